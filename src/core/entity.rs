//! Card identity and the per-game card arena

use crate::core::Card;
use crate::{EngineError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a card instance.
///
/// Ids are dense integers handed out once per game by [`CardArena`] and never
/// reused, so they stay stable across zone changes, destruction, and
/// serialization. A card that leaves play keeps its id and may re-enter play
/// later (heroes do this routinely).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(u32);

impl CardId {
    pub fn new(id: u32) -> Self {
        CardId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two players.
///
/// The game is strictly two-player, so a closed enum beats an open integer
/// id: `opponent()` is total and boards can live in a fixed-size array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    P1,
    P2,
}

impl PlayerId {
    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::P1 => PlayerId::P2,
            PlayerId::P2 => PlayerId::P1,
        }
    }

    /// Index into per-player arrays (boards, and so on).
    pub fn index(self) -> usize {
        match self {
            PlayerId::P1 => 0,
            PlayerId::P2 => 1,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::P1 => write!(f, "P1"),
            PlayerId::P2 => write!(f, "P2"),
        }
    }
}

/// Central storage for every card instance in one game.
///
/// The arena is owned by the game object and passed explicitly wherever
/// lookups are needed; cards are referenced by [`CardId`], never by live
/// reference. Uses FxHashMap for fast hashing of integer keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardArena {
    cards: FxHashMap<CardId, Card>,
    next_id: u32,
}

impl CardArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh, never-reused id.
    pub fn next_id(&mut self) -> CardId {
        let id = CardId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a card under a specific id.
    pub fn insert(&mut self, id: CardId, card: Card) {
        self.cards.insert(id, card);
    }

    /// Allocate an id and insert the card built from it in one step.
    pub fn create(&mut self, build: impl FnOnce(CardId) -> Card) -> CardId {
        let id = self.next_id();
        let card = build(id);
        self.cards.insert(id, card);
        id
    }

    pub fn get(&self, id: CardId) -> Result<&Card> {
        self.cards.get(&id).ok_or(EngineError::CardNotFound(id.as_u32()))
    }

    pub fn get_mut(&mut self, id: CardId) -> Result<&mut Card> {
        self.cards
            .get_mut(&id)
            .ok_or(EngineError::CardNotFound(id.as_u32()))
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CardId, &Card)> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attributes, Card, CardKind};

    #[test]
    fn test_arena_ids_are_dense_and_unique() {
        let mut arena = CardArena::new();
        let a = arena.create(|id| Card::new(id, "A", PlayerId::P1, CardKind::Unit, Attributes::default()));
        let b = arena.create(|id| Card::new(id, "B", PlayerId::P2, CardKind::Unit, Attributes::default()));

        assert_eq!(a.as_u32(), 0);
        assert_eq!(b.as_u32(), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).unwrap().name, "A");
        assert!(arena.get(CardId::new(99)).is_err());
    }

    #[test]
    fn test_opponent_is_involutive() {
        assert_eq!(PlayerId::P1.opponent(), PlayerId::P2);
        assert_eq!(PlayerId::P2.opponent().opponent(), PlayerId::P2);
    }
}
