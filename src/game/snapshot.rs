//! Snapshot store and the external action boundary
//!
//! Suspension is a request/response boundary, not a concurrency construct:
//! after each successful action the whole game state is serialized under a
//! fresh opaque identifier, and the next request names that identifier to
//! resume exactly where processing stopped. Prior identifiers stay valid,
//! so any point can be branched or replayed. Nothing is written on failure,
//! which is the entire crash-consistency story.

use crate::core::{Attributes, BuildingState, Buildings, CardId, PlayerId, Zone};
use crate::game::{ActionContext, EventDescriptor, Game, PhaseStack};
use crate::{EngineError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const STATE_ID_LEN: usize = 16;
const STATE_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Write-on-success store of serialized game states, keyed by opaque
/// random identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStore {
    states: FxHashMap<String, String>,
    rng: ChaCha12Rng,
}

impl SnapshotStore {
    pub fn new(seed: u64) -> Self {
        SnapshotStore {
            states: FxHashMap::default(),
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id: String = (0..STATE_ID_LEN)
                .map(|_| {
                    let i = self.rng.gen_range(0..STATE_ID_ALPHABET.len());
                    STATE_ID_ALPHABET[i] as char
                })
                .collect();
            if !self.states.contains_key(&id) {
                return id;
            }
        }
    }

    /// Serialize a game under a fresh identifier. Prior identifiers remain
    /// valid and resolvable.
    pub fn save(&mut self, game: &Game) -> Result<String> {
        let body = serde_json::to_string(game)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        let id = self.fresh_id();
        self.states.insert(id.clone(), body);
        Ok(id)
    }

    pub fn load(&self, state_id: &str) -> Result<Game> {
        let body = self
            .states
            .get(state_id)
            .ok_or_else(|| EngineError::UnknownState(state_id.to_string()))?;
        serde_json::from_str(body).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Card snapshot as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSnapshot {
    pub card_kind_tag: String,
    pub card_id: CardId,
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub base_attributes: Attributes,
    pub attribute_modifiers: Attributes,
    pub contained_card_ids: Vec<CardId>,
}

/// One board as clients see it: zones as ordered card-snapshot lists plus
/// building and patrol state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub hand: Vec<CardSnapshot>,
    pub deck: Vec<CardSnapshot>,
    pub discard: Vec<CardSnapshot>,
    pub workers: Vec<CardSnapshot>,
    pub in_play: Vec<CardSnapshot>,
    pub hero_zone: Vec<CardSnapshot>,
    pub play_staging_area: Vec<CardSnapshot>,
    pub patrol_zone: BTreeMap<String, CardId>,
    pub buildings: BuildingsView,
    pub gold: i32,
    pub turn_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingsView {
    pub base: BuildingState,
    pub tech: [BuildingState; 3],
    pub add_on: Option<BuildingState>,
}

impl From<&Buildings> for BuildingsView {
    fn from(b: &Buildings) -> Self {
        BuildingsView {
            base: b.base.clone(),
            tech: b.tech.clone(),
            add_on: b.add_on.as_ref().map(|(_, s)| s.clone()),
        }
    }
}

/// The logical state snapshot returned across the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub active_player_id: PlayerId,
    pub player1_board: BoardView,
    pub player2_board: BoardView,
    pub phase_stack: PhaseStack,
    pub event_log: Vec<EventDescriptor>,
}

impl SnapshotView {
    pub fn of(game: &Game) -> Result<Self> {
        Ok(SnapshotView {
            active_player_id: game.active_player,
            player1_board: board_view(game, PlayerId::P1)?,
            player2_board: board_view(game, PlayerId::P2)?,
            phase_stack: game.stack.clone(),
            event_log: game.log.entries().to_vec(),
        })
    }
}

fn card_snapshot(game: &Game, id: CardId) -> Result<CardSnapshot> {
    let card = game.card(id)?;
    Ok(CardSnapshot {
        card_kind_tag: card.kind_tag().to_string(),
        card_id: card.id,
        owner: card.owner,
        controller: card.controller,
        base_attributes: card.base,
        attribute_modifiers: card.modifiers,
        contained_card_ids: card.contained_card_ids.clone(),
    })
}

fn zone_view(game: &Game, player: PlayerId, zone: Zone) -> Result<Vec<CardSnapshot>> {
    game.board(player)
        .zone(zone)
        .iter()
        .map(|&id| card_snapshot(game, id))
        .collect()
}

fn board_view(game: &Game, player: PlayerId) -> Result<BoardView> {
    let board = game.board(player);
    Ok(BoardView {
        hand: zone_view(game, player, Zone::Hand)?,
        deck: zone_view(game, player, Zone::Deck)?,
        discard: zone_view(game, player, Zone::Discard)?,
        workers: zone_view(game, player, Zone::Workers)?,
        in_play: zone_view(game, player, Zone::InPlay)?,
        hero_zone: zone_view(game, player, Zone::HeroZone)?,
        play_staging_area: zone_view(game, player, Zone::Staging)?,
        patrol_zone: board
            .patrol
            .occupants()
            .iter()
            .map(|(slot, id)| (slot.as_str().to_string(), *id))
            .collect(),
        buildings: BuildingsView::from(&board.buildings),
        gold: board.gold,
        turn_count: board.turn_count,
    })
}

/// Successful boundary response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSuccess {
    pub state_id: String,
    pub snapshot: SnapshotView,
    pub event_log: Vec<EventDescriptor>,
}

/// Boundary response: a new snapshot or a plain error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    Success(Box<ActionSuccess>),
    Failure { error: String },
}

/// Register a freshly set up game and hand back its first state identifier.
pub fn register_game(store: &mut SnapshotStore, game: &Game) -> Result<String> {
    store.save(game)
}

/// The single entry point the transport layer calls. The context names the
/// prior snapshot (`stateId`) plus whatever identifiers the action needs.
/// Failures leave the store untouched.
pub fn perform_action(store: &mut SnapshotStore, name: &str, ctx: &ActionContext) -> ActionOutcome {
    match perform_action_inner(store, name, ctx) {
        Ok(success) => ActionOutcome::Success(Box::new(success)),
        Err(err) => ActionOutcome::Failure {
            error: err.to_string(),
        },
    }
}

fn perform_action_inner(
    store: &mut SnapshotStore,
    name: &str,
    ctx: &ActionContext,
) -> Result<ActionSuccess> {
    let state_ref = ctx
        .get("stateId")
        .ok_or_else(|| EngineError::IllegalAction("missing stateId in context".to_string()))?;
    let mut game = store.load(state_ref)?;
    game.perform(name, ctx)?;
    let state_id = store.save(&game)?;
    Ok(ActionSuccess {
        state_id,
        snapshot: SnapshotView::of(&game)?,
        event_log: game.log.entries().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Card;

    fn ctx(pairs: &[(&str, &str)]) -> ActionContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn seeded_game() -> (Game, CardId) {
        let mut game = Game::new(21);
        let unit = game
            .cards
            .create(|id| Card::unit(id, "Recruit", PlayerId::P1, 1, 2, 2));
        game.board_mut(PlayerId::P1).in_play.push(unit);
        (game, unit)
    }

    #[test]
    fn test_round_trip_preserves_state() {
        let (game, unit) = seeded_game();
        let mut store = SnapshotStore::new(1);
        let id = store.save(&game).unwrap();

        let restored = store.load(&id).unwrap();
        assert_eq!(restored.active_player, PlayerId::P1);
        assert!(restored.board(PlayerId::P1).in_play.contains(&unit));
    }

    #[test]
    fn test_failure_writes_nothing() {
        let (game, _) = seeded_game();
        let mut store = SnapshotStore::new(2);
        let id = store.save(&game).unwrap();
        let stored_before = store.len();

        let outcome = perform_action(
            &mut store,
            "Attack",
            &ctx(&[("stateId", &id), ("cardId", "999")]),
        );
        assert!(matches!(outcome, ActionOutcome::Failure { .. }));
        assert_eq!(store.len(), stored_before, "no snapshot written on failure");
    }

    #[test]
    fn test_unknown_state_reference() {
        let mut store = SnapshotStore::new(3);
        let outcome = perform_action(&mut store, "EndTurn", &ctx(&[("stateId", "nope")]));
        match outcome {
            ActionOutcome::Failure { error } => assert!(error.contains("nope")),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn test_prior_states_support_branching() {
        let (mut game, unit) = seeded_game();
        let enemy = game
            .cards
            .create(|id| Card::unit(id, "Enemy", PlayerId::P2, 1, 1, 1));
        game.board_mut(PlayerId::P2).in_play.push(enemy);

        let mut store = SnapshotStore::new(4);
        let root = store.save(&game).unwrap();

        // Branch A: attack. Branch B, from the same root: end the turn.
        let a = perform_action(
            &mut store,
            "Attack",
            &ctx(&[("stateId", &root), ("cardId", &unit.to_string())]),
        );
        let ActionOutcome::Success(a) = a else { panic!("branch A failed") };

        let b = perform_action(&mut store, "EndTurn", &ctx(&[("stateId", &root)]));
        let ActionOutcome::Success(b) = b else { panic!("branch B failed") };

        assert_ne!(a.state_id, b.state_id);
        assert_eq!(a.snapshot.active_player_id, PlayerId::P1);
        assert_eq!(b.snapshot.active_player_id, PlayerId::P2);
        // The root is still loadable after both branches.
        assert!(store.load(&root).is_ok());
    }

    #[test]
    fn test_snapshot_view_shape() {
        let (mut game, unit) = seeded_game();
        game.board_mut(PlayerId::P1)
            .patrol
            .set(crate::core::PatrolSlot::Elite, unit);
        game.board_mut(PlayerId::P1).in_play.clear();

        let view = SnapshotView::of(&game).unwrap();
        assert_eq!(view.player1_board.patrol_zone.get("elite"), Some(&unit));
        assert_eq!(view.player1_board.buildings.base.health, 20);
        assert_eq!(view.player1_board.in_play.len(), 0);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("activePlayerId").is_some());
        assert!(json.get("player1Board").is_some());
        assert!(json["player1Board"].get("patrolZone").is_some());
    }
}
