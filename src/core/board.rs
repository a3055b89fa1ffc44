//! Per-player board: zones, the patrol zone, buildings, and counters

use crate::core::{CardId, PlayerId, Property};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Gold in hand never exceeds this.
pub const GOLD_CAP: i32 = 20;

/// Card-holding zones on a board. The patrol zone and building slots are
/// tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Hand,
    Deck,
    Discard,
    Workers,
    InPlay,
    HeroZone,
    Staging,
}

/// The five named defensive slots a character can occupy between turns.
///
/// Each grants a slot-specific bonus while occupied; the squad leader also
/// carries first-intercept priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatrolSlot {
    SquadLeader,
    Elite,
    Scavenger,
    Technician,
    Lookout,
}

impl PatrolSlot {
    pub const ALL: [PatrolSlot; 5] = [
        PatrolSlot::SquadLeader,
        PatrolSlot::Elite,
        PatrolSlot::Scavenger,
        PatrolSlot::Technician,
        PatrolSlot::Lookout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatrolSlot::SquadLeader => "squadLeader",
            PatrolSlot::Elite => "elite",
            PatrolSlot::Scavenger => "scavenger",
            PatrolSlot::Technician => "technician",
            PatrolSlot::Lookout => "lookout",
        }
    }

    pub fn parse(s: &str) -> Option<PatrolSlot> {
        Self::ALL.iter().copied().find(|slot| slot.as_str() == s)
    }

    /// Attribute bonus granted while the slot is occupied, revoked when the
    /// occupant leaves. Scavenger and Technician pay out on death instead.
    pub fn bonus(&self) -> Option<(Property, i32)> {
        match self {
            PatrolSlot::SquadLeader => Some((Property::Armor, 1)),
            PatrolSlot::Elite => Some((Property::Attack, 1)),
            PatrolSlot::Lookout => Some((Property::Resist, 1)),
            PatrolSlot::Scavenger | PatrolSlot::Technician => None,
        }
    }

    /// Index used for adjacency (slots sit in a fixed row).
    fn index(&self) -> usize {
        match self {
            PatrolSlot::SquadLeader => 0,
            PatrolSlot::Elite => 1,
            PatrolSlot::Scavenger => 2,
            PatrolSlot::Technician => 3,
            PatrolSlot::Lookout => 4,
        }
    }

    /// Neighboring slots in the row, for sparkshot splash.
    pub fn adjacent(&self) -> SmallVec<[PatrolSlot; 2]> {
        let i = self.index();
        let mut out = SmallVec::new();
        if i > 0 {
            out.push(Self::ALL[i - 1]);
        }
        if i + 1 < Self::ALL.len() {
            out.push(Self::ALL[i + 1]);
        }
        out
    }
}

/// Slot-to-card mapping for one player's patrol zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatrolZone {
    slots: [Option<CardId>; 5],
}

impl PatrolZone {
    pub fn get(&self, slot: PatrolSlot) -> Option<CardId> {
        self.slots[slot.index()]
    }

    pub fn set(&mut self, slot: PatrolSlot, card: CardId) {
        self.slots[slot.index()] = Some(card);
    }

    pub fn clear_slot(&mut self, slot: PatrolSlot) -> Option<CardId> {
        self.slots[slot.index()].take()
    }

    /// Which slot a card occupies, if any.
    pub fn slot_of(&self, card: CardId) -> Option<PatrolSlot> {
        PatrolSlot::ALL
            .iter()
            .copied()
            .find(|slot| self.slots[slot.index()] == Some(card))
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.slot_of(card).is_some()
    }

    /// Occupied slots in fixed row order.
    pub fn occupants(&self) -> SmallVec<[(PatrolSlot, CardId); 5]> {
        PatrolSlot::ALL
            .iter()
            .filter_map(|slot| self.slots[slot.index()].map(|c| (*slot, c)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// Building slots on a board. The base always exists; tech tiers and the
/// add-on are constructed during play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingSlot {
    Base,
    Tech1,
    Tech2,
    Tech3,
    AddOn,
}

impl BuildingSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingSlot::Base => "base",
            BuildingSlot::Tech1 => "tech1",
            BuildingSlot::Tech2 => "tech2",
            BuildingSlot::Tech3 => "tech3",
            BuildingSlot::AddOn => "addOn",
        }
    }

    pub fn parse(s: &str) -> Option<BuildingSlot> {
        match s {
            "base" => Some(BuildingSlot::Base),
            "tech1" => Some(BuildingSlot::Tech1),
            "tech2" => Some(BuildingSlot::Tech2),
            "tech3" => Some(BuildingSlot::Tech3),
            "addOn" => Some(BuildingSlot::AddOn),
            _ => None,
        }
    }

    pub fn tech_tier(&self) -> Option<usize> {
        match self {
            BuildingSlot::Tech1 => Some(0),
            BuildingSlot::Tech2 => Some(1),
            BuildingSlot::Tech3 => Some(2),
            _ => None,
        }
    }
}

/// State of one building slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingState {
    pub health: i32,
    pub built: bool,
    pub under_construction: bool,
    pub destroyed: bool,
}

impl BuildingState {
    pub fn built_with_health(health: i32) -> Self {
        BuildingState {
            health,
            built: true,
            under_construction: false,
            destroyed: false,
        }
    }

    /// A building only does its job while finished and standing.
    pub fn operational(&self) -> bool {
        self.built && !self.under_construction && !self.destroyed
    }
}

/// Kinds of add-on building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddOnKind {
    /// Detects one stealth/invisible attacker per turn.
    Tower,
}

/// The building slots of one board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buildings {
    pub base: BuildingState,
    pub tech: [BuildingState; 3],
    pub add_on: Option<(AddOnKind, BuildingState)>,
}

impl Buildings {
    pub fn new(base_health: i32) -> Self {
        Buildings {
            base: BuildingState::built_with_health(base_health),
            tech: Default::default(),
            add_on: None,
        }
    }

    pub fn get(&self, slot: BuildingSlot) -> Option<&BuildingState> {
        match slot {
            BuildingSlot::Base => Some(&self.base),
            BuildingSlot::Tech1 | BuildingSlot::Tech2 | BuildingSlot::Tech3 => {
                slot.tech_tier().map(|i| &self.tech[i])
            }
            BuildingSlot::AddOn => self.add_on.as_ref().map(|(_, s)| s),
        }
    }

    pub fn get_mut(&mut self, slot: BuildingSlot) -> Option<&mut BuildingState> {
        match slot {
            BuildingSlot::Base => Some(&mut self.base),
            BuildingSlot::Tech1 | BuildingSlot::Tech2 | BuildingSlot::Tech3 => {
                slot.tech_tier().map(|i| &mut self.tech[i])
            }
            BuildingSlot::AddOn => self.add_on.as_mut().map(|(_, s)| s),
        }
    }

    /// An operational, unspent tower can reveal a stealthed attacker.
    pub fn has_tower(&self) -> bool {
        matches!(&self.add_on, Some((AddOnKind::Tower, state)) if state.operational())
    }
}

/// One player's side of the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub player: PlayerId,

    pub hand: Vec<CardId>,
    pub deck: Vec<CardId>,
    pub discard: Vec<CardId>,
    pub workers: Vec<CardId>,
    pub in_play: Vec<CardId>,
    pub hero_zone: Vec<CardId>,
    /// Spells pass through here while resolving.
    pub play_staging_area: Vec<CardId>,

    pub patrol: PatrolZone,
    pub buildings: Buildings,

    pub gold: i32,
    pub turn_count: u32,
    /// The tower detects one attacker per turn; reset at the start of the
    /// owner's turn.
    pub tower_spent: bool,
}

impl Board {
    pub fn new(player: PlayerId, base_health: i32) -> Self {
        Board {
            player,
            hand: Vec::new(),
            deck: Vec::new(),
            discard: Vec::new(),
            workers: Vec::new(),
            in_play: Vec::new(),
            hero_zone: Vec::new(),
            play_staging_area: Vec::new(),
            patrol: PatrolZone::default(),
            buildings: Buildings::new(base_health),
            gold: 0,
            turn_count: 0,
            tower_spent: false,
        }
    }

    pub fn zone(&self, zone: Zone) -> &Vec<CardId> {
        match zone {
            Zone::Hand => &self.hand,
            Zone::Deck => &self.deck,
            Zone::Discard => &self.discard,
            Zone::Workers => &self.workers,
            Zone::InPlay => &self.in_play,
            Zone::HeroZone => &self.hero_zone,
            Zone::Staging => &self.play_staging_area,
        }
    }

    pub fn zone_mut(&mut self, zone: Zone) -> &mut Vec<CardId> {
        match zone {
            Zone::Hand => &mut self.hand,
            Zone::Deck => &mut self.deck,
            Zone::Discard => &mut self.discard,
            Zone::Workers => &mut self.workers,
            Zone::InPlay => &mut self.in_play,
            Zone::HeroZone => &mut self.hero_zone,
            Zone::Staging => &mut self.play_staging_area,
        }
    }

    /// Which zone holds the card, counting the patrol zone.
    ///
    /// A card instance appears in at most one zone across both boards; this
    /// is the lookup that invariant makes cheap.
    pub fn locate(&self, card: CardId) -> Option<ZoneRef> {
        if let Some(slot) = self.patrol.slot_of(card) {
            return Some(ZoneRef::Patrol(slot));
        }
        for zone in [
            Zone::InPlay,
            Zone::Hand,
            Zone::Deck,
            Zone::Discard,
            Zone::Workers,
            Zone::HeroZone,
            Zone::Staging,
        ] {
            if self.zone(zone).contains(&card) {
                return Some(ZoneRef::Zone(zone));
            }
        }
        None
    }

    /// Remove the card from whichever zone holds it. Returns where it was.
    pub fn remove_card(&mut self, card: CardId) -> Option<ZoneRef> {
        if let Some(slot) = self.patrol.slot_of(card) {
            self.patrol.clear_slot(slot);
            return Some(ZoneRef::Patrol(slot));
        }
        for zone in [
            Zone::InPlay,
            Zone::Hand,
            Zone::Deck,
            Zone::Discard,
            Zone::Workers,
            Zone::HeroZone,
            Zone::Staging,
        ] {
            let cards = self.zone_mut(zone);
            if let Some(pos) = cards.iter().position(|&c| c == card) {
                // remove() keeps iteration order stable; order is observable
                // through snapshots and choice menus.
                cards.remove(pos);
                return Some(ZoneRef::Zone(zone));
            }
        }
        None
    }

    /// Cards counted as "in play": the in-play zone plus patrollers, in
    /// deterministic order.
    pub fn cards_in_play(&self) -> Vec<CardId> {
        let mut out = self.in_play.clone();
        out.extend(self.patrol.occupants().iter().map(|(_, c)| *c));
        out
    }

    pub fn is_in_play(&self, card: CardId) -> bool {
        self.in_play.contains(&card) || self.patrol.contains(card)
    }

    pub fn gain_gold(&mut self, amount: i32) {
        self.gold = (self.gold + amount).clamp(0, GOLD_CAP);
    }
}

/// A location on one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneRef {
    Zone(Zone),
    Patrol(PatrolSlot),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_in_one_zone_at_a_time() {
        let mut board = Board::new(PlayerId::P1, 20);
        let card = CardId::new(7);

        board.hand.push(card);
        assert_eq!(board.locate(card), Some(ZoneRef::Zone(Zone::Hand)));

        assert_eq!(board.remove_card(card), Some(ZoneRef::Zone(Zone::Hand)));
        board.in_play.push(card);
        assert_eq!(board.locate(card), Some(ZoneRef::Zone(Zone::InPlay)));
        assert!(!board.hand.contains(&card));
    }

    #[test]
    fn test_patrol_slot_mapping() {
        let mut board = Board::new(PlayerId::P2, 20);
        let card = CardId::new(3);

        board.patrol.set(PatrolSlot::Elite, card);
        assert!(board.is_in_play(card));
        assert_eq!(board.locate(card), Some(ZoneRef::Patrol(PatrolSlot::Elite)));

        assert_eq!(board.remove_card(card), Some(ZoneRef::Patrol(PatrolSlot::Elite)));
        assert!(board.patrol.is_empty());
    }

    #[test]
    fn test_sparkshot_adjacency() {
        assert_eq!(
            PatrolSlot::SquadLeader.adjacent().as_slice(),
            &[PatrolSlot::Elite]
        );
        assert_eq!(
            PatrolSlot::Scavenger.adjacent().as_slice(),
            &[PatrolSlot::Elite, PatrolSlot::Technician]
        );
        assert_eq!(
            PatrolSlot::Lookout.adjacent().as_slice(),
            &[PatrolSlot::Technician]
        );
    }

    #[test]
    fn test_gold_cap() {
        let mut board = Board::new(PlayerId::P1, 20);
        board.gain_gold(25);
        assert_eq!(board.gold, GOLD_CAP);
        board.gain_gold(-30);
        assert_eq!(board.gold, 0);
    }

    #[test]
    fn test_tower_requires_operational_add_on() {
        let mut board = Board::new(PlayerId::P1, 20);
        assert!(!board.buildings.has_tower());

        board.buildings.add_on = Some((
            AddOnKind::Tower,
            BuildingState {
                health: 4,
                built: true,
                under_construction: true,
                destroyed: false,
            },
        ));
        assert!(!board.buildings.has_tower(), "still under construction");

        board.buildings.add_on.as_mut().unwrap().1.under_construction = false;
        assert!(board.buildings.has_tower());
    }
}
