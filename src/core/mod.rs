//! Core value types: identities, attributes, capabilities, cards, boards

pub mod attributes;
pub mod board;
pub mod capability;
pub mod card;
pub mod entity;

pub use attributes::{Attributes, Property};
pub use board::{
    AddOnKind, Board, BuildingSlot, BuildingState, Buildings, PatrolSlot, PatrolZone, Zone,
    ZoneRef, GOLD_CAP,
};
pub use capability::{ActivatedAbility, Capability, EffectSpec};
pub use card::{Card, CardKind};
pub use entity::{CardArena, CardId, PlayerId};
