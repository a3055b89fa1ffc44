//! Capabilities: the closed set of optional behaviors a card can register
//!
//! A card declares at construction which capabilities it implements. The
//! dispatcher discovers behavior purely by querying this registry - never by
//! inspecting a card's type - so any card kind can opt into any subset.

use crate::core::Property;
use serde::{Deserialize, Serialize};

/// The closed capability set.
///
/// Trigger-class capabilities are deferred into a choice-bearing action so
/// the player controls resolution order; hook-class capabilities are invoked
/// immediately wherever reordering cannot change the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Trigger: the card arrives in play.
    OnArrival,
    /// Trigger: the card dies.
    OnDeath,
    /// Trigger: its controller's upkeep.
    OnUpkeep,
    /// Trigger: its controller's end of turn.
    OnEndOfTurn,
    /// Trigger: a card its controller owns declares an attack.
    OnAttack,
    /// Hook: the card leaves play for any reason.
    OnLeavesPlay,
    /// Hook: grants an ongoing bonus to its controller's other units.
    GiveBonus,
    /// Hook: revokes the same bonus. Registered automatically alongside
    /// [`Capability::GiveBonus`] with an identical payload, so every grant
    /// has a matching revoke.
    RemoveBonus,
    /// Alteration: adjusts the gold cost of cards its controller plays.
    AlterCost,
    /// Hook: consulted when the card would die; may save it instead.
    WouldDieSave,
    /// Hook: consulted when the card would be discarded; may keep it.
    WouldDiscardIntercept,
    /// Hook: the card is assigned to a patrol slot.
    OnPatrolEntry,
    /// Hook: the card leaves its patrol slot (sidelined or swept).
    OnPatrolExit,
    /// Marker: negates stealth/invisible evasion for targeting purposes.
    Detector,
    /// Marker: while this card is in play, the opposing side's buildings
    /// cannot be attacked.
    GuardsBuildings,
}

/// The behavior a registered capability performs when invoked.
///
/// The card catalog is external to the engine, so behavior is declared as
/// data rather than code; each variant maps onto one engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectSpec {
    /// Presence is the whole behavior (Detector, GuardsBuildings).
    Marker,
    /// Deal damage to the opposing base.
    DamageOpponentBase { amount: i32 },
    /// Controller draws cards.
    Draw { count: u32 },
    /// Controller gains gold.
    GainGold { amount: i32 },
    /// The card itself gains a permanent property delta.
    GainProperty { property: Property, amount: i32 },
    /// The card gains a property delta that expires at the start of its
    /// controller's next turn.
    GainPropertyUntilNextTurn { property: Property, amount: i32 },
    /// Ongoing bonus to the controller's other units (GiveBonus payload).
    GlobalBonus { property: Property, amount: i32 },
    /// Delta applied to the gold cost of cards the controller plays.
    AlterCost { delta: i32 },
    /// Instead of dying, clear all damage. Consumed on use.
    SaveFromDeath,
    /// The card refuses the end-of-turn hand discard.
    PreventDiscard,
}

/// An activated ability, used through the `Ability` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedAbility {
    pub name: String,
    pub gold_cost: i32,
    /// Whether using the ability exhausts the card.
    pub exhausts: bool,
    pub effect: EffectSpec,
}
