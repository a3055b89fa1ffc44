//! Card instances
//!
//! A card is one record with shared fields plus a tagged variant for the
//! kind-specific payload; there is no card class hierarchy. Behavior hangs
//! off the capability registry, not the kind.

use crate::core::{ActivatedAbility, Attributes, Capability, CardId, EffectSpec, PlayerId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Kind tag with variant-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardKind {
    Unit,
    Hero {
        /// Current level; raised by the `HeroLevel` action.
        level: i32,
        /// Crossing these thresholds grants the band bonuses below.
        mid_level: i32,
        max_level: i32,
        /// (attack, health) granted on reaching the mid / max band.
        mid_bonus: (i32, i32),
        max_bonus: (i32, i32),
        /// Turns until a dead hero may be replayed; ticks down at its
        /// owner's upkeep.
        availability: i32,
    },
    Spell {
        effect: EffectSpec,
    },
    Building,
    Upgrade,
}

impl CardKind {
    /// A plain hero payload: level 1, bands at 3/5 granting +1/+1 each.
    pub fn hero() -> CardKind {
        CardKind::Hero {
            level: 1,
            mid_level: 3,
            max_level: 5,
            mid_bonus: (1, 1),
            max_bonus: (1, 1),
            availability: 0,
        }
    }
}

/// A card instance during one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,

    /// Owner never changes; controller can (a stolen card is controlled by
    /// a different player than its owner).
    pub owner: PlayerId,
    pub controller: PlayerId,

    pub kind: CardKind,

    /// Fixed at construction.
    pub base: Attributes,
    /// Mutable deltas accumulated over the card's life. Effective values
    /// are `base + modifiers`, recomputed on every read.
    pub modifiers: Attributes,

    /// Tech tier of the card (0 for starter units, 1-3 for teched ones).
    pub tech_level: i32,

    /// Registered hook/trigger capabilities with their payloads.
    pub hooks: SmallVec<[(Capability, EffectSpec); 2]>,
    /// Activated abilities, used through the `Ability` action.
    pub abilities: SmallVec<[ActivatedAbility; 1]>,

    // Per-turn combat bookkeeping.
    pub exhausted: bool,
    pub arrival_fatigue: bool,
    pub attacks_this_turn: i32,
    /// Set when a tower or detector exposes this card; cleared at the start
    /// of its controller's turn.
    pub revealed_this_turn: bool,
    /// Damage absorbed by armor this turn; armor regenerates at the start
    /// of its controller's turn.
    pub armor_damage: i32,

    /// Cards riding along with this one (tokens pinned under it, etc.).
    pub contained_card_ids: Vec<CardId>,
}

impl Card {
    pub fn new(
        id: CardId,
        name: impl Into<String>,
        owner: PlayerId,
        kind: CardKind,
        base: Attributes,
    ) -> Self {
        Card {
            id,
            name: name.into(),
            owner,
            controller: owner,
            kind,
            base,
            modifiers: Attributes::default(),
            tech_level: 0,
            hooks: SmallVec::new(),
            abilities: SmallVec::new(),
            exhausted: false,
            arrival_fatigue: false,
            attacks_this_turn: 0,
            revealed_this_turn: false,
            armor_damage: 0,
            contained_card_ids: Vec::new(),
        }
    }

    /// Builder: a unit with the given statline.
    pub fn unit(id: CardId, name: impl Into<String>, owner: PlayerId, cost: i32, attack: i32, health: i32) -> Self {
        Card::new(id, name, owner, CardKind::Unit, Attributes::statline(cost, attack, health))
    }

    /// Builder: register a hook capability.
    ///
    /// Registering [`Capability::GiveBonus`] also registers the matching
    /// [`Capability::RemoveBonus`] with the identical payload, so a grant can
    /// never outlive its revoke.
    pub fn with_hook(mut self, capability: Capability, effect: EffectSpec) -> Self {
        if capability == Capability::GiveBonus {
            self.hooks.push((Capability::RemoveBonus, effect.clone()));
        }
        self.hooks.push((capability, effect));
        self
    }

    /// Builder: register an activated ability.
    pub fn with_ability(mut self, ability: ActivatedAbility) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Builder: bump a base property (keywords, armor, and so on).
    pub fn with_base(mut self, property: crate::core::Property, amount: i32) -> Self {
        self.base.add(property, amount);
        self
    }

    /// Builder: set the tech tier.
    pub fn with_tech_level(mut self, tech_level: i32) -> Self {
        self.tech_level = tech_level;
        self
    }

    /// Effective attributes: base plus modifiers, computed fresh.
    pub fn effective(&self) -> Attributes {
        self.base + self.modifiers
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.hooks.iter().any(|(c, _)| *c == capability)
    }

    pub fn hook_effect(&self, capability: Capability) -> Option<&EffectSpec> {
        self.hooks
            .iter()
            .find(|(c, _)| *c == capability)
            .map(|(_, e)| e)
    }

    /// Drop a one-shot capability after it fires.
    pub fn consume_hook(&mut self, capability: Capability) {
        if let Some(pos) = self.hooks.iter().position(|(c, _)| *c == capability) {
            self.hooks.remove(pos);
        }
    }

    pub fn ability(&self, name: &str) -> Option<&ActivatedAbility> {
        self.abilities.iter().find(|a| a.name == name)
    }

    pub fn is_character(&self) -> bool {
        matches!(self.kind, CardKind::Unit | CardKind::Hero { .. })
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind, CardKind::Unit)
    }

    pub fn is_hero(&self) -> bool {
        matches!(self.kind, CardKind::Hero { .. })
    }

    pub fn is_spell(&self) -> bool {
        matches!(self.kind, CardKind::Spell { .. })
    }

    /// Short tag for snapshots and events.
    pub fn kind_tag(&self) -> &'static str {
        match self.kind {
            CardKind::Unit => "unit",
            CardKind::Hero { .. } => "hero",
            CardKind::Spell { .. } => "spell",
            CardKind::Building => "building",
            CardKind::Upgrade => "upgrade",
        }
    }

    /// Reset accumulated state when the card returns to hand, hero zone, or
    /// discard. Base attributes and registered capabilities survive; hero
    /// levels do not reset here (a dead hero keeps its availability clock,
    /// handled by the death pipeline).
    pub fn reset_card(&mut self) {
        self.modifiers = Attributes::default();
        self.controller = self.owner;
        self.exhausted = false;
        self.arrival_fatigue = false;
        self.attacks_this_turn = 0;
        self.revealed_this_turn = false;
        self.armor_damage = 0;
        self.contained_card_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Property;

    #[test]
    fn test_effective_reads_fresh() {
        let mut card = Card::unit(CardId::new(1), "Recruit", PlayerId::P1, 2, 2, 3);
        assert_eq!(card.effective().attack, 2);

        card.modifiers.add(Property::Attack, 2);
        assert_eq!(card.effective().attack, 4);
        assert_eq!(card.base.attack, 2, "base untouched");
    }

    #[test]
    fn test_give_bonus_registers_paired_revoke() {
        let card = Card::unit(CardId::new(1), "Banner", PlayerId::P1, 3, 1, 2).with_hook(
            Capability::GiveBonus,
            EffectSpec::GlobalBonus {
                property: Property::Armor,
                amount: 1,
            },
        );

        assert!(card.has_capability(Capability::GiveBonus));
        assert!(card.has_capability(Capability::RemoveBonus));
        assert_eq!(
            card.hook_effect(Capability::GiveBonus),
            card.hook_effect(Capability::RemoveBonus)
        );
    }

    #[test]
    fn test_reset_card_clears_accumulated_state() {
        let mut card = Card::unit(CardId::new(1), "Recruit", PlayerId::P2, 2, 2, 3);
        card.modifiers.add(Property::Damage, 2);
        card.exhausted = true;
        card.arrival_fatigue = true;
        card.controller = PlayerId::P1;

        card.reset_card();
        assert_eq!(card.modifiers, Attributes::default());
        assert!(!card.exhausted);
        assert!(!card.arrival_fatigue);
        assert_eq!(card.controller, PlayerId::P2);
    }
}
