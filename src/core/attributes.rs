//! The attribute model
//!
//! A card's effective numeric properties are its base values plus the
//! additive modifiers it has accumulated; the sum is recomputed on every
//! read and never cached. Keyword properties are counts rather than
//! booleans: a keyword is active while its count is positive, which lets
//! independent sources stack the same keyword and revoke it independently.

use serde::{Deserialize, Serialize};

/// Every numeric property a card can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Cost,
    Attack,
    Health,
    Armor,
    Damage,
    PlusRune,
    MinusRune,
    Flying,
    AntiAir,
    SwiftStrike,
    Overpower,
    Sparkshot,
    LongRange,
    Frenzy,
    Stealth,
    StealthVsUnits,
    Invisible,
    Unstoppable,
    UnstoppableVsUnits,
    UnstoppableVsHeroes,
    UnstoppableVsBuildings,
    UnstoppableVsBase,
    SkipsTechZeroPatrollers,
    Detector,
    Unattackable,
    Untargetable,
    Resist,
    Haste,
    Readiness,
    Ephemeral,
    Healing,
}

/// A fixed set of named integer counters.
///
/// Used twice per card: once for the base values fixed at construction and
/// once for the mutable deltas accumulated over the card's life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub cost: i32,
    pub attack: i32,
    pub health: i32,
    pub armor: i32,
    pub damage: i32,
    pub plus_rune: i32,
    pub minus_rune: i32,
    pub flying: i32,
    pub anti_air: i32,
    pub swift_strike: i32,
    pub overpower: i32,
    pub sparkshot: i32,
    pub long_range: i32,
    pub frenzy: i32,
    pub stealth: i32,
    pub stealth_vs_units: i32,
    pub invisible: i32,
    pub unstoppable: i32,
    pub unstoppable_vs_units: i32,
    pub unstoppable_vs_heroes: i32,
    pub unstoppable_vs_buildings: i32,
    pub unstoppable_vs_base: i32,
    pub skips_tech_zero_patrollers: i32,
    pub detector: i32,
    pub unattackable: i32,
    pub untargetable: i32,
    pub resist: i32,
    pub haste: i32,
    pub readiness: i32,
    pub ephemeral: i32,
    pub healing: i32,
}

impl Attributes {
    /// A unit statline: everything zero except attack/health/cost.
    pub fn statline(cost: i32, attack: i32, health: i32) -> Self {
        Attributes {
            cost,
            attack,
            health,
            ..Default::default()
        }
    }

    pub fn get(&self, p: Property) -> i32 {
        match p {
            Property::Cost => self.cost,
            Property::Attack => self.attack,
            Property::Health => self.health,
            Property::Armor => self.armor,
            Property::Damage => self.damage,
            Property::PlusRune => self.plus_rune,
            Property::MinusRune => self.minus_rune,
            Property::Flying => self.flying,
            Property::AntiAir => self.anti_air,
            Property::SwiftStrike => self.swift_strike,
            Property::Overpower => self.overpower,
            Property::Sparkshot => self.sparkshot,
            Property::LongRange => self.long_range,
            Property::Frenzy => self.frenzy,
            Property::Stealth => self.stealth,
            Property::StealthVsUnits => self.stealth_vs_units,
            Property::Invisible => self.invisible,
            Property::Unstoppable => self.unstoppable,
            Property::UnstoppableVsUnits => self.unstoppable_vs_units,
            Property::UnstoppableVsHeroes => self.unstoppable_vs_heroes,
            Property::UnstoppableVsBuildings => self.unstoppable_vs_buildings,
            Property::UnstoppableVsBase => self.unstoppable_vs_base,
            Property::SkipsTechZeroPatrollers => self.skips_tech_zero_patrollers,
            Property::Detector => self.detector,
            Property::Unattackable => self.unattackable,
            Property::Untargetable => self.untargetable,
            Property::Resist => self.resist,
            Property::Haste => self.haste,
            Property::Readiness => self.readiness,
            Property::Ephemeral => self.ephemeral,
            Property::Healing => self.healing,
        }
    }

    pub fn add(&mut self, p: Property, delta: i32) {
        let slot = match p {
            Property::Cost => &mut self.cost,
            Property::Attack => &mut self.attack,
            Property::Health => &mut self.health,
            Property::Armor => &mut self.armor,
            Property::Damage => &mut self.damage,
            Property::PlusRune => &mut self.plus_rune,
            Property::MinusRune => &mut self.minus_rune,
            Property::Flying => &mut self.flying,
            Property::AntiAir => &mut self.anti_air,
            Property::SwiftStrike => &mut self.swift_strike,
            Property::Overpower => &mut self.overpower,
            Property::Sparkshot => &mut self.sparkshot,
            Property::LongRange => &mut self.long_range,
            Property::Frenzy => &mut self.frenzy,
            Property::Stealth => &mut self.stealth,
            Property::StealthVsUnits => &mut self.stealth_vs_units,
            Property::Invisible => &mut self.invisible,
            Property::Unstoppable => &mut self.unstoppable,
            Property::UnstoppableVsUnits => &mut self.unstoppable_vs_units,
            Property::UnstoppableVsHeroes => &mut self.unstoppable_vs_heroes,
            Property::UnstoppableVsBuildings => &mut self.unstoppable_vs_buildings,
            Property::UnstoppableVsBase => &mut self.unstoppable_vs_base,
            Property::SkipsTechZeroPatrollers => &mut self.skips_tech_zero_patrollers,
            Property::Detector => &mut self.detector,
            Property::Unattackable => &mut self.unattackable,
            Property::Untargetable => &mut self.untargetable,
            Property::Resist => &mut self.resist,
            Property::Haste => &mut self.haste,
            Property::Readiness => &mut self.readiness,
            Property::Ephemeral => &mut self.ephemeral,
            Property::Healing => &mut self.healing,
        };
        *slot += delta;
    }

    /// Keyword check: a keyword is active while its count is positive.
    pub fn has(&self, p: Property) -> bool {
        self.get(p) > 0
    }

    /// Health adjusted for runes. Does not subtract damage.
    pub fn rune_adjusted_health(&self) -> i32 {
        self.health + self.plus_rune - self.minus_rune
    }

    /// Remaining health: rune-adjusted health minus accumulated damage.
    pub fn all_health(&self) -> i32 {
        self.rune_adjusted_health() - self.damage
    }

    /// Attack adjusted for runes, floored at zero.
    pub fn all_attack(&self) -> i32 {
        (self.attack + self.plus_rune - self.minus_rune).max(0)
    }

    /// A card should be destroyed once accumulated damage meets or exceeds
    /// its effective health.
    pub fn should_destroy(&self) -> bool {
        self.damage >= self.rune_adjusted_health()
    }
}

impl std::ops::Add for Attributes {
    type Output = Attributes;

    fn add(self, rhs: Attributes) -> Attributes {
        Attributes {
            cost: self.cost + rhs.cost,
            attack: self.attack + rhs.attack,
            health: self.health + rhs.health,
            armor: self.armor + rhs.armor,
            damage: self.damage + rhs.damage,
            plus_rune: self.plus_rune + rhs.plus_rune,
            minus_rune: self.minus_rune + rhs.minus_rune,
            flying: self.flying + rhs.flying,
            anti_air: self.anti_air + rhs.anti_air,
            swift_strike: self.swift_strike + rhs.swift_strike,
            overpower: self.overpower + rhs.overpower,
            sparkshot: self.sparkshot + rhs.sparkshot,
            long_range: self.long_range + rhs.long_range,
            frenzy: self.frenzy + rhs.frenzy,
            stealth: self.stealth + rhs.stealth,
            stealth_vs_units: self.stealth_vs_units + rhs.stealth_vs_units,
            invisible: self.invisible + rhs.invisible,
            unstoppable: self.unstoppable + rhs.unstoppable,
            unstoppable_vs_units: self.unstoppable_vs_units + rhs.unstoppable_vs_units,
            unstoppable_vs_heroes: self.unstoppable_vs_heroes + rhs.unstoppable_vs_heroes,
            unstoppable_vs_buildings: self.unstoppable_vs_buildings + rhs.unstoppable_vs_buildings,
            unstoppable_vs_base: self.unstoppable_vs_base + rhs.unstoppable_vs_base,
            skips_tech_zero_patrollers: self.skips_tech_zero_patrollers
                + rhs.skips_tech_zero_patrollers,
            detector: self.detector + rhs.detector,
            unattackable: self.unattackable + rhs.unattackable,
            untargetable: self.untargetable + rhs.untargetable,
            resist: self.resist + rhs.resist,
            haste: self.haste + rhs.haste,
            readiness: self.readiness + rhs.readiness,
            ephemeral: self.ephemeral + rhs.ephemeral,
            healing: self.healing + rhs.healing,
        }
    }
}
