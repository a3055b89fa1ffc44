//! Combat resolution
//!
//! The attack sequence is a state machine over phase boundaries: declare
//! the attacker, choose a target under the stealth/patrol/detection rules,
//! route by target kind, then deal damage with its riders (swift strike,
//! anti-air, overpower, sparkshot). Damage is simultaneous and
//! non-negotiable; deaths resolve last so death-trigger ordering stays a
//! player choice made with the damage already visible.

use crate::core::{BuildingSlot, Capability, CardId, PatrolSlot, PlayerId, Property};
use crate::game::{Action, ActionKind, EventKind, Game, Phase, SearchSpace, TargetId};
use crate::{EngineError, Result};

/// Phase context key: the attacking card.
pub const KEY_ATTACKER: &str = "attacker";
/// Phase context key: overpower excess damage carried to the redirect.
pub const KEY_OVERPOWER_AMOUNT: &str = "overpowerAmount";

impl Game {
    /// Stage 1: validate and mark the attacker, open the target choice,
    /// then dispatch the attack trigger on top of it.
    pub fn declare_attack(&mut self, attacker: CardId) -> Result<()> {
        let controller = {
            let card = self.card(attacker)?;
            if !card.is_character() {
                return Err(EngineError::Precondition(format!(
                    "{} cannot attack",
                    card.name
                )));
            }
            card.controller
        };
        if controller != self.active_player {
            return Err(EngineError::Precondition(
                "only the active player's cards can attack".to_string(),
            ));
        }
        if !self.board(controller).is_in_play(attacker) {
            return Err(EngineError::Precondition("attacker is not in play".to_string()));
        }
        {
            let card = self.card(attacker)?;
            if card.exhausted {
                return Err(EngineError::Precondition(format!(
                    "{} is exhausted",
                    card.name
                )));
            }
            if card.arrival_fatigue && !card.effective().has(Property::Haste) {
                return Err(EngineError::Precondition(format!(
                    "{} arrived this turn",
                    card.name
                )));
            }
            if card.attacks_this_turn >= 1 {
                return Err(EngineError::Precondition(format!(
                    "{} has no attacks left this turn",
                    card.name
                )));
            }
        }

        let targets = self.legal_attack_targets(attacker)?;
        if targets.is_empty() {
            return Err(EngineError::Precondition("no legal attack targets".to_string()));
        }

        {
            let card = self.card_mut(attacker)?;
            card.attacks_this_turn += 1;
            if !card.effective().has(Property::Readiness) {
                card.exhausted = true;
            }
        }
        let name = self.card(attacker)?.name.clone();
        self.log.push_with(
            EventKind::AttackDeclared,
            format!("{name} attacks"),
            [("cardId".to_string(), attacker.to_string())],
        );

        // Target choice goes under the trigger phase so attack reactions
        // resolve before the target is picked.
        let mut phase = Phase::with_action(Action::choose_one(ActionKind::AttackTarget, targets));
        phase.set(KEY_ATTACKER, attacker);
        self.stack.push(phase);

        self.trigger(Capability::OnAttack, SearchSpace::PlayerInPlay(controller));
        Ok(())
    }

    /// Stage 2: the legal target set, by fixed precedence. May spend the
    /// defender's tower to reveal a stealthed attacker, which flips it back
    /// to stoppable.
    pub fn legal_attack_targets(&mut self, attacker: CardId) -> Result<Vec<TargetId>> {
        let (controller, eff, revealed) = {
            let card = self.card(attacker)?;
            (card.controller, card.effective(), card.revealed_this_turn)
        };
        let defender = controller.opponent();

        let mut evasive = eff.has(Property::Unstoppable);
        if !evasive && !revealed {
            let cloaked = eff.has(Property::Stealth) || eff.has(Property::Invisible);
            let cloaked_vs_units = eff.has(Property::StealthVsUnits);
            if cloaked || cloaked_vs_units {
                if self.capability_in_play(defender, Capability::Detector) {
                    // A detector negates the evasion outright.
                } else if cloaked && self.tower_ready(defender) {
                    self.reveal_with_tower(defender, attacker)?;
                } else {
                    // Unit-only stealth with a ready tower slips through
                    // here; the tower challenges it at target selection.
                    evasive = true;
                }
            }
        }

        let interceptors = self.interceptors(attacker, defender)?;
        if evasive || interceptors.is_empty() {
            return self.open_targets(attacker, defender);
        }

        // Patrollers stand in the way: the squad leader must be chosen
        // first if it can intercept, otherwise any interceptor is legal.
        let mut targets: Vec<TargetId> = if let Some(&(_, leader)) = interceptors
            .iter()
            .find(|(slot, _)| *slot == PatrolSlot::SquadLeader)
        {
            vec![TargetId::Card(leader)]
        } else {
            interceptors.iter().map(|&(_, c)| TargetId::Card(c)).collect()
        };

        // Expanding alterations apply after the patroller check is
        // finalized: these targets are legal even through a patrol line.
        if eff.has(Property::UnstoppableVsBase) {
            targets.push(TargetId::Building(defender, BuildingSlot::Base));
        }
        if eff.has(Property::UnstoppableVsBuildings) {
            for slot in self.standing_buildings(defender) {
                let t = TargetId::Building(defender, slot);
                if !targets.contains(&t) {
                    targets.push(t);
                }
            }
        }
        if eff.has(Property::UnstoppableVsHeroes) || eff.has(Property::UnstoppableVsUnits) {
            for id in self.board(defender).cards_in_play() {
                let card = self.card(id)?;
                let wanted = (card.is_hero() && eff.has(Property::UnstoppableVsHeroes))
                    || (card.is_unit() && eff.has(Property::UnstoppableVsUnits));
                if wanted && !card.effective().has(Property::Unattackable) {
                    let t = TargetId::Card(id);
                    if !targets.contains(&t) {
                        targets.push(t);
                    }
                }
            }
        }
        Ok(targets)
    }

    /// Defender patrollers able to intercept this attacker: same
    /// flying/non-flying class, minus any tier the attacker skips.
    fn interceptors(&self, attacker: CardId, defender: PlayerId) -> Result<Vec<(PatrolSlot, CardId)>> {
        let eff = self.card(attacker)?.effective();
        let attacker_flies = eff.has(Property::Flying);
        let skips_tech0 = eff.has(Property::SkipsTechZeroPatrollers);

        let mut out = Vec::new();
        for (slot, id) in self.board(defender).patrol.occupants() {
            let patroller = self.card(id)?;
            if patroller.effective().has(Property::Flying) != attacker_flies {
                continue;
            }
            if skips_tech0 && patroller.tech_level == 0 {
                continue;
            }
            out.push((slot, id));
        }
        Ok(out)
    }

    /// The unguarded target set: every opposing attackable card plus the
    /// standing buildings (building legality subject to the guard hook).
    fn open_targets(&mut self, attacker: CardId, defender: PlayerId) -> Result<Vec<TargetId>> {
        let mut targets = Vec::new();
        for id in self.board(defender).cards_in_play() {
            if id == attacker {
                continue;
            }
            if !self.card(id)?.effective().has(Property::Unattackable) {
                targets.push(TargetId::Card(id));
            }
        }
        let guarded = !self
            .hook_or_alteration(Capability::GuardsBuildings, SearchSpace::PlayerInPlay(defender))?
            .is_empty();
        if !guarded {
            for slot in self.standing_buildings(defender) {
                targets.push(TargetId::Building(defender, slot));
            }
        }
        Ok(targets)
    }

    fn standing_buildings(&self, player: PlayerId) -> Vec<BuildingSlot> {
        let mut out = vec![BuildingSlot::Base];
        for slot in [BuildingSlot::Tech1, BuildingSlot::Tech2, BuildingSlot::Tech3, BuildingSlot::AddOn] {
            if let Some(state) = self.board(player).buildings.get(slot) {
                if state.built && !state.destroyed {
                    out.push(slot);
                }
            }
        }
        out
    }

    pub(crate) fn tower_ready(&self, player: PlayerId) -> bool {
        self.board(player).buildings.has_tower() && !self.board(player).tower_spent
    }

    pub(crate) fn reveal_with_tower(&mut self, tower_owner: PlayerId, target: CardId) -> Result<()> {
        self.board_mut(tower_owner).tower_spent = true;
        self.card_mut(target)?.revealed_this_turn = true;
        let name = self.card(target)?.name.clone();
        self.log.push_with(
            EventKind::TowerRevealed,
            format!("{tower_owner}'s tower reveals {name}"),
            [("cardId".to_string(), target.to_string())],
        );
        Ok(())
    }

    /// Stage 3: route the chosen target. A unit-only-stealth attacker can
    /// be revealed here, after its unit target was already chosen; that
    /// re-enters target selection with the prior defender forced through
    /// if still legal.
    pub fn resolve_attack_target(&mut self, attacker: CardId, target: TargetId) -> Result<()> {
        let name = self.card(attacker)?.name.clone();
        self.log.push(
            EventKind::TargetChosen,
            format!("{name} attacks {}", self.describe_target(target)),
        );

        if let TargetId::Card(defender) = target {
            let (eff, revealed) = {
                let card = self.card(attacker)?;
                (card.effective(), card.revealed_this_turn)
            };
            let unit_only_stealth = eff.has(Property::StealthVsUnits)
                && !eff.has(Property::Stealth)
                && !eff.has(Property::Invisible);
            if unit_only_stealth && !revealed && self.card(defender)?.is_unit() {
                let defender_player = self.card(defender)?.controller;
                if self.tower_ready(defender_player) {
                    self.reveal_with_tower(defender_player, attacker)?;
                    let mut targets = self.legal_attack_targets(attacker)?;
                    if targets.contains(&TargetId::Card(defender)) {
                        targets = vec![TargetId::Card(defender)];
                    }
                    if targets.is_empty() {
                        return Ok(());
                    }
                    let mut phase =
                        Phase::with_action(Action::choose_one(ActionKind::AttackTarget, targets));
                    phase.set(KEY_ATTACKER, attacker);
                    self.stack.push(phase);
                    return Ok(());
                }
            }
        }

        match target {
            TargetId::Building(player, slot) => self.resolve_building_attack(attacker, player, slot),
            TargetId::Card(defender) => self.resolve_character_combat(attacker, defender),
        }
    }

    fn describe_target(&self, target: TargetId) -> String {
        match target {
            TargetId::Card(id) => self
                .card(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|_| id.to_string()),
            TargetId::Building(player, slot) => format!("{player} {}", slot.as_str()),
        }
    }

    fn resolve_building_attack(
        &mut self,
        attacker: CardId,
        player: PlayerId,
        slot: BuildingSlot,
    ) -> Result<()> {
        let (name, strike) = {
            let card = self.card(attacker)?;
            let eff = card.effective();
            (card.name.clone(), eff.all_attack() + eff.frenzy)
        };
        self.deal_building_damage(player, slot, strike, &name)?;
        self.apply_anti_air(attacker, player)?;
        self.process_pending_deaths()
    }

    /// Stage 4 for a character target: swift strike, simultaneous
    /// exchange, anti-air, overpower, sparkshot, deaths last.
    fn resolve_character_combat(&mut self, attacker: CardId, defender: CardId) -> Result<()> {
        let (a_name, a_eff) = {
            let card = self.card(attacker)?;
            (card.name.clone(), card.effective())
        };
        let (d_name, d_eff, defender_player) = {
            let card = self.card(defender)?;
            (card.name.clone(), card.effective(), card.controller)
        };
        // Frenzy counts for the aggressor only.
        let a_strike = a_eff.all_attack() + a_eff.frenzy;
        let d_strike = d_eff.all_attack();
        let defender_slot = self.board(defender_player).patrol.slot_of(defender);
        let defender_health_before = d_eff.all_health();

        let a_swift = a_eff.has(Property::SwiftStrike);
        let d_swift = d_eff.has(Property::SwiftStrike);
        // A patroller cannot reach a long-range attacker to strike back.
        let suppress_return = a_eff.has(Property::LongRange) && defender_slot.is_some();

        if a_swift && !d_swift {
            self.deal_damage(defender, a_strike, &a_name)?;
            let killed = self.card(defender)?.effective().should_destroy();
            if !killed && !suppress_return {
                self.deal_damage(attacker, d_strike, &d_name)?;
            }
        } else if d_swift && !a_swift {
            if !suppress_return {
                self.deal_damage(attacker, d_strike, &d_name)?;
            }
            if !self.card(attacker)?.effective().should_destroy() {
                self.deal_damage(defender, a_strike, &a_name)?;
            }
        } else {
            self.deal_damage(defender, a_strike, &a_name)?;
            if !suppress_return {
                self.deal_damage(attacker, d_strike, &d_name)?;
            }
        }

        // Anti-air only fires on an attacker that flew over the patrol
        // zone; hitting a patroller means nothing was overflown.
        if defender_slot.is_none() {
            self.apply_anti_air(attacker, defender_player)?;
        }

        // Excess beyond lethal is computed either way; it only becomes a
        // choice when the attacker actually has overpower.
        let excess = a_strike - defender_health_before.max(0);
        let mut overpower_pending = false;
        if a_eff.has(Property::Overpower)
            && excess > 0
            && self.card(defender)?.effective().should_destroy()
        {
            let mut redirects = self.open_targets(attacker, defender_player)?;
            redirects.retain(|t| *t != TargetId::Card(defender));
            if !redirects.is_empty() {
                let mut phase =
                    Phase::with_action(Action::choose_one(ActionKind::OverpowerTarget, redirects));
                phase.set(KEY_ATTACKER, attacker);
                phase.set(KEY_OVERPOWER_AMOUNT, excess);
                self.stack.push(phase);
                overpower_pending = true;
            }
        }

        // Sparkshot splashes the neighboring slots immediately; nothing
        // can interrupt it and no choice is offered.
        if a_eff.has(Property::Sparkshot) {
            if let Some(slot) = defender_slot {
                for adjacent in slot.adjacent() {
                    if let Some(occupant) = self.board(defender_player).patrol.get(adjacent) {
                        self.log.push_with(
                            EventKind::SparkshotDamage,
                            format!("{a_name} sparkshot hits the {} slot", adjacent.as_str()),
                            [("cardId".to_string(), occupant.to_string())],
                        );
                        self.deal_damage(occupant, 1, "sparkshot")?;
                    }
                }
            }
        }

        // Deaths resolve after all damage; with an overpower redirect
        // pending they wait for it.
        if !overpower_pending {
            self.process_pending_deaths()?;
        }
        Ok(())
    }

    fn apply_anti_air(&mut self, attacker: CardId, defender_player: PlayerId) -> Result<()> {
        if !self.card(attacker)?.effective().has(Property::Flying) {
            return Ok(());
        }
        for (_, patroller) in self.board(defender_player).patrol.occupants() {
            let eff = self.card(patroller)?.effective();
            if eff.has(Property::AntiAir) {
                self.deal_damage(attacker, eff.all_attack(), "anti-air fire")?;
            }
        }
        Ok(())
    }

    /// Resolution of the overpower redirect choice.
    pub fn resolve_overpower(&mut self, target: TargetId, amount: i32) -> Result<()> {
        self.log.push(
            EventKind::OverpowerDamage,
            format!("overpower deals {amount} to {}", self.describe_target(target)),
        );
        match target {
            TargetId::Card(id) => self.deal_damage(id, amount, "overpower")?,
            TargetId::Building(player, slot) => {
                self.deal_building_damage(player, slot, amount, "overpower")?
            }
        }
        self.process_pending_deaths()
    }
}
