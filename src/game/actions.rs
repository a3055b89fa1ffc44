//! External actions and the cleanup fixed point
//!
//! A single entry point takes an action name plus a loosely-typed context
//! of identifiers, validates it against the top of the phase stack, runs
//! the corresponding rule, and then prunes the stack to a fixed point:
//! saturated frames drop, queued followups run, and any choice with exactly
//! one legal resolution resolves itself. Processing stops where a real
//! choice remains.

use crate::core::{Capability, CardId, CardKind, PatrolSlot, Property, Zone};
use crate::game::combat::{KEY_ATTACKER, KEY_OVERPOWER_AMOUNT};
use crate::game::state::{
    TECH_BUILDING_HEALTH, TECH_COSTS, TECH_WORKER_REQUIREMENTS, TOWER_COST, TOWER_HEALTH,
};
use crate::game::{ActionKind, EventKind, Followup, Game, SearchSpace, TargetId};
use crate::{EngineError, Result};
use std::collections::BTreeMap;

/// Loosely-typed per-action context, mirroring the transport boundary.
pub type ActionContext = BTreeMap<String, String>;

/// Turn actions recognized when no choice is pending.
pub const TURN_ACTIONS: [&str; 10] = [
    "PlayCard", "Worker", "Build", "Patrol", "Sideline", "Ability", "Attack", "HeroLevel",
    "EndTurn", "TowerReveal",
];

fn ctx_card(ctx: &ActionContext) -> Result<CardId> {
    let raw = ctx
        .get("cardId")
        .ok_or_else(|| EngineError::IllegalAction("missing cardId in context".to_string()))?;
    raw.parse::<u32>()
        .map(CardId::new)
        .map_err(|_| EngineError::IllegalAction(format!("malformed cardId '{raw}'")))
}

fn ctx_str<'a>(ctx: &'a ActionContext, key: &str) -> Result<&'a str> {
    ctx.get(key)
        .map(String::as_str)
        .ok_or_else(|| EngineError::IllegalAction(format!("missing {key} in context")))
}

impl Game {
    /// Process one external action to the next suspension point.
    pub fn perform(&mut self, name: &str, ctx: &ActionContext) -> Result<()> {
        if self.winner.is_some() {
            return Err(EngineError::IllegalAction("the game is over".to_string()));
        }

        if name.ends_with("Choice") {
            self.resolve_choice(name, ctx)?;
        } else {
            if !self.stack.is_empty() {
                return Err(EngineError::IllegalAction(format!(
                    "{name} is not legal while a choice is pending"
                )));
            }
            match name {
                "PlayCard" => self.action_play_card(ctx)?,
                "Worker" => self.action_worker(ctx)?,
                "Build" => self.action_build(ctx)?,
                "Patrol" => self.action_patrol(ctx)?,
                "Sideline" => self.action_sideline(ctx)?,
                "Ability" => self.action_ability(ctx)?,
                "Attack" => self.declare_attack(ctx_card(ctx)?)?,
                "HeroLevel" => self.action_hero_level(ctx)?,
                "EndTurn" => self.end_turn()?,
                "TowerReveal" => self.action_tower_reveal(ctx)?,
                other => {
                    return Err(EngineError::IllegalAction(format!(
                        "unknown action '{other}' (expected one of {TURN_ACTIONS:?} or a pending choice)"
                    )))
                }
            }
        }

        self.run_cleanup()
    }

    /// Prune the stack until nothing changes: drop saturated frames, run
    /// queued followups, and auto-execute any phase left with exactly one
    /// action holding exactly one legal resolution.
    pub fn run_cleanup(&mut self) -> Result<()> {
        loop {
            // Fixed point of frame removal plus followups: dropping one
            // frame can expose another that is itself fully resolved.
            loop {
                let removed = self.stack.resolve_empty_phases();
                let followups = self.stack.drain_followups();
                let ran_followup = !followups.is_empty();
                for followup in followups {
                    match followup {
                        Followup::FinishTurn => self.finish_turn()?,
                    }
                }
                if !removed && !ran_followup {
                    break;
                }
            }

            if self.winner.is_some() {
                break;
            }

            // A single legal resolution is no choice at all.
            let forced = self.stack.top_of_stack().and_then(|phase| {
                if phase.game_over || phase.actions.len() != 1 {
                    return None;
                }
                let action = &phase.actions[0];
                if action.never_auto_resolve || action.ids_to_resolve.len() != 1 {
                    return None;
                }
                Some((action.kind, action.ids_to_resolve[0]))
            });

            match forced {
                Some((kind, target)) => {
                    let phase = self.stack.top_mut().expect("forced resolution needs a top frame");
                    phase.actions[0].resolve(target)?;
                    self.execute_resolution(kind, target)?;
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Resolve one identifier of the pending action matching this
    /// `...Choice` name.
    fn resolve_choice(&mut self, name: &str, ctx: &ActionContext) -> Result<()> {
        let (kind, target) = {
            let top = self
                .stack
                .top_of_stack()
                .ok_or_else(|| EngineError::IllegalAction("no choice is pending".to_string()))?;
            let action = top
                .actions
                .iter()
                .find(|a| a.kind.choice_name() == name)
                .ok_or_else(|| {
                    EngineError::IllegalAction(format!("no pending {name} on the current phase"))
                })?;
            (action.kind, find_ctx_target(action.ids_to_resolve.as_slice(), ctx)?)
        };

        let phase = self.stack.top_mut().expect("checked above");
        let action = phase
            .action_of_kind_mut(kind)
            .expect("kind was found above");
        action.resolve(target)?;

        self.execute_resolution(kind, target)
    }

    /// Run the semantic handler for one resolved identifier. The phase that
    /// held the action is still on the stack; handlers may push new phases
    /// above it.
    fn execute_resolution(&mut self, kind: ActionKind, target: TargetId) -> Result<()> {
        match kind {
            ActionKind::Trigger(capability) => {
                let TargetId::Card(id) = target else {
                    return Err(EngineError::IllegalChoice(
                        "a trigger resolves card identifiers".to_string(),
                    ));
                };
                self.resolve_trigger(capability, id)
            }
            ActionKind::AttackTarget => {
                let attacker = self
                    .stack
                    .top_of_stack()
                    .and_then(|p| p.get_card(KEY_ATTACKER))
                    .ok_or_else(|| {
                        EngineError::IllegalAction("attack phase lost its attacker".to_string())
                    })?;
                self.resolve_attack_target(attacker, target)
            }
            ActionKind::OverpowerTarget => {
                let amount = self
                    .stack
                    .top_of_stack()
                    .and_then(|p| p.get_i32(KEY_OVERPOWER_AMOUNT))
                    .ok_or_else(|| {
                        EngineError::IllegalAction("overpower phase lost its amount".to_string())
                    })?;
                self.resolve_overpower(target, amount)
            }
        }
    }

    // ---------------------------------------------------------------
    // Turn actions
    // ---------------------------------------------------------------

    fn action_play_card(&mut self, ctx: &ActionContext) -> Result<()> {
        let player = self.active_player;
        let id = ctx_card(ctx)?;

        let from_zone = if self.board(player).hand.contains(&id) {
            Zone::Hand
        } else if self.board(player).hero_zone.contains(&id) {
            match self.card(id)?.kind {
                CardKind::Hero { availability, .. } if availability == 0 => Zone::HeroZone,
                CardKind::Hero { .. } => {
                    return Err(EngineError::Precondition(
                        "that hero is not yet available".to_string(),
                    ))
                }
                _ => {
                    return Err(EngineError::Precondition(
                        "only heroes are played from the hero zone".to_string(),
                    ))
                }
            }
        } else {
            return Err(EngineError::Precondition(
                "card is not in your hand or hero zone".to_string(),
            ));
        };

        let alterations: i32 = self
            .hook_or_alteration(Capability::AlterCost, SearchSpace::PlayerInPlay(player))?
            .iter()
            .sum();
        let cost = (self.card(id)?.effective().cost + alterations).max(0);
        if self.board(player).gold < cost {
            return Err(EngineError::Precondition(format!(
                "insufficient gold: need {cost}"
            )));
        }
        self.gain_gold(player, -cost);

        let board = self.board_mut(player);
        let zone = board.zone_mut(from_zone);
        let pos = zone.iter().position(|&c| c == id).expect("checked above");
        zone.remove(pos);

        let name = self.card(id)?.name.clone();
        self.log.push_with(
            EventKind::CardPlayed,
            format!("{player} plays {name}"),
            [("cardId".to_string(), id.to_string())],
        );

        match self.card(id)?.kind.clone() {
            CardKind::Spell { effect } => {
                // Spells pass through the staging area while they resolve.
                self.board_mut(player).play_staging_area.push(id);
                self.apply_effect(id, &effect)?;
                self.board_mut(player).remove_card(id);
                self.card_mut(id)?.reset_card();
                self.board_mut(player).discard.push(id);
                self.process_pending_deaths()
            }
            _ => self.enter_play(id),
        }
    }

    fn action_worker(&mut self, ctx: &ActionContext) -> Result<()> {
        let player = self.active_player;
        let id = ctx_card(ctx)?;
        if !self.board(player).hand.contains(&id) {
            return Err(EngineError::Precondition("card is not in your hand".to_string()));
        }
        if self.board(player).gold < 1 {
            return Err(EngineError::Precondition(
                "a worker costs 1 gold".to_string(),
            ));
        }
        self.gain_gold(player, -1);
        self.board_mut(player).remove_card(id);
        self.card_mut(id)?.reset_card();
        self.board_mut(player).workers.push(id);
        let count = self.board(player).workers.len();
        self.log.push_with(
            EventKind::WorkerAssigned,
            format!("{player} assigns a worker ({count} total)"),
            [("cardId".to_string(), id.to_string())],
        );
        Ok(())
    }

    fn action_build(&mut self, ctx: &ActionContext) -> Result<()> {
        let player = self.active_player;
        let which = ctx_str(ctx, "buildingId")?;

        let (tier, cost, health) = match which {
            "tech1" => (Some(0), TECH_COSTS[0], TECH_BUILDING_HEALTH),
            "tech2" => (Some(1), TECH_COSTS[1], TECH_BUILDING_HEALTH),
            "tech3" => (Some(2), TECH_COSTS[2], TECH_BUILDING_HEALTH),
            "tower" => (None, TOWER_COST, TOWER_HEALTH),
            other => {
                return Err(EngineError::IllegalAction(format!(
                    "unknown building '{other}'"
                )))
            }
        };

        if let Some(tier) = tier {
            if tier > 0 && !self.board(player).buildings.tech[tier - 1].operational() {
                return Err(EngineError::Precondition(format!(
                    "tech {tier} must stand before tech {} is built",
                    tier + 1
                )));
            }
            let needed = TECH_WORKER_REQUIREMENTS[tier];
            if self.board(player).workers.len() < needed {
                return Err(EngineError::Precondition(format!(
                    "tech {} requires {needed} workers",
                    tier + 1
                )));
            }
            let state = &self.board(player).buildings.tech[tier];
            if state.built || state.under_construction {
                return Err(EngineError::Precondition("already built".to_string()));
            }
        } else if self.board(player).buildings.add_on.as_ref().is_some_and(|(_, s)| {
            s.built || s.under_construction
        }) {
            return Err(EngineError::Precondition("add-on slot is occupied".to_string()));
        }

        if self.board(player).gold < cost {
            return Err(EngineError::Precondition(format!(
                "insufficient gold: need {cost}"
            )));
        }
        self.gain_gold(player, -cost);

        let under_construction = crate::core::BuildingState {
            health,
            built: false,
            under_construction: true,
            destroyed: false,
        };
        match tier {
            Some(tier) => self.board_mut(player).buildings.tech[tier] = under_construction,
            None => {
                self.board_mut(player).buildings.add_on =
                    Some((crate::core::AddOnKind::Tower, under_construction))
            }
        }
        self.log.push(
            EventKind::BuildStarted,
            format!("{player} starts constructing {which}"),
        );
        Ok(())
    }

    fn action_patrol(&mut self, ctx: &ActionContext) -> Result<()> {
        let player = self.active_player;
        let id = ctx_card(ctx)?;
        let slot = PatrolSlot::parse(ctx_str(ctx, "patrolSlot")?)
            .ok_or_else(|| EngineError::IllegalAction("unknown patrol slot".to_string()))?;

        if !self.board(player).in_play.contains(&id) {
            return Err(EngineError::Precondition(
                "only a card in your in-play zone can patrol".to_string(),
            ));
        }
        if !self.card(id)?.is_character() {
            return Err(EngineError::Precondition("only characters patrol".to_string()));
        }
        if self.card(id)?.exhausted {
            return Err(EngineError::Precondition("an exhausted card cannot patrol".to_string()));
        }
        if self.board(player).patrol.get(slot).is_some() {
            return Err(EngineError::Precondition(format!(
                "the {} slot is occupied",
                slot.as_str()
            )));
        }

        self.board_mut(player).remove_card(id);
        self.board_mut(player).patrol.set(slot, id);
        if let Some((property, amount)) = slot.bonus() {
            self.gain_property(id, property, amount)?;
        }
        if let Some(effect) = self.card(id)?.hook_effect(Capability::OnPatrolEntry).cloned() {
            self.apply_effect(id, &effect)?;
        }
        let name = self.card(id)?.name.clone();
        self.log.push_with(
            EventKind::PatrolAssigned,
            format!("{name} patrols as {}", slot.as_str()),
            [("cardId".to_string(), id.to_string())],
        );
        Ok(())
    }

    fn action_sideline(&mut self, ctx: &ActionContext) -> Result<()> {
        let player = self.active_player;
        let id = ctx_card(ctx)?;
        let slot = self
            .board(player)
            .patrol
            .slot_of(id)
            .ok_or_else(|| EngineError::Precondition("that card is not patrolling".to_string()))?;
        self.vacate_patrol_slot(player, slot)
    }

    fn action_ability(&mut self, ctx: &ActionContext) -> Result<()> {
        let player = self.active_player;
        let id = ctx_card(ctx)?;
        let ability_name = ctx_str(ctx, "abilityName")?;

        if self.card(id)?.controller != player || !self.board(player).is_in_play(id) {
            return Err(EngineError::Precondition(
                "you can only use abilities of your cards in play".to_string(),
            ));
        }
        let ability = self
            .card(id)?
            .ability(ability_name)
            .cloned()
            .ok_or_else(|| {
                EngineError::Precondition(format!("no ability named '{ability_name}'"))
            })?;

        if ability.exhausts {
            let card = self.card(id)?;
            if card.exhausted {
                return Err(EngineError::Precondition("card is exhausted".to_string()));
            }
            if card.arrival_fatigue && !card.effective().has(Property::Haste) {
                return Err(EngineError::Precondition("card arrived this turn".to_string()));
            }
        }
        if self.board(player).gold < ability.gold_cost {
            return Err(EngineError::Precondition(format!(
                "insufficient gold: need {}",
                ability.gold_cost
            )));
        }

        self.gain_gold(player, -ability.gold_cost);
        if ability.exhausts {
            self.card_mut(id)?.exhausted = true;
        }
        let name = self.card(id)?.name.clone();
        self.log.push_with(
            EventKind::AbilityUsed,
            format!("{name} uses {ability_name}"),
            [("cardId".to_string(), id.to_string())],
        );
        self.apply_effect(id, &ability.effect)?;
        self.process_pending_deaths()
    }

    fn action_hero_level(&mut self, ctx: &ActionContext) -> Result<()> {
        let player = self.active_player;
        let id = ctx_card(ctx)?;
        let levels: i32 = match ctx.get("levels") {
            Some(raw) => raw
                .parse()
                .map_err(|_| EngineError::IllegalAction(format!("malformed levels '{raw}'")))?,
            None => 1,
        };
        if levels < 1 {
            return Err(EngineError::IllegalAction("levels must be positive".to_string()));
        }
        if self.card(id)?.controller != player || !self.board(player).is_in_play(id) {
            return Err(EngineError::Precondition(
                "you can only level your hero in play".to_string(),
            ));
        }
        let CardKind::Hero {
            level,
            mid_level,
            max_level,
            mid_bonus,
            max_bonus,
            ..
        } = self.card(id)?.kind.clone()
        else {
            return Err(EngineError::Precondition("only heroes gain levels".to_string()));
        };
        if level >= max_level {
            return Err(EngineError::Precondition("hero is already at max level".to_string()));
        }
        if self.board(player).gold < levels {
            return Err(EngineError::Precondition(format!(
                "insufficient gold: need {levels}"
            )));
        }

        self.gain_gold(player, -levels);
        let new_level = (level + levels).min(max_level);
        if let CardKind::Hero { level, .. } = &mut self.card_mut(id)?.kind {
            *level = new_level;
        }
        let name = self.card(id)?.name.clone();
        self.log.push_with(
            EventKind::HeroLeveled,
            format!("{name} reaches level {new_level}"),
            [("cardId".to_string(), id.to_string())],
        );

        // Band bonuses land once, when the threshold is crossed.
        if level < mid_level && new_level >= mid_level {
            self.gain_property(id, Property::Attack, mid_bonus.0)?;
            self.gain_property(id, Property::Health, mid_bonus.1)?;
        }
        if level < max_level && new_level >= max_level {
            self.gain_property(id, Property::Attack, max_bonus.0)?;
            self.gain_property(id, Property::Health, max_bonus.1)?;
        }
        Ok(())
    }

    fn action_tower_reveal(&mut self, ctx: &ActionContext) -> Result<()> {
        let id = ctx_card(ctx)?;
        let target_controller = self.card(id)?.controller;
        let tower_owner = target_controller.opponent();

        if !self.board(target_controller).is_in_play(id) {
            return Err(EngineError::Precondition("that card is not in play".to_string()));
        }
        let eff = self.card(id)?.effective();
        let cloaked = eff.has(Property::Stealth)
            || eff.has(Property::Invisible)
            || eff.has(Property::StealthVsUnits);
        if !cloaked {
            return Err(EngineError::Precondition("that card has nothing to reveal".to_string()));
        }
        if self.card(id)?.revealed_this_turn {
            return Err(EngineError::Precondition("already revealed this turn".to_string()));
        }
        if !self.tower_ready(tower_owner) {
            return Err(EngineError::Precondition(
                "no tower with an unspent detection".to_string(),
            ));
        }
        self.reveal_with_tower(tower_owner, id)
    }
}

/// Match the supplied context against the action's remaining legal set.
fn find_ctx_target(legal: &[TargetId], ctx: &ActionContext) -> Result<TargetId> {
    if let Some(raw) = ctx.get("cardId") {
        let id = raw
            .parse::<u32>()
            .map(CardId::new)
            .map_err(|_| EngineError::IllegalAction(format!("malformed cardId '{raw}'")))?;
        return Ok(TargetId::Card(id));
    }
    if let Some(raw) = ctx.get("buildingId") {
        let slot = crate::core::BuildingSlot::parse(raw)
            .ok_or_else(|| EngineError::IllegalAction(format!("unknown building '{raw}'")))?;
        return legal
            .iter()
            .copied()
            .find(|t| matches!(t, TargetId::Building(_, s) if *s == slot))
            .ok_or_else(|| {
                EngineError::IllegalChoice(format!("building:{raw} is not a legal choice"))
            });
    }
    Err(EngineError::IllegalAction(
        "choice context needs a cardId or buildingId".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, EffectSpec, PlayerId};

    fn ctx(pairs: &[(&str, &str)]) -> ActionContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fielded(game: &mut Game, name: &str, owner: PlayerId, attack: i32, health: i32) -> CardId {
        let id = game
            .cards
            .create(|id| Card::unit(id, name, owner, 1, attack, health));
        game.board_mut(owner).in_play.push(id);
        id
    }

    #[test]
    fn test_turn_action_rejected_while_choice_pending() {
        let mut game = Game::new(1);
        let a = fielded(&mut game, "A", PlayerId::P1, 1, 2);
        let b = fielded(&mut game, "B", PlayerId::P1, 1, 2);
        for id in [a, b] {
            game.card_mut(id).unwrap().hooks.push((
                Capability::OnUpkeep,
                EffectSpec::GainGold { amount: 1 },
            ));
        }
        game.trigger(Capability::OnUpkeep, SearchSpace::PlayerInPlay(PlayerId::P1));

        let err = game.perform("EndTurn", &ctx(&[]));
        assert!(matches!(err, Err(EngineError::IllegalAction(_))));
    }

    #[test]
    fn test_trigger_choice_resolves_in_player_order() {
        let mut game = Game::new(2);
        let a = fielded(&mut game, "A", PlayerId::P1, 1, 2);
        let b = fielded(&mut game, "B", PlayerId::P1, 1, 2);
        for (id, amount) in [(a, 1), (b, 2)] {
            game.card_mut(id).unwrap().hooks.push((
                Capability::OnUpkeep,
                EffectSpec::GainGold { amount },
            ));
        }
        game.trigger(Capability::OnUpkeep, SearchSpace::PlayerInPlay(PlayerId::P1));

        // Resolve B first: its gold lands before A's.
        game.perform("TriggerChoice", &ctx(&[("cardId", &b.to_string())]))
            .unwrap();
        // A was the only identifier left, so cleanup auto-resolved it and
        // the stack is clear again.
        assert!(game.stack.is_empty());
        assert_eq!(game.board(PlayerId::P1).gold, 3);
    }

    #[test]
    fn test_illegal_choice_leaves_state_untouched() {
        let mut game = Game::new(3);
        let a = fielded(&mut game, "A", PlayerId::P1, 1, 2);
        let b = fielded(&mut game, "B", PlayerId::P1, 1, 2);
        let outsider = fielded(&mut game, "C", PlayerId::P1, 1, 2);
        for id in [a, b] {
            game.card_mut(id).unwrap().hooks.push((
                Capability::OnUpkeep,
                EffectSpec::GainGold { amount: 1 },
            ));
        }
        game.trigger(Capability::OnUpkeep, SearchSpace::PlayerInPlay(PlayerId::P1));

        let err = game.perform("TriggerChoice", &ctx(&[("cardId", &outsider.to_string())]));
        assert!(matches!(err, Err(EngineError::IllegalChoice(_))));
        assert_eq!(game.board(PlayerId::P1).gold, 0);
        assert_eq!(
            game.stack.top_of_stack().unwrap().actions[0].ids_to_resolve.len(),
            2
        );
    }

    #[test]
    fn test_attack_flow_through_perform() {
        let mut game = Game::new(4);
        let attacker = fielded(&mut game, "Bruiser", PlayerId::P1, 3, 4);
        let left = fielded(&mut game, "Left", PlayerId::P2, 1, 2);
        let _right = fielded(&mut game, "Right", PlayerId::P2, 1, 2);

        game.perform("Attack", &ctx(&[("cardId", &attacker.to_string())]))
            .unwrap();
        // Several targets (two units plus the base): the engine suspends.
        assert!(!game.stack.is_empty());

        game.perform("AttackTargetChoice", &ctx(&[("cardId", &left.to_string())]))
            .unwrap();
        assert!(game.stack.is_empty());
        assert!(game.board(PlayerId::P2).discard.contains(&left));
        assert_eq!(game.card(attacker).unwrap().effective().damage, 1);
    }

    #[test]
    fn test_attack_on_base_via_building_choice() {
        let mut game = Game::new(5);
        let attacker = fielded(&mut game, "Bruiser", PlayerId::P1, 3, 4);
        fielded(&mut game, "Bystander", PlayerId::P2, 1, 2);

        game.perform("Attack", &ctx(&[("cardId", &attacker.to_string())]))
            .unwrap();
        game.perform("AttackTargetChoice", &ctx(&[("buildingId", "base")]))
            .unwrap();
        assert_eq!(game.board(PlayerId::P2).buildings.base.health, 17);
    }

    #[test]
    fn test_single_target_attack_auto_resolves() {
        let mut game = Game::new(6);
        let attacker = fielded(&mut game, "Bruiser", PlayerId::P1, 2, 4);
        let leader = fielded(&mut game, "Leader", PlayerId::P2, 1, 3);
        game.board_mut(PlayerId::P2).remove_card(leader);
        game.board_mut(PlayerId::P2)
            .patrol
            .set(PatrolSlot::SquadLeader, leader);

        // The squad leader is the only legal target: no suspension at all.
        game.perform("Attack", &ctx(&[("cardId", &attacker.to_string())]))
            .unwrap();
        assert!(game.stack.is_empty());
        assert_eq!(game.card(leader).unwrap().effective().damage, 2);
    }

    #[test]
    fn test_play_card_pays_altered_cost() {
        let mut game = Game::new(7);
        let discounter = fielded(&mut game, "Quartermaster", PlayerId::P1, 1, 2);
        game.card_mut(discounter).unwrap().hooks.push((
            Capability::AlterCost,
            EffectSpec::AlterCost { delta: -2 },
        ));
        let id = game
            .cards
            .create(|id| Card::unit(id, "Recruit", PlayerId::P1, 3, 2, 2));
        game.board_mut(PlayerId::P1).hand.push(id);
        game.board_mut(PlayerId::P1).gold = 2;

        game.perform("PlayCard", &ctx(&[("cardId", &id.to_string())]))
            .unwrap();
        assert_eq!(game.board(PlayerId::P1).gold, 1, "paid 3 - 2 = 1");
        assert!(game.board(PlayerId::P1).in_play.contains(&id));
        assert!(game.card(id).unwrap().arrival_fatigue);
    }

    #[test]
    fn test_play_spell_resolves_through_staging_to_discard() {
        let mut game = Game::new(8);
        let spell = game.cards.create(|id| {
            Card::new(
                id,
                "Bombard",
                PlayerId::P1,
                CardKind::Spell {
                    effect: EffectSpec::DamageOpponentBase { amount: 3 },
                },
                crate::core::Attributes::statline(2, 0, 0),
            )
        });
        game.board_mut(PlayerId::P1).hand.push(spell);
        game.board_mut(PlayerId::P1).gold = 2;

        game.perform("PlayCard", &ctx(&[("cardId", &spell.to_string())]))
            .unwrap();
        assert_eq!(game.board(PlayerId::P2).buildings.base.health, 17);
        assert!(game.board(PlayerId::P1).discard.contains(&spell));
        assert!(game.board(PlayerId::P1).play_staging_area.is_empty());
    }

    #[test]
    fn test_worker_and_build_preconditions() {
        let mut game = Game::new(9);
        let id = game
            .cards
            .create(|id| Card::unit(id, "Hand", PlayerId::P1, 1, 1, 1));
        game.board_mut(PlayerId::P1).hand.push(id);

        let err = game.perform("Worker", &ctx(&[("cardId", &id.to_string())]));
        assert!(matches!(err, Err(EngineError::Precondition(_))), "no gold");

        game.board_mut(PlayerId::P1).gold = 1;
        game.perform("Worker", &ctx(&[("cardId", &id.to_string())]))
            .unwrap();
        assert_eq!(game.board(PlayerId::P1).workers.len(), 1);

        let err = game.perform("Build", &ctx(&[("buildingId", "tech1")]));
        assert!(matches!(err, Err(EngineError::Precondition(_))), "worker requirement");
    }

    #[test]
    fn test_build_starts_construction() {
        let mut game = Game::new(10);
        for n in 0..TECH_WORKER_REQUIREMENTS[0] {
            let id = game
                .cards
                .create(|id| Card::unit(id, format!("W{n}"), PlayerId::P1, 1, 0, 1));
            game.board_mut(PlayerId::P1).workers.push(id);
        }
        game.board_mut(PlayerId::P1).gold = TECH_COSTS[0];

        game.perform("Build", &ctx(&[("buildingId", "tech1")])).unwrap();
        let tech = &game.board(PlayerId::P1).buildings.tech[0];
        assert!(tech.under_construction && !tech.built);
        assert_eq!(game.board(PlayerId::P1).gold, 0);
    }

    #[test]
    fn test_patrol_and_sideline_pair_the_slot_bonus() {
        let mut game = Game::new(11);
        let unit = fielded(&mut game, "Guard", PlayerId::P1, 1, 3);

        game.perform(
            "Patrol",
            &ctx(&[("cardId", &unit.to_string()), ("patrolSlot", "squadLeader")]),
        )
        .unwrap();
        assert_eq!(game.card(unit).unwrap().effective().armor, 1);

        game.perform("Sideline", &ctx(&[("cardId", &unit.to_string())]))
            .unwrap();
        assert_eq!(game.card(unit).unwrap().effective().armor, 0);
        assert!(game.board(PlayerId::P1).in_play.contains(&unit));
    }

    #[test]
    fn test_hero_level_band_bonus() {
        let mut game = Game::new(12);
        let hero = game.cards.create(|id| {
            Card::new(
                id,
                "Captain",
                PlayerId::P1,
                CardKind::hero(),
                crate::core::Attributes::statline(2, 2, 3),
            )
        });
        game.board_mut(PlayerId::P1).in_play.push(hero);
        game.board_mut(PlayerId::P1).gold = 4;

        game.perform(
            "HeroLevel",
            &ctx(&[("cardId", &hero.to_string()), ("levels", "2")]),
        )
        .unwrap();
        // Level 1 -> 3 crosses the mid band.
        assert_eq!(game.card(hero).unwrap().effective().attack, 3);
        assert_eq!(game.card(hero).unwrap().effective().health, 4);
        assert_eq!(game.board(PlayerId::P1).gold, 2);
    }

    #[test]
    fn test_game_over_blocks_further_actions() {
        let mut game = Game::new(13);
        game.deal_building_damage(
            PlayerId::P2,
            crate::core::BuildingSlot::Base,
            crate::game::state::BASE_HEALTH,
            "test",
        )
        .unwrap();

        let err = game.perform("EndTurn", &ctx(&[]));
        assert!(matches!(err, Err(EngineError::IllegalAction(_))));
    }
}
