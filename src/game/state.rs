//! Main game state structure
//!
//! One `Game` per session: the card arena, both boards, the phase stack,
//! and the event log. Execution is single-threaded and synchronous; one
//! external action is fully processed before the next is accepted.

use crate::core::{
    Board, BuildingSlot, Capability, CardArena, CardId, CardKind, EffectSpec, PatrolSlot,
    PlayerId, Property, Zone, ZoneRef,
};
use crate::game::{Action, EventKind, EventLog, Phase, PhaseStack, TargetId};
use crate::Result;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

pub const BASE_HEALTH: i32 = 20;
pub const TECH_BUILDING_HEALTH: i32 = 5;
pub const TOWER_HEALTH: i32 = 4;
/// Gold cost of tech tiers 1-3.
pub const TECH_COSTS: [i32; 3] = [1, 4, 5];
/// Worker-count prerequisite for tech tiers 1-3.
pub const TECH_WORKER_REQUIREMENTS: [usize; 3] = [6, 8, 10];
pub const TOWER_COST: i32 = 3;
/// Losing a tech building costs the base this much.
pub const TECH_LOSS_BASE_DAMAGE: i32 = 2;
/// End-of-turn draw never exceeds this.
pub const MAX_DRAW: usize = 5;
/// Turns before a dead hero may be replayed.
pub const HERO_DEATH_AVAILABILITY: i32 = 1;

/// An "until next turn" grant: recorded so it can be revoked at the start
/// of its owner's next turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientEffect {
    /// The player whose next turn expires this effect.
    pub owner: PlayerId,
    pub card: CardId,
    pub property: Property,
    pub amount: i32,
}

/// Complete game state.
///
/// Serialized wholesale as the snapshot/resume point; the RNG rides along
/// so a resumed game replays identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub cards: CardArena,
    pub boards: [Board; 2],
    pub active_player: PlayerId,
    pub stack: PhaseStack,
    pub log: EventLog,
    pub transients: Vec<TransientEffect>,
    pub rng: ChaCha12Rng,
    pub winner: Option<PlayerId>,
}

impl Game {
    pub fn new(seed: u64) -> Self {
        Game {
            cards: CardArena::new(),
            boards: [
                Board::new(PlayerId::P1, BASE_HEALTH),
                Board::new(PlayerId::P2, BASE_HEALTH),
            ],
            active_player: PlayerId::P1,
            stack: PhaseStack::new(),
            log: EventLog::new(),
            transients: Vec::new(),
            rng: ChaCha12Rng::seed_from_u64(seed),
            winner: None,
        }
    }

    pub fn board(&self, player: PlayerId) -> &Board {
        &self.boards[player.index()]
    }

    pub fn board_mut(&mut self, player: PlayerId) -> &mut Board {
        &mut self.boards[player.index()]
    }

    pub fn card(&self, id: CardId) -> Result<&crate::core::Card> {
        self.cards.get(id)
    }

    pub fn card_mut(&mut self, id: CardId) -> Result<&mut crate::core::Card> {
        self.cards.get_mut(id)
    }

    /// Find which board and zone hold a card.
    pub fn locate_card(&self, id: CardId) -> Option<(PlayerId, ZoneRef)> {
        for player in [PlayerId::P1, PlayerId::P2] {
            if let Some(zone) = self.board(player).locate(id) {
                return Some((player, zone));
            }
        }
        None
    }

    /// Active zones are where attribute mutations land: in play or
    /// patrolling. Everything else ignores property changes.
    pub fn is_in_active_zone(&self, id: CardId) -> bool {
        self.boards.iter().any(|b| b.is_in_play(id))
    }

    // ---------------------------------------------------------------
    // Attribute mutation
    // ---------------------------------------------------------------

    /// The single mutation path for card properties. No-ops with a
    /// descriptive event when the card is not in an active zone; otherwise
    /// applies the delta to the card's modifiers and logs it.
    pub fn gain_property(&mut self, id: CardId, property: Property, amount: i32) -> Result<()> {
        let name = self.card(id)?.name.clone();
        if !self.is_in_active_zone(id) {
            self.log.push_with(
                EventKind::PropertyChangeIgnored,
                format!("{name} is not in play; {property:?} change ignored"),
                [("cardId".to_string(), id.to_string())],
            );
            return Ok(());
        }

        self.card_mut(id)?.modifiers.add(property, amount);
        self.log.push_with(
            EventKind::PropertyChanged,
            format!("{name}: {property:?} {amount:+}"),
            [("cardId".to_string(), id.to_string())],
        );
        Ok(())
    }

    pub fn lose_property(&mut self, id: CardId, property: Property, amount: i32) -> Result<()> {
        self.gain_property(id, property, -amount)
    }

    /// Grant a property delta that expires at the start of the granting
    /// player's next turn.
    pub fn gain_property_until_next_turn(
        &mut self,
        id: CardId,
        property: Property,
        amount: i32,
    ) -> Result<()> {
        let owner = self.card(id)?.controller;
        self.gain_property(id, property, amount)?;
        self.transients.push(TransientEffect {
            owner,
            card: id,
            property,
            amount,
        });
        Ok(())
    }

    /// Revoke every transient grant owned by `player`.
    pub fn expire_transients_of(&mut self, player: PlayerId) -> Result<()> {
        let expiring: Vec<TransientEffect> = {
            let (keep, expire): (Vec<_>, Vec<_>) = std::mem::take(&mut self.transients)
                .into_iter()
                .partition(|t| t.owner != player);
            self.transients = keep;
            expire
        };
        for t in expiring {
            self.lose_property(t.card, t.property, t.amount)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Gold, drawing, discarding
    // ---------------------------------------------------------------

    pub fn gain_gold(&mut self, player: PlayerId, amount: i32) {
        self.board_mut(player).gain_gold(amount);
        let total = self.board(player).gold;
        self.log.push(
            EventKind::GoldChanged,
            format!("{player} gold {amount:+} (now {total})"),
        );
    }

    /// Draw cards, reshuffling the discard pile into the deck if the deck
    /// runs out mid-draw.
    pub fn draw_cards(&mut self, player: PlayerId, count: usize) -> Result<usize> {
        let mut drawn = 0;
        for _ in 0..count {
            if self.board(player).deck.is_empty() {
                let mut reshuffled = std::mem::take(&mut self.board_mut(player).discard);
                if reshuffled.is_empty() {
                    break;
                }
                use rand::seq::SliceRandom;
                reshuffled.shuffle(&mut self.rng);
                self.board_mut(player).deck = reshuffled;
            }
            let board = self.board_mut(player);
            if let Some(card) = board.deck.pop() {
                board.hand.push(card);
                drawn += 1;
                let name = self.card(card)?.name.clone();
                self.log.push_with(
                    EventKind::CardDrawn,
                    format!("{player} draws {name}"),
                    [("cardId".to_string(), card.to_string())],
                );
            }
        }
        Ok(drawn)
    }

    /// Discard one card from hand, honoring the would-discard intercept
    /// hook. Returns whether the card actually left the hand.
    pub fn discard_from_hand(&mut self, player: PlayerId, card: CardId) -> Result<bool> {
        let name = self.card(card)?.name.clone();
        if self.card(card)?.hook_effect(Capability::WouldDiscardIntercept)
            == Some(&EffectSpec::PreventDiscard)
        {
            self.log.push_with(
                EventKind::DiscardPrevented,
                format!("{name} refuses to be discarded"),
                [("cardId".to_string(), card.to_string())],
            );
            return Ok(false);
        }

        let board = self.board_mut(player);
        if let Some(pos) = board.hand.iter().position(|&c| c == card) {
            board.hand.remove(pos);
            board.discard.push(card);
            self.card_mut(card)?.reset_card();
            self.log.push_with(
                EventKind::CardDiscarded,
                format!("{player} discards {name}"),
                [("cardId".to_string(), card.to_string())],
            );
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ---------------------------------------------------------------
    // Damage
    // ---------------------------------------------------------------

    /// Apply damage to a character. Armor absorbs first; the remainder
    /// accumulates on the card. Deaths are not resolved here - the caller
    /// decides when all damage is in.
    pub fn deal_damage(&mut self, target: CardId, amount: i32, source: &str) -> Result<()> {
        if amount <= 0 {
            return Ok(());
        }
        let (name, armor_left) = {
            let card = self.card(target)?;
            let eff = card.effective();
            (card.name.clone(), (eff.armor - card.armor_damage).max(0))
        };
        let absorbed = armor_left.min(amount);
        if absorbed > 0 {
            self.card_mut(target)?.armor_damage += absorbed;
        }
        let through = amount - absorbed;
        self.log.push_with(
            EventKind::Damage,
            format!("{source} deals {amount} to {name} ({absorbed} absorbed by armor)"),
            [("cardId".to_string(), target.to_string())],
        );
        if through > 0 {
            self.gain_property(target, Property::Damage, through)?;
        }
        Ok(())
    }

    /// Apply damage to a building slot. Destroying a tech building also
    /// costs the base; destroying the base ends the game.
    pub fn deal_building_damage(
        &mut self,
        player: PlayerId,
        slot: BuildingSlot,
        amount: i32,
        source: &str,
    ) -> Result<()> {
        if amount <= 0 {
            return Ok(());
        }
        let destroyed = {
            let board = self.board_mut(player);
            match board.buildings.get_mut(slot) {
                Some(state) if state.built && !state.destroyed => {
                    state.health -= amount;
                    if state.health <= 0 {
                        state.health = 0;
                        state.destroyed = true;
                        true
                    } else {
                        false
                    }
                }
                _ => return Ok(()),
            }
        };
        self.log.push(
            EventKind::Damage,
            format!("{source} deals {amount} to {player} {}", slot.as_str()),
        );

        if destroyed {
            self.log.push(
                EventKind::Death,
                format!("{player} {} is destroyed", slot.as_str()),
            );
            match slot {
                BuildingSlot::Base => self.declare_winner(player.opponent()),
                BuildingSlot::Tech1 | BuildingSlot::Tech2 | BuildingSlot::Tech3 => {
                    self.deal_building_damage(
                        player,
                        BuildingSlot::Base,
                        TECH_LOSS_BASE_DAMAGE,
                        "collapsing tech building",
                    )?;
                }
                BuildingSlot::AddOn => {}
            }
        }
        Ok(())
    }

    fn declare_winner(&mut self, winner: PlayerId) {
        if self.winner.is_some() {
            return;
        }
        self.winner = Some(winner);
        self.stack.push(Phase::game_over());
        self.log
            .push(EventKind::GameOver, format!("{winner} wins the game"));
    }

    // ---------------------------------------------------------------
    // Arrival / departure / death
    // ---------------------------------------------------------------

    /// Put a card into play: arrival fatigue for characters, ongoing
    /// bonuses in both directions, then the arrival trigger.
    pub fn enter_play(&mut self, id: CardId) -> Result<()> {
        let (controller, is_character) = {
            let card = self.card(id)?;
            (card.controller, card.is_character())
        };
        self.board_mut(controller).in_play.push(id);
        if is_character {
            self.card_mut(id)?.arrival_fatigue = true;
        }

        // Existing bonus givers apply to the newcomer...
        let peers = self.board(controller).cards_in_play();
        for peer in &peers {
            if *peer == id {
                continue;
            }
            if let Some(EffectSpec::GlobalBonus { property, amount }) = self
                .card(*peer)?
                .hook_effect(Capability::GiveBonus)
                .cloned()
            {
                if self.card(id)?.is_unit() {
                    self.gain_property(id, property, amount)?;
                }
            }
        }
        // ...and a newly arrived giver applies to everyone already there.
        if let Some(EffectSpec::GlobalBonus { property, amount }) =
            self.card(id)?.hook_effect(Capability::GiveBonus).cloned()
        {
            for peer in &peers {
                if *peer != id && self.card(*peer)?.is_unit() {
                    self.gain_property(*peer, property, amount)?;
                }
            }
        }

        self.trigger_for_ids(Capability::OnArrival, &[id]);
        Ok(())
    }

    /// Take a card out of play: patrol exit, bonus revocation, the
    /// leaves-play hook, then reset and deposit in `destination` on the
    /// owner's board.
    pub fn leave_play(&mut self, id: CardId, destination: Zone) -> Result<()> {
        let controller = self.card(id)?.controller;
        let owner = self.card(id)?.owner;

        if let Some((player, ZoneRef::Patrol(slot))) = self.locate_card(id) {
            self.vacate_patrol_slot(player, slot)?;
        }
        // Revoke this card's ongoing bonus from its peers before it goes.
        if let Some(EffectSpec::GlobalBonus { property, amount }) =
            self.card(id)?.hook_effect(Capability::RemoveBonus).cloned()
        {
            for peer in self.board(controller).cards_in_play() {
                if peer != id && self.card(peer)?.is_unit() {
                    self.lose_property(peer, property, amount)?;
                }
            }
        }
        if let Some(effect) = self.card(id)?.hook_effect(Capability::OnLeavesPlay).cloned() {
            self.apply_effect(id, &effect)?;
        }

        // A reset wipes the modifiers a transient would later revert.
        self.transients.retain(|t| t.card != id);

        self.board_mut(controller).remove_card(id);
        self.card_mut(id)?.reset_card();
        self.board_mut(owner).zone_mut(destination).push(id);
        Ok(())
    }

    /// Pull a patroller back to the in-play zone, revoking its slot bonus
    /// and firing the patrol-exit hook.
    pub fn vacate_patrol_slot(&mut self, player: PlayerId, slot: PatrolSlot) -> Result<()> {
        let Some(card) = self.board_mut(player).patrol.clear_slot(slot) else {
            return Ok(());
        };
        self.board_mut(player).in_play.push(card);
        if let Some((property, amount)) = slot.bonus() {
            self.lose_property(card, property, amount)?;
        }
        if let Some(effect) = self.card(card)?.hook_effect(Capability::OnPatrolExit).cloned() {
            self.apply_effect(card, &effect)?;
        }
        let name = self.card(card)?.name.clone();
        self.log.push_with(
            EventKind::Sidelined,
            format!("{name} leaves the {} slot", slot.as_str()),
            [("cardId".to_string(), card.to_string())],
        );
        Ok(())
    }

    /// Resolve every pending death on both boards: would-die saves first,
    /// then patrol-slot payouts, the orderable death trigger, and finally
    /// the physical departure. Called once all damage for the current step
    /// is in, never mid-exchange.
    pub fn process_pending_deaths(&mut self) -> Result<()> {
        let mut dying: Vec<CardId> = Vec::new();
        for player in [PlayerId::P1, PlayerId::P2] {
            for id in self.board(player).cards_in_play() {
                if self.card(id)?.effective().should_destroy() {
                    dying.push(id);
                }
            }
        }
        if dying.is_empty() {
            return Ok(());
        }

        // Saves happen before anything else and consume themselves.
        let mut dead: Vec<CardId> = Vec::new();
        for id in dying {
            if self.card(id)?.hook_effect(Capability::WouldDieSave)
                == Some(&EffectSpec::SaveFromDeath)
            {
                let damage = self.card(id)?.effective().damage;
                self.lose_property(id, Property::Damage, damage)?;
                self.card_mut(id)?.consume_hook(Capability::WouldDieSave);
                let name = self.card(id)?.name.clone();
                self.log.push_with(
                    EventKind::Saved,
                    format!("{name} is saved from death"),
                    [("cardId".to_string(), id.to_string())],
                );
            } else {
                dead.push(id);
            }
        }
        if dead.is_empty() {
            return Ok(());
        }

        // Slot payouts are immediate hooks; ordering cannot matter.
        for &id in &dead {
            if let Some((player, ZoneRef::Patrol(slot))) = self.locate_card(id) {
                match slot {
                    PatrolSlot::Scavenger => self.gain_gold(player, 1),
                    PatrolSlot::Technician => {
                        self.draw_cards(player, 1)?;
                    }
                    _ => {}
                }
            }
        }

        // Death-trigger ordering is a player choice; the phase opens before
        // the bodies move so the ids are still meaningful to the client.
        let reactive: Vec<CardId> = dead
            .iter()
            .copied()
            .filter(|&id| self.card(id).map(|c| c.has_capability(Capability::OnDeath)).unwrap_or(false))
            .collect();
        self.trigger_for_ids(Capability::OnDeath, &reactive);

        for id in dead {
            let name = self.card(id)?.name.clone();
            let destination = if self.card(id)?.is_hero() {
                Zone::HeroZone
            } else {
                Zone::Discard
            };
            self.leave_play(id, destination)?;
            if let CardKind::Hero { availability, .. } = &mut self.card_mut(id)?.kind {
                *availability = HERO_DEATH_AVAILABILITY;
            }
            self.log.push_with(
                EventKind::Death,
                format!("{name} dies"),
                [("cardId".to_string(), id.to_string())],
            );
        }
        Ok(())
    }

    /// Open (or extend) an ordering choice over exactly these cards for a
    /// trigger capability. No-op when `ids` is empty.
    pub fn trigger_for_ids(&mut self, capability: Capability, ids: &[CardId]) {
        let targets: Vec<TargetId> = ids
            .iter()
            .filter(|&&id| {
                self.card(id)
                    .map(|c| c.has_capability(capability))
                    .unwrap_or(false)
            })
            .map(|&id| TargetId::Card(id))
            .collect();
        if targets.is_empty() {
            return;
        }
        if let Some(top) = self.stack.top_mut() {
            if let Some(action) = top.action_of_kind_mut(crate::game::ActionKind::Trigger(capability)) {
                for t in targets {
                    action.add_id(t);
                }
                return;
            }
        }
        self.stack
            .push(Phase::with_action(Action::trigger(capability, targets)));
    }

    // ---------------------------------------------------------------
    // Data-driven effects
    // ---------------------------------------------------------------

    /// Execute one registered effect on behalf of `source`.
    pub fn apply_effect(&mut self, source: CardId, effect: &EffectSpec) -> Result<()> {
        let controller = self.card(source)?.controller;
        match effect {
            EffectSpec::Marker => {}
            EffectSpec::DamageOpponentBase { amount } => {
                let name = self.card(source)?.name.clone();
                self.deal_building_damage(
                    controller.opponent(),
                    BuildingSlot::Base,
                    *amount,
                    &name,
                )?;
            }
            EffectSpec::Draw { count } => {
                self.draw_cards(controller, *count as usize)?;
            }
            EffectSpec::GainGold { amount } => {
                self.gain_gold(controller, *amount);
            }
            EffectSpec::GainProperty { property, amount } => {
                self.gain_property(source, *property, *amount)?;
            }
            EffectSpec::GainPropertyUntilNextTurn { property, amount } => {
                self.gain_property_until_next_turn(source, *property, *amount)?;
            }
            // Handled at their dispatch sites, not as direct effects.
            EffectSpec::GlobalBonus { .. }
            | EffectSpec::AlterCost { .. }
            | EffectSpec::SaveFromDeath
            | EffectSpec::PreventDiscard => {}
        }
        Ok(())
    }
}
