//! Turn orchestration: end-of-turn bookkeeping and start-of-turn setup
//!
//! `EndTurn` runs the departing player's bookkeeping and queues the turn
//! flip as a followup beneath the end-of-turn trigger, so the flip waits
//! for any ordering choices the trigger opens.

use crate::core::{BuildingSlot, Capability, CardKind, PatrolSlot, Property};
use crate::game::state::MAX_DRAW;
use crate::game::{EventKind, Followup, Game, Phase, SearchSpace};
use crate::Result;

impl Game {
    /// The `EndTurn` action: ephemeral cleanup, draw/discard bookkeeping,
    /// then the end-of-turn trigger with the turn flip queued under it.
    pub fn end_turn(&mut self) -> Result<()> {
        let player = self.active_player;

        // Ephemeral cards do not survive their controller's turn.
        for id in self.board(player).cards_in_play() {
            let eff = self.card(id)?.effective();
            if eff.has(Property::Ephemeral) {
                let remaining = eff.all_health().max(1);
                self.gain_property(id, Property::Damage, remaining)?;
            }
        }
        self.process_pending_deaths()?;

        // Draw/discard bookkeeping runs before the end-of-turn trigger, so
        // cards a trigger puts in hand cannot be swept by this same step.
        // The discard count feeding the draw is read before the hand goes.
        let discard_before = self.board(player).discard.len();
        let hand: Vec<_> = self.board(player).hand.clone();
        for card in hand {
            self.discard_from_hand(player, card)?;
        }
        let draw_count = (discard_before + 2).min(MAX_DRAW);
        self.draw_cards(player, draw_count)?;

        self.log
            .push(EventKind::TurnEnded, format!("{player} ends the turn"));

        // The flip rides beneath the trigger: it fires once every pending
        // end-of-turn choice is resolved (immediately, if there are none).
        self.stack.push(Phase::with_followup(Followup::FinishTurn));
        self.trigger(Capability::OnEndOfTurn, SearchSpace::PlayerInPlay(player));
        Ok(())
    }

    /// The deferred half of `EndTurn`: flip the active player, complete
    /// their construction, and run their start-of-turn sequence.
    pub fn finish_turn(&mut self) -> Result<()> {
        let next = self.active_player.opponent();
        self.active_player = next;

        for slot in [
            BuildingSlot::Tech1,
            BuildingSlot::Tech2,
            BuildingSlot::Tech3,
            BuildingSlot::AddOn,
        ] {
            let completed = {
                let board = self.board_mut(next);
                match board.buildings.get_mut(slot) {
                    Some(state) if state.under_construction => {
                        state.under_construction = false;
                        state.built = true;
                        true
                    }
                    _ => false,
                }
            };
            if completed {
                self.log.push(
                    EventKind::BuildCompleted,
                    format!("{next} finishes constructing {}", slot.as_str()),
                );
            }
        }

        self.start_turn()
    }

    /// Start-of-turn sequence for the (new) active player.
    pub fn start_turn(&mut self) -> Result<()> {
        let player = self.active_player;

        self.board_mut(player).turn_count += 1;
        let turn = self.board(player).turn_count;
        self.log
            .push(EventKind::TurnStarted, format!("{player} begins turn {turn}"));

        // "Until next turn" effects expire at the start of the turn of the
        // player who granted them, a full round after they were made.
        self.expire_transients_of(player)?;

        // Sweep the patrol zone back to the in-play zone, one sideline
        // hook per vacated slot.
        for slot in PatrolSlot::ALL {
            self.vacate_patrol_slot(player, slot)?;
        }

        // Refresh combat bookkeeping.
        for id in self.board(player).cards_in_play() {
            let card = self.card_mut(id)?;
            card.exhausted = false;
            card.arrival_fatigue = false;
            card.attacks_this_turn = 0;
            card.revealed_this_turn = false;
            card.armor_damage = 0;
        }

        // Aggregate healing: the sum of all healing sources mends every
        // damaged friendly character by that amount.
        let healing: i32 = {
            let mut total = 0;
            for id in self.board(player).cards_in_play() {
                total += self.card(id)?.effective().healing;
            }
            total
        };
        if healing > 0 {
            for id in self.board(player).cards_in_play() {
                let card = self.card(id)?;
                if !card.is_character() {
                    continue;
                }
                let damage = card.effective().damage;
                if damage > 0 {
                    self.lose_property(id, Property::Damage, damage.min(healing))?;
                }
            }
        }

        // Dead heroes tick toward availability.
        for id in self.board(player).hero_zone.clone() {
            if let CardKind::Hero { availability, .. } = &mut self.card_mut(id)?.kind {
                if *availability > 0 {
                    *availability -= 1;
                }
            }
        }

        // Workers pay out, the tower reloads.
        let income = self.board(player).workers.len() as i32;
        if income > 0 {
            self.gain_gold(player, income);
        }
        self.board_mut(player).tower_spent = false;

        self.trigger(Capability::OnUpkeep, SearchSpace::PlayerInPlay(player));
        Ok(())
    }
}
