//! Hook/trigger dispatch
//!
//! Two dispatch modes over a capability and a search space of cards:
//! hooks/alterations run immediately in search-space order (reordering
//! cannot change the outcome), while triggers defer into a choice-bearing
//! action so the player controls resolution order. Discovery is purely
//! registry-based: a card qualifies because it registered the capability,
//! never because of what kind of card it is.

use crate::core::{Capability, CardId, EffectSpec, PlayerId};
use crate::game::{EventKind, Game};
use crate::Result;

/// Where to look for qualifying cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSpace {
    /// Every card in play, both boards, P1 side first.
    AllInPlay,
    /// One player's in-play cards (patrollers included).
    PlayerInPlay(PlayerId),
    /// One player's patrollers only, in slot order.
    Patrollers(PlayerId),
}

impl Game {
    /// Deterministic enumeration of a search space.
    pub fn search_space_ids(&self, space: SearchSpace) -> Vec<CardId> {
        match space {
            SearchSpace::AllInPlay => {
                let mut out = self.board(PlayerId::P1).cards_in_play();
                out.extend(self.board(PlayerId::P2).cards_in_play());
                out
            }
            SearchSpace::PlayerInPlay(player) => self.board(player).cards_in_play(),
            SearchSpace::Patrollers(player) => self
                .board(player)
                .patrol
                .occupants()
                .iter()
                .map(|(_, c)| *c)
                .collect(),
        }
    }

    /// Immediate dispatch: invoke the capability on every qualifying card
    /// in search-space order and collect one numeric output per invocation
    /// (cost deltas for alterations, 1 for bare markers, 0 otherwise). No
    /// phase is created; the caller gets control straight back.
    pub fn hook_or_alteration(
        &mut self,
        capability: Capability,
        space: SearchSpace,
    ) -> Result<Vec<i32>> {
        let mut outputs = Vec::new();
        for id in self.search_space_ids(space) {
            let Some(effect) = self.card(id)?.hook_effect(capability).cloned() else {
                continue;
            };
            match effect {
                EffectSpec::AlterCost { delta } => outputs.push(delta),
                EffectSpec::Marker => outputs.push(1),
                other => {
                    self.apply_effect(id, &other)?;
                    outputs.push(0);
                }
            }
        }
        Ok(outputs)
    }

    /// Deferred dispatch: qualifying cards become (or extend) an ordering
    /// choice on the stack. Resolution happens one identifier at a time
    /// through subsequent player choices.
    pub fn trigger(&mut self, capability: Capability, space: SearchSpace) {
        let ids = self.search_space_ids(space);
        self.trigger_for_ids(capability, &ids);
    }

    /// Presence query for marker capabilities (detectors and the like).
    pub fn capability_in_play(&self, player: PlayerId, capability: Capability) -> bool {
        self.board(player)
            .cards_in_play()
            .iter()
            .any(|&id| {
                self.card(id)
                    .map(|c| c.has_capability(capability))
                    .unwrap_or(false)
            })
    }

    /// Execute one card's share of a trigger, producing the event the
    /// ordering choice promised.
    pub fn resolve_trigger(&mut self, capability: Capability, id: CardId) -> Result<()> {
        let name = self.card(id)?.name.clone();
        if let Some(effect) = self.card(id)?.hook_effect(capability).cloned() {
            self.apply_effect(id, &effect)?;
        }
        self.log.push_with(
            EventKind::TriggerResolved,
            format!("{name} resolves its {capability:?} trigger"),
            [("cardId".to_string(), id.to_string())],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, Property};
    use crate::game::{ActionKind, TargetId};

    fn unit(game: &mut Game, name: &str, owner: PlayerId) -> CardId {
        let id = game
            .cards
            .create(|id| Card::unit(id, name, owner, 1, 1, 2));
        game.board_mut(owner).in_play.push(id);
        id
    }

    #[test]
    fn test_hooks_run_immediately_in_space_order() {
        let mut game = Game::new(1);
        let a = unit(&mut game, "A", PlayerId::P1);
        let b = unit(&mut game, "B", PlayerId::P1);
        for id in [a, b] {
            game.card_mut(id).unwrap().hooks.push((
                Capability::AlterCost,
                EffectSpec::AlterCost { delta: -1 },
            ));
        }

        let outputs = game
            .hook_or_alteration(Capability::AlterCost, SearchSpace::PlayerInPlay(PlayerId::P1))
            .unwrap();
        assert_eq!(outputs, vec![-1, -1]);
        assert!(game.stack.is_empty(), "hooks never open a phase");
    }

    #[test]
    fn test_trigger_defers_into_ordering_choice() {
        let mut game = Game::new(2);
        let a = unit(&mut game, "A", PlayerId::P1);
        let b = unit(&mut game, "B", PlayerId::P1);
        let bystander = unit(&mut game, "C", PlayerId::P1);
        for id in [a, b] {
            game.card_mut(id).unwrap().hooks.push((
                Capability::OnUpkeep,
                EffectSpec::GainGold { amount: 1 },
            ));
        }

        game.trigger(Capability::OnUpkeep, SearchSpace::PlayerInPlay(PlayerId::P1));

        let top = game.stack.top_of_stack().unwrap();
        assert_eq!(top.actions.len(), 1);
        let action = &top.actions[0];
        assert_eq!(action.kind, ActionKind::Trigger(Capability::OnUpkeep));
        assert!(action.must_choose_all);
        assert_eq!(
            action.ids_to_resolve,
            vec![TargetId::Card(a), TargetId::Card(b)],
            "only qualifying cards are listed"
        );
        assert!(!action
            .ids_to_resolve
            .contains(&TargetId::Card(bystander)));
        assert_eq!(game.board(PlayerId::P1).gold, 0, "nothing resolved yet");
    }

    #[test]
    fn test_patroller_space_enumerates_slot_order() {
        let mut game = Game::new(6);
        let elite = unit(&mut game, "Elite", PlayerId::P2);
        let leader = unit(&mut game, "Leader", PlayerId::P2);
        let _bench = unit(&mut game, "Bench", PlayerId::P2);
        for (slot, id) in [
            (crate::core::PatrolSlot::Elite, elite),
            (crate::core::PatrolSlot::SquadLeader, leader),
        ] {
            game.board_mut(PlayerId::P2).remove_card(id);
            game.board_mut(PlayerId::P2).patrol.set(slot, id);
        }

        let ids = game.search_space_ids(SearchSpace::Patrollers(PlayerId::P2));
        assert_eq!(ids, vec![leader, elite], "fixed slot order, bench excluded");
    }

    #[test]
    fn test_trigger_with_no_qualifiers_is_a_no_op() {
        let mut game = Game::new(3);
        unit(&mut game, "A", PlayerId::P1);
        game.trigger(Capability::OnUpkeep, SearchSpace::AllInPlay);
        assert!(game.stack.is_empty());
    }

    #[test]
    fn test_trigger_appends_to_existing_phase() {
        let mut game = Game::new(4);
        let a = unit(&mut game, "A", PlayerId::P1);
        let b = unit(&mut game, "B", PlayerId::P2);
        for id in [a, b] {
            game.card_mut(id).unwrap().hooks.push((
                Capability::OnDeath,
                EffectSpec::GainGold { amount: 1 },
            ));
        }

        game.trigger(Capability::OnDeath, SearchSpace::PlayerInPlay(PlayerId::P1));
        game.trigger(Capability::OnDeath, SearchSpace::PlayerInPlay(PlayerId::P2));

        assert_eq!(game.stack.len(), 1, "second dispatch extended the first");
        let action = &game.stack.top_of_stack().unwrap().actions[0];
        assert_eq!(action.ids_to_resolve.len(), 2);
    }

    #[test]
    fn test_resolve_trigger_runs_effect_and_logs() {
        let mut game = Game::new(5);
        let a = unit(&mut game, "A", PlayerId::P1);
        game.card_mut(a).unwrap().hooks.push((
            Capability::OnArrival,
            EffectSpec::GainProperty {
                property: Property::Attack,
                amount: 2,
            },
        ));

        game.resolve_trigger(Capability::OnArrival, a).unwrap();
        assert_eq!(game.card(a).unwrap().effective().attack, 3);
        assert_eq!(
            game.log.entries().last().unwrap().kind,
            EventKind::TriggerResolved
        );
    }
}
