//! The phase/action stack
//!
//! The core state machine: a stack of phases, each holding one or more
//! actions describing what identifiers remain to be resolved. Every rule in
//! the engine mutates this stack; the orchestration layer repeatedly prunes
//! it to a fixed point after each external action.

use crate::core::{BuildingSlot, Capability, CardId, PlayerId};
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// An identifier a pending action can resolve: a card, or a building slot
/// on a specific player's board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetId {
    Card(CardId),
    Building(PlayerId, BuildingSlot),
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Card(id) => write!(f, "card:{id}"),
            TargetId::Building(player, slot) => write!(f, "building:{player}:{}", slot.as_str()),
        }
    }
}

/// What a pending action decides, which fixes both its external choice name
/// and its resolution handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Player-ordered resolution of a dispatched trigger.
    Trigger(Capability),
    /// Combat: choose the attack target.
    AttackTarget,
    /// Combat: choose where overpower excess damage goes.
    OverpowerTarget,
}

impl ActionKind {
    /// External action name that resolves one identifier of this kind.
    pub fn choice_name(&self) -> &'static str {
        match self {
            ActionKind::Trigger(_) => "TriggerChoice",
            ActionKind::AttackTarget => "AttackTargetChoice",
            ActionKind::OverpowerTarget => "OverpowerChoice",
        }
    }
}

/// A named pending decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Remaining legal choices. An identifier appears at most once.
    pub ids_to_resolve: Vec<TargetId>,
    /// Choices already made, in the order they were made.
    pub resolved_ids: Vec<TargetId>,
    /// Every identifier must eventually be resolved (order is the choice).
    pub must_choose_all: bool,
    /// Exactly this many resolutions complete the action.
    pub choose_number: Option<usize>,
    /// Resolving an identifier leaves it in the legal set.
    pub can_choose_targets_more_than_once: bool,
    /// Never remove this action automatically, even when saturated.
    pub never_auto_resolve: bool,
}

impl Action {
    /// An ordering decision over trigger sources: all of them must fire.
    pub fn trigger(capability: Capability, ids: Vec<TargetId>) -> Self {
        Action {
            kind: ActionKind::Trigger(capability),
            ids_to_resolve: ids,
            resolved_ids: Vec::new(),
            must_choose_all: true,
            choose_number: None,
            can_choose_targets_more_than_once: false,
            never_auto_resolve: false,
        }
    }

    /// Pick exactly one identifier from the set.
    pub fn choose_one(kind: ActionKind, ids: Vec<TargetId>) -> Self {
        Action {
            kind,
            ids_to_resolve: ids,
            resolved_ids: Vec::new(),
            must_choose_all: false,
            choose_number: Some(1),
            can_choose_targets_more_than_once: false,
            never_auto_resolve: false,
        }
    }

    /// Add an identifier to the legal set, keeping the at-most-once
    /// invariant.
    pub fn add_id(&mut self, id: TargetId) {
        if !self.ids_to_resolve.contains(&id) {
            self.ids_to_resolve.push(id);
        }
    }

    /// Resolve one identifier: it moves to `resolved_ids` and leaves the
    /// legal set unless repeat choices are allowed. Rejects an identifier
    /// not currently legal before any mutation.
    pub fn resolve(&mut self, id: TargetId) -> Result<()> {
        let pos = self
            .ids_to_resolve
            .iter()
            .position(|&candidate| candidate == id)
            .ok_or_else(|| EngineError::IllegalChoice(format!("{id} is not a legal choice")))?;

        if !self.can_choose_targets_more_than_once {
            self.ids_to_resolve.remove(pos);
        }
        self.resolved_ids.push(id);
        Ok(())
    }

    /// The choice is complete: either all required identifiers resolved, or
    /// the requested count reached.
    pub fn is_saturated(&self) -> bool {
        if self.must_choose_all && self.ids_to_resolve.is_empty() {
            return true;
        }
        if let Some(n) = self.choose_number {
            if self.resolved_ids.len() >= n {
                return true;
            }
        }
        false
    }
}

/// Side effect to run once a phase leaves the stack. Encodes "what happens
/// after these choices are done" without callbacks in serialized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Followup {
    /// Flip the active player, complete their construction, and run their
    /// start-of-turn sequence.
    FinishTurn,
}

/// A stack frame: pending actions plus a small key/value context carried
/// for this frame (e.g. which card is attacking).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Phase {
    pub actions: Vec<Action>,
    pub extra_state: BTreeMap<String, String>,
    pub end_this_phase: bool,
    pub game_over: bool,
    pub followup: Option<Followup>,
}

impl Phase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(action: Action) -> Self {
        Phase {
            actions: vec![action],
            ..Default::default()
        }
    }

    pub fn with_followup(followup: Followup) -> Self {
        Phase {
            followup: Some(followup),
            ..Default::default()
        }
    }

    /// The frame that marks the game as finished; it survives cleanup so
    /// every later request sees it.
    pub fn game_over() -> Self {
        Phase {
            game_over: true,
            ..Default::default()
        }
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.extra_state.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra_state.get(key).map(String::as_str)
    }

    pub fn get_card(&self, key: &str) -> Option<CardId> {
        self.get(key)?.parse::<u32>().ok().map(CardId::new)
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key)?.parse().ok()
    }

    pub fn action_of_kind_mut(&mut self, kind: ActionKind) -> Option<&mut Action> {
        self.actions.iter_mut().find(|a| a.kind == kind)
    }
}

/// The stack of phases. Top of stack is the frame whose actions are
/// currently resolvable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseStack {
    frames: Vec<Phase>,
    /// Followups from frames dropped by cleanup, awaiting execution by the
    /// orchestrator.
    pending_followups: Vec<Followup>,
}

impl PhaseStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, phase: Phase) {
        self.frames.push(phase);
    }

    pub fn top_of_stack(&self) -> Option<&Phase> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Phase> {
        self.frames.last_mut()
    }

    /// Pop the current phase, queueing its followup if it has one.
    pub fn end_current_phase(&mut self) -> Option<Phase> {
        let phase = self.frames.pop()?;
        if let Some(f) = phase.followup {
            self.pending_followups.push(f);
        }
        Some(phase)
    }

    /// One cleanup pass over every frame: drop saturated actions (unless
    /// flagged `never_auto_resolve`), then drop frames left with zero
    /// actions or flagged `end_this_phase`. Frames flagged `game_over` are
    /// exempt. Returns whether any frame was removed; the orchestrator
    /// re-applies until a fixed point, because dropping one frame can make
    /// the newly exposed top frame itself fully resolved.
    pub fn resolve_empty_phases(&mut self) -> bool {
        let mut removed_frame = false;
        let mut kept = Vec::with_capacity(self.frames.len());

        for mut phase in std::mem::take(&mut self.frames) {
            if phase.game_over {
                kept.push(phase);
                continue;
            }
            phase
                .actions
                .retain(|a| a.never_auto_resolve || !a.is_saturated());

            if phase.actions.is_empty() || phase.end_this_phase {
                removed_frame = true;
                if let Some(f) = phase.followup {
                    self.pending_followups.push(f);
                }
            } else {
                kept.push(phase);
            }
        }

        self.frames = kept;
        removed_frame
    }

    /// Followups queued by dropped frames, oldest first.
    pub fn drain_followups(&mut self) -> SmallVec<[Followup; 2]> {
        self.pending_followups.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Phase] {
        &self.frames
    }

    pub fn has_game_over(&self) -> bool {
        self.frames.iter().any(|p| p.game_over)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(n: u32) -> TargetId {
        TargetId::Card(CardId::new(n))
    }

    #[test]
    fn test_resolve_moves_id() {
        let mut action = Action::trigger(Capability::OnArrival, vec![card(1), card(2)]);
        action.resolve(card(2)).unwrap();

        assert_eq!(action.ids_to_resolve, vec![card(1)]);
        assert_eq!(action.resolved_ids, vec![card(2)]);
        assert!(!action.is_saturated());
    }

    #[test]
    fn test_resolve_rejects_unknown_id_without_mutation() {
        let mut action = Action::trigger(Capability::OnArrival, vec![card(1)]);
        let err = action.resolve(card(9));
        assert!(matches!(err, Err(EngineError::IllegalChoice(_))));
        assert_eq!(action.ids_to_resolve, vec![card(1)]);
        assert!(action.resolved_ids.is_empty());
    }

    #[test]
    fn test_must_choose_all_saturates_when_drained() {
        let mut action = Action::trigger(Capability::OnDeath, vec![card(1), card(2)]);
        action.resolve(card(1)).unwrap();
        action.resolve(card(2)).unwrap();
        assert!(action.is_saturated());
    }

    #[test]
    fn test_choose_number_saturates_at_count() {
        let mut action = Action::choose_one(ActionKind::AttackTarget, vec![card(1), card(2), card(3)]);
        assert!(!action.is_saturated());
        action.resolve(card(2)).unwrap();
        assert!(action.is_saturated());
        assert_eq!(action.ids_to_resolve.len(), 2, "unchosen ids remain listed");
    }

    #[test]
    fn test_repeat_choices_keep_id_legal() {
        let mut action = Action::choose_one(ActionKind::AttackTarget, vec![card(1)]);
        action.can_choose_targets_more_than_once = true;
        action.choose_number = Some(2);

        action.resolve(card(1)).unwrap();
        action.resolve(card(1)).unwrap();
        assert!(action.is_saturated());
        assert_eq!(action.ids_to_resolve, vec![card(1)]);
    }

    #[test]
    fn test_add_id_deduplicates() {
        let mut action = Action::trigger(Capability::OnArrival, vec![card(1)]);
        action.add_id(card(1));
        action.add_id(card(2));
        assert_eq!(action.ids_to_resolve.len(), 2);
    }

    #[test]
    fn test_cleanup_drops_saturated_actions_and_empty_phases() {
        let mut stack = PhaseStack::new();
        let mut action = Action::trigger(Capability::OnArrival, vec![card(1)]);
        action.resolve(card(1)).unwrap();
        stack.push(Phase::with_action(action));

        assert!(stack.resolve_empty_phases());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_cleanup_is_idempotent_at_fixed_point() {
        let mut stack = PhaseStack::new();
        stack.push(Phase::with_action(Action::choose_one(
            ActionKind::AttackTarget,
            vec![card(1), card(2)],
        )));

        assert!(!stack.resolve_empty_phases());
        assert!(!stack.resolve_empty_phases(), "no further removal at fixed point");
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_never_auto_resolve_survives_cleanup() {
        let mut stack = PhaseStack::new();
        let mut action = Action::choose_one(ActionKind::AttackTarget, vec![card(1)]);
        action.never_auto_resolve = true;
        action.resolve(card(1)).unwrap();
        stack.push(Phase::with_action(action));

        assert!(!stack.resolve_empty_phases());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_game_over_phase_is_exempt() {
        let mut stack = PhaseStack::new();
        stack.push(Phase::game_over());
        assert!(!stack.resolve_empty_phases());
        assert!(stack.has_game_over());
    }

    #[test]
    fn test_end_this_phase_drops_frame_with_live_actions() {
        let mut stack = PhaseStack::new();
        let mut phase = Phase::with_action(Action::choose_one(
            ActionKind::AttackTarget,
            vec![card(1), card(2)],
        ));
        phase.end_this_phase = true;
        stack.push(phase);

        assert!(stack.resolve_empty_phases());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_end_current_phase_pops_and_queues_followup() {
        let mut stack = PhaseStack::new();
        stack.push(Phase::with_followup(Followup::FinishTurn));
        stack.push(Phase::with_action(Action::choose_one(
            ActionKind::AttackTarget,
            vec![card(1), card(2)],
        )));

        stack.end_current_phase();
        assert_eq!(stack.len(), 1);
        assert!(stack.drain_followups().is_empty(), "popped frame had none");

        stack.end_current_phase();
        assert!(stack.is_empty());
        assert_eq!(stack.drain_followups().as_slice(), &[Followup::FinishTurn]);
    }

    #[test]
    fn test_dropped_phase_queues_followup() {
        let mut stack = PhaseStack::new();
        stack.push(Phase::with_followup(Followup::FinishTurn));

        assert!(stack.resolve_empty_phases());
        let followups = stack.drain_followups();
        assert_eq!(followups.as_slice(), &[Followup::FinishTurn]);
        assert!(stack.drain_followups().is_empty());
    }
}
