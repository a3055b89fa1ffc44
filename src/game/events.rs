//! The event log: append-only descriptors of what happened, for clients

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Kind tag for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    CardPlayed,
    WorkerAssigned,
    BuildStarted,
    BuildCompleted,
    PatrolAssigned,
    Sidelined,
    AbilityUsed,
    AttackDeclared,
    TargetChosen,
    Damage,
    Death,
    Saved,
    TriggerResolved,
    PropertyChanged,
    PropertyChangeIgnored,
    GoldChanged,
    CardDrawn,
    CardDiscarded,
    DiscardPrevented,
    TurnStarted,
    TurnEnded,
    HeroLeveled,
    TowerRevealed,
    OverpowerDamage,
    SparkshotDamage,
    GameOver,
}

/// One immutable entry in the event log: never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub kind: EventKind,
    /// Human-readable description for client display.
    pub text: String,
    /// Loose key/value context (card ids, amounts, slot names).
    pub context: SmallVec<[(String, String); 2]>,
}

/// Per-game append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<EventDescriptor>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: EventKind, text: impl Into<String>) {
        self.events.push(EventDescriptor {
            kind,
            text: text.into(),
            context: SmallVec::new(),
        });
    }

    pub fn push_with(
        &mut self,
        kind: EventKind,
        text: impl Into<String>,
        context: impl IntoIterator<Item = (String, String)>,
    ) {
        self.events.push(EventDescriptor {
            kind,
            text: text.into(),
            context: context.into_iter().collect(),
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventDescriptor> {
        self.events.iter()
    }

    pub fn entries(&self) -> &[EventDescriptor] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
