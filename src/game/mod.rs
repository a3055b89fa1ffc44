//! The engine: phase stack, dispatch, combat, turn orchestration, and the
//! snapshot boundary

pub mod actions;
pub mod combat;
pub mod dispatch;
pub mod events;
pub mod snapshot;
pub mod stack;
pub mod state;
pub mod turn;

pub use actions::{ActionContext, TURN_ACTIONS};
pub use dispatch::SearchSpace;
pub use events::{EventDescriptor, EventKind, EventLog};
pub use snapshot::{
    perform_action, register_game, ActionOutcome, ActionSuccess, SnapshotStore, SnapshotView,
};
pub use stack::{Action, ActionKind, Followup, Phase, PhaseStack, TargetId};
pub use state::{Game, TransientEffect};
