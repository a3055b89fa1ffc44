//! Garrison - rules engine for a two-player, turn-based strategy card game
//!
//! The engine tracks per-player board state, resolves the actions a player
//! may take, and manages the cascades of secondary effects those actions set
//! off. Pending decisions live on a stack of phases; whenever a decision has
//! more than one legal resolution the engine suspends and hands control back
//! to the caller, who resumes from a serialized snapshot.

pub mod core;
pub mod game;
pub mod error;

pub use error::{EngineError, Result};
