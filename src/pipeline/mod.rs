//! One request/response voice turn.

pub mod coordinator;
pub mod messages;

pub use coordinator::TurnOrchestrator;
