//! Discussion Orchestrator core: Event Bus (C2), Context Builder glue,
//! Turn Executor (C5), Summary Generator (C7), and the Orchestrator (C6)
//! that ties every component into one discussion's lifecycle.

pub mod event_bus;
pub mod orchestrator;
pub mod repetition;
pub mod running_models;
pub mod summary;
pub mod turn_executor;

pub use event_bus::{EventBus, TokenThrottle};
pub use orchestrator::Orchestrator;
pub use running_models::RunningModels;
pub use summary::SummaryGenerator;
pub use turn_executor::{TurnExecutor, TurnOutcome};
