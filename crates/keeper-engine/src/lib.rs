//! Decision and execution engine for time-delayed proxy nominations.
//!
//! On each tick the engine reads the delayed-action queue, checks every
//! queued nomination's targets against a commission threshold, and then
//! cancels the announcement, leaves it waiting for its delay window, or
//! executes it and records the result.

pub mod announcements;
pub mod decision;
pub mod engine;
pub mod error;
pub mod executor;
pub mod memory;
pub mod notifier;
pub mod pacer;
pub mod progress;
pub mod registry;
pub mod scheduler;
pub mod types;
pub mod validity;

#[cfg(test)]
pub(crate) mod test_support;

pub use decision::{classify, ItemTracker};
pub use engine::{Engine, EngineConfig};
pub use error::{ActionError, EngineError};
pub use executor::{Executor, UNKNOWN_NAME};
pub use memory::InMemoryStore;
pub use notifier::{LogNotifier, NoopNotifier, NotificationRateLimiter, RateLimitedNotifier};
pub use pacer::ExecutionPacer;
pub use progress::{
    BroadcastProgressSink, NoopProgressSink, ProgressReporter, TracingProgressSink, EXECUTION_TASK,
};
pub use registry::GroupRegistry;
pub use scheduler::Scheduler;
pub use types::{
    ActionState, CancelReport, Decision, ExecutionOutcome, ItemOutcome, ItemReport, PlanVerdict,
    PlannedAction, SkipReason, TickOutcome, TickReport, ValidityResult,
};
