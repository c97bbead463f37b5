//! Operator dashboard for the validator metrics service.

pub mod config;
pub mod render;
pub mod scheduler;
pub mod source;
pub mod state;

pub use scheduler::{RefreshOutcome, RefreshScheduler, Trigger};
pub use source::MetricsSource;
pub use state::{ApiStatus, ClientPollState, SchedulerPhase};
