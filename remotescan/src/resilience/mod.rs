//! Resilient execution of remote calls.
//!
//! The [`ResilientExecutor`] wraps a unit of work with a pluggable retry
//! policy. It knows nothing about job semantics; registered
//! [`ResilienceConsultant`]s classify each failure and propose (or decline)
//! a retry plan.

mod consultants;
mod executor;

pub use consultants::{
    NetworkErrorConsultant, ResilienceConsultant, ResourceAccessConsultant, RetryProposal,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT,
};
pub use executor::ResilientExecutor;
