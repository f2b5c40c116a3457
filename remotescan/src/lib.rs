//! # Remotescan
//!
//! A client library for driving remote scan-job execution services through
//! their full lifecycle.
//!
//! Remotescan talks to an external, asynchronous scan-execution service and
//! handles:
//!
//! - **Job submission**: create a remote job and record its id durably
//! - **Idempotent uploads**: transfer source/binary artifacts exactly once,
//!   even across process restarts
//! - **Polling to completion**: wait for a terminal state within a budget
//! - **Cancellation and resumption**: abort a running job on request, or pick
//!   up a half-finished orchestration after a crash without duplicating side
//!   effects
//! - **Resilience**: retry transient network failures with pluggable
//!   classification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use remotescan::prelude::*;
//!
//! let transport = Arc::new(HttpTransport::new("https://scanner.example.com", false)?);
//! let controller = JobLifecycleController::new(transport);
//!
//! let request = OrchestrationRequest::new(local_job_id, "codescan")
//!     .with_source_artifact(ArtifactData::from_bytes(zip_bytes));
//!
//! // First invocation submits and returns immediately.
//! controller.execute(&request, InvocationReason::Initial, &metadata, &token).await?;
//! // A later invocation uploads, marks ready and polls to completion.
//! let outcome = controller.execute(&request, InvocationReason::Resume, &metadata, &token).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod controller;
pub mod endpoint;
pub mod errors;
pub mod job;
pub mod metadata;
pub mod request;
pub mod resilience;
pub mod testing;
pub mod transport;
pub mod upload;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancelToken;
    pub use crate::controller::JobLifecycleController;
    pub use crate::endpoint::EndpointBuilder;
    pub use crate::errors::{AdapterError, TransportError};
    pub use crate::job::{
        ExecutionResult, InvocationReason, JobMessage, MessageSeverity, RemoteJobId,
        RemoteJobState,
    };
    pub use crate::metadata::{InMemoryMetadataStore, MetadataError, MetadataStore};
    pub use crate::request::{ArtifactData, OrchestrationRequest, ResumeErrorPolicy};
    pub use crate::resilience::{
        NetworkErrorConsultant, ResilienceConsultant, ResilientExecutor,
        ResourceAccessConsultant, RetryProposal,
    };
    pub use crate::transport::{HttpTransport, RemoteTransport};
    pub use crate::upload::{ArtifactKind, UploadOrchestrator};
}

#[cfg(test)]
mod tests {
    #[test]
    fn library_compiles() {
        assert!(true);
    }
}
