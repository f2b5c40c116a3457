//! Error types for the remotescan client.
//!
//! The taxonomy separates transport-level failures (which the resilience
//! layer may retry) from orchestration outcomes (job failed, canceled by
//! user, timeout, interruption) which always propagate to the caller.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::job::{RemoteJobId, RemoteJobState};
use crate::metadata::MetadataError;

/// A failure surfaced by a [`crate::transport::RemoteTransport`]
/// implementation.
///
/// The root cause chain stays inspectable so resilience consultants can
/// classify the failure instead of matching on message strings.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request itself failed (connect, timeout, body transfer).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A low-level I/O failure on the socket/connection layer.
    #[error("i/o failure during {context}: {source}")]
    Io {
        /// Which operation the failure occurred in.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The remote service answered with a non-success status code.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
        /// The request URL.
        url: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// The request URL.
        url: String,
        /// What went wrong while decoding.
        message: String,
    },
}

impl TransportError {
    /// Creates an I/O transport error.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Walks the source chain and returns the deepest error.
    #[must_use]
    pub fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        let mut current: &(dyn std::error::Error + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

/// The error type returned by the orchestration entry point.
///
/// Nothing here is fatal to the process; every failure path is a typed value
/// for the caller to handle.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A remote call failed and no retry was proposed, or retries were
    /// exhausted. The transport failure is preserved unchanged.
    #[error("remote call failed: {0}")]
    Transport(#[from] TransportError),

    /// The remote job itself reported `FAILED`.
    #[error("remote scan job {job_id} failed after {elapsed:?} (last state: {last_state})")]
    JobFailed {
        /// The remote job that failed.
        job_id: RemoteJobId,
        /// Time spent polling when the failure was observed.
        elapsed: Duration,
        /// The state reported by the remote service.
        last_state: RemoteJobState,
    },

    /// The remote job was canceled on user request.
    #[error("remote scan job {job_id} was canceled by user request (last state: {last_state})")]
    CanceledByUser {
        /// The remote job that was canceled.
        job_id: RemoteJobId,
        /// The cancellation state reported by the remote service.
        last_state: RemoteJobState,
    },

    /// Polling exceeded the configured overall budget without reaching a
    /// terminal state.
    #[error(
        "no terminal state for remote scan job {job_id} after {checks} status checks \
         over {elapsed:?}; last state: {last_state}"
    )]
    PollTimeout {
        /// The remote job that did not finish in time.
        job_id: RemoteJobId,
        /// How many status checks were performed.
        checks: u32,
        /// Elapsed time since the polling phase started.
        elapsed: Duration,
        /// The last state observed before giving up.
        last_state: RemoteJobState,
    },

    /// The orchestration was asked to stop through its cancellation token.
    /// Never retried.
    #[error("orchestration interrupted: {reason}")]
    Interrupted {
        /// The reason recorded on the cancellation token.
        reason: String,
    },

    /// `Cancel` was invoked but no remote job id was ever recorded.
    #[error("cannot cancel: no remote job id recorded for local job {local_job_id}")]
    CancelWithoutSubmission {
        /// The caller's correlation id for the orchestration attempt.
        local_job_id: Uuid,
    },

    /// The metadata store failed to persist a state transition.
    #[error("metadata store failure: {0}")]
    Metadata(#[from] MetadataError),

    /// A recorded remote job id could not be parsed back.
    #[error("recorded remote job id {value:?} is not a valid uuid")]
    InvalidMetadata {
        /// The raw value found in the metadata store.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn root_cause_walks_to_deepest_error() {
        let inner = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
        let error = TransportError::io("job status fetch", inner);

        let root = error.root_cause();
        let io_error = root.downcast_ref::<io::Error>();
        assert!(io_error.is_some());
        assert_eq!(
            io_error.map(io::Error::kind),
            Some(io::ErrorKind::ConnectionReset)
        );
    }

    #[test]
    fn root_cause_of_sourceless_error_is_itself() {
        let error = TransportError::UnexpectedStatus {
            status: 404,
            url: "http://localhost/api/job/create".to_string(),
        };

        assert!(error.root_cause().to_string().contains("404"));
    }

    #[test]
    fn poll_timeout_names_elapsed_retries_and_state() {
        let error = AdapterError::PollTimeout {
            job_id: RemoteJobId::random(),
            checks: 12,
            elapsed: Duration::from_secs(600),
            last_state: RemoteJobState::Running,
        };

        let message = error.to_string();
        assert!(message.contains("12 status checks"));
        assert!(message.contains("600s"));
        assert!(message.contains("RUNNING"));
    }

    #[test]
    fn cancel_without_submission_is_descriptive() {
        let local_job_id = Uuid::new_v4();
        let error = AdapterError::CancelWithoutSubmission { local_job_id };

        assert!(error.to_string().contains("no remote job id recorded"));
        assert!(error.to_string().contains(&local_job_id.to_string()));
    }
}
