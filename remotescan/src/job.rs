//! Core value types for remote scan jobs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The id the remote service hands back on job submission.
///
/// Opaque to this crate; it is only round-tripped through metadata and URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteJobId(Uuid);

impl RemoteJobId {
    /// Wraps an existing uuid.
    #[must_use]
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generates a fresh random id (used by test doubles).
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped uuid.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RemoteJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RemoteJobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The status the remote service reports for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteJobState {
    /// Job exists but has not been queued yet.
    Created,
    /// Job is waiting in the remote queue.
    Queued,
    /// Job is fully prepared and may be started.
    ReadyToStart,
    /// Job is executing.
    Running,
    /// Terminal: job finished successfully.
    Done,
    /// Terminal: job execution failed remotely.
    Failed,
    /// Terminal: job was canceled.
    Canceled,
    /// A cancel was requested; treated as a user-cancel outcome.
    CancelRequested,
}

impl RemoteJobState {
    /// Returns true if no further remote transition will occur.
    ///
    /// `CANCEL_REQUESTED` counts as terminal for orchestration purposes.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::Failed | Self::Canceled | Self::CancelRequested
        )
    }

    /// Returns true if the state represents a user cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::CancelRequested)
    }
}

impl fmt::Display for RemoteJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Queued => "QUEUED",
            Self::ReadyToStart => "READY_TO_START",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::CancelRequested => "CANCEL_REQUESTED",
        };
        write!(f, "{name}")
    }
}

/// Why the orchestration entry point was invoked.
///
/// Supplied by the caller, never derived internally: only the caller knows
/// whether this is a fresh attempt, a restart or a user-requested abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationReason {
    /// First attempt for this local job.
    Initial,
    /// The process restarted; work may already be partially done.
    Resume,
    /// The user requested the job be aborted.
    Cancel,
}

impl fmt::Display for InvocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Resume => write!(f, "resume"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// Severity of an informational message attached to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageSeverity {
    /// Informational only.
    Info,
    /// Something worth looking at, scan still usable.
    Warning,
    /// A problem the remote side wants the user to see.
    Error,
}

/// A message the remote service attached to a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Message severity.
    #[serde(rename = "type")]
    pub severity: MessageSeverity,
    /// Human readable message text.
    pub text: String,
}

impl JobMessage {
    /// Creates a new message.
    #[must_use]
    pub fn new(severity: MessageSeverity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// The outcome of one orchestration invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// An `Initial` invocation submitted the job; no blocking work was done.
    /// A later `Resume` invocation continues the lifecycle.
    Submitted {
        /// The freshly created remote job.
        remote_job_id: RemoteJobId,
    },
    /// The remote job reached `DONE` and its result was fetched.
    Completed {
        /// The opaque report payload.
        report: String,
        /// Informational messages attached to the job (possibly empty).
        messages: Vec<JobMessage>,
    },
    /// A `Cancel` invocation was processed. No result payload exists.
    Canceled,
}

impl ExecutionResult {
    /// Returns the report payload for a completed run.
    #[must_use]
    pub fn report(&self) -> Option<&str> {
        match self {
            Self::Completed { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Returns true for the cancellation outcome.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&RemoteJobState::ReadyToStart).unwrap();
        assert_eq!(json, r#""READY_TO_START""#);

        let state: RemoteJobState = serde_json::from_str(r#""CANCEL_REQUESTED""#).unwrap();
        assert_eq!(state, RemoteJobState::CancelRequested);
    }

    #[test]
    fn terminal_states() {
        assert!(RemoteJobState::Done.is_terminal());
        assert!(RemoteJobState::Failed.is_terminal());
        assert!(RemoteJobState::Canceled.is_terminal());
        assert!(RemoteJobState::CancelRequested.is_terminal());

        assert!(!RemoteJobState::Created.is_terminal());
        assert!(!RemoteJobState::Queued.is_terminal());
        assert!(!RemoteJobState::ReadyToStart.is_terminal());
        assert!(!RemoteJobState::Running.is_terminal());
    }

    #[test]
    fn cancellation_states() {
        assert!(RemoteJobState::Canceled.is_cancellation());
        assert!(RemoteJobState::CancelRequested.is_cancellation());
        assert!(!RemoteJobState::Failed.is_cancellation());
        assert!(!RemoteJobState::Done.is_cancellation());
    }

    #[test]
    fn state_display_matches_wire_names() {
        assert_eq!(RemoteJobState::ReadyToStart.to_string(), "READY_TO_START");
        assert_eq!(RemoteJobState::Done.to_string(), "DONE");
    }

    #[test]
    fn job_id_round_trips_through_string() {
        let id = RemoteJobId::random();
        let parsed: RemoteJobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn message_deserializes_with_type_field() {
        let message: JobMessage =
            serde_json::from_str(r#"{"type":"WARNING","text":"partial results"}"#).unwrap();
        assert_eq!(
            message,
            JobMessage::new(MessageSeverity::Warning, "partial results")
        );
    }

    #[test]
    fn execution_result_report_accessor() {
        let completed = ExecutionResult::Completed {
            report: "{}".to_string(),
            messages: Vec::new(),
        };
        assert_eq!(completed.report(), Some("{}"));
        assert!(ExecutionResult::Canceled.is_canceled());
        assert!(ExecutionResult::Canceled.report().is_none());
    }
}
