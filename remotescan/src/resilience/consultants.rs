//! Failure classification strategies.
//!
//! Consultants inspect the root cause chain of a transport failure, not just
//! the outermost error, since failures arrive wrapped. The first consultant
//! (in registration order) returning a proposal wins; unknown failure classes
//! yield no proposal and are never retried.

use std::time::Duration;

use crate::errors::TransportError;

/// Default maximum retry attempts proposed by the standard consultants.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default wait between two retry attempts.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(10_000);

/// A retry plan proposed by a consultant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryProposal {
    /// Short description of why a retry makes sense, for logging.
    pub info: String,
    /// Maximum number of retries before the failure propagates.
    pub max_retries: u32,
    /// Wait between two attempts.
    pub wait: Duration,
}

impl RetryProposal {
    /// Creates a new proposal.
    #[must_use]
    pub fn new(info: impl Into<String>, max_retries: u32, wait: Duration) -> Self {
        Self {
            info: info.into(),
            max_retries,
            wait,
        }
    }
}

/// Classifies a failure and proposes a retry plan, or declines.
pub trait ResilienceConsultant: Send + Sync {
    /// Returns a proposal if this consultant recognizes the failure.
    fn consult(&self, error: &TransportError) -> Option<RetryProposal>;
}

/// Walks the source chain looking for an I/O error.
fn find_io_error(error: &TransportError) -> Option<&std::io::Error> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(io_error) = err.downcast_ref::<std::io::Error>() {
            return Some(io_error);
        }
        current = err.source();
    }
    None
}

/// Walks the source chain looking for a reqwest error.
fn find_reqwest_error(error: &TransportError) -> Option<&reqwest::Error> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(reqwest_error) = err.downcast_ref::<reqwest::Error>() {
            return Some(reqwest_error);
        }
        current = err.source();
    }
    None
}

const CONNECTION_ERROR_KINDS: [std::io::ErrorKind; 5] = [
    std::io::ErrorKind::ConnectionRefused,
    std::io::ErrorKind::ConnectionReset,
    std::io::ErrorKind::ConnectionAborted,
    std::io::ErrorKind::NotConnected,
    std::io::ErrorKind::BrokenPipe,
];

/// Matches failures whose root cause is a low-level socket/connection error.
#[derive(Debug, Clone)]
pub struct NetworkErrorConsultant {
    max_retries: u32,
    wait: Duration,
}

impl Default for NetworkErrorConsultant {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            wait: DEFAULT_RETRY_WAIT,
        }
    }
}

impl NetworkErrorConsultant {
    /// Creates a consultant with the given retry tuning.
    #[must_use]
    pub fn new(max_retries: u32, wait: Duration) -> Self {
        Self { max_retries, wait }
    }
}

impl ResilienceConsultant for NetworkErrorConsultant {
    fn consult(&self, error: &TransportError) -> Option<RetryProposal> {
        let io_error = find_io_error(error)?;
        if !CONNECTION_ERROR_KINDS.contains(&io_error.kind()) {
            return None;
        }
        Some(RetryProposal::new(
            format!("connection-level network failure ({})", io_error.kind()),
            self.max_retries,
            self.wait,
        ))
    }
}

/// Matches higher-level resource-access transport failures: request-phase
/// reqwest errors (connect, timeout) and any remaining I/O error not claimed
/// by [`NetworkErrorConsultant`].
#[derive(Debug, Clone)]
pub struct ResourceAccessConsultant {
    max_retries: u32,
    wait: Duration,
}

impl Default for ResourceAccessConsultant {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            wait: DEFAULT_RETRY_WAIT,
        }
    }
}

impl ResourceAccessConsultant {
    /// Creates a consultant with the given retry tuning.
    #[must_use]
    pub fn new(max_retries: u32, wait: Duration) -> Self {
        Self { max_retries, wait }
    }
}

impl ResilienceConsultant for ResourceAccessConsultant {
    fn consult(&self, error: &TransportError) -> Option<RetryProposal> {
        if let Some(reqwest_error) = find_reqwest_error(error) {
            if reqwest_error.is_connect()
                || reqwest_error.is_timeout()
                || reqwest_error.is_request()
            {
                return Some(RetryProposal::new(
                    "resource access failure while reaching the remote service",
                    self.max_retries,
                    self.wait,
                ));
            }
        }
        if find_io_error(error).is_some() {
            return Some(RetryProposal::new(
                "i/o failure while accessing the remote service",
                self.max_retries,
                self.wait,
            ));
        }
        None
    }
}
