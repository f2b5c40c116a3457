//! The resilient executor: repeated invocation of a remote call under a
//! consultant-driven retry policy.

use std::future::Future;
use tracing::{debug, info, warn};

use crate::cancellation::CancelToken;
use crate::errors::{AdapterError, TransportError};
use crate::resilience::consultants::{ResilienceConsultant, RetryProposal};

/// Executes operations resiliently by consulting registered
/// [`ResilienceConsultant`]s on each failure.
///
/// One executor must always be used for the same kind of target: retry
/// bookkeeping is per `execute` call, but the consultant configuration is
/// shared.
#[derive(Default)]
pub struct ResilientExecutor {
    consultants: Vec<Box<dyn ResilienceConsultant>>,
}

impl ResilientExecutor {
    /// Creates an executor with no consultants. Without consultants every
    /// failure propagates immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consultant. Consultants are asked in registration order;
    /// the first proposal wins.
    #[must_use]
    pub fn with_consultant(mut self, consultant: impl ResilienceConsultant + 'static) -> Self {
        self.consultants.push(Box::new(consultant));
        self
    }

    /// Returns the number of registered consultants.
    #[must_use]
    pub fn consultant_count(&self) -> usize {
        self.consultants.len()
    }

    /// Repeatedly invokes `operation` until it succeeds, a failure is not
    /// retryable, or the winning proposal's retry budget is exhausted.
    ///
    /// The wait between attempts is interruptible; a cancellation during the
    /// wait (or before any attempt) aborts with [`AdapterError::Interrupted`].
    pub async fn execute<T, F, Fut>(
        &self,
        token: &CancelToken,
        mut operation: F,
    ) -> Result<T, AdapterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut retries_done: u32 = 0;

        loop {
            if token.is_cancelled() {
                return Err(token.interruption_error());
            }

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let Some(proposal) = self.first_proposal(&error) else {
                debug!(
                    consultants = self.consultants.len(),
                    error = %error,
                    "no consultant proposed a retry, propagating"
                );
                return Err(AdapterError::Transport(error));
            };

            if retries_done >= proposal.max_retries {
                warn!(
                    retries = retries_done,
                    max_retries = proposal.max_retries,
                    info = %proposal.info,
                    "retry budget exhausted, propagating"
                );
                return Err(AdapterError::Transport(error));
            }

            retries_done += 1;
            debug!(
                wait_ms = proposal.wait.as_millis() as u64,
                info = %proposal.info,
                "waiting before retry"
            );
            if !token.sleep_unless_cancelled(proposal.wait).await {
                return Err(token.interruption_error());
            }
            info!(
                retry = retries_done,
                max_retries = proposal.max_retries,
                info = %proposal.info,
                "retrying remote call"
            );
        }
    }

    fn first_proposal(&self, error: &TransportError) -> Option<RetryProposal> {
        self.consultants
            .iter()
            .find_map(|consultant| consultant.consult(error))
    }
}
