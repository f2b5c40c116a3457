//! A scriptable transport double that records calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::errors::TransportError;
use crate::job::{JobMessage, RemoteJobId, RemoteJobState};
use crate::request::ArtifactData;
use crate::transport::{JobCreateRequest, RemoteTransport};

/// A transport double that records every call and answers from a script.
///
/// Status calls consume a queued state sequence; once the queue is empty the
/// last state repeats, which models a job hanging in a non-terminal state.
/// Failures can be queued per operation and are consumed before the scripted
/// success behavior.
pub struct ScriptedTransport {
    job_id: RemoteJobId,
    statuses: Mutex<VecDeque<RemoteJobState>>,
    last_status: Mutex<RemoteJobState>,
    report: Mutex<String>,
    messages: Mutex<Vec<JobMessage>>,
    failures: Mutex<HashMap<String, VecDeque<TransportError>>>,
    calls: Mutex<Vec<String>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            job_id: RemoteJobId::random(),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(RemoteJobState::Running),
            report: Mutex::new(String::new()),
            messages: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedTransport {
    /// Creates a transport with a random job id and an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The job id `create_job` hands out.
    #[must_use]
    pub fn job_id(&self) -> RemoteJobId {
        self.job_id
    }

    /// Queues one status response.
    pub fn push_status(&self, state: RemoteJobState) {
        self.statuses.lock().push_back(state);
    }

    /// Queues several status responses at once.
    pub fn push_statuses(&self, states: impl IntoIterator<Item = RemoteJobState>) {
        self.statuses.lock().extend(states);
    }

    /// Sets the report payload returned by `job_result`.
    pub fn set_report(&self, report: impl Into<String>) {
        *self.report.lock() = report.into();
    }

    /// Sets the messages returned by `job_messages`.
    pub fn set_messages(&self, messages: Vec<JobMessage>) {
        *self.messages.lock() = messages;
    }

    /// Queues a failure for the next call of `operation`.
    pub fn fail_next(&self, operation: impl Into<String>, error: TransportError) {
        self.failures
            .lock()
            .entry(operation.into())
            .or_default()
            .push_back(error);
    }

    /// All recorded operation names, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// How often the given operation was called.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == operation).count()
    }

    fn record(&self, operation: &str) -> Result<(), TransportError> {
        self.calls.lock().push(operation.to_string());
        if let Some(queue) = self.failures.lock().get_mut(operation) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTransport for ScriptedTransport {
    async fn create_job(
        &self,
        _request: &JobCreateRequest,
    ) -> Result<RemoteJobId, TransportError> {
        self.record("create")?;
        Ok(self.job_id)
    }

    async fn job_status(&self, _job_id: RemoteJobId) -> Result<RemoteJobState, TransportError> {
        self.record("status")?;
        let mut last = self.last_status.lock();
        if let Some(state) = self.statuses.lock().pop_front() {
            *last = state;
        }
        Ok(*last)
    }

    async fn job_result(&self, _job_id: RemoteJobId) -> Result<String, TransportError> {
        self.record("result")?;
        Ok(self.report.lock().clone())
    }

    async fn job_messages(
        &self,
        _job_id: RemoteJobId,
    ) -> Result<Vec<JobMessage>, TransportError> {
        self.record("messages")?;
        Ok(self.messages.lock().clone())
    }

    async fn upload(
        &self,
        _job_id: RemoteJobId,
        file_name: &str,
        _artifact: &ArtifactData,
    ) -> Result<(), TransportError> {
        self.record(&format!("upload:{file_name}"))
    }

    async fn mark_ready_to_start(&self, _job_id: RemoteJobId) -> Result<(), TransportError> {
        self.record("mark-ready")
    }

    async fn cancel_job(&self, _job_id: RemoteJobId) -> Result<(), TransportError> {
        self.record("cancel")
    }
}
