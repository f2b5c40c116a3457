//! The job lifecycle controller: the state machine driving one remote scan
//! job from submission to terminal state.
//!
//! The controller is re-entrant. Each [`JobLifecycleController::execute`]
//! call inspects the invocation reason and the persisted metadata and picks
//! up wherever the attempt left off:
//!
//! - `Initial` submits a new remote job, records its id and returns without
//!   blocking; a later `Resume` invocation continues the lifecycle.
//! - `Resume` re-reads metadata, re-queries the remote status and decides
//!   whether to keep waiting, start over, or just report an already-finished
//!   result.
//! - `Cancel` sends a remote cancel for the recorded job.
//!
//! The design assumes at most one concurrent orchestration attempt per local
//! job id; overlapping attempts against the same metadata would race on the
//! remote job id key.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cancellation::CancelToken;
use crate::errors::AdapterError;
use crate::job::{ExecutionResult, InvocationReason, RemoteJobId, RemoteJobState};
use crate::metadata::{is_flag_set, keys, MetadataStore};
use crate::request::{OrchestrationRequest, ResumeErrorPolicy};
use crate::resilience::{NetworkErrorConsultant, ResilientExecutor, ResourceAccessConsultant};
use crate::transport::{JobCreateRequest, JobParameter, RemoteTransport};
use crate::upload::UploadOrchestrator;

/// Remote API version this client speaks.
const API_VERSION: &str = "1.0";

/// Parameter key carrying the reduced scan configuration, when present.
const SCAN_CONFIGURATION_PARAMETER: &str = "scan.configuration";

/// What a `Resume` invocation decided to do after inspecting metadata and
/// remote status.
enum ResumeAction {
    /// The remote job already finished; fetch the result directly.
    FetchResult(RemoteJobId),
    /// Run the upload/ready/poll pipeline for this job.
    Pipeline(RemoteJobId),
}

/// Drives the full lifecycle of remote scan jobs.
pub struct JobLifecycleController {
    transport: Arc<dyn RemoteTransport>,
    uploader: UploadOrchestrator,
}

impl JobLifecycleController {
    /// Creates a controller on the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        let uploader = UploadOrchestrator::new(transport.clone());
        Self {
            transport,
            uploader,
        }
    }

    /// Executes one orchestration invocation.
    ///
    /// The caller supplies the invocation reason, the metadata store scoped
    /// to this attempt and a cancellation token honored at every blocking
    /// point and before every remote call.
    pub async fn execute(
        &self,
        request: &OrchestrationRequest,
        reason: InvocationReason,
        metadata: &dyn MetadataStore,
        token: &CancelToken,
    ) -> Result<ExecutionResult, AdapterError> {
        if token.is_cancelled() {
            return Err(token.interruption_error());
        }
        debug!(local_job = %request.local_job_id, %reason, "orchestration invoked");

        let executor = Self::executor_for(request);
        match reason {
            InvocationReason::Initial => {
                let remote_job_id = self.submit(request, metadata, &executor, token).await?;
                Ok(ExecutionResult::Submitted { remote_job_id })
            }
            InvocationReason::Resume => {
                match self
                    .resolve_resume(request, metadata, &executor, token)
                    .await?
                {
                    ResumeAction::FetchResult(job_id) => {
                        self.fetch_outcome(job_id, &executor, token).await
                    }
                    ResumeAction::Pipeline(job_id) => {
                        self.run_pipeline(request, job_id, metadata, &executor, token)
                            .await
                    }
                }
            }
            InvocationReason::Cancel => self.cancel(request, metadata, &executor, token).await,
        }
    }

    fn executor_for(request: &OrchestrationRequest) -> ResilientExecutor {
        ResilientExecutor::new()
            .with_consultant(NetworkErrorConsultant::new(
                request.max_retries,
                request.retry_wait,
            ))
            .with_consultant(ResourceAccessConsultant::new(
                request.max_retries,
                request.retry_wait,
            ))
    }

    fn build_create_request(request: &OrchestrationRequest) -> JobCreateRequest {
        let mut parameters: Vec<JobParameter> = request
            .parameters
            .iter()
            .map(|(key, value)| JobParameter {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        if let Some(configuration) = &request.scan_configuration {
            parameters.push(JobParameter {
                key: SCAN_CONFIGURATION_PARAMETER.to_string(),
                value: configuration.clone(),
            });
        }
        JobCreateRequest {
            api_version: API_VERSION.to_string(),
            local_job_uuid: request.local_job_id,
            product_id: request.product_id.clone(),
            parameters,
        }
    }

    async fn recorded_job_id(
        metadata: &dyn MetadataStore,
    ) -> Result<Option<RemoteJobId>, AdapterError> {
        match metadata.get(keys::REMOTE_JOB_ID).await {
            None => Ok(None),
            Some(value) if value.is_empty() => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| AdapterError::InvalidMetadata { value }),
        }
    }

    /// Submits a new remote job and records its id durably before returning.
    async fn submit(
        &self,
        request: &OrchestrationRequest,
        metadata: &dyn MetadataStore,
        executor: &ResilientExecutor,
        token: &CancelToken,
    ) -> Result<RemoteJobId, AdapterError> {
        let body = Self::build_create_request(request);
        let job_id = executor
            .execute(token, || self.transport.create_job(&body))
            .await?;

        info!(
            remote_job = %job_id,
            local_job = %request.local_job_id,
            "new remote scan job created"
        );
        metadata.set(keys::REMOTE_JOB_ID, &job_id.to_string()).await;
        metadata.persist().await?;
        Ok(job_id)
    }

    /// Decides how to continue an attempt after a restart.
    async fn resolve_resume(
        &self,
        request: &OrchestrationRequest,
        metadata: &dyn MetadataStore,
        executor: &ResilientExecutor,
        token: &CancelToken,
    ) -> Result<ResumeAction, AdapterError> {
        let Some(job_id) = Self::recorded_job_id(metadata).await? else {
            warn!(
                local_job = %request.local_job_id,
                "no remote job id recorded, resume not possible, submitting a new remote job"
            );
            let job_id = self.submit(request, metadata, executor, token).await?;
            return Ok(ResumeAction::Pipeline(job_id));
        };

        match executor
            .execute(token, || self.transport.job_status(job_id))
            .await
        {
            Ok(RemoteJobState::Done) => {
                info!(
                    remote_job = %job_id,
                    "recorded remote job already finished, fetching result directly"
                );
                Ok(ResumeAction::FetchResult(job_id))
            }
            Ok(state) if state.is_terminal() => {
                // The recorded job is dead; its id is deliberately replaced.
                warn!(
                    remote_job = %job_id,
                    %state,
                    "recorded remote job ended in a non-resumable state, submitting a new remote job"
                );
                let job_id = self.submit(request, metadata, executor, token).await?;
                Ok(ResumeAction::Pipeline(job_id))
            }
            Ok(state) => {
                info!(remote_job = %job_id, %state, "resuming recorded remote job");
                Ok(ResumeAction::Pipeline(job_id))
            }
            Err(error @ AdapterError::Interrupted { .. }) => Err(error),
            Err(error) => match request.resume_error_policy {
                ResumeErrorPolicy::Surface => Err(error),
                ResumeErrorPolicy::ResubmitAsNew => {
                    warn!(
                        remote_job = %job_id,
                        error = %error,
                        "status query failed, treating recorded remote job as not resumable"
                    );
                    let job_id = self.submit(request, metadata, executor, token).await?;
                    Ok(ResumeAction::Pipeline(job_id))
                }
            },
        }
    }

    /// Upload, mark ready, poll to completion, fetch the result.
    async fn run_pipeline(
        &self,
        request: &OrchestrationRequest,
        job_id: RemoteJobId,
        metadata: &dyn MetadataStore,
        executor: &ResilientExecutor,
        token: &CancelToken,
    ) -> Result<ExecutionResult, AdapterError> {
        self.uploader
            .upload_all(executor, token, request, job_id, metadata)
            .await?;
        self.mark_ready(job_id, metadata, executor, token).await?;
        self.wait_for_done(request, job_id, executor, token).await?;
        self.fetch_outcome(job_id, executor, token).await
    }

    async fn mark_ready(
        &self,
        job_id: RemoteJobId,
        metadata: &dyn MetadataStore,
        executor: &ResilientExecutor,
        token: &CancelToken,
    ) -> Result<(), AdapterError> {
        let ready_key = keys::marked_ready(job_id);
        if is_flag_set(metadata.get(&ready_key).await.as_deref()) {
            info!(remote_job = %job_id, "job already marked as ready to start");
            return Ok(());
        }

        executor
            .execute(token, || self.transport.mark_ready_to_start(job_id))
            .await?;
        metadata.set(&ready_key, "true").await;
        metadata.persist().await?;
        info!(remote_job = %job_id, "remote job marked as ready to start");
        Ok(())
    }

    /// Polls the remote status until a terminal state or until the budget
    /// (measured from the start of this phase) is exhausted.
    async fn wait_for_done(
        &self,
        request: &OrchestrationRequest,
        job_id: RemoteJobId,
        executor: &ResilientExecutor,
        token: &CancelToken,
    ) -> Result<(), AdapterError> {
        info!(
            remote_job = %job_id,
            local_job = %request.local_job_id,
            poll_interval_ms = request.poll_interval.as_millis() as u64,
            timeout_ms = request.timeout.as_millis() as u64,
            "start waiting for remote job to finish"
        );

        let started = Instant::now();
        let mut checks: u32 = 0;

        loop {
            let state = executor
                .execute(token, || self.transport.job_status(job_id))
                .await?;
            checks += 1;
            debug!(
                remote_job = %job_id,
                %state,
                checks,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "fetched remote job status"
            );

            match state {
                RemoteJobState::Done => return Ok(()),
                RemoteJobState::Failed => {
                    return Err(AdapterError::JobFailed {
                        job_id,
                        elapsed: started.elapsed(),
                        last_state: state,
                    });
                }
                state if state.is_cancellation() => {
                    return Err(AdapterError::CanceledByUser {
                        job_id,
                        last_state: state,
                    });
                }
                _ => {}
            }

            if !token.sleep_unless_cancelled(request.poll_interval).await {
                return Err(token.interruption_error());
            }
            if started.elapsed() >= request.timeout {
                return Err(AdapterError::PollTimeout {
                    job_id,
                    checks,
                    elapsed: started.elapsed(),
                    last_state: state,
                });
            }
        }
    }

    async fn fetch_outcome(
        &self,
        job_id: RemoteJobId,
        executor: &ResilientExecutor,
        token: &CancelToken,
    ) -> Result<ExecutionResult, AdapterError> {
        let report = executor
            .execute(token, || self.transport.job_result(job_id))
            .await?;
        let messages = executor
            .execute(token, || self.transport.job_messages(job_id))
            .await?;
        Ok(ExecutionResult::Completed { report, messages })
    }

    /// Sends a remote cancel for the recorded job.
    ///
    /// Cancelling a job that was never submitted is an error, not a no-op.
    async fn cancel(
        &self,
        request: &OrchestrationRequest,
        metadata: &dyn MetadataStore,
        executor: &ResilientExecutor,
        token: &CancelToken,
    ) -> Result<ExecutionResult, AdapterError> {
        let Some(job_id) = Self::recorded_job_id(metadata).await? else {
            return Err(AdapterError::CancelWithoutSubmission {
                local_job_id: request.local_job_id,
            });
        };

        executor
            .execute(token, || self.transport.cancel_job(job_id))
            .await?;
        info!(remote_job = %job_id, local_job = %request.local_job_id, "remote scan job canceled");
        Ok(ExecutionResult::Canceled)
    }
}
