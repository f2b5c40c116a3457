//! The immutable per-invocation input to the orchestration.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Default wait between two status checks while polling.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default overall budget for the polling phase. Scans can run for days.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 24 * 60 * 60);

/// An artifact payload to be transferred to the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactData {
    /// The raw archive bytes.
    pub content: Vec<u8>,
    /// Hex-encoded sha256 checksum of `content`.
    pub checksum_sha256: String,
    /// Size of `content` in bytes, sent as a content-size header.
    pub size_in_bytes: u64,
}

impl ArtifactData {
    /// Creates an artifact from pre-computed checksum and size.
    #[must_use]
    pub fn new(content: Vec<u8>, checksum_sha256: impl Into<String>, size_in_bytes: u64) -> Self {
        Self {
            content,
            checksum_sha256: checksum_sha256.into(),
            size_in_bytes,
        }
    }

    /// Creates an artifact from raw bytes, computing checksum and size.
    #[must_use]
    pub fn from_bytes(content: Vec<u8>) -> Self {
        let checksum = hex::encode(Sha256::digest(&content));
        let size = content.len() as u64;
        Self::new(content, checksum, size)
    }
}

/// Policy for a `Resume` invocation whose remote status query fails
/// (for example because the remote job id is no longer known to the server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeErrorPolicy {
    /// Treat the attempt as not resumable and submit a brand-new remote job.
    #[default]
    ResubmitAsNew,
    /// Propagate the status query failure to the caller.
    Surface,
}

/// Immutable input for one orchestration invocation.
///
/// Built with the `with_*` methods:
///
/// ```rust
/// use remotescan::request::{ArtifactData, OrchestrationRequest};
/// use std::time::Duration;
/// use uuid::Uuid;
///
/// let request = OrchestrationRequest::new(Uuid::new_v4(), "codescan")
///     .with_parameter("scan.target.depth", "3")
///     .with_source_artifact(ArtifactData::from_bytes(b"zip bytes".to_vec()))
///     .with_poll_interval(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    /// The caller's correlation id, stable across resume/cancel invocations.
    pub local_job_id: Uuid,
    /// Which remote product should execute the job.
    pub product_id: String,
    /// Arbitrary string key/value job parameters, forwarded on submission.
    pub parameters: BTreeMap<String, String>,
    /// Optional reduced scan-configuration payload, forwarded as a parameter.
    pub scan_configuration: Option<String>,
    /// Source archive to upload, if the scan requires one.
    pub source_artifact: Option<ArtifactData>,
    /// Binary archive to upload, if the scan requires one.
    pub binary_artifact: Option<ArtifactData>,
    /// The remote service reuses storage already populated elsewhere;
    /// skips uploads entirely.
    pub reuse_remote_storage: bool,
    /// Accept untrusted TLS certificates on the remote endpoint.
    pub trust_all_certificates: bool,
    /// Maximum retries proposed for recognized transient failures.
    pub max_retries: u32,
    /// Wait between two retries of a failed remote call.
    pub retry_wait: Duration,
    /// Wait between two status checks while polling.
    pub poll_interval: Duration,
    /// Overall budget for the polling phase.
    pub timeout: Duration,
    /// What to do when a resume status query fails.
    pub resume_error_policy: ResumeErrorPolicy,
}

impl OrchestrationRequest {
    /// Creates a request with default timing and retry settings.
    #[must_use]
    pub fn new(local_job_id: Uuid, product_id: impl Into<String>) -> Self {
        Self {
            local_job_id,
            product_id: product_id.into(),
            parameters: BTreeMap::new(),
            scan_configuration: None,
            source_artifact: None,
            binary_artifact: None,
            reuse_remote_storage: false,
            trust_all_certificates: false,
            max_retries: crate::resilience::DEFAULT_MAX_RETRIES,
            retry_wait: crate::resilience::DEFAULT_RETRY_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            resume_error_policy: ResumeErrorPolicy::default(),
        }
    }

    /// Adds a job parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Sets the reduced scan-configuration payload.
    #[must_use]
    pub fn with_scan_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.scan_configuration = Some(configuration.into());
        self
    }

    /// Declares a required source archive upload.
    #[must_use]
    pub fn with_source_artifact(mut self, artifact: ArtifactData) -> Self {
        self.source_artifact = Some(artifact);
        self
    }

    /// Declares a required binary archive upload.
    #[must_use]
    pub fn with_binary_artifact(mut self, artifact: ArtifactData) -> Self {
        self.binary_artifact = Some(artifact);
        self
    }

    /// Marks remote storage as already populated; uploads are skipped.
    #[must_use]
    pub fn with_reuse_remote_storage(mut self, reuse: bool) -> Self {
        self.reuse_remote_storage = reuse;
        self
    }

    /// Accepts untrusted TLS certificates.
    #[must_use]
    pub fn with_trust_all_certificates(mut self, trust: bool) -> Self {
        self.trust_all_certificates = trust;
        self
    }

    /// Overrides the retry limit for transient failures.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Overrides the wait between retries.
    #[must_use]
    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the overall polling budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the resume status-query failure policy.
    #[must_use]
    pub fn with_resume_error_policy(mut self, policy: ResumeErrorPolicy) -> Self {
        self.resume_error_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_bytes_computes_sha256_and_size() {
        let artifact = ArtifactData::from_bytes(b"hello".to_vec());

        assert_eq!(
            artifact.checksum_sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(artifact.size_in_bytes, 5);
        assert_eq!(artifact.content, b"hello".to_vec());
    }

    #[test]
    fn request_defaults() {
        let request = OrchestrationRequest::new(Uuid::new_v4(), "codescan");

        assert_eq!(request.product_id, "codescan");
        assert!(request.parameters.is_empty());
        assert!(request.source_artifact.is_none());
        assert!(request.binary_artifact.is_none());
        assert!(!request.reuse_remote_storage);
        assert!(!request.trust_all_certificates);
        assert_eq!(request.max_retries, 3);
        assert_eq!(request.retry_wait, Duration::from_millis(10_000));
        assert_eq!(request.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(request.timeout, DEFAULT_TIMEOUT);
        assert_eq!(request.resume_error_policy, ResumeErrorPolicy::ResubmitAsNew);
    }

    #[test]
    fn builder_methods() {
        let request = OrchestrationRequest::new(Uuid::new_v4(), "codescan")
            .with_parameter("scan.target.depth", "3")
            .with_scan_configuration("{\"reduced\":true}")
            .with_reuse_remote_storage(true)
            .with_max_retries(7)
            .with_retry_wait(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(100))
            .with_timeout(Duration::from_secs(1))
            .with_resume_error_policy(ResumeErrorPolicy::Surface);

        assert_eq!(
            request.parameters.get("scan.target.depth"),
            Some(&"3".to_string())
        );
        assert_eq!(
            request.scan_configuration.as_deref(),
            Some("{\"reduced\":true}")
        );
        assert!(request.reuse_remote_storage);
        assert_eq!(request.max_retries, 7);
        assert_eq!(request.retry_wait, Duration::from_millis(50));
        assert_eq!(request.poll_interval, Duration::from_millis(100));
        assert_eq!(request.timeout, Duration::from_secs(1));
        assert_eq!(request.resume_error_policy, ResumeErrorPolicy::Surface);
    }
}
