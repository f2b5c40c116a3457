//! Idempotent transfer of job artifacts to the remote service.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cancellation::CancelToken;
use crate::errors::AdapterError;
use crate::job::RemoteJobId;
use crate::metadata::{is_flag_set, keys, MetadataStore};
use crate::request::{ArtifactData, OrchestrationRequest};
use crate::resilience::ResilientExecutor;
use crate::transport::RemoteTransport;

/// The closed set of artifact kinds a scan job may require.
///
/// Each kind carries its own upload file name and metadata key fragment, so
/// per-operation dispatch is a table lookup instead of scattered branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Source code archive.
    Sources,
    /// Binary archive.
    Binaries,
}

impl ArtifactKind {
    /// All artifact kinds, in upload order.
    pub const ALL: [Self; 2] = [Self::Sources, Self::Binaries];

    /// The file name the remote service expects for this kind.
    #[must_use]
    pub fn upload_file_name(self) -> &'static str {
        match self {
            Self::Sources => "sourcecode.zip",
            Self::Binaries => "binaries.tar",
        }
    }

    /// Fragment used in the per-job metadata key.
    #[must_use]
    pub fn key_fragment(self) -> &'static str {
        match self {
            Self::Sources => "sources",
            Self::Binaries => "binaries",
        }
    }

    /// The artifact payload of this kind on the request, if required.
    #[must_use]
    pub fn artifact(self, request: &OrchestrationRequest) -> Option<&ArtifactData> {
        match self {
            Self::Sources => request.source_artifact.as_ref(),
            Self::Binaries => request.binary_artifact.as_ref(),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_fragment())
    }
}

/// Transfers required artifacts, guarded by persisted per-artifact flags so
/// a crash mid-upload is retried on resume without duplicating completed
/// uploads.
pub struct UploadOrchestrator {
    transport: Arc<dyn RemoteTransport>,
}

impl UploadOrchestrator {
    /// Creates an orchestrator on the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }

    /// Uploads every artifact the request declares required.
    ///
    /// Skipped entirely when the request reuses remote storage. Each
    /// artifact's `done` flag is persisted after its upload succeeds, never
    /// before.
    pub async fn upload_all(
        &self,
        executor: &ResilientExecutor,
        token: &CancelToken,
        request: &OrchestrationRequest,
        job_id: RemoteJobId,
        metadata: &dyn MetadataStore,
    ) -> Result<(), AdapterError> {
        if request.reuse_remote_storage {
            info!(
                remote_job = %job_id,
                local_job = %request.local_job_id,
                "no upload necessary, job reuses storage populated elsewhere"
            );
            return Ok(());
        }

        for kind in ArtifactKind::ALL {
            self.upload_if_required(kind, executor, token, request, job_id, metadata)
                .await?;
        }
        Ok(())
    }

    async fn upload_if_required(
        &self,
        kind: ArtifactKind,
        executor: &ResilientExecutor,
        token: &CancelToken,
        request: &OrchestrationRequest,
        job_id: RemoteJobId,
        metadata: &dyn MetadataStore,
    ) -> Result<(), AdapterError> {
        let Some(artifact) = kind.artifact(request) else {
            debug!(remote_job = %job_id, kind = %kind, "skipped upload, not required");
            return Ok(());
        };

        let done_key = keys::upload_done(job_id, kind.key_fragment());
        if is_flag_set(metadata.get(&done_key).await.as_deref()) {
            info!(
                remote_job = %job_id,
                local_job = %request.local_job_id,
                kind = %kind,
                "reusing existing upload"
            );
            return Ok(());
        }

        info!(
            remote_job = %job_id,
            local_job = %request.local_job_id,
            kind = %kind,
            size_in_bytes = artifact.size_in_bytes,
            "starting upload"
        );
        executor
            .execute(token, || {
                self.transport
                    .upload(job_id, kind.upload_file_name(), artifact)
            })
            .await?;

        metadata.set(&done_key, "true").await;
        metadata.persist().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryMetadataStore;
    use crate::testing::ScriptedTransport;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn request_with_sources() -> OrchestrationRequest {
        OrchestrationRequest::new(Uuid::new_v4(), "codescan")
            .with_source_artifact(ArtifactData::from_bytes(b"zip".to_vec()))
    }

    fn orchestrator() -> (Arc<ScriptedTransport>, UploadOrchestrator) {
        let transport = Arc::new(ScriptedTransport::new());
        let orchestrator = UploadOrchestrator::new(transport.clone());
        (transport, orchestrator)
    }

    #[test]
    fn kind_table() {
        assert_eq!(ArtifactKind::Sources.upload_file_name(), "sourcecode.zip");
        assert_eq!(ArtifactKind::Binaries.upload_file_name(), "binaries.tar");
        assert_eq!(ArtifactKind::Sources.to_string(), "sources");
        assert_eq!(ArtifactKind::Binaries.to_string(), "binaries");

        let request = request_with_sources();
        assert!(ArtifactKind::Sources.artifact(&request).is_some());
        assert!(ArtifactKind::Binaries.artifact(&request).is_none());
    }

    #[tokio::test]
    async fn uploads_required_artifacts_and_persists_flags() {
        let (transport, orchestrator) = orchestrator();
        let metadata = InMemoryMetadataStore::new();
        let request = request_with_sources();
        let job_id = transport.job_id();

        orchestrator
            .upload_all(
                &ResilientExecutor::new(),
                &CancelToken::new(),
                &request,
                job_id,
                &metadata,
            )
            .await
            .unwrap();

        assert_eq!(transport.call_count("upload:sourcecode.zip"), 1);
        assert_eq!(transport.call_count("upload:binaries.tar"), 0);
        assert_eq!(
            metadata
                .get(&keys::upload_done(job_id, "sources"))
                .await
                .as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn already_done_flag_skips_upload() {
        let (transport, orchestrator) = orchestrator();
        let metadata = InMemoryMetadataStore::new();
        let request = request_with_sources();
        let job_id = transport.job_id();

        metadata
            .set(&keys::upload_done(job_id, "sources"), "true")
            .await;

        orchestrator
            .upload_all(
                &ResilientExecutor::new(),
                &CancelToken::new(),
                &request,
                job_id,
                &metadata,
            )
            .await
            .unwrap();

        assert_eq!(transport.call_count("upload:sourcecode.zip"), 0);
    }

    #[tokio::test]
    async fn reuse_remote_storage_skips_all_uploads() {
        let (transport, orchestrator) = orchestrator();
        let metadata = InMemoryMetadataStore::new();
        let request = request_with_sources().with_reuse_remote_storage(true);

        orchestrator
            .upload_all(
                &ResilientExecutor::new(),
                &CancelToken::new(),
                &request,
                transport.job_id(),
                &metadata,
            )
            .await
            .unwrap();

        assert_eq!(transport.call_count("upload:sourcecode.zip"), 0);
        assert!(metadata.is_empty());
    }

    #[tokio::test]
    async fn failed_upload_leaves_flag_unset() {
        let (transport, orchestrator) = orchestrator();
        let metadata = InMemoryMetadataStore::new();
        let request = request_with_sources();
        let job_id = transport.job_id();

        transport.fail_next(
            "upload:sourcecode.zip",
            crate::errors::TransportError::UnexpectedStatus {
                status: 500,
                url: "http://localhost".to_string(),
            },
        );

        let result = orchestrator
            .upload_all(
                &ResilientExecutor::new(),
                &CancelToken::new(),
                &request,
                job_id,
                &metadata,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(metadata.get(&keys::upload_done(job_id, "sources")).await, None);
    }
}
