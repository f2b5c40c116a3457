//! The transport seam towards the remote scan service.
//!
//! [`RemoteTransport`] is the narrow interface the orchestration core
//! depends on; [`HttpTransport`] is the production implementation on
//! reqwest. Test doubles live in [`crate::testing`].

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TransportError;
use crate::job::{JobMessage, RemoteJobId, RemoteJobState};
use crate::request::ArtifactData;

pub use http::HttpTransport;

/// Body of the job creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreateRequest {
    /// Remote API version this client speaks.
    pub api_version: String,
    /// The caller's correlation id for the job.
    pub local_job_uuid: Uuid,
    /// Which remote product should execute the job.
    pub product_id: String,
    /// Flat job parameter list.
    pub parameters: Vec<JobParameter>,
}

/// One key/value job parameter on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameter {
    /// Parameter key.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

/// Response body of the job creation call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreateResponse {
    /// The id the remote service assigned to the job.
    pub job_uuid: RemoteJobId,
}

/// Response body of the status call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    /// The job the status belongs to.
    pub job_uuid: RemoteJobId,
    /// The reported state.
    pub state: RemoteJobState,
}

/// Response body of the messages call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobMessagesResponse {
    /// The messages attached to the job.
    #[serde(default)]
    pub messages: Vec<JobMessage>,
}

/// Issues the remote operations the orchestration consumes and surfaces
/// failures with an inspectable root cause.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// `POST job/create`: submits a new job, returns its remote id.
    async fn create_job(
        &self,
        request: &JobCreateRequest,
    ) -> Result<RemoteJobId, TransportError>;

    /// `GET job/{id}/status`: fetches the current job state.
    async fn job_status(&self, job_id: RemoteJobId) -> Result<RemoteJobState, TransportError>;

    /// `GET job/{id}/result`: fetches the opaque report payload.
    async fn job_result(&self, job_id: RemoteJobId) -> Result<String, TransportError>;

    /// `GET job/{id}/messages`: fetches informational messages (may be empty).
    async fn job_messages(&self, job_id: RemoteJobId)
        -> Result<Vec<JobMessage>, TransportError>;

    /// `POST job/{id}/upload/{file}`: multipart upload of one artifact with
    /// checksum and content-size header.
    async fn upload(
        &self,
        job_id: RemoteJobId,
        file_name: &str,
        artifact: &ArtifactData,
    ) -> Result<(), TransportError>;

    /// `PUT job/{id}/mark-ready-to-start`.
    async fn mark_ready_to_start(&self, job_id: RemoteJobId) -> Result<(), TransportError>;

    /// `PUT job/{id}/cancel`.
    async fn cancel_job(&self, job_id: RemoteJobId) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_request_serializes_camel_case() {
        let local_job_uuid = Uuid::new_v4();
        let request = JobCreateRequest {
            api_version: "1.0".to_string(),
            local_job_uuid,
            product_id: "codescan".to_string(),
            parameters: vec![JobParameter {
                key: "scan.target.depth".to_string(),
                value: "3".to_string(),
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["apiVersion"], "1.0");
        assert_eq!(json["localJobUuid"], local_job_uuid.to_string());
        assert_eq!(json["productId"], "codescan");
        assert_eq!(json["parameters"][0]["key"], "scan.target.depth");
        assert_eq!(json["parameters"][0]["value"], "3");
    }

    #[test]
    fn status_response_parses() {
        let job_id = RemoteJobId::random();
        let json = format!(r#"{{"jobUuid":"{job_id}","state":"READY_TO_START"}}"#);

        let response: JobStatusResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.job_uuid, job_id);
        assert_eq!(response.state, RemoteJobState::ReadyToStart);
    }

    #[test]
    fn messages_response_parses_and_defaults_empty() {
        let response: JobMessagesResponse =
            serde_json::from_str(r#"{"messages":[{"type":"INFO","text":"done"}]}"#).unwrap();
        assert_eq!(response.messages.len(), 1);

        let empty: JobMessagesResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.messages.is_empty());
    }
}
