//! Production transport on reqwest.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

use crate::endpoint::EndpointBuilder;
use crate::errors::TransportError;
use crate::job::{JobMessage, RemoteJobId, RemoteJobState};
use crate::request::ArtifactData;
use crate::transport::{
    JobCreateRequest, JobCreateResponse, JobMessagesResponse, JobStatusResponse, RemoteTransport,
};

/// Header carrying the artifact content size on uploads.
const FILE_SIZE_HEADER: &str = "x-file-size";

/// HTTP implementation of [`RemoteTransport`].
pub struct HttpTransport {
    client: Client,
    endpoints: EndpointBuilder,
}

impl HttpTransport {
    /// Creates a transport for the given base URL.
    ///
    /// With `trust_all_certificates` the client accepts untrusted TLS
    /// certificates, for scan services with self-signed endpoints.
    pub fn new(
        base_url: impl Into<String>,
        trust_all_certificates: bool,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(trust_all_certificates)
            .build()?;
        Ok(Self {
            client,
            endpoints: EndpointBuilder::new(base_url),
        })
    }

    /// Creates a transport reusing an already configured client.
    #[must_use]
    pub fn with_client(client: Client, endpoints: EndpointBuilder) -> Self {
        Self { client, endpoints }
    }

    /// Returns the endpoint builder in use.
    #[must_use]
    pub fn endpoints(&self) -> &EndpointBuilder {
        &self.endpoints
    }

    fn checked(response: Response) -> Result<Response, TransportError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(TransportError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: response.url().to_string(),
            })
        }
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn create_job(
        &self,
        request: &JobCreateRequest,
    ) -> Result<RemoteJobId, TransportError> {
        let url = self.endpoints.create_job();
        let response = self.client.post(&url).json(request).send().await?;
        let parsed: JobCreateResponse = Self::checked(response)?.json().await?;
        Ok(parsed.job_uuid)
    }

    async fn job_status(&self, job_id: RemoteJobId) -> Result<RemoteJobState, TransportError> {
        let url = self.endpoints.job_status(job_id);
        let response = self.client.get(&url).send().await?;
        let parsed: JobStatusResponse = Self::checked(response)?.json().await?;
        Ok(parsed.state)
    }

    async fn job_result(&self, job_id: RemoteJobId) -> Result<String, TransportError> {
        let url = self.endpoints.job_result(job_id);
        let response = self.client.get(&url).send().await?;
        Ok(Self::checked(response)?.text().await?)
    }

    async fn job_messages(
        &self,
        job_id: RemoteJobId,
    ) -> Result<Vec<JobMessage>, TransportError> {
        let url = self.endpoints.job_messages(job_id);
        let response = self.client.get(&url).send().await?;
        let body = Self::checked(response)?.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let parsed: JobMessagesResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Decode {
                url,
                message: e.to_string(),
            })?;
        Ok(parsed.messages)
    }

    async fn upload(
        &self,
        job_id: RemoteJobId,
        file_name: &str,
        artifact: &ArtifactData,
    ) -> Result<(), TransportError> {
        let url = self.endpoints.upload(job_id, file_name);
        let form = Form::new()
            .part(
                "file",
                Part::bytes(artifact.content.clone()).file_name(file_name.to_string()),
            )
            .text("checkSum", artifact.checksum_sha256.clone());

        let response = self
            .client
            .post(&url)
            .header(FILE_SIZE_HEADER, artifact.size_in_bytes.to_string())
            .multipart(form)
            .send()
            .await?;
        Self::checked(response)?;
        Ok(())
    }

    async fn mark_ready_to_start(&self, job_id: RemoteJobId) -> Result<(), TransportError> {
        let url = self.endpoints.mark_ready_to_start(job_id);
        let response = self.client.put(&url).send().await?;
        Self::checked(response)?;
        Ok(())
    }

    async fn cancel_job(&self, job_id: RemoteJobId) -> Result<(), TransportError> {
        let url = self.endpoints.cancel_job(job_id);
        let response = self.client.put(&url).send().await?;
        Self::checked(response)?;
        Ok(())
    }
}
