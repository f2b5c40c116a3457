//! Pure mapping from (base URL, job id, operation) to request URLs.

use crate::job::RemoteJobId;

const API_PREFIX: &str = "/api";

/// Builds the URLs of the remote scan service.
///
/// Stateless aside from the base URL; a trailing slash on the base URL is
/// tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointBuilder {
    base_url: String,
}

impl EndpointBuilder {
    /// Creates a builder for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Returns the base URL (without trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST` target for creating a new job.
    #[must_use]
    pub fn create_job(&self) -> String {
        format!("{}{API_PREFIX}/job/create", self.base_url)
    }

    /// `GET` target for the job status.
    #[must_use]
    pub fn job_status(&self, job_id: RemoteJobId) -> String {
        format!("{}{API_PREFIX}/job/{job_id}/status", self.base_url)
    }

    /// `GET` target for the job result payload.
    #[must_use]
    pub fn job_result(&self, job_id: RemoteJobId) -> String {
        format!("{}{API_PREFIX}/job/{job_id}/result", self.base_url)
    }

    /// `GET` target for the informational messages of a job.
    #[must_use]
    pub fn job_messages(&self, job_id: RemoteJobId) -> String {
        format!("{}{API_PREFIX}/job/{job_id}/messages", self.base_url)
    }

    /// `POST` target for uploading one artifact file.
    #[must_use]
    pub fn upload(&self, job_id: RemoteJobId, file_name: &str) -> String {
        format!("{}{API_PREFIX}/job/{job_id}/upload/{file_name}", self.base_url)
    }

    /// `PUT` target for marking the job ready to start.
    #[must_use]
    pub fn mark_ready_to_start(&self, job_id: RemoteJobId) -> String {
        format!(
            "{}{API_PREFIX}/job/{job_id}/mark-ready-to-start",
            self.base_url
        )
    }

    /// `PUT` target for canceling the job.
    #[must_use]
    pub fn cancel_job(&self, job_id: RemoteJobId) -> String {
        format!("{}{API_PREFIX}/job/{job_id}/cancel", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builder() -> (EndpointBuilder, RemoteJobId) {
        (
            EndpointBuilder::new("https://scanner.example.com"),
            RemoteJobId::random(),
        )
    }

    #[test]
    fn create_job_url() {
        let (builder, _) = builder();
        assert_eq!(
            builder.create_job(),
            "https://scanner.example.com/api/job/create"
        );
    }

    #[test]
    fn job_scoped_urls() {
        let (builder, job_id) = builder();
        let base = format!("https://scanner.example.com/api/job/{job_id}");

        assert_eq!(builder.job_status(job_id), format!("{base}/status"));
        assert_eq!(builder.job_result(job_id), format!("{base}/result"));
        assert_eq!(builder.job_messages(job_id), format!("{base}/messages"));
        assert_eq!(
            builder.upload(job_id, "sourcecode.zip"),
            format!("{base}/upload/sourcecode.zip")
        );
        assert_eq!(
            builder.mark_ready_to_start(job_id),
            format!("{base}/mark-ready-to-start")
        );
        assert_eq!(builder.cancel_job(job_id), format!("{base}/cancel"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let builder = EndpointBuilder::new("https://scanner.example.com/");
        assert_eq!(builder.base_url(), "https://scanner.example.com");
        assert_eq!(
            builder.create_job(),
            "https://scanner.example.com/api/job/create"
        );
    }
}
