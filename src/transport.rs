//! Wire calls to the solving service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::errors::{Result, SolverError};

/// An `in.php` upload.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub api_key: String,
    pub file_name: String,
    pub image: Vec<u8>,
    /// Extra form fields (recognition hints).
    pub fields: Vec<(&'static str, String)>,
}

/// The two remote calls the client makes. Implementations return the raw
/// response body; interpreting it is the client's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, request: SubmitRequest) -> Result<String>;

    async fn fetch_result(&self, api_key: &str, job_id: &str) -> Result<String>;
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SolverError::Http)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await.map_err(SolverError::Http)?;
        if !status.is_success() {
            return Err(SolverError::Status {
                status_code: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, request: SubmitRequest) -> Result<String> {
        let file = Part::bytes(request.image).file_name(request.file_name);
        let mut form = Form::new().text("key", request.api_key).part("file", file);
        for (name, value) in request.fields {
            form = form.text(name, value);
        }

        let response = self
            .http
            .post(format!("{}/in.php", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(SolverError::Http)?;

        Self::read_body(response).await
    }

    async fn fetch_result(&self, api_key: &str, job_id: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/res.php", self.base_url))
            .query(&[("key", api_key), ("action", "get"), ("id", job_id)])
            .send()
            .await
            .map_err(SolverError::Http)?;

        Self::read_body(response).await
    }
}
