use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{SolverConfig, DEFAULT_BASE_URL};
use crate::errors::{Result, SolverError};
use crate::models::{
    classify_poll_response, parse_submit_response, Job, PollResponse, RecognitionHints,
};
use crate::screenshot::Recognize;
use crate::transport::{HttpTransport, SubmitRequest, Transport};

const API_KEY_ENV: &str = "ANTIGATE_API_KEY";

/// Builder for constructing a [`SolverClient`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use antigate::{CharacterSet, RecognitionHints, SolverClientBuilder};
/// use std::time::Duration;
///
/// # fn example() -> antigate::Result<()> {
/// let client = SolverClientBuilder::new()
///     .api_key("0123456789abcdef")
///     .poll_interval(Duration::from_secs(3))
///     .max_wait(Duration::from_secs(60))
///     .hints(RecognitionHints {
///         charset: CharacterSet::DigitsOnly,
///         ..Default::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SolverClientBuilder {
    config: SolverConfig,
    /// First duration setter that could not be expressed in whole seconds.
    rejected: Option<String>,
}

impl SolverClientBuilder {
    /// Create a new builder with default settings and no API key.
    pub fn new() -> Self {
        Self {
            config: SolverConfig::new(""),
            rejected: None,
        }
    }

    /// Start from an existing config, e.g. one loaded with
    /// [`SolverConfig::from_json_file`].
    pub fn from_config(config: SolverConfig) -> Self {
        Self {
            config,
            rejected: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Override the service endpoint (defaults to `http://antigate.com`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Delay between status queries. Must be a whole number of seconds.
    pub fn poll_interval(mut self, d: Duration) -> Self {
        if let Some(secs) = self.whole_secs("poll_interval", d) {
            self.config.poll_interval_secs = secs;
        }
        self
    }

    /// Total polling budget. Must be a whole number of seconds.
    pub fn max_wait(mut self, d: Duration) -> Self {
        if let Some(secs) = self.whole_secs("max_wait", d) {
            self.config.max_wait_secs = secs;
        }
        self
    }

    /// Per-request HTTP timeout. Must be a whole number of seconds.
    pub fn request_timeout(mut self, d: Duration) -> Self {
        if let Some(secs) = self.whole_secs("request_timeout", d) {
            self.config.request_timeout_secs = secs;
        }
        self
    }

    fn whole_secs(&mut self, field: &str, d: Duration) -> Option<u64> {
        if d.subsec_nanos() == 0 {
            return Some(d.as_secs());
        }
        if self.rejected.is_none() {
            self.rejected = Some(format!(
                "{field} must be a whole number of seconds, got {d:?}"
            ));
        }
        None
    }

    pub fn hints(mut self, hints: RecognitionHints) -> Self {
        self.config.hints = hints;
        self
    }

    /// Build the [`SolverClient`].
    ///
    /// If no API key was set, the builder reads the `ANTIGATE_API_KEY`
    /// environment variable. Returns [`SolverError::Config`] if no key is
    /// available, a duration had a sub-second part, or the settings are
    /// inconsistent.
    pub fn build(self) -> Result<SolverClient> {
        if let Some(message) = self.rejected {
            return Err(SolverError::Config(message));
        }
        let mut config = self.config;
        if config.api_key.is_empty() {
            config.api_key = std::env::var(API_KEY_ENV).map_err(|_| {
                SolverError::Config(format!(
                    "API key is required. Pass it to SolverClientBuilder::api_key() \
                     or set the {API_KEY_ENV} environment variable."
                ))
            })?;
        }
        SolverClient::new(config)
    }
}

impl Default for SolverClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the antigate image CAPTCHA API.
///
/// Holds only immutable configuration and a transport, so it can be cloned
/// and shared freely between concurrent recognitions.
///
/// # Example
///
/// ```no_run
/// use antigate::{SolverClient, SolverConfig};
///
/// # async fn example() -> antigate::Result<()> {
/// let client = SolverClient::new(SolverConfig::new("0123456789abcdef"))?;
/// let text = client.recognize("captcha.png").await?;
/// println!("solved: {text}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SolverClient<T = HttpTransport> {
    config: SolverConfig,
    transport: T,
}

impl SolverClient<HttpTransport> {
    /// Validate `config` and build an HTTP-backed client from it.
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let base_url = if config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.as_str()
        };
        let transport = HttpTransport::new(base_url, config.request_timeout())?;
        Ok(Self { config, transport })
    }
}

impl<T: Transport> SolverClient<T> {
    /// Build a client over a custom transport.
    pub fn with_transport(config: SolverConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Upload an image and poll until it is solved.
    ///
    /// Submission is never retried; only the not-ready polling state is,
    /// up to the configured max wait.
    ///
    /// # Errors
    ///
    /// - [`SolverError::Io`] if the file cannot be read.
    /// - [`SolverError::Submission`] if the upload is rejected.
    /// - [`SolverError::Remote`] if the service reports an error while polling.
    /// - [`SolverError::Timeout`] if no answer arrives within the max wait.
    pub async fn recognize(&self, image_path: impl AsRef<Path>) -> Result<String> {
        let job = self.submit(image_path).await?;
        self.poll(&job).await
    }

    /// Like [`recognize`](Self::recognize), but aborts with
    /// [`SolverError::Cancelled`] as soon as `cancel` fires, including in
    /// the middle of a request or a poll sleep.
    pub async fn recognize_with_cancel(
        &self,
        image_path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let job = self.submit_inner(image_path.as_ref(), Some(cancel)).await?;
        self.poll_inner(&job, Some(cancel)).await
    }

    /// Upload an image to `in.php` and return the issued [`Job`].
    pub async fn submit(&self, image_path: impl AsRef<Path>) -> Result<Job> {
        self.submit_inner(image_path.as_ref(), None).await
    }

    /// Query `res.php` until the job is solved, fails, or the max wait
    /// is exhausted.
    pub async fn poll(&self, job: &Job) -> Result<String> {
        self.poll_inner(job, None).await
    }

    /// [`poll`](Self::poll) with external cancellation.
    pub async fn poll_with_cancel(&self, job: &Job, cancel: &CancellationToken) -> Result<String> {
        self.poll_inner(job, Some(cancel)).await
    }

    async fn submit_inner(&self, path: &Path, cancel: Option<&CancellationToken>) -> Result<Job> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "captcha.png".to_string());

        let image = tokio::fs::read(path).await.map_err(SolverError::Io)?;

        tracing::debug!(file = %file_name, bytes = image.len(), "submitting captcha");

        let request = SubmitRequest {
            api_key: self.config.api_key.clone(),
            file_name,
            image,
            fields: self.config.hints.form_fields(),
        };
        let body = cancellable(cancel, self.transport.submit(request)).await??;
        let id = parse_submit_response(&body)?;

        tracing::debug!(job_id = %id, "captcha accepted");
        Ok(Job::new(id))
    }

    async fn poll_inner(&self, job: &Job, cancel: Option<&CancellationToken>) -> Result<String> {
        let interval = self.config.poll_interval();
        let max_wait = self.config.max_wait();
        let mut elapsed = Duration::ZERO;

        while elapsed <= max_wait {
            let body = cancellable(
                cancel,
                self.transport.fetch_result(&self.config.api_key, &job.id),
            )
            .await??;

            match classify_poll_response(&body) {
                PollResponse::Solved(text) => {
                    tracing::info!(
                        job_id = %job.id,
                        took = ?job.submitted_at.elapsed(),
                        "captcha solved"
                    );
                    return Ok(text);
                }
                PollResponse::Failed(message) => return Err(SolverError::Remote(message)),
                PollResponse::NotReady => {
                    tracing::debug!(job_id = %job.id, ?elapsed, "captcha not ready");
                }
                PollResponse::Unrecognized(body) => {
                    tracing::warn!(job_id = %job.id, %body, "unrecognized status response, retrying");
                }
            }

            cancellable(cancel, tokio::time::sleep(interval)).await?;
            elapsed += interval;
        }

        Err(SolverError::Timeout(max_wait))
    }
}

#[async_trait]
impl<T: Transport> Recognize for SolverClient<T> {
    async fn recognize(&self, image_path: &Path) -> Result<String> {
        SolverClient::recognize(self, image_path).await
    }
}

/// Run `fut`, giving up with [`SolverError::Cancelled`] if `cancel` fires first.
async fn cancellable<F: Future>(cancel: Option<&CancellationToken>, fut: F) -> Result<F::Output> {
    match cancel {
        None => Ok(fut.await),
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(SolverError::Cancelled),
            out = fut => Ok(out),
        },
    }
}
