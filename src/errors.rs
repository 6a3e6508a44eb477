use std::time::Duration;

use thiserror::Error;

/// All errors that can occur while solving a CAPTCHA.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The upload response had no `|` delimiter or explicitly reported an error.
    /// Carries the raw response body.
    #[error("submission rejected: {0}")]
    Submission(String),

    /// A status query returned a body containing `ERROR`. Carries the raw body.
    #[error("remote error: {0}")]
    Remote(String),

    /// Polling ran past the configured max wait without a terminal response.
    #[error("CAPTCHA_TIMEOUT_HIT: no solution within {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired while a request or sleep was pending.
    #[error("recognition cancelled")]
    Cancelled,

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status_code}: {body}")]
    Status { status_code: u16, body: String },

    /// A transport-level HTTP error from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error, typically from reading the image file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is incomplete or violates an invariant.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The image source failed to produce a CAPTCHA image.
    #[error("capture failed: {0}")]
    Capture(String),
}

/// A convenience alias for `Result<T, SolverError>`.
pub type Result<T> = std::result::Result<T, SolverError>;
