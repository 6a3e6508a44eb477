//! # antigate
//!
//! Async client for the antigate / anti-captcha image CAPTCHA API. Upload an
//! image, poll until a worker has typed the answer, get the text back.
//!
//! ## Quick start
//!
//! ```no_run
//! use antigate::SolverClientBuilder;
//!
//! #[tokio::main]
//! async fn main() -> antigate::Result<()> {
//!     // Reads ANTIGATE_API_KEY when no key is passed explicitly.
//!     let client = SolverClientBuilder::new().build()?;
//!
//!     let text = client.recognize("captcha.png").await?;
//!     println!("CAPTCHA says {text}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol
//!
//! `POST /in.php` answers `OK|<job id>`. `GET /res.php` answers
//! `CAPCHA_NOT_READY` until the job is done, then `OK|<text>`. Any body
//! containing `ERROR` is fatal. Only the not-ready state is retried, every
//! `poll_interval_secs`, until `max_wait_secs` is used up.
//!
//! ## Solving from a page
//!
//! [`ScreenshotSolver`] wraps the client for browser-driven flows: a
//! [`CaptchaImageSource`] writes the cropped CAPTCHA to a temp file, the
//! client recognizes it, and the file is removed.

mod client;
mod config;
mod errors;
mod models;
mod screenshot;
mod transport;

pub use client::{SolverClient, SolverClientBuilder};
pub use config::SolverConfig;
pub use errors::{Result, SolverError};
pub use models::{
    classify_poll_response, parse_submit_response, CharacterSet, Job, Language, PollResponse,
    RecognitionHints, NOT_READY,
};
pub use screenshot::{CaptchaImageSource, Recognize, ScreenshotSolver};
pub use transport::{HttpTransport, SubmitRequest, Transport};
pub use tokio_util::sync::CancellationToken;
