use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::errors::{Result, SolverError};

/// Exact body the service returns while a job is still being solved.
/// The misspelling is part of the wire protocol.
pub const NOT_READY: &str = "CAPCHA_NOT_READY";

const ERROR_MARKER: &str = "ERROR";

/// A submitted CAPTCHA, as issued by `in.php`.
#[derive(Debug, Clone)]
pub struct Job {
    /// Opaque identifier assigned by the service.
    pub id: String,
    pub submitted_at: Instant,
}

impl Job {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            submitted_at: Instant::now(),
        }
    }
}

/// Allowed characters in the answer. Sent as `numeric`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterSet {
    #[default]
    Any,
    DigitsOnly,
    LettersOnly,
}

impl CharacterSet {
    fn code(self) -> u8 {
        match self {
            CharacterSet::Any => 0,
            CharacterSet::DigitsOnly => 1,
            CharacterSet::LettersOnly => 2,
        }
    }
}

/// Alphabet of the answer. Sent as `is_russian`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Any,
    CyrillicOnly,
    CyrillicOrLatin,
}

impl Language {
    fn code(self) -> u8 {
        match self {
            Language::Any => 0,
            Language::CyrillicOnly => 1,
            Language::CyrillicOrLatin => 2,
        }
    }
}

/// Hints passed to the human or machine solving the CAPTCHA.
///
/// Defaults leave every constraint unspecified, in which case no hint fields
/// are sent at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionHints {
    /// The answer has two or more words.
    pub phrase: bool,
    pub case_sensitive: bool,
    pub charset: CharacterSet,
    /// 0 = unspecified.
    pub min_length: u32,
    /// 0 = unspecified.
    pub max_length: u32,
    pub language: Language,
}

impl RecognitionHints {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.min_length != 0 && self.max_length != 0 && self.min_length > self.max_length {
            return Err(SolverError::Config(format!(
                "min_length {} exceeds max_length {}",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }

    /// Multipart fields for `in.php`, skipping anything left at its default.
    pub(crate) fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if self.phrase {
            fields.push(("phrase", "1".to_string()));
        }
        if self.case_sensitive {
            fields.push(("regsense", "1".to_string()));
        }
        if self.charset != CharacterSet::Any {
            fields.push(("numeric", self.charset.code().to_string()));
        }
        if self.min_length != 0 {
            fields.push(("min_len", self.min_length.to_string()));
        }
        if self.max_length != 0 {
            fields.push(("max_len", self.max_length.to_string()));
        }
        if self.language != Language::Any {
            fields.push(("is_russian", self.language.code().to_string()));
        }
        fields
    }
}

/// Classified body of a `res.php` status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResponse {
    Solved(String),
    NotReady,
    /// Fatal; carries the raw body.
    Failed(String),
    /// Matches none of the known shapes; carries the raw body.
    Unrecognized(String),
}

/// Classify a status query body. Checks run in order: error marker, exact
/// not-ready sentinel, pipe delimiter.
pub fn classify_poll_response(body: &str) -> PollResponse {
    if body.contains(ERROR_MARKER) {
        return PollResponse::Failed(body.to_string());
    }
    if body == NOT_READY {
        return PollResponse::NotReady;
    }
    match after_first_pipe(body) {
        Some(text) => PollResponse::Solved(text.to_string()),
        None => PollResponse::Unrecognized(body.to_string()),
    }
}

/// Extract the job id from an `in.php` body of the form `OK|<id>`.
pub fn parse_submit_response(body: &str) -> Result<String> {
    if body.starts_with(ERROR_MARKER) {
        return Err(SolverError::Submission(body.to_string()));
    }
    after_first_pipe(body)
        .map(str::to_string)
        .ok_or_else(|| SolverError::Submission(body.to_string()))
}

fn after_first_pipe(body: &str) -> Option<&str> {
    body.split_once('|').map(|(_, rest)| rest)
}
