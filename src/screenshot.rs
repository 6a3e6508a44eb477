//! Solve a CAPTCHA shown on a live page.
//!
//! The browser side is an external collaborator: it takes a screenshot,
//! crops the CAPTCHA element out of it and writes the crop to the path it is
//! given. [`ScreenshotSolver`] owns that path, hands it to a recognizer and
//! removes the file afterwards.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::Result;

/// Turns an image file into the text it shows.
#[async_trait]
pub trait Recognize: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String>;
}

/// Writes the cropped CAPTCHA image of the current page to `dest`.
///
/// Implementations should report failures as
/// [`SolverError::Capture`](crate::SolverError::Capture).
#[async_trait]
pub trait CaptchaImageSource: Send + Sync {
    async fn capture(&self, dest: &Path) -> Result<()>;
}

pub struct ScreenshotSolver<R> {
    recognizer: R,
    dir: PathBuf,
}

impl<R: Recognize> ScreenshotSolver<R> {
    /// Temporary images go to the system temp directory.
    pub fn new(recognizer: R) -> Self {
        Self::with_dir(recognizer, std::env::temp_dir())
    }

    pub fn with_dir(recognizer: R, dir: impl Into<PathBuf>) -> Self {
        Self {
            recognizer,
            dir: dir.into(),
        }
    }

    /// Capture, recognize, clean up.
    ///
    /// The temporary image is removed whether or not recognition succeeds;
    /// the recognition outcome is returned unchanged.
    pub async fn solve(&self, source: &dyn CaptchaImageSource) -> Result<String> {
        let path = self.dir.join(format!("{}.png", uuid::Uuid::new_v4().simple()));

        let outcome = match source.capture(&path).await {
            Ok(()) => self.recognizer.recognize(&path).await,
            Err(e) => Err(e),
        };

        remove_image(&path).await;
        outcome
    }
}

async fn remove_image(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove captcha image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SolverError;
    use std::sync::Mutex;

    struct FakeSource;

    #[async_trait]
    impl CaptchaImageSource for FakeSource {
        async fn capture(&self, dest: &Path) -> Result<()> {
            tokio::fs::write(dest, b"\x89PNG").await?;
            Ok(())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl CaptchaImageSource for BrokenSource {
        async fn capture(&self, _dest: &Path) -> Result<()> {
            Err(SolverError::Capture("element not visible".into()))
        }
    }

    /// Records the path it was asked about and whether the file existed then.
    struct FakeRecognizer {
        answer: std::result::Result<String, String>,
        seen: Mutex<Option<(PathBuf, bool)>>,
    }

    impl FakeRecognizer {
        fn answering(answer: std::result::Result<&str, &str>) -> Self {
            Self {
                answer: answer.map(str::to_string).map_err(str::to_string),
                seen: Mutex::new(None),
            }
        }

        fn seen(&self) -> Option<(PathBuf, bool)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Recognize for FakeRecognizer {
        async fn recognize(&self, image_path: &Path) -> Result<String> {
            *self.seen.lock().unwrap() = Some((image_path.to_path_buf(), image_path.exists()));
            self.answer.clone().map_err(SolverError::Remote)
        }
    }

    #[tokio::test]
    async fn solve_returns_text_and_removes_image() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScreenshotSolver::with_dir(FakeRecognizer::answering(Ok("w7k2p")), dir.path());

        let text = solver.solve(&FakeSource).await.unwrap();

        assert_eq!(text, "w7k2p");
        let (path, existed) = solver.recognizer.seen().unwrap();
        assert!(existed);
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "png");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn solve_removes_image_when_recognition_fails() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScreenshotSolver::with_dir(
            FakeRecognizer::answering(Err("ERROR_CAPTCHA_UNSOLVABLE")),
            dir.path(),
        );

        let err = solver.solve(&FakeSource).await.unwrap_err();

        assert!(matches!(err, SolverError::Remote(ref m) if m == "ERROR_CAPTCHA_UNSOLVABLE"));
        let (path, _) = solver.recognizer.seen().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn capture_failure_skips_recognition() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScreenshotSolver::with_dir(FakeRecognizer::answering(Ok("x")), dir.path());

        let err = solver.solve(&BrokenSource).await.unwrap_err();

        assert!(matches!(err, SolverError::Capture(_)));
        assert!(solver.recognizer.seen().is_none());
    }

    #[tokio::test]
    async fn each_solve_uses_a_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScreenshotSolver::with_dir(FakeRecognizer::answering(Ok("x")), dir.path());

        solver.solve(&FakeSource).await.unwrap();
        let (first, _) = solver.recognizer.seen().unwrap();
        solver.solve(&FakeSource).await.unwrap();
        let (second, _) = solver.recognizer.seen().unwrap();

        assert_ne!(first, second);
    }
}
