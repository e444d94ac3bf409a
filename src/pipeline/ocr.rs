//! OCR engine boundary.
//!
//! [`OcrEngine`] is the seam between the pipeline and whatever recognises
//! text. The default [`TesseractEngine`] shells out to the `tesseract`
//! executable, one process per image:
//!
//! ```text
//! <tesseract> /tmp/ocr-XXXX.png stdout [-l <lang>]
//! ```
//!
//! The executable location is injected through
//! [`crate::config::ExtractionConfig::tesseract_path`]; nothing here touches
//! `PATH` or any other process-wide state.

use crate::config::ExtractionConfig;
use crate::error::{FileError, Scan2XlsxError};
use crate::pipeline::encode::encode_png;
use image::DynamicImage;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Recognises the text in one in-memory raster image.
///
/// Implementations must be `Send + Sync`: the batch runs each file on
/// tokio's blocking pool. Errors are reported as [`FileError::Ocr`] with no
/// page; the PDF extractor tags the page itself.
pub trait OcrEngine: Send + Sync {
    /// Short engine identifier used in logs.
    fn name(&self) -> &'static str;

    /// Return the raw (not yet normalised) text of `image`.
    fn recognize(&self, image: &DynamicImage) -> Result<String, FileError>;
}

/// Runs the `tesseract` command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    language: Option<String>,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            language: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            program: config.tesseract_path.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.ocr_timeout_secs),
        }
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run `tesseract --version` and return its first output line.
    ///
    /// Lets callers fail fast before a batch starts instead of recording the
    /// same "not found" error against every file.
    pub fn check_available(&self) -> Result<String, Scan2XlsxError> {
        let output = std::process::Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| {
                Scan2XlsxError::OcrEngineUnavailable(format!(
                    "cannot run '{}': {e}",
                    self.program.display()
                ))
            })?;

        // Older tesseract releases print the version banner on stderr.
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        Ok(banner.lines().next().unwrap_or_default().trim().to_string())
    }

    fn build_command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image_path).arg("stdout");
        if let Some(ref lang) = self.language {
            cmd.arg("-l").arg(lang);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C reaches the batch (which
        // cancels between files) but not the page being recognised.
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    async fn run(&self, image_path: &Path) -> Result<String, String> {
        let start = Instant::now();
        let child = self.build_command(image_path).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                format!("tesseract executable not found at '{}'", self.program.display())
            } else {
                format!("failed to start '{}': {e}", self.program.display())
            }
        })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("failed waiting for tesseract: {e}")),
            // The dropped future owns the child; kill_on_drop ends it.
            Err(_) => {
                return Err(format!(
                    "tesseract timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        debug!(
            "tesseract finished in {}ms ({} bytes)",
            start.elapsed().as_millis(),
            output.stdout.len()
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Drive `fut` to completion from synchronous code.
///
/// Inside the batch this runs on a `spawn_blocking` thread and reuses the
/// caller's runtime; standalone callers get a private current-thread one.
fn block_on<F: Future>(fut: F) -> Result<F::Output, String> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(fut)),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(|rt| rt.block_on(fut))
            .map_err(|e| format!("failed to start OCR runtime: {e}")),
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, FileError> {
        let ocr_err = |detail: String| FileError::Ocr { page: None, detail };

        let png = encode_png(image).map_err(|e| ocr_err(format!("PNG encoding failed: {e}")))?;

        let mut tmp = tempfile::Builder::new()
            .prefix("ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ocr_err(format!("tempfile: {e}")))?;
        tmp.write_all(&png)
            .and_then(|_| tmp.flush())
            .map_err(|e| ocr_err(format!("tempfile write: {e}")))?;

        // `tmp` is deleted when it goes out of scope, after tesseract exits.
        block_on(self.run(tmp.path()))
            .and_then(|r| r)
            .map_err(ocr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_copies_engine_settings() {
        let config = ExtractionConfig::builder()
            .tesseract_path("/opt/tess/bin/tesseract")
            .language("eng+deu")
            .ocr_timeout_secs(9)
            .build()
            .unwrap();
        let engine = TesseractEngine::from_config(&config);
        assert_eq!(engine.program(), Path::new("/opt/tess/bin/tesseract"));
        assert_eq!(engine.language.as_deref(), Some("eng+deu"));
        assert_eq!(engine.timeout, Duration::from_secs(9));
    }

    #[test]
    fn command_line_includes_language_only_when_set() {
        let engine = TesseractEngine::new("tesseract");
        let cmd = engine.build_command(Path::new("/tmp/page.png"));
        let args: Vec<_> = cmd.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["/tmp/page.png", "stdout"]);

        let engine = engine.with_language("fra");
        let cmd = engine.build_command(Path::new("/tmp/page.png"));
        let args: Vec<_> = cmd.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["/tmp/page.png", "stdout", "-l", "fra"]);
    }

    #[test]
    fn missing_executable_is_an_ocr_error() {
        let engine = TesseractEngine::new("/definitely/not/a/real/tesseract");
        let err = engine
            .recognize(&DynamicImage::new_rgb8(4, 4))
            .expect_err("should fail");
        match err {
            FileError::Ocr { page, detail } => {
                assert_eq!(page, None);
                assert!(detail.contains("not found"), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_executable_is_unavailable() {
        let engine = TesseractEngine::new("/definitely/not/a/real/tesseract");
        assert!(matches!(
            engine.check_available(),
            Err(Scan2XlsxError::OcrEngineUnavailable(_))
        ));
    }

    /// Script tests run one at a time: exec'ing a script while another
    /// thread still has it open for writing fails with ETXTBSY.
    #[cfg(unix)]
    fn serial() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install `body` as an executable stand-in for tesseract.
    #[cfg(unix)]
    fn fake_tesseract(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn stdout_is_returned_raw() {
        let _serial = serial();
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(dir.path(), "printf 'Hello\\n\\nWorld\\n'"));
        let text = engine.recognize(&DynamicImage::new_rgb8(4, 4)).unwrap();
        assert_eq!(text, "Hello\n\nWorld\n");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_carries_stderr() {
        let _serial = serial();
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(
            dir.path(),
            "echo 'Error in pixReadStream' >&2\nexit 3",
        ));
        match engine.recognize(&DynamicImage::new_rgb8(4, 4)).unwrap_err() {
            FileError::Ocr { page, detail } => {
                assert_eq!(page, None);
                assert!(detail.contains("Error in pixReadStream"), "got: {detail}");
                assert!(detail.contains('3'), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn slow_engine_is_killed_at_timeout() {
        let _serial = serial();
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(dir.path(), "exec sleep 10"))
            .with_timeout(Duration::from_secs(1));

        let start = Instant::now();
        let err = engine.recognize(&DynamicImage::new_rgb8(4, 4)).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(5));
        match err {
            FileError::Ocr { detail, .. } => assert!(detail.contains("timed out"), "got: {detail}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn terminal_interrupt_does_not_reach_the_engine() {
        // The engine signals its whole process group, the way a terminal
        // Ctrl-C would. That group must not contain this process, and the
        // engine shields itself only from its own signal.
        let _serial = serial();
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(
            dir.path(),
            "trap '' INT\nkill -INT 0\necho still here",
        ));
        let text = engine.recognize(&DynamicImage::new_rgb8(4, 4)).unwrap();
        assert_eq!(text.trim(), "still here");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn engine_leads_its_own_process_group() {
        let _serial = serial();
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(
            dir.path(),
            "echo \"$$ $(cut -d' ' -f5 /proc/$$/stat)\"",
        ));
        let out = engine.recognize(&DynamicImage::new_rgb8(4, 4)).unwrap();
        let ids: Vec<&str> = out.split_whitespace().collect();
        assert_eq!(ids.len(), 2, "got: {out:?}");
        assert_eq!(ids[0], ids[1], "pid and pgid differ: {out:?}");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn recognize_runs_on_the_blocking_pool() {
        let _serial = serial();
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(dir.path(), "echo pooled"));
        let text = tokio::task::spawn_blocking(move || engine.recognize(&DynamicImage::new_rgb8(4, 4)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "pooled\n");
    }
}
