//! CLI binary for scan2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs the batch and writes the spreadsheet.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2xlsx::pipeline::input::resolve_inputs;
use scan2xlsx::{
    process_batch, write_xlsx, BatchOutput, BatchProgressCallback, Extraction, ExtractionConfig,
    Extractor, FileError, FileKind, PdfiumRasterizer, ProgressCallback, TesseractEngine,
    UploadedFile, OUTPUT_FILE_NAME,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one ✓/✗ line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-file wall-clock start times, keyed by upload index.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("OCR");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed(&self, index: usize) -> String {
        let ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        format!("{:.1}s", ms as f64 / 1000.0)
    }

    fn println(&self, line: String) {
        self.bar.println(line);
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting text from {total_files} files…"))
        ));
    }

    fn on_file_start(&self, index: usize, _total: usize, name: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, extraction: &Extraction) {
        let elapsed = self.elapsed(index);
        let pages = if extraction.page_count == 1 {
            "1 page".to_string()
        } else {
            format!("{} pages", extraction.page_count)
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            green("✓"),
            index + 1,
            total,
            name,
            dim(&format!("{pages}, {} chars", extraction.text.chars().count())),
            dim(&elapsed),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, name: &str, error: &FileError) {
        let elapsed = self.elapsed(index);

        // Truncate very long error messages to keep output tidy.
        let msg = error.to_string();
        let msg = match msg.char_indices().nth(80) {
            Some((cut, _)) => format!("{}\u{2026}", &msg[..cut]),
            None => msg,
        };

        let mark = if error.is_skip() { yellow("–") } else { red("✗") };
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            mark,
            index + 1,
            total,
            name,
            red(&msg),
            dim(&elapsed),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} files extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files extracted  ({} without text)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a few scans into output.xlsx
  scan2xlsx receipt.jpg invoice.pdf page.png

  # Choose the output file and tesseract language
  scan2xlsx --lang deu -o belege.xlsx scans/*.pdf

  # Download inputs, keep page previews
  scan2xlsx https://example.com/scan.pdf --preview-dir previews/

  # JSON report on stdout, non-zero exit if anything failed
  scan2xlsx --json --fail-on-error *.png > report.json

SUPPORTED INPUTS:
  image/jpeg, image/png (.jpg .jpeg .png)   OCR'd directly
  application/pdf (.pdf)                    every page rendered, then OCR'd
  anything else                             row with an [ERROR] marker

OUTPUT:
  One worksheet "OCR Results" with the columns "File Name" and
  "Extracted Text", one row per input, in input order.

ENVIRONMENT VARIABLES:
  RUST_LOG                 Override log filter (e.g. scan2xlsx=debug)
  SCAN2XLSX_*              Every option has an env twin, e.g. SCAN2XLSX_LANG

SETUP:
  Install tesseract (plus language data) and a pdfium shared library.
  Use --tesseract and --pdfium-lib-dir when they are not on the default
  search paths.
"#;

/// OCR scanned images and PDFs into a spreadsheet.
#[derive(Parser, Debug)]
#[command(
    name = "scan2xlsx",
    version,
    about = "OCR scanned images and PDFs into an .xlsx spreadsheet",
    long_about = "Extract text from JPEG/PNG images and PDF documents (local files or URLs) \
with tesseract and write one spreadsheet row per input: the file name and its extracted text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local files or HTTP/HTTPS URLs, processed in the given order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Spreadsheet to write.
    #[arg(short, long, env = "SCAN2XLSX_OUTPUT", default_value = OUTPUT_FILE_NAME)]
    output: PathBuf,

    /// PDF rendering DPI (72–600).
    #[arg(long, env = "SCAN2XLSX_DPI", default_value_t = scan2xlsx::config::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "SCAN2XLSX_LANG")]
    lang: Option<String>,

    /// Tesseract executable.
    #[arg(long, env = "SCAN2XLSX_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "SCAN2XLSX_PDFIUM_LIB_DIR")]
    pdfium_lib_dir: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SCAN2XLSX_PASSWORD")]
    password: Option<String>,

    /// Per-image tesseract timeout in seconds.
    #[arg(long, env = "SCAN2XLSX_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SCAN2XLSX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Write a PNG preview (first page for PDFs) of every extracted file here.
    #[arg(long, env = "SCAN2XLSX_PREVIEW_DIR")]
    preview_dir: Option<PathBuf>,

    /// Print each file's extracted text to stdout.
    #[arg(long, env = "SCAN2XLSX_SHOW_TEXT", conflicts_with = "json")]
    show_text: bool,

    /// Print the batch report as JSON to stdout.
    #[arg(long, env = "SCAN2XLSX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCAN2XLSX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCAN2XLSX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCAN2XLSX_QUIET")]
    quiet: bool,

    /// Exit with status 1 when any file produced no text.
    #[arg(long, env = "SCAN2XLSX_FAIL_ON_ERROR")]
    fail_on_error: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the per-file feedback; library INFO logs
    // would only interleave with it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve inputs ───────────────────────────────────────────────────
    let files = resolve_inputs(&cli.inputs, cli.download_timeout)
        .await
        .context("Failed to read inputs")?;

    // ── Build config ─────────────────────────────────────────────────────
    let cancel = Arc::new(AtomicBool::new(false));
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };

    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
        cancel.clone(),
    )?;

    // ── Check engines ────────────────────────────────────────────────────
    // Only the engines this batch actually needs.
    check_engines(&files, &config)?;

    // ── Ctrl-C → cooperative cancellation ───────────────────────────────
    {
        let cancel = cancel.clone();
        let progress = progress.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
                let msg = format!(
                    "{} Interrupted; finishing the current file, the rest are marked cancelled",
                    yellow("■")
                );
                match progress {
                    Some(cb) => cb.println(msg),
                    None => eprintln!("{msg}"),
                }
            }
        });
    }

    // ── Run batch ────────────────────────────────────────────────────────
    let extractor = Extractor::from_config(&config);
    let output = process_batch(files, &extractor, &config)
        .await
        .context("Batch failed")?;

    write_xlsx(&output.table, &cli.output)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    if let Some(ref dir) = cli.preview_dir {
        write_previews(&output, dir)
            .await
            .with_context(|| format!("Failed to write previews to {}", dir.display()))?;
    }

    if cli.show_text {
        for report in &output.reports {
            println!("── {} ──", report.file_name);
            println!("{}", report.cell_text());
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output.summary())
            .context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&output, &cli.output, show_progress);
    }

    if cli.fail_on_error && output.stats.unsuccessful() > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: Arc<AtomicBool>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .tesseract_path(&cli.tesseract)
        .ocr_timeout_secs(cli.ocr_timeout)
        .download_timeout_secs(cli.download_timeout)
        .cancel_flag(cancel);

    if let Some(ref lang) = cli.lang {
        builder = builder.language(lang);
    }
    if let Some(ref dir) = cli.pdfium_lib_dir {
        builder = builder.pdfium_lib_dir(dir);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Fail fast when tesseract or pdfium is missing but some input needs it.
fn check_engines(files: &[UploadedFile], config: &ExtractionConfig) -> Result<()> {
    let needs_ocr = files.iter().any(|f| f.kind() != FileKind::Unsupported);
    let needs_pdfium = files.iter().any(|f| f.kind() == FileKind::Pdf);

    if needs_ocr {
        let version = TesseractEngine::from_config(config)
            .check_available()
            .context("tesseract is required to extract text")?;
        tracing::debug!("Using {}", version);
    }
    if needs_pdfium {
        PdfiumRasterizer::from_config(config)
            .check_available()
            .context("pdfium is required to render PDF pages")?;
    }
    Ok(())
}

/// Save `<index>-<name>.png` for every file that produced a preview.
async fn write_previews(output: &BatchOutput, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    for report in &output.reports {
        if let Ok(ref extraction) = report.outcome {
            let png = scan2xlsx::pipeline::encode::encode_png(&extraction.preview)
                .with_context(|| format!("Failed to encode preview of {}", report.file_name))?;
            let path = dir.join(format!("{:03}-{}.png", report.index + 1, report.file_name));
            tokio::fs::write(&path, png)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }
    Ok(())
}

/// End-of-run summary on stderr, listing every file without text.
fn print_summary(output: &BatchOutput, path: &Path, show_progress: bool) {
    let stats = &output.stats;

    // The progress callback already printed its own tally line.
    if !show_progress {
        eprintln!(
            "Extracted {}/{} files ({} pages) in {}ms",
            stats.succeeded, stats.total_files, stats.total_pages, stats.total_duration_ms
        );
    }

    let failures = output.failures();
    if !failures.is_empty() {
        eprintln!("{}", bold("Files without text:"));
        for (name, err) in failures {
            eprintln!("  {} {}  {}", red("✗"), name, dim(&err.to_string()));
        }
    }

    eprintln!(
        "{}  {} rows  →  {}",
        if stats.unsuccessful() == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        output.table.len(),
        bold(&path.display().to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn show_text_and_json_cannot_share_stdout() {
        let err = Cli::try_parse_from(["scan2xlsx", "--json", "--show-text", "a.png"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        assert!(Cli::try_parse_from(["scan2xlsx", "--json", "a.png"]).is_ok());
        assert!(Cli::try_parse_from(["scan2xlsx", "--show-text", "a.png"]).is_ok());
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["scan2xlsx", "a.png", "b.pdf"]).unwrap();
        assert_eq!(cli.inputs, ["a.png", "b.pdf"]);
        assert_eq!(cli.output, PathBuf::from(OUTPUT_FILE_NAME));
        assert_eq!(cli.dpi, scan2xlsx::config::DEFAULT_DPI);
    }
}
