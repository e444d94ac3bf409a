//! Input resolution: turn user-supplied paths or URLs into [`UploadedFile`]s.
//!
//! Local files get a declared media type from their extension, the way an
//! upload widget would tag them. Downloads use the `Content-Type` header and
//! fall back to the URL's extension when the server sends something generic.
//! Resolution never looks inside the bytes: classification stays a matter
//! of declared type, and a mislabelled file fails later as a per-file error.

use crate::error::Scan2XlsxError;
use crate::output::UploadedFile;
use std::path::Path;
use tracing::{debug, info};

/// Media type given to files whose extension is not recognised.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Media type implied by a file name's extension.
pub fn media_type_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("txt") => "text/plain",
        _ => UNKNOWN_MEDIA_TYPE,
    }
}

/// Resolve every input in order. The first input that cannot be read
/// aborts resolution; no file has been processed at that point.
pub async fn resolve_inputs<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Result<Vec<UploadedFile>, Scan2XlsxError> {
    if inputs.is_empty() {
        return Err(Scan2XlsxError::NoInputs);
    }
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        files.push(resolve_input(input.as_ref(), timeout_secs).await?);
    }
    Ok(files)
}

/// Resolve one input string to an uploaded file.
///
/// If the input is a URL, download it. Otherwise read the local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadedFile, Scan2XlsxError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input)).await
    }
}

/// Read a local file, tagging it with the media type of its extension.
async fn resolve_local(path: &Path) -> Result<UploadedFile, Scan2XlsxError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Scan2XlsxError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Scan2XlsxError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ if path.is_dir() => Scan2XlsxError::InvalidInput {
            input: path.display().to_string(),
            reason: "is a directory".to_string(),
        },
        _ => Scan2XlsxError::InvalidInput {
            input: path.display().to_string(),
            reason: e.to_string(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let media_type = media_type_for_name(&name);

    debug!("Resolved local file: {} ({}, {} bytes)", path.display(), media_type, bytes.len());
    Ok(UploadedFile::new(name, media_type, bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedFile, Scan2XlsxError> {
    info!("Downloading: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Scan2XlsxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_error(url, timeout_secs, e))?;

    if !response.status().is_success() {
        return Err(Scan2XlsxError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = filename_from_url(url);
    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let media_type = choose_media_type(header_type.as_deref(), &name);

    // The client timeout covers the body too, so a stalled transfer
    // surfaces here rather than in `send()`.
    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(url, timeout_secs, e))?;

    info!("Downloaded {} ({}, {} bytes)", name, media_type, bytes.len());
    Ok(UploadedFile::new(name, media_type, bytes.to_vec()))
}

fn download_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> Scan2XlsxError {
    if e.is_timeout() {
        Scan2XlsxError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        Scan2XlsxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Prefer a usable `Content-Type`; fall back to the name's extension when
/// the server only says "bytes".
fn choose_media_type(header: Option<&str>, name: &str) -> String {
    match header {
        Some(h) if !is_generic_media_type(h) => h.to_string(),
        _ => media_type_for_name(name).to_string(),
    }
}

fn is_generic_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(UNKNOWN_MEDIA_TYPE)
        || essence.eq_ignore_ascii_case("binary/octet-stream")
        || essence.is_empty()
}

/// Extract a reasonable file name from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}
