use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::field::{self, Empty};
use tracing::{instrument, Span};
use url::Url;

use crate::fetch::BodyStream;
use crate::FetchError;

const TEMP_PREFIX: &str = "harvester-dl-";
/// Leading bytes handed to signature sniffing.
const SNIFF_WINDOW: u64 = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    #[error("could not create download file in {dir}: {message}")]
    Create { dir: String, message: String },
    #[error("failed reading response body: {0}")]
    Body(FetchError),
    #[error("failed writing download: {0}")]
    Write(String),
    #[error("could not read back downloaded file: {0}")]
    Read(String),
    #[error("unrecognized file signature")]
    UnknownType,
    #[error("could not rename download to {target}: {message}")]
    Rename { target: String, message: String },
}

/// File type determined from the leading bytes of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedType {
    pub mime_type: String,
    pub extension: String,
}

/// A response body written to local storage for inspection.
///
/// The file stays on disk until [`Download::delete`] is called.
#[derive(Debug)]
pub struct Download {
    source_url: Url,
    local_path: Option<PathBuf>,
    detected_type: Option<DetectedType>,
    download_error: Option<DownloadError>,
    type_error: Option<DownloadError>,
}

impl Download {
    fn new(source_url: Url) -> Self {
        Self {
            source_url,
            local_path: None,
            detected_type: None,
            download_error: None,
            type_error: None,
        }
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn detected_type(&self) -> Option<&DetectedType> {
        self.detected_type.as_ref()
    }

    pub fn download_error(&self) -> Option<&DownloadError> {
        self.download_error.as_ref()
    }

    /// Sniffing or renaming failure.
    pub fn type_error(&self) -> Option<&DownloadError> {
        self.type_error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.download_error.is_none() && self.type_error.is_none()
    }

    /// Removes the downloaded file. Returns whether a file was removed;
    /// calling it again is harmless.
    pub fn delete(&self) -> io::Result<bool> {
        let Some(path) = self.local_path.as_deref() else {
            return Ok(false);
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Streams response bodies into uniquely named files under one directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    dir: PathBuf,
}

impl Downloader {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[instrument(
        name = "download",
        level = "debug",
        skip_all,
        fields(
            url = %url,
            downloaded_as = Empty,
            bytes = Empty,
            detected_type = Empty,
            final_path = Empty,
            error = Empty
        )
    )]
    pub async fn download(&self, url: &Url, body: BodyStream) -> Download {
        let span = Span::current();
        let mut download = Download::new(url.clone());

        let (file, path) = match self.create_file() {
            Ok(created) => created,
            Err(err) => {
                span.record("error", field::display(&err));
                engine_warn!("Download of {} failed: {}", url, err);
                download.download_error = Some(err);
                return download;
            }
        };
        span.record("downloaded_as", field::display(path.display()));
        download.local_path = Some(path.clone());

        match write_body(file, body).await {
            Ok(written) => {
                span.record("bytes", written);
            }
            Err(err) => {
                span.record("error", field::display(&err));
                engine_warn!("Download of {} failed: {}", url, err);
                download.download_error = Some(err);
                return download;
            }
        }

        let detected = match sniff_file_type(&path) {
            Ok(detected) => detected,
            Err(err) => {
                span.record("error", field::display(&err));
                engine_warn!("Could not determine file type of {:?}: {}", path, err);
                download.type_error = Some(err);
                return download;
            }
        };
        span.record("detected_type", detected.mime_type.as_str());

        let renamed = path.with_extension(&detected.extension);
        match fs::rename(&path, &renamed) {
            Ok(()) => {
                span.record("final_path", field::display(renamed.display()));
                engine_debug!("Downloaded {} to {:?} ({})", url, renamed, detected.mime_type);
                download.local_path = Some(renamed);
            }
            Err(err) => {
                let err = DownloadError::Rename {
                    target: renamed.display().to_string(),
                    message: err.to_string(),
                };
                span.record("error", field::display(&err));
                engine_warn!("{}", err);
                download.type_error = Some(err);
            }
        }
        download.detected_type = Some(detected);
        download
    }

    fn create_file(&self) -> Result<(fs::File, PathBuf), DownloadError> {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .and_then(|tmp| tmp.keep().map_err(|err| err.error))
            .map_err(|err| DownloadError::Create {
                dir: self.dir.display().to_string(),
                message: err.to_string(),
            })
    }
}

async fn write_body(file: fs::File, mut body: BodyStream) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::from_std(file);
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(DownloadError::Body)?;
        file.write_all(&chunk)
            .await
            .map_err(|err| DownloadError::Write(err.to_string()))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|err| DownloadError::Write(err.to_string()))?;
    Ok(written)
}

/// Determines the file type from the leading bytes only; the declared
/// Content-Type is not consulted.
pub fn sniff_file_type(path: &Path) -> Result<DetectedType, DownloadError> {
    let file = fs::File::open(path).map_err(|err| DownloadError::Read(err.to_string()))?;
    let mut head = Vec::with_capacity(SNIFF_WINDOW as usize);
    file.take(SNIFF_WINDOW)
        .read_to_end(&mut head)
        .map_err(|err| DownloadError::Read(err.to_string()))?;

    infer::get(&head)
        .map(|kind| DetectedType {
            mime_type: kind.mime_type().to_string(),
            extension: kind.extension().to_string(),
        })
        .ok_or(DownloadError::UnknownType)
}
