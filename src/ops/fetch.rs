//! Source acquisition.
//!
//! The archive is cached by file name: once `<name>-<version>.tar.gz` exists
//! in the source directory it is never downloaded again. The extracted tree
//! is thrown away and unpacked again on every run so each build starts clean.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use tar::Archive;
use tempfile::NamedTempFile;
use url::Url;

use crate::core::config::SourceSpec;
use crate::core::layout::Layout;
use crate::ops::errors::DownloadError;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::hash::sha256_file;

/// Transfers a URL's body into a writer.
pub trait Downloader {
    /// Stream `url` into `dest`, returning the number of bytes written.
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64, DownloadError>;
}

/// Downloads over HTTP(S) with a progress bar on stderr.
#[derive(Debug, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64, DownloadError> {
        let transfer = |source: Box<dyn std::error::Error + Send + Sync>| DownloadError::Transfer {
            url: url.to_string(),
            source,
        };

        // Large archives on slow links must not hit reqwest's default timeout.
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| transfer(Box::new(e)))?;

        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| transfer(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let pb = match response.content_length() {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner} {msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        pb.set_message("Downloading");

        let written = io::copy(&mut pb.wrap_read(response), dest).map_err(|e| transfer(Box::new(e)))?;
        pb.finish_and_clear();

        Ok(written)
    }
}

/// A source tree ready to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    /// Cached archive
    pub archive: PathBuf,

    /// Freshly extracted source tree
    pub tree: PathBuf,

    /// Whether the archive was downloaded during this call
    pub downloaded: bool,
}

/// Make sure the archive is present, verify it, and unpack a clean tree.
pub fn fetch_source(
    downloader: &dyn Downloader,
    source: &SourceSpec,
    layout: &Layout,
) -> Result<FetchedSource, DownloadError> {
    let archive = layout.archive_path(source);

    let downloaded = if archive.is_file() {
        tracing::info!("Using cached {}", archive.display());
        false
    } else {
        let url = source_url(source)?;
        tracing::info!("Downloading {}", url);
        download_to(downloader, &url, &archive)?;
        true
    };

    if let Some(expected) = &source.sha256 {
        verify_checksum(&archive, expected)?;
    }

    let tree = layout.source_tree(source);
    extract_source(&archive, layout.src_dir(), &tree)?;

    Ok(FetchedSource {
        archive,
        tree,
        downloaded,
    })
}

/// Unpack `archive` into `dest`, replacing any previous `tree`.
///
/// `tree` is the directory the archive is expected to create.
pub fn extract_source(archive: &Path, dest: &Path, tree: &Path) -> Result<(), DownloadError> {
    let extract_err = |source: io::Error| DownloadError::Extract {
        archive: archive.to_path_buf(),
        source,
    };

    remove_dir_all_if_exists(tree).map_err(extract_err)?;

    let file = File::open(archive).map_err(extract_err)?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_mtime(true);
    tar.unpack(dest).map_err(extract_err)?;

    if !tree.is_dir() {
        return Err(DownloadError::MissingSourceTree {
            path: tree.to_path_buf(),
        });
    }

    tracing::debug!("Extracted {} to {}", archive.display(), tree.display());
    Ok(())
}

fn source_url(source: &SourceSpec) -> Result<Url, DownloadError> {
    source.download_url().map_err(|e| DownloadError::InvalidUrl {
        url: source.resolved_url(),
        source: e,
    })
}

/// Download into a temporary file next to `archive` and move it into place
/// only once complete, so a failed transfer never populates the cache.
fn download_to(downloader: &dyn Downloader, url: &Url, archive: &Path) -> Result<(), DownloadError> {
    let dir = archive.parent().unwrap_or_else(|| Path::new("."));
    let io_err = |source: io::Error| DownloadError::Io {
        path: archive.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    let bytes = downloader.download(url, tmp.as_file_mut())?;
    tmp.as_file_mut().flush().map_err(io_err)?;
    tmp.persist(archive).map_err(|e| io_err(e.error))?;

    tracing::info!("Downloaded {} ({} bytes)", archive.display(), bytes);
    Ok(())
}

fn verify_checksum(archive: &Path, expected: &str) -> Result<(), DownloadError> {
    let actual = sha256_file(archive).map_err(|source| DownloadError::Io {
        path: archive.to_path_buf(),
        source,
    })?;

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(DownloadError::ChecksumMismatch {
            path: archive.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }

    tracing::debug!("Checksum verified: {}", &actual[..16]);
    Ok(())
}
