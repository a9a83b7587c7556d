use crate::adb::client::{device_args, AdbRunner};
use crate::core::{RetrieveError, ToolError};
use bytes::Bytes;
use chrono::Local;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// An APK pulled from the device into its own staging directory.
///
/// The directory is deleted when this value (or the [`StagedDownload`] made
/// from it) is dropped.
#[derive(Debug)]
pub struct RetrievedPackageFile {
    staging: TempDir,
    local_path: PathBuf,
    file_name: String,
}

impl RetrievedPackageFile {
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Suggested download name, `<package_id>.apk`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    pub async fn open_stream(self) -> Result<StagedDownload, RetrieveError> {
        let file = File::open(&self.local_path)
            .await
            .map_err(RetrieveError::StreamingFailed)?;
        let len = file
            .metadata()
            .await
            .map_err(RetrieveError::StreamingFailed)?
            .len();
        Ok(StagedDownload {
            inner: ReaderStream::new(file),
            len,
            file_name: self.file_name,
            staging: self.staging,
        })
    }
}

/// Byte stream over a staged APK that owns its staging directory.
pub struct StagedDownload {
    // Declared before `staging` so the file handle closes before the directory is removed.
    inner: ReaderStream<File>,
    len: u64,
    file_name: String,
    staging: TempDir,
}

impl StagedDownload {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for StagedDownload {
    fn drop(&mut self) {
        debug!("removing staging dir {}", self.staging.path().display());
    }
}

impl Stream for StagedDownload {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

pub struct PackageRetriever {
    runner: Arc<dyn AdbRunner>,
}

impl PackageRetriever {
    pub fn new(runner: Arc<dyn AdbRunner>) -> Self {
        Self { runner }
    }

    pub async fn retrieve(
        &self,
        install_path: &str,
        package_id: &str,
    ) -> Result<RetrievedPackageFile, RetrieveError> {
        validate(install_path, package_id)?;

        let staging = tempfile::Builder::new()
            .prefix(&format!("apkpull-{}-", Local::now().format("%Y%m%d_%H%M%S")))
            .tempdir()
            .map_err(RetrieveError::Staging)?;
        let file_name = format!("{package_id}.apk");
        let local_path = staging.path().join(&file_name);
        let dest = local_path.to_string_lossy().into_owned();

        info!("pulling {} to {}", install_path, dest);
        let args = device_args(self.runner.as_ref(), &["pull", install_path, &dest]);
        match self.runner.run(&args).await {
            Ok(out) => debug!("adb pull: {}", out),
            Err(ToolError::ExecutionFailed { stderr, .. }) => {
                return Err(RetrieveError::PullFailed(stderr))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(RetrievedPackageFile {
            staging,
            local_path,
            file_name,
        })
    }
}

fn validate(install_path: &str, package_id: &str) -> Result<(), RetrieveError> {
    if install_path.is_empty() || package_id.is_empty() {
        return Err(RetrieveError::InvalidRequest("Missing package info"));
    }
    // Android package names only use `[A-Za-z0-9_.]`; anything else could escape
    // the staging dir or break the Content-Disposition header.
    let valid_chars = package_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid_chars || package_id.contains("..") {
        return Err(RetrieveError::InvalidRequest("Invalid package id"));
    }
    Ok(())
}
