use crate::error::{Result, WebcamError};
use crate::platform::{Artifact, ObjectUrl, ObjectUrls};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Receives a download request for an object URL, like an anchor click.
#[async_trait]
pub trait DownloadTarget: Send + Sync {
    async fn download(&self, href: &ObjectUrl, file_name: &str) -> Result<()>;
}

fn resolve(urls: &ObjectUrls, href: &ObjectUrl) -> Result<Artifact> {
    urls.resolve(href).ok_or_else(|| {
        WebcamError::component("download", &format!("object URL {} is not live", href))
    })
}

/// Writes downloads into a directory.
///
/// Existing files are never overwritten; a ` (n)` suffix is added instead.
pub struct DirectoryDownloads {
    dir: PathBuf,
    urls: Arc<ObjectUrls>,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>, urls: Arc<ObjectUrls>) -> Self {
        Self {
            dir: dir.into(),
            urls,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn unique_path(&self, file_name: &str) -> PathBuf {
        let mut candidate = self.dir.join(file_name);
        let mut n = 1;
        while fs::try_exists(&candidate).await.unwrap_or(false) {
            candidate = self.dir.join(format!("{} ({})", file_name, n));
            n += 1;
        }
        candidate
    }
}

#[async_trait]
impl DownloadTarget for DirectoryDownloads {
    async fn download(&self, href: &ObjectUrl, file_name: &str) -> Result<()> {
        let artifact = resolve(&self.urls, href)?;

        fs::create_dir_all(&self.dir).await?;
        let path = self.unique_path(file_name).await;
        fs::write(&path, artifact.data()).await?;

        debug!("Wrote {} bytes to {}", artifact.len(), path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub file_name: String,
    pub artifact: Artifact,
}

/// Keeps downloads in memory, for tests and dry runs.
pub struct MemoryDownloads {
    urls: Arc<ObjectUrls>,
    saved: Mutex<Vec<SavedFile>>,
}

impl MemoryDownloads {
    pub fn new(urls: Arc<ObjectUrls>) -> Self {
        Self {
            urls,
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn saved(&self) -> Vec<SavedFile> {
        self.saved.lock().clone()
    }

    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.saved
            .lock()
            .iter()
            .filter(|file| file.file_name.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl DownloadTarget for MemoryDownloads {
    async fn download(&self, href: &ObjectUrl, file_name: &str) -> Result<()> {
        let artifact = resolve(&self.urls, href)?;
        self.saved.lock().push(SavedFile {
            file_name: file_name.to_string(),
            artifact,
        });
        Ok(())
    }
}
