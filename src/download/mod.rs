//! Client-side saving of captured artifacts under timestamped names.

mod targets;

pub use targets::{DirectoryDownloads, DownloadTarget, MemoryDownloads, SavedFile};

use crate::platform::{Artifact, ObjectUrls};
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

/// `YYYYMMDD_HHMMSS`, zero padded
pub fn format_timestamp<T: TimeZone>(instant: &DateTime<T>) -> String
where
    T::Offset: Display,
{
    instant.format("%Y%m%d_%H%M%S").to_string()
}

/// Resolve a configured timezone; `None` or an unknown name means local time
pub(crate) fn resolve_timestamp_timezone(tz_name: Option<&str>) -> Option<Tz> {
    let name = tz_name?;
    match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            warn!(
                "Invalid timestamp timezone '{}', falling back to local time",
                name
            );
            None
        }
    }
}

/// Hands artifacts to a [`DownloadTarget`] through a transient object URL.
pub struct DownloadSink {
    urls: Arc<ObjectUrls>,
    target: Arc<dyn DownloadTarget>,
    timezone: Option<Tz>,
}

impl DownloadSink {
    pub fn new(
        urls: Arc<ObjectUrls>,
        target: Arc<dyn DownloadTarget>,
        timezone: Option<&str>,
    ) -> Self {
        Self {
            urls,
            target,
            timezone: resolve_timestamp_timezone(timezone),
        }
    }

    /// File name for an artifact saved at `now`
    pub fn file_name(&self, prefix: &str, now: DateTime<Utc>) -> String {
        let stamp = match self.timezone {
            Some(tz) => format_timestamp(&now.with_timezone(&tz)),
            None => format_timestamp(&now.with_timezone(&Local)),
        };
        format!("{}{}", prefix, stamp)
    }

    /// Save `artifact` as `prefix + timestamp`; returns the file name used
    pub async fn save(&self, artifact: &Artifact, prefix: &str) -> String {
        self.save_at(artifact, prefix, Utc::now()).await
    }

    pub async fn save_at(&self, artifact: &Artifact, prefix: &str, now: DateTime<Utc>) -> String {
        let file_name = self.file_name(prefix, now);
        let url = self.urls.create(artifact.clone());

        // The save is fire-and-forget; the URL goes away either way
        match self.target.download(&url, &file_name).await {
            Ok(()) => info!(
                "Saved {} ({}, {} bytes)",
                file_name,
                artifact.mime_type(),
                artifact.len()
            ),
            Err(e) => warn!("Download of {} failed: {}", file_name, e),
        }
        self.urls.revoke(&url);

        file_name
    }
}
