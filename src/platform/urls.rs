use super::Artifact;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;
use uuid::Uuid;

/// `blob:` style handle to an artifact held by [`ObjectUrls`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live object URLs.
///
/// Every URL created here keeps its artifact alive until it is revoked.
#[derive(Default)]
pub struct ObjectUrls {
    entries: Mutex<HashMap<ObjectUrl, Artifact>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, artifact: Artifact) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:webcam-app/{}", Uuid::new_v4()));
        trace!("Created object URL {} ({} bytes)", url, artifact.len());
        self.entries.lock().insert(url.clone(), artifact);
        url
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<Artifact> {
        self.entries.lock().get(url).cloned()
    }

    /// Revoking an unknown or already revoked URL is a no-op
    pub fn revoke(&self, url: &ObjectUrl) {
        if self.entries.lock().remove(url).is_some() {
            trace!("Revoked object URL {}", url);
        }
    }

    /// Number of URLs not yet revoked
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}
