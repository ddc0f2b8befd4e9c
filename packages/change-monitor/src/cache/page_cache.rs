//! URL-keyed page cache with a time-to-live.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// One cached page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.fetched_at <= ttl
    }
}

/// Page cache persisted as a single JSON map of `url -> entry`.
///
/// Single writer per process. Persistence is best-effort: a failed write is
/// logged and the in-memory map stays authoritative for the rest of the run.
pub struct PageCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    path: Option<PathBuf>,
}

impl PageCache {
    /// Default TTL: one weekly scan.
    pub const DEFAULT_TTL_HOURS: i64 = 168;

    /// File name used inside a cache directory.
    pub const FILE_NAME: &'static str = "page_cache.json";

    /// Open the cache backed by `path`, loading it if present.
    ///
    /// Expired entries are dropped on load. An unreadable or corrupt file
    /// is logged and the cache starts empty.
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entries = Self::load(&path, ttl);
        info!(path = %path.display(), entries = entries.len(), "Page cache loaded");

        Self {
            entries: RwLock::new(entries),
            ttl,
            path: Some(path),
        }
    }

    /// Open `page_cache.json` inside a cache directory.
    pub fn in_dir(dir: impl AsRef<Path>, ttl: Duration) -> Self {
        Self::open(dir.as_ref().join(Self::FILE_NAME), ttl)
    }

    /// Cache without durable storage.
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            path: None,
        }
    }

    fn load(path: &Path, ttl: Duration) -> HashMap<String, CacheEntry> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read page cache, starting empty");
                return HashMap::new();
            }
        };

        let mut entries: HashMap<String, CacheEntry> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt page cache, starting empty");
                return HashMap::new();
            }
        };

        let now = Utc::now();
        entries.retain(|_, entry| entry.is_fresh(ttl, now));
        entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Cached content for `url`, if still within the TTL.
    pub fn get(&self, url: &str) -> Option<String> {
        self.get_at(url, Utc::now())
    }

    /// Like [`get`](Self::get) with an explicit clock. Expired entries are
    /// evicted.
    pub fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<String> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(url) {
                None => return None,
                Some(entry) if entry.is_fresh(self.ttl, now) => {
                    debug!(url = %url, "Page cache hit");
                    return Some(entry.content.clone());
                }
                Some(_) => {}
            }
        }

        debug!(url = %url, "Page cache entry expired");
        self.entries.write().unwrap().remove(url);
        None
    }

    /// Store content for `url` and persist the cache.
    pub fn set(&self, url: &str, content: &str) {
        self.set_at(url, content, Utc::now());
    }

    pub fn set_at(&self, url: &str, content: &str, fetched_at: DateTime<Utc>) {
        self.entries.write().unwrap().insert(
            url.to_string(),
            CacheEntry {
                content: content.to_string(),
                fetched_at,
            },
        );
        self.persist();
    }

    /// Drop every entry and delete the backing file.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();

        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "Page cache cleared"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete page cache"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = self.write_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to persist page cache");
        }
    }

    fn write_file(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = {
            let entries = self.entries.read().unwrap();
            serde_json::to_string(&*entries)?
        };

        // Write-then-rename so a crash never leaves a truncated cache.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_respects_ttl() {
        let cache = PageCache::in_memory(Duration::hours(168));
        let fetched = Utc::now() - Duration::hours(200);
        cache.set_at("https://example.com/a", "old", fetched);

        assert_eq!(cache.get_at("https://example.com/a", fetched + Duration::hours(168)).as_deref(), Some("old"));
        assert_eq!(cache.get_at("https://example.com/a", fetched + Duration::hours(169)), None);
        // evicted
        assert!(cache.is_empty());
    }

    #[test]
    fn test_miss_has_no_side_effects() {
        let cache = PageCache::in_memory(Duration::hours(1));
        cache.set("https://example.com/a", "x");
        assert_eq!(cache.get("https://example.com/b"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let content = "  Förderung\r\n\t<b>100 €</b>\n\n";

        let cache = PageCache::in_dir(dir.path(), Duration::hours(168));
        cache.set("https://example.com/a", content);

        let reopened = PageCache::in_dir(dir.path(), Duration::hours(168));
        assert_eq!(reopened.get("https://example.com/a").as_deref(), Some(content));
    }

    #[test]
    fn test_open_drops_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::in_dir(dir.path(), Duration::hours(168));
        cache.set_at("https://example.com/old", "old", Utc::now() - Duration::days(30));
        cache.set("https://example.com/new", "new");

        let reopened = PageCache::in_dir(dir.path(), Duration::hours(168));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PageCache::FILE_NAME);
        std::fs::write(&path, "not json").unwrap();

        let cache = PageCache::open(&path, Duration::hours(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_removes_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PageCache::in_dir(dir.path().join("nested"), Duration::hours(1));
        cache.set("https://example.com/a", "x");
        let path = cache.path().unwrap().to_path_buf();
        assert!(path.exists());

        cache.clear();
        assert!(!path.exists());
        assert!(cache.get("https://example.com/a").is_none());
    }
}
