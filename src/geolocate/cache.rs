//! Last-fix cache at ~/.mawqii/last_fix.json.
//!
//! TTL: 30 days. A stale file is ignored, not deleted.
//! Used as the auto-detection fallback when no fresh fix can be acquired.

use super::types::Location;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const CACHE_TTL_MS: i64 = 30 * 24 * 3600 * 1000; // 30 days in ms

#[derive(Serialize, Deserialize, Clone)]
struct CachedFix {
    lat: f64,
    lng: f64,
    #[serde(default)]
    accuracy: Option<f64>,
    timestamp: i64,
}

/// The last-known-fix cache.
pub struct LastFixCache {
    path: PathBuf,
    entry: Option<CachedFix>,
}

impl LastFixCache {
    /// Load from the default location (~/.mawqii/last_fix.json).
    pub fn load() -> Self {
        let path = Self::default_path();
        let entry = Self::read_file(&path);
        Self { path, entry }
    }

    /// Load from a specific path (for testing).
    pub fn load_from(path: PathBuf) -> Self {
        let entry = Self::read_file(&path);
        Self { path, entry }
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mawqii")
            .join("last_fix.json")
    }

    fn read_file(path: &PathBuf) -> Option<CachedFix> {
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// The last stored fix, or None if missing or expired.
    pub fn last_fix(&self) -> Option<Location> {
        let entry = self.entry.as_ref()?;
        let now = chrono::Utc::now().timestamp_millis();
        if now - entry.timestamp > CACHE_TTL_MS {
            return None; // expired
        }
        Some(Location {
            lat: entry.lat,
            lng: entry.lng,
            accuracy: entry.accuracy,
        })
    }

    /// Store a fix and persist to disk.
    pub fn put(&mut self, fix: &Location) {
        self.entry = Some(CachedFix {
            lat: fix.lat,
            lng: fix.lng,
            accuracy: fix.accuracy,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
        self.persist();
    }

    fn persist(&self) {
        let Some(entry) = &self.entry else {
            return;
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(entry) {
            let _ = fs::write(&self.path, json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn test_cache() -> (LastFixCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_fix.json");
        (LastFixCache::load_from(path), dir)
    }

    #[test]
    fn test_put_then_get() {
        let (mut cache, _dir) = test_cache();
        cache.put(&Location::with_accuracy(24.7136, 46.6753, 5.0));

        let fix = cache.last_fix().unwrap();
        assert_relative_eq!(fix.lat, 24.7136);
        assert_relative_eq!(fix.lng, 46.6753);
        assert_relative_eq!(fix.accuracy.unwrap(), 5.0);
    }

    #[test]
    fn test_empty_cache_miss() {
        let (cache, _dir) = test_cache();
        assert!(cache.last_fix().is_none());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_fix.json");

        {
            let mut cache = LastFixCache::load_from(path.clone());
            cache.put(&Location::new(59.3293, 18.0686));
        }

        let cache = LastFixCache::load_from(path);
        let fix = cache.last_fix().unwrap();
        assert_relative_eq!(fix.lat, 59.3293);
        assert!(fix.accuracy.is_none());
    }

    #[test]
    fn test_expired_entry_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_fix.json");
        let stale = r#"{
            "lat": 10.0,
            "lng": 20.0,
            "timestamp": 0
        }"#;
        fs::write(&path, stale).unwrap();

        let cache = LastFixCache::load_from(path);
        assert!(cache.last_fix().is_none());
    }
}
