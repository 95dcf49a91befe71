//! Persistence of the "most recently added" watermark
//!
//! The watermark is the only state the monitor keeps across restarts. It is
//! stored as `{"mostRecentlyAddedAt": <seconds or null>}`.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Boundary between already announced and new library items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Watermark {
    /// No poll has completed yet
    #[default]
    Uninitialized,
    /// `addedAt` of the newest item seen so far
    At(i64),
}

impl Watermark {
    pub fn value(&self) -> Option<i64> {
        match self {
            Watermark::Uninitialized => None,
            Watermark::At(at) => Some(*at),
        }
    }

    /// Whether `added_at` is strictly newer than this watermark
    pub fn is_before(&self, added_at: i64) -> bool {
        match self {
            Watermark::Uninitialized => true,
            Watermark::At(at) => added_at > *at,
        }
    }
}

impl From<Option<i64>> for Watermark {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Watermark::Uninitialized, Watermark::At)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWatermark {
    most_recently_added_at: Option<i64>,
}

/// Where the watermark lives between runs
///
/// Implementations may block; the detector calls `save` from the blocking
/// thread pool.
pub trait WatermarkStore: Send + Sync {
    fn load(&self) -> Result<Watermark, StoreError>;
    fn save(&self, watermark: Watermark) -> Result<(), StoreError>;
}

/// Keeps the watermark in memory only
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<Watermark>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(watermark: Watermark) -> Self {
        Self {
            value: Mutex::new(watermark),
        }
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn load(&self) -> Result<Watermark, StoreError> {
        Ok(*self.value.lock())
    }

    fn save(&self, watermark: Watermark) -> Result<(), StoreError> {
        *self.value.lock() = watermark;
        Ok(())
    }
}

/// Stores the watermark in a small JSON file
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct JsonFileWatermarkStore {
    path: PathBuf,
}

impl JsonFileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data directory, one file per server
    pub fn in_data_dir(machine_identifier: Option<&str>) -> Result<Self, StoreError> {
        Ok(Self::new(Self::default_path(machine_identifier)?))
    }

    /// `<data_dir>/plex-monitor/<machine id or "default">.json`
    pub fn default_path(machine_identifier: Option<&str>) -> Result<PathBuf, StoreError> {
        let data_dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        let name = machine_identifier
            .map(sanitize_file_stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "default".to_string());

        Ok(data_dir.join("plex-monitor").join(format!("{}.json", name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WatermarkStore for JsonFileWatermarkStore {
    fn load(&self) -> Result<Watermark, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No stored watermark");
                return Ok(Watermark::Uninitialized);
            }
            Err(e) => return Err(e.into()),
        };

        let stored: StoredWatermark = serde_json::from_str(&contents)?;
        Ok(stored.most_recently_added_at.into())
    }

    fn save(&self, watermark: Watermark) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stored = StoredWatermark {
            most_recently_added_at: watermark.value(),
        };
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&stored)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn sanitize_file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileWatermarkStore::new(dir.path().join("missing.json"));

        assert_eq!(store.load().unwrap(), Watermark::Uninitialized);
    }

    #[test]
    fn test_file_round_trip_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("server.json");
        let store = JsonFileWatermarkStore::new(&path);

        store.save(Watermark::At(1_700_000_000)).unwrap();
        assert_eq!(store.load().unwrap(), Watermark::At(1_700_000_000));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["mostRecentlyAddedAt"], 1_700_000_000);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_null_value_is_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        std::fs::write(&path, r#"{"mostRecentlyAddedAt":null}"#).unwrap();

        let store = JsonFileWatermarkStore::new(&path);
        assert_eq!(store.load().unwrap(), Watermark::Uninitialized);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileWatermarkStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_default_path_uses_machine_identifier() {
        if let Ok(path) = JsonFileWatermarkStore::default_path(Some("ab/c d")) {
            assert!(path.ends_with("plex-monitor/ab_c_d.json"));
        }
        if let Ok(path) = JsonFileWatermarkStore::default_path(None) {
            assert!(path.ends_with("plex-monitor/default.json"));
        }
    }

    #[test]
    fn test_watermark_ordering() {
        assert!(Watermark::Uninitialized.is_before(0));
        assert!(Watermark::At(500).is_before(600));
        assert!(!Watermark::At(500).is_before(500));
        assert_eq!(Watermark::from(Some(3)).value(), Some(3));
    }
}
