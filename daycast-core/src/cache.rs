//! Time-boxed cache of daily summaries, keyed by `"lat,lon,date"`.
//!
//! Entries expire 15 minutes after they were written. When opened from a
//! file, the whole table is written back after every `put`.

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{clock::Clock, error::WeatherError, model::DailySummary, model::Location};

pub const CACHE_TTL_MINUTES: i64 = 15;

/// `(lat-string, lon-string, date-string)`.
///
/// Coordinates are compared by their printed form, so two values that print
/// differently never share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(location: &Location, date: &str) -> Self {
        Self::from_parts(&location.lat_key(), &location.lon_key(), date)
    }

    pub fn from_parts(lat: &str, lon: &str, date: &str) -> Self {
        Self(format!("{lat},{lon},{date}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "data")]
    pub summary: DailySummary,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

pub struct WeatherCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    path: Option<PathBuf>,
}

impl fmt::Debug for WeatherCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherCache")
            .field("entries", &self.entries.lock().len())
            .field("ttl", &self.ttl)
            .field("path", &self.path)
            .finish()
    }
}

impl WeatherCache {
    /// Process-local cache with nothing on disk.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(CACHE_TTL_MINUTES),
            clock,
            path: None,
        }
    }

    /// Cache backed by a JSON file. A missing file starts empty; so does an
    /// unreadable one, after logging why.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let entries = match load_table(&path) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %path.display(), "Discarding weather cache: {err}");
                HashMap::new()
            }
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened weather cache");

        Self {
            entries: Mutex::new(entries),
            ttl: Duration::minutes(CACHE_TTL_MINUTES),
            clock,
            path: Some(path),
        }
    }

    /// Fresh summary for `key`, or `None` if absent or at least 15 minutes old.
    pub fn get(&self, key: &CacheKey) -> Option<DailySummary> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        let entry = entries.get(key.as_str())?;

        if now - entry.created_at >= self.ttl {
            tracing::debug!(%key, "Cache entry expired");
            return None;
        }

        tracing::debug!(%key, "Cache hit");
        Some(entry.summary.clone())
    }

    /// Store `summary` with `createdAt = now`, replacing any previous entry.
    pub fn put(&self, key: &CacheKey, summary: DailySummary) {
        let entry = CacheEntry { summary, created_at: self.clock.now() };

        let snapshot = {
            let mut entries = self.entries.lock();
            entries.insert(key.as_str().to_string(), entry);
            self.path.as_ref().map(|_| entries.clone())
        };

        if let (Some(path), Some(table)) = (&self.path, snapshot) {
            if let Err(err) = save_table(path, &table) {
                tracing::warn!(path = %path.display(), "Failed to persist weather cache: {err:#}");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, on disk as well.
    pub fn clear(&self) -> anyhow::Result<()> {
        self.entries.lock().clear();
        if let Some(path) = &self.path {
            save_table(path, &HashMap::new())?;
        }
        Ok(())
    }
}

fn load_table(path: &Path) -> Result<HashMap<String, CacheEntry>, WeatherError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| WeatherError::Validation(format!("cannot read cache file: {e}")))?;

    serde_json::from_str(&contents)
        .map_err(|e| WeatherError::Validation(format!("malformed cache file: {e}")))
}

fn save_table(path: &Path, table: &HashMap<String, CacheEntry>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string(table).context("Failed to serialize weather cache")?;

    fs::write(path, json)
        .with_context(|| format!("Failed to write cache file: {}", path.display()))?;

    Ok(())
}
