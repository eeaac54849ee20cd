//! Last-selected location, persisted as `{ "lat", "lon", "tz" }` JSON.
//! A file without `tz` is read as UTC.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{error::WeatherError, model::Location};

/// A value loaded from local state, tagged with whether the default was used.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub used_default: bool,
}

#[derive(Debug, Clone)]
pub struct LocationStore {
    path: PathBuf,
}

impl LocationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored location, or the Hyderabad default when nothing usable is stored.
    pub fn load(&self) -> Loaded<Location> {
        match self.read() {
            Ok(Some(location)) => Loaded { value: location, used_default: false },
            Ok(None) => Loaded { value: Location::hyderabad(), used_default: true },
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "Ignoring stored location: {err}");
                Loaded { value: Location::hyderabad(), used_default: true }
            }
        }
    }

    fn read(&self) -> Result<Option<Location>, WeatherError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| WeatherError::Validation(format!("cannot read location file: {e}")))?;

        let location: Location = serde_json::from_str(&contents)
            .map_err(|e| WeatherError::Validation(format!("malformed location file: {e}")))?;

        location.validate()?;
        Ok(Some(location))
    }

    pub fn save(&self, location: &Location) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(location).context("Failed to serialize location")?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write location file: {}", self.path.display()))?;

        Ok(())
    }
}
