use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::WeatherError;

/// A point on the map plus the IANA zone used to compute calendar dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_tz")]
    pub tz: String,
}

fn default_tz() -> String {
    "UTC".to_string()
}

impl Location {
    pub fn new(lat: f64, lon: f64, tz: impl Into<String>) -> Result<Self, WeatherError> {
        let location = Self { lat, lon, tz: tz.into() };
        location.validate()?;
        Ok(location)
    }

    /// Default location used when nothing valid has been stored yet: Hyderabad, India.
    pub fn hyderabad() -> Self {
        Self { lat: 17.385, lon: 78.4867, tz: "Asia/Kolkata".to_string() }
    }

    pub fn validate(&self) -> Result<(), WeatherError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(WeatherError::Validation(format!(
                "latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(WeatherError::Validation(format!(
                "longitude {} is outside [-180, 180]",
                self.lon
            )));
        }
        self.tz.parse::<Tz>().map_err(|e| {
            WeatherError::Validation(format!("unknown timezone '{}': {e}", self.tz))
        })?;
        Ok(())
    }

    /// Latitude exactly as it is used in cache keys and sent to the override service.
    pub fn lat_key(&self) -> String {
        self.lat.to_string()
    }

    pub fn lon_key(&self) -> String {
        self.lon.to_string()
    }
}

/// Which of the three selectable days a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateKey {
    #[default]
    Today,
    Tomorrow,
    DayAfter,
}

impl DateKey {
    pub fn offset_days(self) -> i64 {
        match self {
            DateKey::Today => 0,
            DateKey::Tomorrow => 1,
            DateKey::DayAfter => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateKey::Today => "today",
            DateKey::Tomorrow => "tomorrow",
            DateKey::DayAfter => "dayafter",
        }
    }

    pub const fn all() -> &'static [DateKey] {
        &[DateKey::Today, DateKey::Tomorrow, DateKey::DayAfter]
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateKey {
    type Err = WeatherError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "today" => Ok(DateKey::Today),
            "tomorrow" => Ok(DateKey::Tomorrow),
            "dayafter" | "day-after" => Ok(DateKey::DayAfter),
            _ => Err(WeatherError::Validation(format!(
                "Unknown day '{value}'. Supported days: today, tomorrow, dayafter."
            ))),
        }
    }
}

/// Display icon category derived from a provider condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionIcon {
    Clear,
    PartlyCloudy,
    Fog,
    Rain,
    Snow,
    Other,
}

impl ConditionIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "⛅",
            Self::Fog => "🌫️",
            Self::Rain => "🌧️",
            Self::Snow => "❄️",
            Self::Other => "🌥️",
        }
    }
}

/// Where a displayed record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Provenance {
    Api,
    Override { version: u32 },
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Api => f.write_str("api"),
            Provenance::Override { version } => write!(f, "override v{version}"),
        }
    }
}

impl From<Provenance> for String {
    fn from(value: Provenance) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "api" {
            return Ok(Provenance::Api);
        }
        value
            .strip_prefix("override v")
            .and_then(|v| v.parse().ok())
            .map(|version| Provenance::Override { version })
            .ok_or_else(|| format!("unrecognised provenance '{value}'"))
    }
}

/// One day's weather, aggregated from the provider's hourly samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub temp_c: f64,
    pub humidity_pct: u8,
    pub wind_kph: f64,
    pub precip_mm: f64,
    pub condition_text: String,
    pub condition_icon: ConditionIcon,
    pub provenance: Provenance,
    /// Date label of the provider day-bucket the values were taken from.
    pub bucket_date: String,
}

/// User-editable subset of [`DailySummary`]. Absent fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_c: Option<f64>,
    #[serde(
        default,
        deserialize_with = "humidity_from_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub humidity_pct: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_kph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precip_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_text: Option<String>,
}

impl OverrideFields {
    pub fn is_empty(&self) -> bool {
        self.temp_c.is_none()
            && self.humidity_pct.is_none()
            && self.wind_kph.is_none()
            && self.precip_mm.is_none()
            && self.condition_text.is_none()
    }

    /// Reject values no displayed record could hold.
    pub fn validate(&self) -> Result<(), WeatherError> {
        if self.is_empty() {
            return Err(WeatherError::Validation("override has no fields".to_string()));
        }
        if let Some(h) = self.humidity_pct {
            if h > 100 {
                return Err(WeatherError::Validation(format!("humidity {h}% is above 100")));
            }
        }
        if let Some(p) = self.precip_mm {
            if !p.is_finite() || p < 0.0 {
                return Err(WeatherError::Validation(format!("precipitation {p} mm is negative")));
            }
        }
        for (name, value) in [("temperature", self.temp_c), ("wind", self.wind_kph)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(WeatherError::Validation(format!("{name} must be a number")));
            }
        }
        Ok(())
    }

    /// Bring values received from the override service into displayable range.
    pub fn sanitized(mut self) -> Self {
        self.temp_c = self.temp_c.filter(|v| v.is_finite());
        self.wind_kph = self.wind_kph.filter(|v| v.is_finite()).map(|v| v.max(0.0));
        self.precip_mm = self.precip_mm.filter(|v| v.is_finite()).map(|v| v.max(0.0));
        self.humidity_pct = self.humidity_pct.map(|h| h.min(100));
        self
    }

    /// Field-level overwrite of `base`; anything not set here is left untouched.
    pub fn apply_to(&self, base: &DailySummary) -> DailySummary {
        let mut merged = base.clone();
        if let Some(v) = self.temp_c {
            merged.temp_c = v;
        }
        if let Some(v) = self.humidity_pct {
            merged.humidity_pct = v;
        }
        if let Some(v) = self.wind_kph {
            merged.wind_kph = v;
        }
        if let Some(v) = self.precip_mm {
            merged.precip_mm = v;
        }
        if let Some(v) = &self.condition_text {
            merged.condition_text = v.clone();
        }
        merged
    }
}

/// Humidity arrives as any JSON number (`55`, `55.0`, `150`); it is rounded and
/// clamped to a percentage.
fn humidity_from_number<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|h| h.is_finite()).map(|h| h.round().clamp(0.0, 100.0) as u8))
}

/// A user override as reported by the override service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub version: u32,
    pub fields: OverrideFields,
    /// Only set when the service reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The record to display for one (location, date, user) request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub date_key: DateKey,
    pub date: NaiveDate,
    pub summary: DailySummary,
    pub active_override: Option<Override>,
    /// The provider had no bucket for `date` and the first one was used instead.
    pub used_default_bucket: bool,
    /// The override service could not be reached; `summary` is the base record.
    pub override_unavailable: bool,
}

impl ResolvedRecord {
    pub fn provenance(&self) -> Provenance {
        self.summary.provenance
    }
}
