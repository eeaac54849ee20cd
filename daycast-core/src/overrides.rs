//! Client for the per-user override service.
//!
//! The service owns every override and assigns versions; this side only asks
//! it to create, replace or delete one.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::instrument;

use crate::{
    error::WeatherError,
    http::{build_client, success_body, truncate_body},
    model::{Location, Override, OverrideFields},
};

/// Identifies one override: coordinates as strings, the date, and the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OverrideKey {
    pub lat: String,
    pub lon: String,
    pub date: String,
    pub email: String,
}

impl OverrideKey {
    pub fn new(location: &Location, date: &str, email: &str) -> Self {
        Self {
            lat: location.lat_key(),
            lon: location.lon_key(),
            date: date.to_string(),
            email: email.to_string(),
        }
    }
}

#[async_trait]
pub trait OverrideStore: Send + Sync + Debug {
    /// The current override for `key`, if any.
    async fn fetch(&self, key: &OverrideKey) -> Result<Option<Override>, WeatherError>;

    /// Create or replace the override for `key`; the store picks the version.
    async fn save(&self, key: &OverrideKey, fields: &OverrideFields) -> Result<Override, WeatherError>;

    /// Delete the override for `key`. Deleting a missing override succeeds.
    async fn remove(&self, key: &OverrideKey) -> Result<(), WeatherError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverrideResponse {
    version: Option<u32>,
    new_values: Option<OverrideFields>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    updated_at: Option<DateTime<Utc>>,
}

/// `updatedAt` is informational: accept epoch milliseconds or RFC 3339 and
/// drop anything else instead of failing the response.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match &value {
        None => None,
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)),
        Some(_) => None,
    };
    if parsed.is_none() && value.is_some() {
        tracing::debug!(?value, "Ignoring unrecognised override timestamp");
    }
    Ok(parsed)
}

#[derive(Debug, Serialize)]
struct SaveBody<'a> {
    #[serde(flatten)]
    key: &'a OverrideKey,
    values: &'a OverrideFields,
}

/// [`OverrideStore`] backed by the HTTP override service at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpOverrideClient {
    base_url: String,
    http: Client,
}

impl HttpOverrideClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build_client(timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/override", self.base_url)
    }
}

fn parse_response(body: &str) -> Result<OverrideResponse, WeatherError> {
    if body.trim().is_empty() {
        return Ok(OverrideResponse { version: None, new_values: None, updated_at: None });
    }
    serde_json::from_str(body)
        .map_err(|e| WeatherError::Fetch(format!("Failed to parse override response: {e}")))
}

#[async_trait]
impl OverrideStore for HttpOverrideClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch(&self, key: &OverrideKey) -> Result<Option<Override>, WeatherError> {
        let res = self
            .http
            .get(self.endpoint())
            .query(&[
                ("lat", key.lat.as_str()),
                ("lon", key.lon.as_str()),
                ("date", key.date.as_str()),
                ("email", key.email.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Fetch(format!("Failed to fetch override: {e}")))?;

        let body = success_body(res, "Override fetch").await?;
        let parsed = parse_response(&body)?;

        let Some(fields) = parsed.new_values else {
            return Ok(None);
        };

        let version = parsed.version.ok_or_else(|| {
            WeatherError::Fetch("Override response has values but no version".to_string())
        })?;

        Ok(Some(Override { version, fields: fields.sanitized(), updated_at: parsed.updated_at }))
    }

    #[instrument(skip(self, fields), level = "info")]
    async fn save(&self, key: &OverrideKey, fields: &OverrideFields) -> Result<Override, WeatherError> {
        let res = self
            .http
            .post(self.endpoint())
            .json(&SaveBody { key, values: fields })
            .send()
            .await
            .map_err(|e| WeatherError::Fetch(format!("Failed to save override: {e}")))?;

        let body = success_body(res, "Override save").await?;
        let parsed = parse_response(&body)?;

        let version = parsed.version.ok_or_else(|| {
            WeatherError::Fetch(format!(
                "Override service did not return a version: {}",
                truncate_body(&body)
            ))
        })?;

        tracing::info!(version, "Saved override");

        Ok(Override {
            version,
            fields: parsed.new_values.map_or_else(|| fields.clone(), OverrideFields::sanitized),
            updated_at: parsed.updated_at,
        })
    }

    #[instrument(skip(self), level = "info")]
    async fn remove(&self, key: &OverrideKey) -> Result<(), WeatherError> {
        let res = self
            .http
            .delete(self.endpoint())
            .json(key)
            .send()
            .await
            .map_err(|e| WeatherError::Fetch(format!("Failed to remove override: {e}")))?;

        if res.status() == StatusCode::NOT_FOUND {
            tracing::debug!("No override to remove");
            return Ok(());
        }

        success_body(res, "Override remove").await?;
        Ok(())
    }
}
