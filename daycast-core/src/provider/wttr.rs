use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    error::WeatherError,
    http::{build_client, success_body},
    model::Location,
};

use super::{DayBucket, HourlySample, WeatherProvider};

pub const WTTR_BASE_URL: &str = "https://wttr.in";

/// wttr.in `format=j1` forecast adapter.
#[derive(Debug, Clone)]
pub struct WttrProvider {
    base_url: String,
    http: Client,
}

impl WttrProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build_client(timeout)?,
        })
    }
}

/// wttr.in sends most numbers as strings; accept either.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
}

impl Loose {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Loose::Number(n) => Some(*n),
            Loose::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WtDesc {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WtHourly {
    temp_c: Option<Loose>,
    humidity: Option<Loose>,
    windspeed_kmph: Option<Loose>,
    #[serde(rename = "precipMM")]
    precip_mm: Option<Loose>,
    weather_code: Option<Loose>,
    #[serde(default)]
    weather_desc: Vec<WtDesc>,
}

#[derive(Debug, Deserialize)]
struct WtDay {
    date: String,
    #[serde(default)]
    hourly: Vec<WtHourly>,
}

#[derive(Debug, Deserialize)]
struct WtResponse {
    #[serde(default)]
    weather: Vec<WtDay>,
}

impl From<WtHourly> for HourlySample {
    fn from(h: WtHourly) -> Self {
        Self {
            temp_c: h.temp_c.as_ref().and_then(Loose::as_f64),
            humidity_pct: h.humidity.as_ref().and_then(Loose::as_f64),
            wind_kph: h.windspeed_kmph.as_ref().and_then(Loose::as_f64),
            precip_mm: h.precip_mm.as_ref().and_then(Loose::as_f64),
            condition_code: h
                .weather_code
                .as_ref()
                .and_then(Loose::as_f64)
                .map(|c| c as i64),
            condition_text: h.weather_desc.into_iter().next().map(|d| d.value),
        }
    }
}

fn parse_forecast(body: &str) -> Result<Vec<DayBucket>, WeatherError> {
    let parsed: WtResponse = serde_json::from_str(body)
        .map_err(|e| WeatherError::Data(format!("Failed to parse wttr.in forecast JSON: {e}")))?;

    Ok(parsed
        .weather
        .into_iter()
        .map(|day| DayBucket {
            date: day.date,
            hourly: day.hourly.into_iter().map(HourlySample::from).collect(),
        })
        .collect())
}

#[async_trait]
impl WeatherProvider for WttrProvider {
    #[instrument(skip(self), fields(lat = %location.lat, lon = %location.lon), level = "info")]
    async fn forecast(&self, location: &Location) -> Result<Vec<DayBucket>, WeatherError> {
        let url = format!("{}/{},{}", self.base_url, location.lat_key(), location.lon_key());

        let res = self
            .http
            .get(&url)
            .query(&[("format", "j1")])
            .send()
            .await
            .map_err(|e| WeatherError::Fetch(format!("Failed to send request to wttr.in: {e}")))?;

        let body = success_body(res, "wttr.in forecast").await?;
        let buckets = parse_forecast(&body)?;

        tracing::info!(buckets = buckets.len(), "Fetched wttr.in forecast");
        Ok(buckets)
    }
}
