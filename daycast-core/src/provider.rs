//! Weather provider abstraction.
//!
//! Providers return their forecast as provider-neutral day buckets; all
//! field-name knowledge stays inside the adapter module.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::WeatherError, model::Location};

pub mod wttr;

pub use wttr::WttrProvider;

/// One hourly sample. Numeric fields are `None` when the provider omitted
/// them or sent something that is not a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySample {
    pub temp_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_kph: Option<f64>,
    pub precip_mm: Option<f64>,
    pub condition_code: Option<i64>,
    pub condition_text: Option<String>,
}

/// The provider's grouping of hourly samples under one date label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBucket {
    pub date: String,
    pub hourly: Vec<HourlySample>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Every day bucket the provider currently offers for `location`.
    async fn forecast(&self, location: &Location) -> Result<Vec<DayBucket>, WeatherError>;
}
