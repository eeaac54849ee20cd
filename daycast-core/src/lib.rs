//! Core library for the `daycast` forecast viewer.
//!
//! This crate defines:
//! - The resolution pipeline (cache, provider aggregation, user overrides)
//! - Abstractions over the weather provider and the override service
//! - Configuration and persisted local state
//! - Shared domain models
//!
//! It is used by `daycast-cli`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod config;
pub mod date;
pub mod error;
pub mod http;
pub mod icon;
pub mod location;
pub mod model;
pub mod overrides;
pub mod pipeline;
pub mod provider;
pub mod session;

pub use aggregator::ForecastAggregator;
pub use cache::{CacheKey, WeatherCache};
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use config::{Config, OverrideSettings, ProviderSettings};
pub use error::WeatherError;
pub use location::{Loaded, LocationStore};
pub use model::{
    ConditionIcon, DailySummary, DateKey, Location, Override, OverrideFields, Provenance,
    ResolvedRecord,
};
pub use overrides::{HttpOverrideClient, OverrideKey, OverrideStore};
pub use pipeline::{Outcome, RequestState, ResolutionPipeline};
pub use provider::{DayBucket, HourlySample, WeatherProvider, WttrProvider};
pub use session::Session;
