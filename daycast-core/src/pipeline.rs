//! Cache -> aggregator -> override merge, with a stale-response guard.
//!
//! Every call to [`ResolutionPipeline::resolve`] takes a new generation id
//! before its first suspension point. Only the call holding the newest id may
//! publish its result; anything older that finishes later is reported as
//! [`Outcome::Superseded`] and leaves the published state alone.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use anyhow::Result;
use parking_lot::Mutex;

use crate::{
    aggregator::ForecastAggregator,
    cache::{CacheKey, WeatherCache},
    clock::Clock,
    config::Config,
    date,
    error::WeatherError,
    model::{DailySummary, DateKey, Location, Override, OverrideFields, Provenance, ResolvedRecord},
    overrides::{HttpOverrideClient, OverrideKey, OverrideStore},
    provider::WttrProvider,
    session::Session,
};

/// Lifecycle of the most recent request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading { generation: u64, date_key: DateKey },
    Ready { generation: u64, record: ResolvedRecord },
    Failed { generation: u64, date_key: DateKey, error: WeatherError },
}

/// What a single `resolve` call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ready(ResolvedRecord),
    Failed(WeatherError),
    /// A newer request started before this one finished; its result was dropped.
    Superseded { generation: u64, current: u64 },
}

#[derive(Debug)]
pub struct ResolutionPipeline {
    aggregator: ForecastAggregator,
    cache: WeatherCache,
    overrides: Arc<dyn OverrideStore>,
    clock: Arc<dyn Clock>,
    generation: AtomicU64,
    state: Mutex<RequestState>,
}

impl ResolutionPipeline {
    pub fn new(
        aggregator: ForecastAggregator,
        cache: WeatherCache,
        overrides: Arc<dyn OverrideStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            aggregator,
            cache,
            overrides,
            clock,
            generation: AtomicU64::new(0),
            state: Mutex::new(RequestState::Idle),
        }
    }

    /// Wire up the wttr.in provider and the HTTP override service from `config`.
    pub fn from_config(config: &Config, cache: WeatherCache, clock: Arc<dyn Clock>) -> Result<Self> {
        let timeout = config.request_timeout();
        let provider = WttrProvider::new(config.provider.base_url.clone(), timeout)?;
        let overrides = HttpOverrideClient::new(config.override_base_url()?, timeout)?;

        Ok(Self::new(
            ForecastAggregator::new(Arc::new(provider)),
            cache,
            Arc::new(overrides),
            clock,
        ))
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    pub fn state(&self) -> RequestState {
        self.state.lock().clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Resolve the record to display for `date_key` in `session`.
    pub async fn resolve(&self, session: &Session, date_key: DateKey) -> Outcome {
        let generation = {
            let mut state = self.state.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = RequestState::Loading { generation, date_key };
            generation
        };

        tracing::debug!(generation, %date_key, "Resolving forecast");

        let result = self.load(session, date_key).await;
        self.publish(generation, date_key, result)
    }

    fn publish(
        &self,
        generation: u64,
        date_key: DateKey,
        result: Result<ResolvedRecord, WeatherError>,
    ) -> Outcome {
        let mut state = self.state.lock();

        let current = self.generation.load(Ordering::SeqCst);
        if generation != current {
            tracing::debug!(generation, current, %date_key, "Dropping superseded result");
            return Outcome::Superseded { generation, current };
        }

        match result {
            Ok(record) => {
                *state = RequestState::Ready { generation, record: record.clone() };
                Outcome::Ready(record)
            }
            Err(error) => {
                tracing::warn!(generation, %date_key, "Resolution failed: {error}");
                *state = RequestState::Failed { generation, date_key, error: error.clone() };
                Outcome::Failed(error)
            }
        }
    }

    async fn load(&self, session: &Session, date_key: DateKey) -> Result<ResolvedRecord, WeatherError> {
        let date = date::resolve(date_key.offset_days(), &session.location.tz, self.clock.now())?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let base = self.base_summary(&session.location, &date_str).await?;
        let used_default_bucket = base.bucket_date != date_str;

        let key = OverrideKey::new(&session.location, &date_str, &session.user);
        let (summary, active_override, override_unavailable) = match self.overrides.fetch(&key).await {
            Ok(Some(found)) => {
                let mut merged = found.fields.apply_to(&base);
                merged.provenance = Provenance::Override { version: found.version };
                (merged, Some(found), false)
            }
            Ok(None) => (base, None, false),
            Err(err) => {
                tracing::warn!(date = %date_str, "Override unavailable, showing provider data: {err}");
                (base, None, true)
            }
        };

        Ok(ResolvedRecord {
            date_key,
            date,
            summary,
            active_override,
            used_default_bucket,
            override_unavailable,
        })
    }

    async fn base_summary(&self, location: &Location, date: &str) -> Result<DailySummary, WeatherError> {
        let key = CacheKey::new(location, date);
        if let Some(summary) = self.cache.get(&key) {
            return Ok(summary);
        }

        let summary = self.aggregator.fetch(location, date).await?;
        self.cache.put(&key, summary.clone());
        Ok(summary)
    }

    fn override_key(&self, session: &Session, date_key: DateKey) -> Result<OverrideKey, WeatherError> {
        let date =
            date::resolve_string(date_key.offset_days(), &session.location.tz, self.clock.now())?;
        Ok(OverrideKey::new(&session.location, &date, &session.user))
    }

    /// Ask the override service to create or replace the override for `date_key`.
    ///
    /// Never touches the published state; resolve again to see the result.
    pub async fn save_override(
        &self,
        session: &Session,
        date_key: DateKey,
        fields: &OverrideFields,
    ) -> Result<Override, WeatherError> {
        fields.validate()?;
        let key = self.override_key(session, date_key)?;
        self.overrides.save(&key, fields).await
    }

    /// Ask the override service to delete the override for `date_key`.
    pub async fn remove_override(&self, session: &Session, date_key: DateKey) -> Result<(), WeatherError> {
        let key = self.override_key(session, date_key)?;
        self.overrides.remove(&key).await
    }
}
