//! Reduces a provider's hourly breakdown into one [`DailySummary`].

use std::sync::Arc;

use tracing::instrument;

use crate::{
    error::WeatherError,
    icon::map_code,
    model::{DailySummary, Location, Provenance},
    provider::{DayBucket, HourlySample, WeatherProvider},
};

#[derive(Debug, Clone)]
pub struct ForecastAggregator {
    provider: Arc<dyn WeatherProvider>,
}

impl ForecastAggregator {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Fetch the provider forecast and summarise the bucket for `date`.
    #[instrument(skip(self, location), fields(lat = %location.lat, lon = %location.lon), level = "info")]
    pub async fn fetch(&self, location: &Location, date: &str) -> Result<DailySummary, WeatherError> {
        let buckets = self.provider.forecast(location).await?;
        let bucket = select_bucket(&buckets, date)?;

        if bucket.date != date {
            tracing::warn!(
                requested = date,
                used = %bucket.date,
                "No forecast bucket for requested date, falling back to first bucket"
            );
        }

        summarize(bucket)
    }
}

/// The bucket labelled `date`, else the first one.
///
/// Providers only return a few days starting today, so an out-of-range date
/// silently gets the first day's data. Callers can tell by comparing
/// [`DailySummary::bucket_date`] with the date they asked for.
pub fn select_bucket<'a>(buckets: &'a [DayBucket], date: &str) -> Result<&'a DayBucket, WeatherError> {
    buckets
        .iter()
        .find(|b| b.date == date)
        .or_else(|| buckets.first())
        .ok_or_else(|| WeatherError::Data("Provider returned no forecast days".to_string()))
}

/// Aggregate every hourly sample of `bucket`.
///
/// Absent or non-finite numbers count as 0.0 and still take part in the
/// averages; samples are never dropped.
pub fn summarize(bucket: &DayBucket) -> Result<DailySummary, WeatherError> {
    let hourly = &bucket.hourly;
    if hourly.is_empty() {
        return Err(WeatherError::Data(format!("No hourly data for {}", bucket.date)));
    }

    let count = hourly.len() as f64;
    let total = |field: fn(&HourlySample) -> Option<f64>| -> f64 {
        hourly.iter().map(|h| sample_or_zero(field(h))).sum()
    };

    let temp_c = total(|h| h.temp_c) / count;
    let humidity = total(|h| h.humidity_pct) / count;
    let wind_kph = total(|h| h.wind_kph) / count;
    let precip_mm = total(|h| h.precip_mm);

    let mid = &hourly[hourly.len() / 2];

    Ok(DailySummary {
        temp_c: one_decimal(temp_c),
        humidity_pct: humidity.round().clamp(0.0, 100.0) as u8,
        wind_kph: one_decimal(wind_kph),
        precip_mm: one_decimal(precip_mm),
        condition_text: mid.condition_text.clone().unwrap_or_default(),
        condition_icon: map_code(mid.condition_code.unwrap_or(0)),
        provenance: Provenance::Api,
        bucket_date: bucket.date.clone(),
    })
}

fn sample_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConditionIcon;
    use async_trait::async_trait;

    fn sample(temp: f64, humidity: f64, wind: f64, precip: f64, code: i64, text: &str) -> HourlySample {
        HourlySample {
            temp_c: Some(temp),
            humidity_pct: Some(humidity),
            wind_kph: Some(wind),
            precip_mm: Some(precip),
            condition_code: Some(code),
            condition_text: Some(text.to_string()),
        }
    }

    fn bucket(date: &str, hourly: Vec<HourlySample>) -> DayBucket {
        DayBucket { date: date.to_string(), hourly }
    }

    #[derive(Debug)]
    struct StaticProvider(Vec<DayBucket>);

    #[async_trait]
    impl WeatherProvider for StaticProvider {
        async fn forecast(&self, _location: &Location) -> Result<Vec<DayBucket>, WeatherError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn precipitation_is_summed_not_averaged() {
        let b = bucket(
            "2024-03-10",
            vec![
                sample(10.0, 50.0, 5.0, 0.0, 113, "Sunny"),
                sample(10.0, 50.0, 5.0, 2.0, 176, "Patchy rain"),
                sample(10.0, 50.0, 5.0, 3.0, 176, "Patchy rain"),
            ],
        );
        assert_eq!(summarize(&b).unwrap().precip_mm, 5.0);
    }

    #[test]
    fn humidity_mean_rounds_half_up() {
        let b = bucket(
            "2024-03-10",
            vec![sample(0.0, 40.0, 0.0, 0.0, 113, ""), sample(0.0, 41.0, 0.0, 0.0, 113, "")],
        );
        assert_eq!(summarize(&b).unwrap().humidity_pct, 41);
    }

    #[test]
    fn means_are_rounded_to_one_decimal() {
        let b = bucket(
            "2024-03-10",
            vec![
                sample(10.0, 50.0, 7.0, 0.0, 113, ""),
                sample(11.0, 50.0, 8.0, 0.0, 113, ""),
                sample(11.0, 50.0, 8.0, 0.0, 113, ""),
            ],
        );
        let summary = summarize(&b).unwrap();
        assert_eq!(summary.temp_c, 10.7);
        assert_eq!(summary.wind_kph, 7.7);
    }

    #[test]
    fn missing_samples_count_as_zero() {
        let mut gap = sample(0.0, 0.0, 0.0, 0.0, 113, "");
        gap.temp_c = None;
        gap.humidity_pct = Some(f64::NAN);
        let b = bucket("2024-03-10", vec![sample(20.0, 80.0, 10.0, 1.0, 113, ""), gap]);

        let summary = summarize(&b).unwrap();
        assert_eq!(summary.temp_c, 10.0);
        assert_eq!(summary.humidity_pct, 40);
    }

    #[test]
    fn condition_comes_from_middle_sample() {
        let b = bucket(
            "2024-03-10",
            vec![
                sample(0.0, 0.0, 0.0, 0.0, 113, "Sunny"),
                sample(0.0, 0.0, 0.0, 0.0, 113, "Sunny"),
                sample(0.0, 0.0, 0.0, 0.0, 338, "Heavy snow"),
                sample(0.0, 0.0, 0.0, 0.0, 113, "Sunny"),
            ],
        );
        let summary = summarize(&b).unwrap();
        assert_eq!(summary.condition_icon, ConditionIcon::Snow);
        assert_eq!(summary.condition_text, "Heavy snow");
    }

    #[test]
    fn absent_condition_code_maps_to_other() {
        let mut only = sample(0.0, 0.0, 0.0, 0.0, 0, "");
        only.condition_code = None;
        only.condition_text = None;
        let summary = summarize(&bucket("2024-03-10", vec![only])).unwrap();

        assert_eq!(summary.condition_icon, ConditionIcon::Other);
        assert_eq!(summary.condition_text, "");
    }

    #[test]
    fn empty_hourly_list_is_a_data_error() {
        let err = summarize(&bucket("2024-03-10", vec![])).unwrap_err();
        assert!(matches!(err, WeatherError::Data(_)));
    }

    #[test]
    fn exact_bucket_wins_over_first() {
        let buckets = vec![bucket("2024-03-10", vec![]), bucket("2024-03-11", vec![])];
        assert_eq!(select_bucket(&buckets, "2024-03-11").unwrap().date, "2024-03-11");
    }

    #[test]
    fn unmatched_date_falls_back_to_first_bucket() {
        let buckets = vec![bucket("2024-03-10", vec![]), bucket("2024-03-11", vec![])];
        assert_eq!(select_bucket(&buckets, "2024-03-20").unwrap().date, "2024-03-10");
    }

    #[test]
    fn no_buckets_is_a_data_error() {
        assert!(matches!(select_bucket(&[], "2024-03-10"), Err(WeatherError::Data(_))));
    }

    #[tokio::test]
    async fn fallback_does_not_raise_and_reports_bucket_date() {
        let provider = StaticProvider(vec![bucket(
            "2024-03-10",
            vec![sample(18.0, 60.0, 9.0, 0.2, 116, "Partly cloudy")],
        )]);
        let aggregator = ForecastAggregator::new(Arc::new(provider));

        let summary = aggregator.fetch(&Location::hyderabad(), "2024-03-14").await.unwrap();

        assert_eq!(summary.bucket_date, "2024-03-10");
        assert_eq!(summary.temp_c, 18.0);
        assert_eq!(summary.condition_icon, ConditionIcon::PartlyCloudy);
        assert_eq!(summary.provenance, Provenance::Api);
    }
}
