//! End-to-end resolution against mock provider and override services.

use std::{sync::Arc, time::Duration};

use chrono::{TimeZone, Utc};
use daycast_core::{
    DateKey, ForecastAggregator, HttpOverrideClient, Location, ManualClock, Outcome,
    OverrideFields, Provenance, RequestState, ResolutionPipeline, ResolvedRecord, Session,
    WeatherCache, WttrProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROVIDER_PATH: &str = "/17.385,78.4867";

fn hour(temp: &str, humidity: &str, precip: &str, code: &str, desc: &str) -> serde_json::Value {
    serde_json::json!({
        "tempC": temp,
        "humidity": humidity,
        "windspeedKmph": "12",
        "precipMM": precip,
        "weatherCode": code,
        "weatherDesc": [{ "value": desc }]
    })
}

fn forecast() -> serde_json::Value {
    serde_json::json!({
        "weather": [
            {
                "date": "2024-03-10",
                "hourly": [
                    hour("20", "40", "0.0", "113", "Sunny"),
                    hour("22", "41", "2.0", "176", "Patchy rain possible"),
                    hour("24", "41", "3.0", "176", "Patchy rain possible")
                ]
            },
            {
                "date": "2024-03-11",
                "hourly": [hour("15", "70", "0.1", "143", "Mist")]
            }
        ]
    })
}

struct Harness {
    provider: MockServer,
    overrides: MockServer,
    clock: Arc<ManualClock>,
    pipeline: ResolutionPipeline,
}

async fn harness() -> Harness {
    let provider = MockServer::start().await;
    let overrides = MockServer::start().await;
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()));

    let wttr = WttrProvider::new(provider.uri(), Duration::from_secs(5)).unwrap();
    let store = HttpOverrideClient::new(overrides.uri(), Duration::from_secs(5)).unwrap();

    let pipeline = ResolutionPipeline::new(
        ForecastAggregator::new(Arc::new(wttr)),
        WeatherCache::in_memory(clock.clone()),
        Arc::new(store),
        clock.clone(),
    );

    Harness { provider, overrides, clock, pipeline }
}

fn session() -> Session {
    Session::new(Location::new(17.385, 78.4867, "UTC").unwrap(), "ana@example.com")
}

async fn mount_forecast(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(PROVIDER_PATH))
        .and(query_param("format", "j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_no_override(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;
}

fn ready(outcome: Outcome) -> ResolvedRecord {
    match outcome {
        Outcome::Ready(record) => record,
        other => panic!("expected ready outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn aggregates_provider_data() {
    let h = harness().await;
    mount_forecast(&h.provider, 1).await;
    mount_no_override(&h.overrides).await;

    let record = ready(h.pipeline.resolve(&session(), DateKey::Today).await);

    assert_eq!(record.summary.temp_c, 22.0);
    assert_eq!(record.summary.humidity_pct, 41);
    assert_eq!(record.summary.wind_kph, 12.0);
    assert_eq!(record.summary.precip_mm, 5.0);
    assert_eq!(record.summary.condition_text, "Patchy rain possible");
    assert_eq!(record.provenance().to_string(), "api");
}

#[tokio::test]
async fn repeated_resolution_within_ttl_hits_cache() {
    let h = harness().await;
    mount_forecast(&h.provider, 1).await;
    mount_no_override(&h.overrides).await;

    let first = ready(h.pipeline.resolve(&session(), DateKey::Today).await);
    h.clock.advance(chrono::Duration::minutes(14));
    let second = ready(h.pipeline.resolve(&session(), DateKey::Today).await);

    assert_eq!(first.summary, second.summary);
}

#[tokio::test]
async fn expired_entry_is_refetched() {
    let h = harness().await;
    mount_forecast(&h.provider, 2).await;
    mount_no_override(&h.overrides).await;

    ready(h.pipeline.resolve(&session(), DateKey::Today).await);
    h.clock.advance(chrono::Duration::minutes(15));
    ready(h.pipeline.resolve(&session(), DateKey::Today).await);
}

#[tokio::test]
async fn override_wins_field_by_field() {
    let h = harness().await;
    mount_forecast(&h.provider, 1).await;

    Mock::given(method("GET"))
        .and(path("/override"))
        .and(query_param("date", "2024-03-10"))
        .and(query_param("email", "ana@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "version": 3,
            "newValues": { "tempC": 25.0 }
        })))
        .mount(&h.overrides)
        .await;

    let record = ready(h.pipeline.resolve(&session(), DateKey::Today).await);

    assert_eq!(record.summary.temp_c, 25.0);
    assert_eq!(record.summary.humidity_pct, 41);
    assert_eq!(record.summary.precip_mm, 5.0);
    assert_eq!(record.provenance(), Provenance::Override { version: 3 });
    assert_eq!(record.provenance().to_string(), "override v3");
    assert_eq!(record.active_override.map(|o| o.version), Some(3));
}

#[tokio::test]
async fn out_of_range_override_humidity_is_clamped() {
    let h = harness().await;
    mount_forecast(&h.provider, 1).await;

    Mock::given(method("GET"))
        .and(path("/override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "version": 2,
            "newValues": { "humidityPct": 150 },
            "updatedAt": 1710072000000_i64
        })))
        .mount(&h.overrides)
        .await;

    let record = ready(h.pipeline.resolve(&session(), DateKey::Today).await);

    assert_eq!(record.summary.humidity_pct, 100);
    assert_eq!(record.provenance().to_string(), "override v2");
    assert!(!record.override_unavailable);
}

#[tokio::test]
async fn removing_override_restores_api_values() {
    let h = harness().await;
    mount_forecast(&h.provider, 1).await;

    Mock::given(method("GET"))
        .and(path("/override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "version": 1,
            "newValues": { "tempC": 30.0, "conditionText": "Heatwave" }
        })))
        .up_to_n_times(1)
        .mount(&h.overrides)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "deleted": true })))
        .expect(1)
        .mount(&h.overrides)
        .await;
    mount_no_override(&h.overrides).await;

    let s = session();
    let overridden = ready(h.pipeline.resolve(&s, DateKey::Today).await);
    assert_eq!(overridden.summary.condition_text, "Heatwave");

    h.pipeline.remove_override(&s, DateKey::Today).await.unwrap();

    let restored = ready(h.pipeline.resolve(&s, DateKey::Today).await);
    assert_eq!(restored.provenance(), Provenance::Api);
    assert_eq!(restored.summary.temp_c, 22.0);
    assert_eq!(restored.summary.condition_text, "Patchy rain possible");
}

#[tokio::test]
async fn failed_save_leaves_published_record_untouched() {
    let h = harness().await;
    mount_forecast(&h.provider, 1).await;
    mount_no_override(&h.overrides).await;

    Mock::given(method("POST"))
        .and(path("/override"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.overrides)
        .await;

    let s = session();
    let record = ready(h.pipeline.resolve(&s, DateKey::Today).await);
    let before = h.pipeline.state();

    let fields = OverrideFields { temp_c: Some(1.0), ..Default::default() };
    assert!(h.pipeline.save_override(&s, DateKey::Today, &fields).await.is_err());

    assert_eq!(h.pipeline.state(), before);
    assert!(matches!(before, RequestState::Ready { record: r, .. } if r == record));
}

#[tokio::test]
async fn provider_outage_fails_the_request() {
    let h = harness().await;

    Mock::given(method("GET"))
        .and(path(PROVIDER_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.provider)
        .await;

    let outcome = h.pipeline.resolve(&session(), DateKey::Today).await;
    match outcome {
        Outcome::Failed(err) => assert!(err.user_message().contains("Failed to fetch")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn late_response_for_abandoned_day_is_dropped() {
    let h = harness().await;
    mount_forecast(&h.provider, 2).await;

    Mock::given(method("GET"))
        .and(path("/override"))
        .and(query_param("date", "2024-03-10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&h.overrides)
        .await;
    Mock::given(method("GET"))
        .and(path("/override"))
        .and(query_param("date", "2024-03-11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&h.overrides)
        .await;

    let s = session();
    let (today, tomorrow) = tokio::join!(h.pipeline.resolve(&s, DateKey::Today), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.pipeline.resolve(&s, DateKey::Tomorrow).await
    });

    assert!(matches!(today, Outcome::Superseded { generation: 1, current: 2 }));
    let tomorrow = ready(tomorrow);
    assert_eq!(tomorrow.summary.condition_text, "Mist");

    match h.pipeline.state() {
        RequestState::Ready { generation, record } => {
            assert_eq!(generation, 2);
            assert_eq!(record.date_key, DateKey::Tomorrow);
        }
        other => panic!("expected tomorrow to stay published, got {other:?}"),
    }
}
