//! End-to-end pushes through the reqwest transport against a mock provider

use chrono::Utc;
use std::time::Duration;
use station_push::adapters::{
    OpenWeatherMapAdapter, PwsWeatherAdapter, WowAdapter, WundergroundAdapter,
};
use station_push::types::RetryAdvice;
use station_push::{
    ModuleReading, ModuleType, ProviderId, PushOutcome, PushScheduler, Pusher, PusherConfig,
    ReadingSnapshot, ReqwestTransport, StationConfig, StationCredentials, TransportErrorKind,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIGNATURE: &str = "station-push/it";

fn pusher(timeout: Duration) -> Pusher<ReqwestTransport> {
    let transport = ReqwestTransport::new(timeout, Duration::from_secs(2)).unwrap();
    Pusher::new(transport, Duration::from_secs(1800), SIGNATURE)
}

fn snapshot(station_id: &str) -> ReadingSnapshot {
    let now = Utc::now().timestamp();
    ReadingSnapshot::new(station_id)
        .with_module(ModuleReading::new("base", ModuleType::Main, now).with("Pressure", 1013.0))
        .with_module(
            ModuleReading::new("out", ModuleType::Outdoor, now - 5)
                .with("Temperature", 20.0)
                .with("Humidity", 55.0),
        )
}

fn wow_station() -> StationCredentials {
    StationCredentials::new(ProviderId::Wow, true, "ABC", "XYZ")
}

#[tokio::test]
async fn test_wow_form_post_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/automaticreading"))
        .and(body_string_contains("siteid=ABC"))
        .and(body_string_contains("siteAuthenticationKey=XYZ"))
        .and(body_string_contains("baromin=29.91"))
        .and(body_string_contains("tempf=68.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = WowAdapter::with_endpoint(format!("{}/automaticreading", server.uri()));
    let result = pusher(Duration::from_secs(5))
        .push(&adapter, &wow_station(), &snapshot("st"))
        .await;

    assert_eq!(result.outcome, PushOutcome::Success { warning: None });
    assert_eq!(result.status, Some(200));
}

#[tokio::test]
async fn test_wow_error_message_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"errorMessage":"Invalid site ID"}"#),
        )
        .mount(&server)
        .await;

    let adapter = WowAdapter::with_endpoint(server.uri());
    let result = pusher(Duration::from_secs(5))
        .push(&adapter, &wow_station(), &snapshot("st"))
        .await;

    assert_eq!(result.rejection_message(), Some("Invalid site ID"));
    assert_eq!(result.retry_advice(), RetryAdvice::AwaitConfigurationChange);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let adapter = WowAdapter::with_endpoint(server.uri());
    let result = pusher(Duration::from_millis(200))
        .push(&adapter, &wow_station(), &snapshot("st"))
        .await;

    match &result.outcome {
        PushOutcome::TransportFailed { error } => {
            assert_eq!(error.kind, TransportErrorKind::Timeout)
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(result.retry_advice(), RetryAdvice::RetrySoon);
}

#[tokio::test]
async fn test_pws_error_line_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("action=updateraw"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>ERROR: Not a vailid Station ID</body></html>"),
        )
        .mount(&server)
        .await;

    let adapter = PwsWeatherAdapter::with_endpoint(server.uri());
    let station = StationCredentials::new(ProviderId::Pws, true, "KSTATION", "pw");
    let result = pusher(Duration::from_secs(5))
        .push(&adapter, &station, &snapshot("st"))
        .await;

    assert!(matches!(result.outcome, PushOutcome::ProviderRejected { .. }));
}

#[tokio::test]
async fn test_openweathermap_uses_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Basic dXNlcjpwdw=="))
        .and(body_string_contains("pressure=1013.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"cod":"200"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = OpenWeatherMapAdapter::with_endpoint(server.uri());
    let station = StationCredentials::new(ProviderId::OpenWeatherMap, true, "user", "pw");
    let result = pusher(Duration::from_secs(5))
        .push(&adapter, &station, &snapshot("st"))
        .await;

    assert!(result.is_success());
}

#[tokio::test]
async fn test_wunderground_sends_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("ID", "KID"))
        .and(query_param("PASSWORD", "pw"))
        .and(query_param("baromin", "29.91"))
        .and(query_param("action", "updateraw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("success\n"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = WundergroundAdapter::with_endpoint(server.uri());
    let station = StationCredentials::new(ProviderId::Wunderground, true, "KID", "pw");
    let result = pusher(Duration::from_secs(5))
        .push(&adapter, &station, &snapshot("st"))
        .await;

    assert_eq!(result.outcome, PushOutcome::Success { warning: None });
}

#[tokio::test]
async fn test_scheduler_cycle_against_mock_providers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wug"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("INVALIDPASSWORDID|Password or key and/or id are incorrect"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let toml = format!(
        r#"
        http_timeout_secs = 5

        [endpoints]
        wow = "{uri}/wow"
        wug = "{uri}/wug"

        [[stations]]
        station_id = "a"

        [[stations.providers]]
        provider = "wow"
        sync = true
        username = "A"
        password = "K"

        [[stations.providers]]
        provider = "wug"
        sync = true
        username = "KA"
        password = "wrong"

        [[stations]]
        station_id = "b"

        [[stations.providers]]
        provider = "wow"
        sync = true
        username = "B"
        password = "K"

        [[stations.providers]]
        provider = "pws"
        sync = false
        username = "B"
        password = "K"
        "#,
        uri = server.uri()
    );
    let config = PusherConfig::from_toml_str(&toml).unwrap();
    let stations: Vec<StationConfig> = config.stations.clone();

    let mut scheduler = PushScheduler::new(Pusher::from_config(&config).unwrap(), &config);
    let snapshots = vec![snapshot("a"), snapshot("b")];

    let report = scheduler.run_cycle(&stations, &snapshots, Utc::now()).await;

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.summary.pushed, 2);
    assert_eq!(report.summary.rejected, 1);
    assert_eq!(report.summary.skipped, 1);
    assert!(scheduler.is_suspended("a", ProviderId::Wunderground));
    assert!(!report.has_retryable_failures());
}
