use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use demand_api::{build_router, AppState, ForecastService};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MULTIPART_BOUNDARY: &str = "demandtestboundary";

fn sample_csv(days: usize) -> String {
    let mut csv = String::from("slot_start_time,demand\n");
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for i in 0..days {
        let date = start + Duration::days(i as i64);
        csv.push_str(&format!("{date} 06:00:00,{}\n", 40.0 + (i % 7) as f64 * 3.0));
        csv.push_str(&format!("{date} 18:00:00,{}\n", 60.0 + (i % 5) as f64 * 2.0));
    }
    csv
}

async fn spawn_app(service: Arc<ForecastService>) -> SocketAddr {
    let app = build_router(AppState::new(service));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });
    addr
}

async fn loaded_app(days: usize) -> (SocketAddr, Arc<ForecastService>) {
    let service = Arc::new(ForecastService::new());
    service
        .replace_data(sample_csv(days).into_bytes())
        .await
        .expect("initial load");
    (spawn_app(service.clone()).await, service)
}

async fn send_raw(addr: SocketAddr, request: String) -> (String, String) {
    let mut stream = TcpStream::connect(addr).await.expect("connect server");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");

    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("header/body separator");
    let status_line = head.lines().next().expect("status line").to_string();
    (status_line, body.to_string())
}

async fn http_get(addr: SocketAddr, path: &str) -> (String, String) {
    let request = format!(
        "GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
    );
    send_raw(addr, request).await
}

async fn http_post_csv(addr: SocketAddr, csv: &str) -> (String, String) {
    let body = format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{MULTIPART_BOUNDARY}--\r\n"
    );
    let request = format!(
        "POST /v1/update-data HTTP/1.1\r\nHost: {addr}\r\n\
         Content-Type: multipart/form-data; boundary={MULTIPART_BOUNDARY}\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    send_raw(addr, request).await
}

fn forecast_map(body: &str) -> BTreeMap<String, f64> {
    serde_json::from_str(body).expect("forecast JSON object")
}

#[tokio::test]
async fn inference_returns_the_requested_horizon() {
    let (addr, _service) = loaded_app(40).await;

    let (status, body) = http_get(addr, "/v1/inference?days_to_forecast=5").await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    let forecast = forecast_map(&body);
    assert_eq!(forecast.len(), 5);

    // 40 days from Jan 1 give a 32-day training prefix ending Feb 1
    let expected: Vec<String> = (0..5)
        .map(|offset| {
            (NaiveDate::from_ymd_opt(2024, 2, 2).unwrap() + Duration::days(offset)).to_string()
        })
        .collect();
    let keys: Vec<String> = forecast.keys().cloned().collect();
    assert_eq!(keys, expected);
    assert!(forecast.values().all(|value| value.is_finite()));
}

#[tokio::test]
async fn inference_defaults_to_thirty_days() {
    let (addr, _service) = loaded_app(40).await;

    let (status, body) = http_get(addr, "/v1/inference").await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(forecast_map(&body).len(), 30);
}

#[rstest::rstest]
#[case(0)]
#[case(-5)]
#[tokio::test]
async fn inference_rejects_a_non_positive_horizon(#[case] days: i64) {
    let (addr, _service) = loaded_app(40).await;

    let (status, body) =
        http_get(addr, &format!("/v1/inference?days_to_forecast={days}")).await;

    assert_eq!(status, "HTTP/1.1 400 Bad Request");
    let detail: Value = serde_json::from_str(&body).expect("error JSON");
    assert!(detail["detail"]
        .as_str()
        .expect("detail string")
        .contains("days_to_forecast"));
}

#[tokio::test]
async fn inference_before_any_load_is_not_ready() {
    let addr = spawn_app(Arc::new(ForecastService::new())).await;

    let (status, body) = http_get(addr, "/v1/inference?days_to_forecast=5").await;

    assert_eq!(status, "HTTP/1.1 503 Service Unavailable");
    let detail: Value = serde_json::from_str(&body).expect("error JSON");
    assert!(detail["detail"]
        .as_str()
        .expect("detail string")
        .contains("not ready"));
}

#[tokio::test]
async fn update_data_retrains_and_acknowledges() {
    let addr = spawn_app(Arc::new(ForecastService::new())).await;

    let (status, body) = http_post_csv(addr, &sample_csv(40)).await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    let ack: Value = serde_json::from_str(&body).expect("ack JSON");
    assert_eq!(
        ack,
        serde_json::json!({ "message": "Data updated and model retrained successfully" })
    );

    let (status, body) = http_get(addr, "/v1/inference?days_to_forecast=3").await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(forecast_map(&body).len(), 3);
}

#[tokio::test]
async fn rejected_update_keeps_the_previous_model_serving() {
    let (addr, _service) = loaded_app(40).await;
    let (_, before) = http_get(addr, "/v1/inference?days_to_forecast=5").await;

    let (status, _) =
        http_post_csv(addr, "slot_start_time,volume\n2024-01-01 00:00:00,1.0\n").await;
    assert_eq!(status, "HTTP/1.1 400 Bad Request");

    let (status, after) = http_get(addr, "/v1/inference?days_to_forecast=5").await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(forecast_map(&before), forecast_map(&after));
}

#[tokio::test]
async fn identical_updates_yield_identical_forecasts() {
    let addr = spawn_app(Arc::new(ForecastService::new())).await;
    let csv = sample_csv(40);

    let (status, _) = http_post_csv(addr, &csv).await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    let (_, first) = http_get(addr, "/v1/inference?days_to_forecast=10").await;

    let (status, _) = http_post_csv(addr, &csv).await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    let (_, second) = http_get(addr, "/v1/inference?days_to_forecast=10").await;

    assert_eq!(forecast_map(&first), forecast_map(&second));
}

#[tokio::test]
async fn update_with_too_few_days_is_a_validation_error() {
    let addr = spawn_app(Arc::new(ForecastService::new())).await;

    let (status, body) = http_post_csv(addr, &sample_csv(6)).await;

    assert_eq!(status, "HTTP/1.1 400 Bad Request");
    let detail: Value = serde_json::from_str(&body).expect("error JSON");
    assert!(detail["detail"]
        .as_str()
        .expect("detail string")
        .contains("Insufficient data"));
}

#[tokio::test]
async fn health_and_readiness_endpoints() {
    let service = Arc::new(ForecastService::new());
    let addr = spawn_app(service.clone()).await;

    let (status, _) = http_get(addr, "/healthz").await;
    assert_eq!(status, "HTTP/1.1 200 OK");

    let (status, _) = http_get(addr, "/readyz").await;
    assert_eq!(status, "HTTP/1.1 503 Service Unavailable");

    service
        .replace_data(sample_csv(40).into_bytes())
        .await
        .expect("load dataset");

    let (status, _) = http_get(addr, "/readyz").await;
    assert_eq!(status, "HTTP/1.1 200 OK");
}

#[tokio::test]
async fn model_info_reports_the_published_fit() {
    let (addr, _service) = loaded_app(40).await;

    let (status, body) = http_get(addr, "/v1/model").await;

    assert_eq!(status, "HTTP/1.1 200 OK");
    let info: Value = serde_json::from_str(&body).expect("model JSON");
    assert_eq!(info["model"], "ARIMA(5,1,0)");
    assert_eq!(info["order"], serde_json::json!({ "p": 5, "d": 1, "q": 0 }));
    assert_eq!(info["days"], 40);
    assert_eq!(info["train_len"], 32);
    assert_eq!(info["train_end"], "2024-02-01");
    assert!(info["holdout"]["mae"].as_f64().expect("holdout mae") >= 0.0);
}
