//! HTTP API tests driven through the router without a socket

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use water_sentry::api::{create_router, AppState, RateLimitConfig, RateLimiter};
use water_sentry::{
    AppError, AppResult, EmailMessage, Mailer, ReadingStore, Reporter, RiskClassifier,
    Synthesizer, TelemetryCollector,
};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        if self.fail {
            return Err(AppError::mail_transport("connection refused"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct TestApp {
    router: Router,
    mailer: Arc<RecordingMailer>,
    state: Arc<AppState>,
}

fn app_with(mailer: RecordingMailer, capacity: usize, rate_limit: u32) -> TestApp {
    let mailer = Arc::new(mailer);
    let telemetry_dir = std::env::temp_dir().join(format!("water-sentry-{}", uuid::Uuid::new_v4()));
    let state = Arc::new(AppState::from_parts(
        RiskClassifier::default(),
        Synthesizer::default(),
        ReadingStore::with_capacity(capacity),
        Reporter::new(
            mailer.clone(),
            "sentry@example.org",
            Some("ops@example.org".to_string()),
        ),
        Arc::new(TelemetryCollector::with_config(telemetry_dir, 100)),
        RateLimiter::new(RateLimitConfig::per_minute(rate_limit)),
    ));
    TestApp {
        router: create_router(state.clone()),
        mailer,
        state,
    }
}

fn app() -> TestApp {
    app_with(RecordingMailer::default(), 100, 1000)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    for path in ["/health", "/v1/health"] {
        let (status, body) = send(&app.router, get(path)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");
    }
}

#[tokio::test]
async fn test_submit_and_latest() {
    let app = app();

    let (status, body) = send(
        &app.router,
        post(
            "/v1/submit",
            json!({"location": "well-7", "ph": 6.0, "tds": 300, "hardness": 250, "nitrate": 20}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let assessment = &body["data"]["record"]["assessment"];
    assert_eq!(assessment["status"], "MODERATE");
    assert_eq!(assessment["elements"], json!(["Uranium"]));

    let (status, body) = send(&app.router, get("/v1/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reading"]["location"], "well-7");

    let (status, _) = send(&app.router, get("/v1/latest?location=WELL-7")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, get("/v1/latest?location=elsewhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "API_NOT_FOUND");
}

#[tokio::test]
async fn test_submit_synthesizes_missing_fields() {
    let app = app();
    let (status, body) = send(&app.router, post("/v1/submit", json!({"tds": 1000}))).await;
    assert_eq!(status, StatusCode::OK);

    let reading = &body["data"]["record"]["reading"];
    assert_eq!(reading["location"], "unspecified");
    assert_eq!(reading["ph"], 7.5);
    assert_eq!(reading["hardness"], 400.0);
    assert_eq!(reading["nitrate"], 50.0);
    assert_eq!(reading["synthesized"], json!(["ph", "hardness", "nitrate"]));
}

#[tokio::test]
async fn test_submit_requires_tds() {
    let app = app();
    let (status, body) = send(&app.router, post("/v1/submit", json!({"ph": 7.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INPUT_MISSING_FIELD");
    assert!(app.state.store.is_empty());
}

#[tokio::test]
async fn test_latest_empty_store() {
    let app = app();
    let (status, body) = send(&app.router, get("/v1/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_DATA");
}

#[tokio::test]
async fn test_classify_stateless() {
    let app = app();
    let (status, body) = send(
        &app.router,
        post("/v1/classify", json!({"ph": 9.0, "tds": 1000, "hardness": 300, "nitrate": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["risk_score"], 100.0);
    assert_eq!(body["data"]["status"], "HIGH");
    assert!(app.state.store.is_empty());

    let (status, body) = send(&app.router, post("/v1/classify", json!({"ph": 7.0, "tds": 10}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INPUT_MISSING_FIELD");
}

#[tokio::test]
async fn test_batch_classify() {
    let app = app();
    let (status, body) = send(
        &app.router,
        post(
            "/v1/classify/batch",
            json!({"readings": [
                {"ph": 7.0, "tds": 100, "hardness": 50, "nitrate": 10},
                {"ph": 6.0, "tds": 300, "hardness": 250, "nitrate": 20},
                {"ph": 9.0, "tds": 1000, "hardness": 300, "nitrate": 100},
                {"ph": 7.0}
            ]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["total_requested"], 4);
    assert_eq!(data["total_processed"], 3);
    assert_eq!(data["total_safe"], 1);
    assert_eq!(data["total_moderate"], 1);
    assert_eq!(data["total_high"], 1);
    assert_eq!(data["results"][3]["status"], "error");

    let (status, _) = send(&app.router, post("/v1/classify/batch", json!({"readings": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let too_many: Vec<Value> = (0..101)
        .map(|_| json!({"ph": 7.0, "tds": 100, "hardness": 50, "nitrate": 10}))
        .collect();
    let (status, _) = send(&app.router, post("/v1/classify/batch", json!({ "readings": too_many }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_newest_first_and_bounded() {
    let app = app_with(RecordingMailer::default(), 3, 1000);
    for tds in [100, 200, 300, 400, 500] {
        send(&app.router, post("/v1/submit", json!({"tds": tds}))).await;
    }

    let (status, body) = send(&app.router, get("/v1/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(body["data"]["capacity"], 3);
    assert_eq!(body["data"]["records"][0]["reading"]["tds"], 500.0);

    let (_, body) = send(&app.router, get("/v1/history?limit=1")).await;
    assert_eq!(body["data"]["count"], 1);
}

#[tokio::test]
async fn test_report_sends_latest() {
    let app = app();

    let (status, body) = send(&app.router, post("/v1/report", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_DATA");

    send(
        &app.router,
        post("/v1/submit", json!({"location": "Reservoir", "ph": 7.8, "tds": 600, "hardness": 120, "nitrate": 60})),
    )
    .await;

    let (status, body) = send(
        &app.router,
        post("/v1/report", json!({"recipient": "lab@example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["to"], "lab@example.org");
    assert_eq!(body["data"]["transport"], "recording");

    // no body falls back to the default recipient
    let request = Request::builder()
        .method("POST")
        .uri("/v1/report")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["to"], "ops@example.org");

    let sent = app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].subject.contains("Reservoir"));
    assert!(sent[0].text.contains("Cesium, Radium"));
    drop(sent);

    assert_eq!(app.state.telemetry.get_stats().reports_sent, 2);
}

#[tokio::test]
async fn test_report_rejects_malformed_body() {
    let app = app();
    send(&app.router, post("/v1/submit", json!({"location": "A", "tds": 100}))).await;

    let (status, body) = send(
        &app.router,
        post(
            "/v1/report",
            json!({"recipient": ["lab@example.org"], "location": "nowhere"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "API_BAD_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/report")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.mailer.sent.lock().unwrap().is_empty());
    assert_eq!(app.state.telemetry.get_stats().reports_sent, 0);
}

#[tokio::test]
async fn test_report_mail_failure() {
    let app = app_with(
        RecordingMailer {
            fail: true,
            ..Default::default()
        },
        10,
        1000,
    );
    send(&app.router, post("/v1/submit", json!({"tds": 100}))).await;

    let (status, body) = send(&app.router, post("/v1/report", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "MAIL_TRANSPORT_FAILED");
    assert_eq!(app.state.telemetry.get_stats().reports_failed, 1);

    // classification keeps working
    let (status, _) = send(&app.router, post("/v1/submit", json!({"tds": 200}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats() {
    let app = app();
    send(&app.router, post("/v1/submit", json!({"tds": 100}))).await;
    send(
        &app.router,
        post("/v1/classify", json!({"ph": 9.0, "tds": 1000, "hardness": 300, "nitrate": 100})),
    )
    .await;

    let (status, body) = send(&app.router, get("/v1/stats")).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["telemetry"]["total_assessed"], 2);
    assert_eq!(data["telemetry"]["high"], 1);
    assert_eq!(data["store"]["entries"], 1);
    assert_eq!(data["synthesis"], "heuristic");
    assert_eq!(data["mail_transport"], "recording");
}

#[tokio::test]
async fn test_rate_limit() {
    let app = app_with(RecordingMailer::default(), 10, 2);
    let classify = || post("/v1/classify", json!({"ph": 7.0, "tds": 100, "hardness": 50, "nitrate": 10}));

    let response = app.router.clone().oneshot(classify()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "1");

    let (status, _) = send(&app.router, classify()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, classify()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "API_RATE_LIMITED");

    // health stays reachable
    let (status, _) = send(&app.router, get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
}
