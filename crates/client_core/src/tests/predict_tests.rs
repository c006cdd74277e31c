use super::*;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct InferenceState {
    status: StatusCode,
    body: String,
    received: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn handle_predict(
    State(state): State<InferenceState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    state.received.lock().await.push(payload);
    (
        state.status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "device": "cpu", "modelLoaded": true }))
}

async fn spawn_inference_server(
    status: StatusCode,
    body: impl Into<String>,
) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = InferenceState {
        status,
        body: body.into(),
        received: Arc::clone(&received),
    };
    let app = Router::new()
        .route("/predict", post(handle_predict))
        .route("/health", get(handle_health))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/predict"), received)
}

#[tokio::test]
async fn posts_image_url_and_parses_prediction() {
    let (url, received) = spawn_inference_server(
        StatusCode::OK,
        r#"{"ok":true,"imageUrl":"https://cdn/x.png","label":"Tuberculosis","confidence":0.87,"probs":{"Normal":0.13,"Tuberculosis":0.87}}"#,
    )
    .await;
    let client = HttpPredictionClient::new(&url).expect("client");

    let result = client.predict("https://cdn/x.png").await.expect("prediction");
    assert_eq!(result.label, "Tuberculosis");
    assert_eq!(result.confidence, 0.87);
    assert_eq!(result.probs.as_ref().map(|p| p.len()), Some(2));

    let received = received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], serde_json::json!({ "imageUrl": "https://cdn/x.png" }));
}

#[tokio::test]
async fn non_ok_status_surfaces_server_error_message() {
    let (url, _) =
        spawn_inference_server(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"bad image"}"#).await;
    let client = HttpPredictionClient::new(&url).expect("client");

    let err = client.predict("https://cdn/x.png").await.expect_err("http error");
    assert_eq!(
        err,
        FlowError::PredictionHttp {
            status: 500,
            message: "bad image".into()
        }
    );
}

#[tokio::test]
async fn non_ok_status_reads_detail_then_falls_back() {
    let (url, _) =
        spawn_inference_server(StatusCode::BAD_REQUEST, r#"{"detail":"Missing imageUrl"}"#).await;
    let client = HttpPredictionClient::new(&url).expect("client");
    let err = client.predict("").await.expect_err("http error");
    assert_eq!(err.to_string(), "Missing imageUrl");

    let (url, _) = spawn_inference_server(StatusCode::BAD_GATEWAY, "{}").await;
    let client = HttpPredictionClient::new(&url).expect("client");
    let err = client.predict("https://cdn/x.png").await.expect_err("http error");
    assert_eq!(err.to_string(), "AI request failed");
}

#[tokio::test]
async fn unparseable_body_is_reported_as_crash() {
    let (url, _) = spawn_inference_server(StatusCode::OK, "<html>oops</html>").await;
    let client = HttpPredictionClient::new(&url).expect("client");

    let err = client.predict("https://cdn/x.png").await.expect_err("parse error");
    assert!(matches!(err, FlowError::PredictionTransport(_)));
    assert!(err.to_string().starts_with("AI request crashed: "));
}

#[tokio::test]
async fn unreachable_endpoint_is_reported_as_crash() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = HttpPredictionClient::new(&format!("http://{addr}/predict")).expect("client");
    let err = client.predict("https://cdn/x.png").await.expect_err("transport error");
    assert!(matches!(err, FlowError::PredictionTransport(_)));
}

#[tokio::test]
async fn health_uses_sibling_route() {
    let (url, _) = spawn_inference_server(StatusCode::OK, "{}").await;
    let client = HttpPredictionClient::new(&url).expect("client");
    assert!(client
        .health_url()
        .expect("health url")
        .as_str()
        .ends_with("/health"));

    let health = client.health().await.expect("health");
    assert!(health.ok);
    assert!(health.model_loaded);
    assert_eq!(health.device.as_deref(), Some("cpu"));
}

#[test]
fn rejects_invalid_endpoint() {
    assert!(HttpPredictionClient::new("not a url").is_err());
}
