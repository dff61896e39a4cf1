// HTTP control surface consumed by the mobile control app

use agribot_cns::ControlSurface;
use agribot_core::GridDetector;
use agribot_eye::DebugSink;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, warn};

/// Shared state behind every route
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlSurface>,
    pub detector: Arc<dyn GridDetector>,
    pub debug: Arc<dyn DebugSink>,
}

impl AppState {
    pub fn new(
        control: Arc<ControlSurface>,
        detector: Arc<dyn GridDetector>,
        debug: Arc<dyn DebugSink>,
    ) -> Self {
        Self {
            control,
            detector,
            debug,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/json", post(handle_json))
        .route("/detect", get(detect))
        .route("/get-image", get(get_image))
        .route("/status", get(status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn hello() -> &'static str {
    "Hello from agribot!"
}

/// Accepts `{"cmd": <command>}`. Only an unparseable body is rejected.
/// Dispatch failures surface on the event bus and in the logs; the
/// response is success regardless.
async fn handle_json(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let cmd = body.get("cmd").cloned().unwrap_or(Value::Null);
    if cmd.is_null() {
        warn!("Request body has no 'cmd'; forwarding null to the actuator");
    }

    let receipt = state.control.handle(cmd).await;
    debug!(
        "Handled {:?} (loop changed: {}, outcome: {:?})",
        receipt.directive, receipt.loop_changed, receipt.outcome
    );

    Json(json!({ "status": "success", "received": body })).into_response()
}

async fn detect(State(state): State<AppState>) -> Json<Value> {
    let coordinates = state.detector.detect().await;
    Json(json!({ "response": coordinates }))
}

async fn get_image(State(state): State<AppState>) -> Response {
    let sink = Arc::clone(&state.debug);
    match tokio::task::spawn_blocking(move || sink.latest()).await {
        Ok(Ok(Some(jpeg))) => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
        Ok(Ok(None)) => error_response(StatusCode::NOT_FOUND, "Image not found"),
        Ok(Err(e)) => {
            warn!("Failed to read debug image: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read image")
        }
        Err(e) => {
            error!("Debug image task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read image")
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let controller = state.control.controller();
    Json(json!({
        "loop": controller.state().as_str(),
        "generation": controller.generation(),
        "active_executors": controller.active_executors(),
    }))
}
