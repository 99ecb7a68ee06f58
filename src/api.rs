use std::sync::Arc;

use serde_json::{json, Value};
use shuttle_axum::axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::analyze::types::AnalysisRequest;
use crate::analyze::AnalysisService;
use crate::auth::{AuthClient, SignInRequest, SignUpRequest};
use crate::config::AppConfig;
use crate::retry::friendly_error_message;

#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub auth: Option<Arc<AuthClient>>,
}

impl AppState {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            analysis: Arc::new(AnalysisService::from_config(cfg)),
            auth: cfg.auth.clone().map(|a| Arc::new(AuthClient::new(a))),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/analyze", post(analyze))
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// The analysis endpoint cannot fail on AI problems; a 500 here means the
/// request body itself was unreadable.
async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(json) => json,
        Err(rejection) => {
            let payload = Json(json!({ "success": false, "error": rejection.body_text() }));
            return (StatusCode::INTERNAL_SERVER_ERROR, payload).into_response();
        }
    };

    let outcome = state.analysis.analyze(&req).await;

    let mut response = Json(json!({ "success": true, "analysis": outcome.result })).into_response();
    let headers = response.headers_mut();
    headers.insert(
        "x-ai-used",
        HeaderValue::from_static(if outcome.ai_used() { "1" } else { "0" }),
    );
    if let Some(reason) = &outcome.fallback {
        headers.insert("x-ai-reason", HeaderValue::from_static(reason.label()));
    }
    response
}

// Auth proxying mirrors the upstream form actions: the HTTP status is 200
// either way and the body tells success from failure.

async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Json<Value> {
    let Json(req) = match body {
        Ok(json) => json,
        Err(rejection) => return Json(json!({ "error": rejection.body_text() })),
    };
    let Some(auth) = &state.auth else {
        return Json(json!({ "error": "Authentication service is not configured" }));
    };
    match auth.sign_up(&req).await {
        Ok(data) => Json(json!({ "success": true, "data": data })),
        Err(err) => Json(json!({ "error": friendly_error_message(&err.to_string()) })),
    }
}

async fn signin(
    State(state): State<AppState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Json<Value> {
    let Json(req) = match body {
        Ok(json) => json,
        Err(rejection) => return Json(json!({ "error": rejection.body_text() })),
    };
    let Some(auth) = &state.auth else {
        return Json(json!({ "error": "Authentication service is not configured" }));
    };
    match auth.sign_in(&req).await {
        Ok(data) => Json(json!({ "success": true, "data": data })),
        Err(err) => Json(json!({ "error": friendly_error_message(&err.to_string()) })),
    }
}
