//! Axum HTTP server that forwards question requests to Gemini.
//!
//! The only reason this exists is to keep the API key on the server. It is
//! stateless apart from the shared HTTP client and does no retrying,
//! caching, or validation of the caller.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/.netlify/functions/generate-questions` | `{topic, difficulty}` → raw Gemini response |

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::config::ProxyConfig;
use crate::gemini::GenerateContentRequest;
use crate::generator::GenerateRequest;

pub const GENERATE_QUESTIONS_PATH: &str = "/.netlify/functions/generate-questions";

pub struct ProxyState {
    client: reqwest::Client,
    gemini_url: String,
    api_key: String,
}

impl ProxyState {
    pub fn new(client: reqwest::Client, gemini_url: String, api_key: String) -> Self {
        Self {
            client,
            gemini_url,
            api_key,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::new(
            client,
            config.gemini_url.clone(),
            config.api_key.clone(),
        ))
    }
}

pub type AppState = Arc<ProxyState>;

pub fn create_router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(handle_health_check))
        .route(GENERATE_QUESTIONS_PATH, post(handle_generate_questions))
        .with_state(Arc::new(state))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
}

async fn handle_health_check() -> Json<Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

async fn handle_generate_questions(State(state): State<AppState>, body: Bytes) -> Response {
    let request: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Rejecting unreadable request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body.");
        }
    };
    log::info!(
        "Forwarding question request: topic={:?} difficulty={:?}",
        request.topic,
        request.difficulty
    );

    let payload = GenerateContentRequest::new(&request.topic, &request.difficulty);
    let upstream = state
        .client
        .post(&state.gemini_url)
        .query(&[("key", state.api_key.as_str())])
        .json(&payload)
        .send()
        .await;

    let response = match upstream {
        Ok(response) => response,
        Err(e) => {
            // reqwest puts the full URL, key included, into its errors
            log::error!("Gemini request failed: {}", e.without_url());
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch questions.");
        }
    };

    let status = response.status();
    if !status.is_success() {
        log::warn!("Gemini answered with status {}", status.as_u16());
        let code = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        return error_response(
            code,
            &format!("API request failed with status {}", status.as_u16()),
        );
    }

    match response.json::<Value>().await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            log::error!("Gemini response could not be read: {}", e.without_url());
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch questions.")
        }
    }
}
