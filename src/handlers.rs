use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::form_models::WebhookEnvelope;
use crate::gmail::GmailClient;
use crate::pipeline::{deliver_raw, process_backlog, DeliveryOutcome};
use crate::typeform::{ResponsesQuery, TypeformClient};
use crate::webhook_handler::typeform_webhook;

/// Application state shared across all request handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the Typeform responses and webhooks API.
    pub typeform: TypeformClient,
    /// Client for sending reports through Gmail.
    pub gmail: GmailClient,
    /// Webhook event ids already handled (10 minute TTL).
    pub processed_events: Cache<String, i64>,
    /// Held while a report is rendered, sent and cleaned up.
    pub delivery_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let typeform = TypeformClient::new(&config)?;
        let gmail = GmailClient::new(&config)?;

        let processed_events = Cache::builder()
            .time_to_live(Duration::from_secs(600))
            .max_capacity(10_000)
            .build();

        Ok(Self {
            config,
            typeform,
            gmail,
            processed_events,
            delivery_lock: Mutex::new(()),
        })
    }
}

/// Routes that bypass rate limiting.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

/// Routes that trigger report delivery.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/backlog-reports", get(backlog_reports))
        .route("/webhook", post(typeform_webhook))
        .route("/test-email", get(test_email))
}

/// GET /
pub async fn index() -> &'static str {
    "Welcome to the Antioch21 Report Generator!"
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - The health status.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "cmra-report-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct BacklogParams {
    /// Send reports for the fetched responses instead of only listing them
    #[serde(default)]
    pub process: bool,
    pub page_size: Option<u32>,
    pub before: Option<String>,
}

/// GET /backlog-reports
///
/// Fetches one page of completed responses from Typeform. With
/// `process=true`, delivers a report for each of them in order.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `params` - Paging and processing options.
pub async fn backlog_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BacklogParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let query = ResponsesQuery {
        page_size: params.page_size,
        before: params.before,
    };
    let page = state
        .typeform
        .fetch_responses(&query)
        .await
        .context("Failed to fetch backlog responses")?;

    if !params.process {
        return Ok(Json(json!({
            "total_items": page.total_items,
            "page_count": page.page_count,
            "responses": page.items,
        })));
    }

    let summary = process_backlog(&state, &page.items).await;
    Ok(Json(json!({
        "total_items": page.total_items,
        "page_count": page.page_count,
        "summary": summary,
    })))
}

/// GET /test-email
///
/// Runs the pipeline on the fixture payload and sends the report to the
/// configured test recipient.
pub async fn test_email(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeliveryOutcome>, AppError> {
    let recipient = state.config.test_email_recipient.clone().ok_or_else(|| {
        AppError::BadRequest("TEST_EMAIL_RECIPIENT is not configured".to_string())
    })?;

    let fixture = &state.config.test_email_fixture;
    let data = tokio::fs::read_to_string(fixture)
        .await
        .with_context(|| format!("Failed to read test fixture {}", fixture.display()))?;
    let envelope: WebhookEnvelope = serde_json::from_str(&data)
        .map_err(|e| AppError::InternalError(format!("Invalid test fixture: {}", e)))?;

    tracing::info!("📧 Sending test report to {}", recipient);
    let outcome = deliver_raw(&state, &envelope.form_response, Some(&recipient)).await?;
    Ok(Json(outcome))
}
