//! Report delivery: parse, assemble, render, send, clean up.

use serde::Serialize;

use crate::errors::{AppError, ResultExt};
use crate::form_models::RawFormResponse;
use crate::gmail::is_valid_email;
use crate::handlers::AppState;
use crate::pdf::{render_report, RenderedReport};
use crate::report::{assemble, ReportContext};
use crate::response::{parse, ParseWarning, ParsedResponse};

/// Rendered files that are removed when dropped, so a cancelled delivery
/// leaves nothing behind in the work directory.
struct ReportFiles(RenderedReport);

impl Drop for ReportFiles {
    fn drop(&mut self) {
        self.0.cleanup();
    }
}

/// Result of one successfully delivered report.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub response_id: Option<String>,
    pub recipient: String,
    pub church: String,
    pub message_id: String,
    pub warnings: Vec<String>,
}

/// Per-item status in a backlog run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BacklogStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacklogItemResult {
    pub response_id: Option<String>,
    pub status: BacklogStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BacklogSummary {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<BacklogItemResult>,
}

fn log_warnings(response_id: Option<&str>, warnings: &[ParseWarning]) -> Vec<String> {
    warnings
        .iter()
        .map(|w| {
            tracing::warn!(
                "⚠️ Response {}: {}",
                response_id.unwrap_or("<unknown>"),
                w
            );
            w.to_string()
        })
        .collect()
}

/// Renders and emails the report for a parsed response.
///
/// `recipient` overrides the respondent's own address. Generated files are
/// removed after the send attempt whether or not it succeeded.
pub async fn deliver_report(
    state: &AppState,
    response: &ParsedResponse,
    recipient: Option<&str>,
) -> Result<DeliveryOutcome, AppError> {
    let recipient = match recipient.or(response.answers.email.as_deref()) {
        Some(email) => email.to_string(),
        None => {
            return Err(AppError::BadRequest(
                "Response has no email answer to send the report to".to_string(),
            ))
        }
    };
    if !is_valid_email(&recipient) {
        return Err(AppError::BadRequest(format!(
            "Invalid recipient email: {}",
            recipient
        )));
    }

    let context = ReportContext::for_response(response);
    let document = assemble(response, &context)?;
    let church = document.church.clone();

    // Report files are named after the church, so two deliveries must not overlap
    let _guard = state.delivery_lock.lock().await;

    let work_dir = state.config.report_work_dir.clone();
    // Wrapped on the blocking thread so a result nobody awaits still cleans up
    let files = tokio::task::spawn_blocking(move || {
        render_report(&document, &work_dir).map(ReportFiles)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Render task failed: {}", e)))??;

    let sent = state
        .gmail
        .send_report(&recipient, &files.0.pdf_path)
        .await
        .with_context(|| format!("Failed to send report for {}", church));
    drop(files);

    let sent = sent?;
    tracing::info!("✓ Report for {} sent to {}", church, recipient);

    Ok(DeliveryOutcome {
        response_id: response.response_id.clone(),
        recipient,
        church,
        message_id: sent.id,
        warnings: Vec::new(),
    })
}

/// Parses a raw response and delivers its report, carrying parser warnings
/// into the outcome.
pub async fn deliver_raw(
    state: &AppState,
    raw: &RawFormResponse,
    recipient: Option<&str>,
) -> Result<DeliveryOutcome, AppError> {
    let (response, warnings) = parse_logged(raw)?;

    let mut delivered = deliver_report(state, &response, recipient).await?;
    delivered.warnings = warnings;
    Ok(delivered)
}

fn parse_logged(raw: &RawFormResponse) -> Result<(ParsedResponse, Vec<String>), AppError> {
    let outcome = parse(raw)?;
    let warnings = log_warnings(raw.id(), &outcome.warnings);
    Ok((outcome.response, warnings))
}

/// Delivers reports for a batch of responses one after another.
///
/// A failing item is recorded and does not stop the rest.
pub async fn process_backlog(state: &AppState, items: &[RawFormResponse]) -> BacklogSummary {
    let mut summary = BacklogSummary::default();

    for (index, raw) in items.iter().enumerate() {
        let response_id = raw.id().map(str::to_string);
        tracing::info!(
            "🔄 Backlog item {}/{} ({})",
            index + 1,
            items.len(),
            response_id.as_deref().unwrap_or("<unknown>")
        );

        summary.processed += 1;
        let (result, warnings) = match parse_logged(raw) {
            Ok((response, warnings)) => (deliver_report(state, &response, None).await, warnings),
            Err(e) => (Err(e), Vec::new()),
        };
        match result {
            Ok(delivered) => {
                summary.sent += 1;
                summary.results.push(BacklogItemResult {
                    response_id,
                    status: BacklogStatus::Sent,
                    message_id: Some(delivered.message_id),
                    error: None,
                    warnings,
                });
            }
            Err(e) => {
                tracing::error!("❌ Backlog item {} failed: {}", index + 1, e);
                summary.failed += 1;
                summary.results.push(BacklogItemResult {
                    response_id,
                    status: BacklogStatus::Failed,
                    message_id: None,
                    error: Some(e.to_string()),
                    warnings,
                });
            }
        }
    }

    tracing::info!(
        "Backlog done: {} processed, {} sent, {} failed",
        summary.processed,
        summary.sent,
        summary.failed
    );
    summary
}
