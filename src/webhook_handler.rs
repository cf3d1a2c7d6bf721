use crate::errors::AppError;
use crate::form_models::{WebhookEnvelope, WebhookResponse};
use crate::handlers::AppState;
use crate::pipeline::deliver_raw;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Typeform-Signature";

/// Typeform webhook handler
///
/// Receives a completed CMRA response, renders the report and emails it to the
/// respondent before answering. Deliveries are deduplicated by `event_id`; a
/// failed delivery is forgotten so Typeform's retry is processed again. A
/// delivery keeps running if the sender disconnects.
///
/// Authentication: when a webhook secret is configured, the
/// `Typeform-Signature` header must carry `sha256=<base64 HMAC of the body>`.
pub async fn typeform_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), AppError> {
    validate_signature(&state, &headers, &body)?;

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;
    let event_id = envelope.event_id.clone();
    tracing::info!("Webhook received: {}", event_id);

    let entry = state
        .processed_events
        .entry(event_id.clone())
        .or_insert(chrono::Utc::now().timestamp())
        .await;
    if !entry.is_fresh() {
        tracing::info!("Skipping duplicate webhook event {}", event_id);
        return Ok((
            StatusCode::OK,
            Json(WebhookResponse {
                status: "duplicate".to_string(),
                event_id,
                message_id: None,
                warnings: Vec::new(),
            }),
        ));
    }

    // Detached from the request: a dropped connection must not skip the dedupe reset
    let task_state = Arc::clone(&state);
    let task_event_id = event_id.clone();
    let delivery = tokio::spawn(async move {
        let result = deliver_raw(&task_state, &envelope.form_response, None).await;
        if let Err(ref e) = result {
            tracing::error!("❌ Webhook event {} failed: {}", task_event_id, e);
            task_state.processed_events.invalidate(&task_event_id).await;
        }
        result
    });

    let outcome = match delivery.await {
        Ok(result) => result?,
        Err(e) => {
            tracing::error!("❌ Delivery task for {} aborted: {}", event_id, e);
            state.processed_events.invalidate(&event_id).await;
            return Err(AppError::InternalError(format!("Delivery task failed: {}", e)));
        }
    };

    Ok((
        StatusCode::OK,
        Json(WebhookResponse {
            status: "success".to_string(),
            event_id,
            message_id: Some(outcome.message_id),
            warnings: outcome.warnings,
        }),
    ))
}

/// Checks the body signature when a webhook secret is configured.
fn validate_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    let Some(ref secret) = state.config.webhook_secret else {
        return Ok(());
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", SIGNATURE_HEADER)))?;

    if !verify_signature(secret, body, signature) {
        tracing::warn!("Invalid webhook signature received");
        return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
    }

    Ok(())
}

/// Verifies a `sha256=<base64>` signature over `body`.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(encoded) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    // verify_slice compares in constant time
    mac.verify_slice(&expected).is_ok()
}

/// Computes the header value Typeform sends for `body`.
pub fn sign_body(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", STANDARD.encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"event_id":"abc"}"#;
        let header = sign_body("s3cret", body).unwrap();
        assert!(header.starts_with("sha256="));
        assert!(verify_signature("s3cret", body, &header));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let header = sign_body("s3cret", b"original").unwrap();
        assert!(!verify_signature("s3cret", b"tampered", &header));
        assert!(!verify_signature("other", b"original", &header));
    }

    #[test]
    fn test_signature_rejects_malformed_header() {
        assert!(!verify_signature("s3cret", b"body", ""));
        assert!(!verify_signature("s3cret", b"body", "sha1=abc"));
        assert!(!verify_signature("s3cret", b"body", "sha256=***not base64***"));
    }
}
