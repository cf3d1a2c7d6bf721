//! Shared helpers for integration tests.
#![allow(dead_code)]

use cmra_report_api::config::Config;
use serde_json::{json, Value};
use std::path::Path;

pub const TEST_ACCESS_TOKEN: &str = "ya29.test-access";

/// Test config with both external APIs pointed at `base_url` and all files under `dir`.
pub fn create_test_config(base_url: String, dir: &Path) -> Config {
    Config {
        port: 8080,
        typeform_token: "test_token".to_string(),
        typeform_base_url: base_url.clone(),
        form_id: "SKFDhMKo".to_string(),
        webhook_name: "cmra_webhook".to_string(),
        app_url: Some("https://reports.example.org".to_string()),
        webhook_secret: None,
        gmail_base_url: base_url,
        gmail_credentials_path: dir.join("credentials.json"),
        gmail_token_path: dir.join("token.json"),
        report_sender: "Antioch21 <admin@antioch21.sg>".to_string(),
        report_work_dir: dir.join("reports"),
        test_email_fixture: dir.join("fixture.json"),
        test_email_recipient: None,
    }
}

/// Writes a token file whose access token never expires.
pub fn write_valid_token(path: &Path) {
    let token = json!({
        "token": TEST_ACCESS_TOKEN,
        "refresh_token": "1//refresh",
        "client_id": "client-id",
        "client_secret": "client-secret",
        "scopes": ["https://www.googleapis.com/auth/gmail.send"]
    });
    std::fs::write(path, token.to_string()).unwrap();
}

/// A form response with all 14 scores, where every score except
/// `discipleship` is `other`.
pub fn form_response(email: Option<&str>, church: &str, discipleship: f64, other: f64) -> Value {
    let keys = [
        "discipleship",
        "education",
        "training",
        "sending",
        "sending1",
        "membercare",
        "support",
        "praying",
        "giving",
        "community",
        "structure",
        "organisation",
        "policies",
        "partnerships",
    ];
    let scores: Vec<Value> = keys
        .iter()
        .map(|&key| {
            let number = if key == "discipleship" { discipleship } else { other };
            json!({ "key": key, "type": "number", "number": number })
        })
        .collect();

    let mut answers = vec![
        json!({
            "type": "text",
            "text": "Grace Tan",
            "field": { "id": "Wz6EJ0SrP537", "type": "short_text" }
        }),
        json!({
            "type": "text",
            "text": church,
            "field": { "id": "4yBh92Cyp8hz", "type": "short_text" }
        }),
    ];
    if let Some(email) = email {
        answers.push(json!({
            "type": "email",
            "email": email,
            "field": { "id": "mQQ6n4XODVE8", "type": "email" }
        }));
    }

    json!({
        "token": format!("tok-{}", church.to_lowercase().replace(' ', "-")),
        "submitted_at": "2025-06-01T09:52:37Z",
        "answers": answers,
        "scores": scores
    })
}

pub fn webhook_payload(event_id: &str, form_response: Value) -> Value {
    json!({
        "event_id": event_id,
        "event_type": "form_response",
        "form_response": form_response
    })
}

/// Files left in a directory (empty when it does not exist).
pub fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
