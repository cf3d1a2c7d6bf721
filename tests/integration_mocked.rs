/// Integration tests with mocked external APIs
/// Exercises the Typeform and Gmail clients and the full delivery pipeline
/// without hitting real external services
mod common;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use cmra_report_api::errors::AppError;
use cmra_report_api::form_models::{RawFormResponse, WebhookEnvelope};
use cmra_report_api::gmail::GmailClient;
use cmra_report_api::handlers::AppState;
use cmra_report_api::pdf::render_report;
use cmra_report_api::pipeline::{deliver_raw, process_backlog, BacklogStatus};
use cmra_report_api::report::{assemble, ReportContext};
use cmra_report_api::response::parse;
use cmra_report_api::typeform::{ResponsesQuery, TypeformClient};
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_gmail_send(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .and(header("authorization", format!("Bearer {}", TEST_ACCESS_TOKEN).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "msg-123", "threadId": "t-1"})),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn raw_response(value: serde_json::Value) -> RawFormResponse {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_typeform_fetch_responses() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let page = json!({
        "total_items": 2,
        "page_count": 1,
        "items": [
            form_response(Some("a@church.org"), "Church A", 10.0, 10.0),
            form_response(Some("b@church.org"), "Church B", 20.0, 5.0)
        ]
    });

    Mock::given(method("GET"))
        .and(path("/forms/SKFDhMKo/responses"))
        .and(query_param("page_size", "10"))
        .and(query_param("completed", "true"))
        .and(query_param("before", "tok-older"))
        .and(header("authorization", "Bearer test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), dir.path());
    let client = TypeformClient::new(&config).unwrap();

    let result = client
        .fetch_responses(&ResponsesQuery {
            page_size: Some(10),
            before: Some("tok-older".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(result.total_items, 2);
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[1].token.as_deref(), Some("tok-church-b"));
}

#[tokio::test]
async fn test_typeform_error_status_is_external_error() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/forms/SKFDhMKo/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), dir.path());
    let client = TypeformClient::new(&config).unwrap();

    let err = client
        .fetch_responses(&ResponsesQuery::default())
        .await
        .unwrap_err();
    match err {
        AppError::ExternalApiError(msg) => assert!(msg.contains("invalid token")),
        other => panic!("expected ExternalApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_typeform_register_webhook() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("PUT"))
        .and(path("/forms/SKFDhMKo/webhooks/cmra_webhook"))
        .and(body_partial_json(json!({
            "url": "https://reports.example.org/webhook",
            "enabled": true,
            "events": ["form_response"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": "cmra_webhook",
            "enabled": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), dir.path());
    let client = TypeformClient::new(&config).unwrap();

    let registered = client
        .register_webhook("cmra_webhook", "https://reports.example.org/webhook", None)
        .await
        .unwrap();
    assert_eq!(registered["tag"], "cmra_webhook");
}

#[tokio::test]
async fn test_gmail_send_report_builds_attachment() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());
    write_valid_token(&config.gmail_token_path);
    mount_gmail_send(&mock_server, 1).await;

    let pdf_path = dir.path().join("report.pdf");
    std::fs::write(&pdf_path, b"%PDF-1.3 fake").unwrap();

    let client = GmailClient::new(&config).unwrap();
    let sent = client
        .send_report("pastor@church.org", &pdf_path)
        .await
        .unwrap();
    assert_eq!(sent.id, "msg-123");

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    let raw = URL_SAFE.decode(body["raw"].as_str().unwrap()).unwrap();
    let message = String::from_utf8_lossy(&raw);
    assert!(message.contains("To: pastor@church.org"));
    assert!(message.contains("CMRA_Report.pdf"));
    assert!(message.contains("application/pdf"));
}

#[tokio::test]
async fn test_gmail_rejects_invalid_recipient_without_calling_api() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());
    write_valid_token(&config.gmail_token_path);
    mount_gmail_send(&mock_server, 0).await;

    let pdf_path = dir.path().join("report.pdf");
    std::fs::write(&pdf_path, b"%PDF-1.3 fake").unwrap();

    let client = GmailClient::new(&config).unwrap();
    let err = client.send_report("not-an-email", &pdf_path).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_gmail_refreshes_expired_token() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());

    let expired = json!({
        "token": "ya29.expired",
        "refresh_token": "1//refresh",
        "token_uri": format!("{}/token", mock_server.uri()),
        "client_id": "client-id",
        "client_secret": "client-secret",
        "scopes": ["https://www.googleapis.com/auth/gmail.send"],
        "expiry": "2020-01-01T00:00:00Z"
    });
    std::fs::write(&config.gmail_token_path, expired.to_string()).unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TEST_ACCESS_TOKEN,
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_gmail_send(&mock_server, 2).await;

    let pdf_path = dir.path().join("report.pdf");
    std::fs::write(&pdf_path, b"%PDF-1.3 fake").unwrap();

    let client = GmailClient::new(&config).unwrap();
    client.send_report("pastor@church.org", &pdf_path).await.unwrap();
    // Second send reuses the refreshed token
    client.send_report("pastor@church.org", &pdf_path).await.unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.gmail_token_path).unwrap())
            .unwrap();
    assert_eq!(saved["token"], TEST_ACCESS_TOKEN);
    assert_eq!(saved["refresh_token"], "1//refresh");
}

#[tokio::test]
async fn test_gmail_refresh_uses_credentials_file() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());

    std::fs::write(
        &config.gmail_token_path,
        json!({ "refresh_token": "1//refresh" }).to_string(),
    )
    .unwrap();
    std::fs::write(
        &config.gmail_credentials_path,
        json!({
            "installed": {
                "client_id": "installed-id",
                "client_secret": "installed-secret",
                "token_uri": format!("{}/token", mock_server.uri())
            }
        })
        .to_string(),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TEST_ACCESS_TOKEN,
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_gmail_send(&mock_server, 1).await;

    let pdf_path = dir.path().join("report.pdf");
    std::fs::write(&pdf_path, b"%PDF-1.3 fake").unwrap();

    let client = GmailClient::new(&config).unwrap();
    client.send_report("pastor@church.org", &pdf_path).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let form = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(form.contains("client_id=installed-id"));
    assert!(form.contains("grant_type=refresh_token"));
}

#[tokio::test]
async fn test_gmail_refresh_failure_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());

    std::fs::write(
        &config.gmail_token_path,
        json!({
            "refresh_token": "1//revoked",
            "token_uri": format!("{}/token", mock_server.uri()),
            "client_id": "client-id",
            "client_secret": "client-secret"
        })
        .to_string(),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&mock_server)
        .await;

    let pdf_path = dir.path().join("report.pdf");
    std::fs::write(&pdf_path, b"%PDF-1.3 fake").unwrap();

    let client = GmailClient::new(&config).unwrap();
    let err = client
        .send_report("pastor@church.org", &pdf_path)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_gmail_missing_token_file_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config("http://127.0.0.1:9".to_string(), dir.path());

    let pdf_path = dir.path().join("report.pdf");
    std::fs::write(&pdf_path, b"%PDF-1.3 fake").unwrap();

    let client = GmailClient::new(&config).unwrap();
    let err = client
        .send_report("pastor@church.org", &pdf_path)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[test]
fn test_render_names_pdf_after_church_and_removes_chart() {
    let dir = tempfile::tempdir().unwrap();
    let raw = raw_response(form_response(
        Some("grace@church.org"),
        "St. Andrew's Cathedral",
        20.0,
        12.5,
    ));

    let outcome = parse(&raw).unwrap();
    assert!(outcome.warnings.is_empty());
    let document = assemble(&outcome.response, &ReportContext::for_response(&outcome.response))
        .unwrap();
    let rendered = render_report(&document, dir.path()).unwrap();

    let file_name = rendered
        .pdf_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert_eq!(
        file_name,
        "church_missions_readiness_report_St_Andrew_s_Cathedral.pdf"
    );
    assert!(std::fs::metadata(&rendered.pdf_path).unwrap().len() > 0);
    for temp in &rendered.temp_files {
        assert!(!temp.exists(), "{} should be removed", temp.display());
    }
    assert_eq!(files_in(dir.path()), vec![file_name]);

    assert_eq!(rendered.cleanup(), 1);
    assert_eq!(rendered.cleanup(), 0);
}

#[tokio::test]
async fn test_end_to_end_delivery_cleans_up() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());
    write_valid_token(&config.gmail_token_path);
    mount_gmail_send(&mock_server, 1).await;

    let work_dir = config.report_work_dir.clone();
    let state = AppState::new(config).unwrap();
    let raw = raw_response(form_response(
        Some("grace@church.org"),
        "Covenant Grace Church",
        20.0,
        15.0,
    ));

    let outcome = deliver_raw(&state, &raw, None).await.unwrap();

    assert_eq!(outcome.message_id, "msg-123");
    assert_eq!(outcome.recipient, "grace@church.org");
    assert_eq!(outcome.church, "Covenant Grace Church");
    assert!(outcome.warnings.is_empty());
    assert!(files_in(&work_dir).is_empty());
}

#[tokio::test]
async fn test_failed_send_still_cleans_up() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());
    write_valid_token(&config.gmail_token_path);

    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let work_dir = config.report_work_dir.clone();
    let state = AppState::new(config).unwrap();
    let raw = raw_response(form_response(
        Some("grace@church.org"),
        "Covenant Grace Church",
        20.0,
        15.0,
    ));

    let err = deliver_raw(&state, &raw, None).await.unwrap_err();
    assert!(matches!(err.root(), AppError::ExternalApiError(_)));
    assert!(files_in(&work_dir).is_empty());
}

#[tokio::test]
async fn test_cancelled_delivery_cleans_up() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());
    write_valid_token(&config.gmail_token_path);

    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "msg-late"}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let work_dir = config.report_work_dir.clone();
    let state = Arc::new(AppState::new(config).unwrap());
    let raw = raw_response(form_response(
        Some("grace@church.org"),
        "Covenant Grace Church",
        20.0,
        15.0,
    ));

    let task_state = Arc::clone(&state);
    let delivery = tokio::spawn(async move { deliver_raw(&task_state, &raw, None).await });

    // Wait until the PDF is rendered and the send is in flight
    let mut in_flight = false;
    for _ in 0..200 {
        let requests = mock_server.received_requests().await.unwrap_or_default();
        if !requests.is_empty() {
            in_flight = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(in_flight);
    assert_eq!(files_in(&work_dir).len(), 1);

    delivery.abort();
    assert!(delivery.await.unwrap_err().is_cancelled());
    assert!(files_in(&work_dir).is_empty());
}

#[tokio::test]
async fn test_test_recipient_overrides_respondent() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());
    write_valid_token(&config.gmail_token_path);
    mount_gmail_send(&mock_server, 1).await;

    let state = AppState::new(config).unwrap();
    let fixture = include_str!("../fixtures/example-webhook-response.json");
    let envelope: WebhookEnvelope = serde_json::from_str(fixture).unwrap();

    let outcome = deliver_raw(&state, &envelope.form_response, Some("tester@example.org"))
        .await
        .unwrap();
    assert_eq!(outcome.recipient, "tester@example.org");
    assert_eq!(outcome.church, "Covenant Grace Church");
}

#[tokio::test]
async fn test_backlog_continues_after_failure() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(mock_server.uri(), dir.path());
    write_valid_token(&config.gmail_token_path);
    mount_gmail_send(&mock_server, 2).await;

    let state = AppState::new(config).unwrap();
    let items = vec![
        raw_response(form_response(Some("a@church.org"), "Church A", 20.0, 10.0)),
        raw_response(form_response(None, "Church B", 5.0, 5.0)),
        raw_response(form_response(Some("c@church.org"), "Church C", 25.0, 25.0)),
    ];

    let summary = process_backlog(&state, &items).await;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed, 1);
    assert!(matches!(summary.results[1].status, BacklogStatus::Failed));
    assert_eq!(summary.results[1].response_id.as_deref(), Some("tok-church-b"));
    assert_eq!(summary.results[2].message_id.as_deref(), Some("msg-123"));
}

#[tokio::test]
async fn test_backlog_failure_keeps_parse_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(create_test_config("http://127.0.0.1:9".to_string(), dir.path()))
        .unwrap();

    let mut no_email = form_response(None, "Church B", 5.0, 5.0);
    // Drops the last score, "partnerships"
    no_email["scores"].as_array_mut().unwrap().pop();

    let summary = process_backlog(&state, &[raw_response(no_email)]).await;

    assert_eq!(summary.failed, 1);
    let result = &summary.results[0];
    assert!(matches!(result.status, BacklogStatus::Failed));
    assert!(result.error.is_some());
    assert!(result.warnings.iter().any(|w| w.contains("partnerships")));
}
