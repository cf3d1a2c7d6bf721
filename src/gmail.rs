//! Gmail delivery through the REST API with an OAuth2 authorized-user token.
//!
//! The token file uses the same layout Google's client libraries write
//! (`token`, `refresh_token`, `token_uri`, `client_id`, `client_secret`,
//! `scopes`, `expiry`), so an existing `token.json` keeps working.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart};
use lettre::Message;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::content::{
    EMAIL_ATTACHMENT_NAME, EMAIL_HTML_BODY, EMAIL_PLAIN_BODY, EMAIL_SUBJECT,
};
use crate::errors::{AppError, ResultExt};

pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Seconds before the recorded expiry at which a token is treated as stale.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client registration from `credentials.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Parses a Google client secret file in either the "installed" or "web" shape.
    pub fn from_json(data: &str) -> Result<Self, AppError> {
        let file: CredentialsFile = serde_json::from_str(data).map_err(|e| {
            AppError::InternalError(format!("Invalid OAuth credentials file: {}", e))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            AppError::InternalError(
                "OAuth credentials file has neither an 'installed' nor a 'web' client".to_string(),
            )
        })
    }

    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        Self::from_json(&data)
    }
}

/// Persisted OAuth2 authorized-user credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// Current access token
    #[serde(default)]
    pub token: Option<String>,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields written by other clients, preserved on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorizedUser {
    /// A token is usable when present and not within the expiry skew.
    /// Tokens without a recorded expiry are treated as valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expiry)) => now + ChronoDuration::seconds(EXPIRY_SKEW_SECS) < expiry,
        }
    }

    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::Unauthorized(format!(
                    "Gmail token file {} not found, run authorize_gmail first",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&data)
            .map_err(|e| AppError::InternalError(format!("Invalid Gmail token file: {}", e)))
    }

    pub async fn save(&self, path: &Path) -> Result<(), AppError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::InternalError(format!("Failed to encode token: {}", e)))?;
        tokio::fs::write(path, data)
            .await
            .with_context(|| format!("Failed to write token file {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Gmail API response for a sent message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentMessage {
    pub id: String,
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
}

/// Validates a recipient address before anything is sent.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    );

    match email_regex {
        Ok(re) if re.is_match(email) => true,
        Ok(_) => {
            tracing::warn!("❌ Invalid email format: {}", email);
            false
        }
        Err(e) => {
            tracing::error!("Email regex failed to compile: {}", e);
            false
        }
    }
}

/// Builds the report email as RFC 5322 bytes.
pub fn build_report_message(
    sender: &str,
    recipient: &str,
    pdf_bytes: Vec<u8>,
) -> Result<Vec<u8>, AppError> {
    let from: Mailbox = sender
        .parse()
        .map_err(|e| AppError::InternalError(format!("Invalid sender address '{}': {}", sender, e)))?;
    let to: Mailbox = recipient
        .parse()
        .map_err(|e| AppError::BadRequest(format!("Invalid recipient '{}': {}", recipient, e)))?;
    let pdf_type = ContentType::parse("application/pdf")
        .map_err(|e| AppError::InternalError(format!("Invalid content type: {}", e)))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(EMAIL_SUBJECT)
        .multipart(
            MultiPart::mixed()
                .multipart(MultiPart::alternative_plain_html(
                    EMAIL_PLAIN_BODY.to_string(),
                    EMAIL_HTML_BODY.to_string(),
                ))
                .singlepart(
                    Attachment::new(EMAIL_ATTACHMENT_NAME.to_string()).body(pdf_bytes, pdf_type),
                ),
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build email: {}", e)))?;

    Ok(message.formatted())
}

/// Consent URL for the installed-app loopback flow.
pub fn authorization_url(secret: &ClientSecret, redirect_uri: &str) -> Result<String, AppError> {
    let url = url::Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", GMAIL_SEND_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AppError::InternalError(format!("Invalid auth_uri: {}", e)))?;
    Ok(url.to_string())
}

async fn post_token_request(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AppError> {
    let response = client
        .post(token_uri)
        .form(form)
        .send()
        .await
        .map_err(|e| AppError::ExternalApiError(format!("Token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AppError::ExternalApiError(format!(
            "Token endpoint returned {}: {}",
            status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::ExternalApiError(format!("Failed to parse token response: {}", e)))
}

fn expiry_from(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in.map(|secs| Utc::now() + ChronoDuration::seconds(secs))
}

/// Exchanges an authorization code for a new authorized-user record.
pub async fn exchange_code(
    client: &Client,
    secret: &ClientSecret,
    code: &str,
    redirect_uri: &str,
) -> Result<AuthorizedUser, AppError> {
    let tokens = post_token_request(
        client,
        &secret.token_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;

    let refresh_token = tokens.refresh_token.ok_or_else(|| {
        AppError::ExternalApiError("Token endpoint did not return a refresh token".to_string())
    })?;

    Ok(AuthorizedUser {
        token: Some(tokens.access_token),
        refresh_token,
        token_uri: Some(secret.token_uri.clone()),
        client_id: Some(secret.client_id.clone()),
        client_secret: Some(secret.client_secret.clone()),
        scopes: tokens
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| vec![GMAIL_SEND_SCOPE.to_string()]),
        expiry: expiry_from(tokens.expires_in),
        extra: Map::new(),
    })
}

/// Client for sending report emails through Gmail.
#[derive(Clone)]
pub struct GmailClient {
    client: Client,
    base_url: String,
    sender: String,
    credentials_path: PathBuf,
    token_path: PathBuf,
    tokens: Arc<Mutex<Option<AuthorizedUser>>>,
}

impl GmailClient {
    /// Creates a new `GmailClient`. Token files are read on first use.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Gmail client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.gmail_base_url.clone(),
            sender: config.report_sender.clone(),
            credentials_path: config.gmail_credentials_path.clone(),
            token_path: config.gmail_token_path.clone(),
            tokens: Arc::new(Mutex::new(None)),
        })
    }

    /// Returns a valid access token, refreshing and persisting it when stale.
    async fn access_token(&self) -> Result<String, AppError> {
        let mut guard = self.tokens.lock().await;

        let mut user = match guard.take() {
            Some(user) => user,
            None => AuthorizedUser::load(&self.token_path).await?,
        };

        if !user.is_valid_at(Utc::now()) {
            tracing::info!("Gmail access token expired, refreshing");
            self.refresh(&mut user).await?;
            if let Err(e) = user.save(&self.token_path).await {
                tracing::warn!("⚠️ Refreshed Gmail token kept in memory only: {}", e);
            }
        }

        let token = user.token.clone();
        *guard = Some(user);
        token.ok_or_else(|| {
            AppError::Unauthorized("Gmail token file has no access token".to_string())
        })
    }

    async fn refresh(&self, user: &mut AuthorizedUser) -> Result<(), AppError> {
        // Client id and secret come from the token file first, credentials.json otherwise
        let (client_id, client_secret, token_uri) =
            match (&user.client_id, &user.client_secret) {
                (Some(id), Some(secret)) => (
                    id.clone(),
                    secret.clone(),
                    user.token_uri.clone().unwrap_or_else(default_token_uri),
                ),
                _ => {
                    let secret = ClientSecret::load(&self.credentials_path).await?;
                    let token_uri = user.token_uri.clone().unwrap_or(secret.token_uri);
                    (secret.client_id, secret.client_secret, token_uri)
                }
            };

        let tokens = post_token_request(
            &self.client,
            &token_uri,
            &[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
        .map_err(|e| match e {
            AppError::ExternalApiError(msg) => AppError::Unauthorized(format!(
                "Gmail token refresh failed, run authorize_gmail again: {}",
                msg
            )),
            other => other,
        })?;

        user.token = Some(tokens.access_token);
        user.expiry = expiry_from(tokens.expires_in);
        if let Some(refresh_token) = tokens.refresh_token {
            user.refresh_token = refresh_token;
        }
        tracing::info!("✓ Gmail access token refreshed");
        Ok(())
    }

    /// Sends the rendered report to `recipient` as `CMRA_Report.pdf`.
    ///
    /// # Arguments
    ///
    /// * `recipient` - Respondent email address.
    /// * `pdf_path` - Path to the rendered report.
    ///
    /// # Returns
    ///
    /// * `Result<SentMessage, AppError>` - The Gmail message id.
    pub async fn send_report(
        &self,
        recipient: &str,
        pdf_path: &Path,
    ) -> Result<SentMessage, AppError> {
        if !is_valid_email(recipient) {
            return Err(AppError::BadRequest(format!(
                "Invalid recipient email: {}",
                recipient
            )));
        }

        let pdf_bytes = tokio::fs::read(pdf_path)
            .await
            .with_context(|| format!("Failed to read report {}", pdf_path.display()))?;
        let raw = build_report_message(&self.sender, recipient, pdf_bytes)?;
        let access_token = self.access_token().await?;

        let url = format!("{}/gmail/v1/users/me/messages/send", self.base_url);
        tracing::info!("Sending report to {}", recipient);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({ "raw": URL_SAFE.encode(raw) }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Gmail request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Gmail returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Gmail returned status {}: {}",
                status, error_text
            )));
        }

        let sent: SentMessage = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Gmail response: {}", e))
        })?;

        tracing::info!("✓ Message Id: {}", sent.id);
        Ok(sent)
    }
}
