use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_TYPEFORM_BASE_URL: &str = "https://api.typeform.com";
const DEFAULT_GMAIL_BASE_URL: &str = "https://gmail.googleapis.com";
const DEFAULT_FORM_ID: &str = "SKFDhMKo";
const DEFAULT_WEBHOOK_NAME: &str = "cmra_webhook";
const DEFAULT_SENDER: &str = "Antioch21 <admin@antioch21.sg>";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub typeform_token: String,
    pub typeform_base_url: String,
    pub form_id: String,
    pub webhook_name: String,
    /// Public URL of this service, used when registering the webhook
    pub app_url: Option<String>,
    /// Typeform webhook secret; when set, deliveries must be signed
    pub webhook_secret: Option<String>,
    pub gmail_base_url: String,
    pub gmail_credentials_path: PathBuf,
    pub gmail_token_path: PathBuf,
    pub report_sender: String,
    pub report_work_dir: PathBuf,
    pub test_email_fixture: PathBuf,
    pub test_email_recipient: Option<String>,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn http_url(name: &str, url: String) -> anyhow::Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            typeform_token: std::env::var("TYPEFORM_PERSONAL_ACCESS_TOKEN")
                .map_err(|_| {
                    anyhow::anyhow!("TYPEFORM_PERSONAL_ACCESS_TOKEN environment variable required")
                })
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("TYPEFORM_PERSONAL_ACCESS_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            typeform_base_url: http_url(
                "TYPEFORM_BASE_URL",
                optional_var("TYPEFORM_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TYPEFORM_BASE_URL.to_string()),
            )?,
            form_id: optional_var("CMRA_FORM_ID").unwrap_or_else(|| DEFAULT_FORM_ID.to_string()),
            webhook_name: optional_var("CMRA_WEBHOOK_NAME")
                .unwrap_or_else(|| DEFAULT_WEBHOOK_NAME.to_string()),
            app_url: optional_var("APP_URL")
                .map(|url| http_url("APP_URL", url))
                .transpose()?,
            webhook_secret: optional_var("TYPEFORM_WEBHOOK_SECRET"),
            gmail_base_url: http_url(
                "GMAIL_API_BASE_URL",
                optional_var("GMAIL_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GMAIL_BASE_URL.to_string()),
            )?,
            gmail_credentials_path: optional_var("GMAIL_CREDENTIALS_PATH")
                .unwrap_or_else(|| "credentials.json".to_string())
                .into(),
            gmail_token_path: optional_var("GMAIL_TOKEN_PATH")
                .unwrap_or_else(|| "token.json".to_string())
                .into(),
            report_sender: optional_var("REPORT_SENDER")
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            report_work_dir: optional_var("REPORT_WORK_DIR")
                .unwrap_or_else(|| "reports".to_string())
                .into(),
            test_email_fixture: optional_var("TEST_EMAIL_FIXTURE")
                .unwrap_or_else(|| "fixtures/example-webhook-response.json".to_string())
                .into(),
            test_email_recipient: optional_var("TEST_EMAIL_RECIPIENT"),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Typeform Base URL: {}", config.typeform_base_url);
        tracing::debug!("Form ID: {}", config.form_id);
        tracing::debug!("Gmail Base URL: {}", config.gmail_base_url);
        tracing::debug!("Report directory: {}", config.report_work_dir.display());
        if config.webhook_secret.is_none() {
            tracing::warn!("TYPEFORM_WEBHOOK_SECRET not set, webhook signatures are not verified");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_url_validation() {
        assert_eq!(
            http_url("X", "https://api.typeform.com/".to_string()).unwrap(),
            "https://api.typeform.com"
        );
        assert!(http_url("X", "ftp://example.com".to_string()).is_err());
    }
}
