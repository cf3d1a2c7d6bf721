use crate::config::Config;
use crate::errors::AppError;
use crate::form_models::ResponsesPage;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Typeform caps `page_size` at 1000.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Query parameters for the responses API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesQuery {
    pub page_size: Option<u32>,
    /// Only responses submitted before this response token
    pub before: Option<String>,
}

/// Client for the Typeform REST API.
#[derive(Clone)]
pub struct TypeformClient {
    client: Client,
    base_url: String,
    token: String,
    form_id: String,
}

impl TypeformClient {
    /// Creates a new `TypeformClient` from the configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Typeform client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.typeform_base_url.clone(),
            token: config.typeform_token.clone(),
            form_id: config.form_id.clone(),
        })
    }

    /// Fetches one page of completed responses for the CMRA form.
    ///
    /// # Arguments
    ///
    /// * `query` - Page size and pagination cursor.
    ///
    /// # Returns
    ///
    /// * `Result<ResponsesPage, AppError>` - The page of responses.
    pub async fn fetch_responses(&self, query: &ResponsesQuery) -> Result<ResponsesPage, AppError> {
        let page_size = query.page_size.unwrap_or(25).clamp(1, MAX_PAGE_SIZE).to_string();
        let mut params = vec![("page_size", page_size.as_str()), ("completed", "true")];
        if let Some(before) = query.before.as_deref() {
            params.push(("before", before));
        }

        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(
            &format!("{}/forms/{}/responses", self.base_url, self.form_id),
            &params,
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Fetching Typeform responses for form {}", self.form_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Typeform request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Typeform returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Typeform returned status {}: {}",
                status, error_text
            )));
        }

        let page: ResponsesPage = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Typeform responses: {}", e))
        })?;

        tracing::info!(
            "Fetched {} response(s) ({} total)",
            page.items.len(),
            page.total_items
        );
        Ok(page)
    }

    /// Creates or updates the webhook subscription for new responses.
    ///
    /// # Arguments
    ///
    /// * `name` - Webhook tag, unique per form.
    /// * `target_url` - Endpoint Typeform will POST responses to.
    /// * `secret` - Optional signing secret.
    pub async fn register_webhook(
        &self,
        name: &str,
        target_url: &str,
        secret: Option<&str>,
    ) -> Result<Value, AppError> {
        let url = format!(
            "{}/forms/{}/webhooks/{}",
            self.base_url, self.form_id, name
        );

        let mut body = json!({
            "url": target_url,
            "enabled": true,
            "events": ["form_response"],
        });
        if let Some(secret) = secret {
            body["secret"] = json!(secret);
        }

        tracing::info!("Registering webhook '{}' -> {}", name, target_url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Webhook registration failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Typeform webhook registration failed {}: {}",
                status, error_text
            )));
        }

        let data = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse webhook response: {}", e))
        })?;

        tracing::info!("✓ Webhook '{}' registered", name);
        Ok(data)
    }
}
