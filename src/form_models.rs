use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typeform webhook delivery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    /// Unique id of this delivery, reused by Typeform on retries
    pub event_id: String,

    /// Event type (always "form_response" for the CMRA subscription)
    #[serde(default)]
    pub event_type: Option<String>,

    /// The submitted response
    pub form_response: RawFormResponse,
}

/// A single form response, either from a webhook or from the responses API.
///
/// Answers and scores are kept as raw JSON so that one malformed entry does not
/// reject the whole payload; the parser decides what to keep.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawFormResponse {
    /// Response token
    #[serde(default)]
    pub token: Option<String>,

    /// Response id (responses API only)
    #[serde(default)]
    pub response_id: Option<String>,

    #[serde(default)]
    pub form_id: Option<String>,

    #[serde(default)]
    pub landed_at: Option<String>,

    #[serde(default)]
    pub submitted_at: Option<String>,

    /// Answer entries; `None` when the container is missing or null
    #[serde(default)]
    pub answers: Option<Vec<Value>>,

    /// Score entries (`key`/`number` pairs)
    #[serde(default)]
    pub scores: Option<Vec<Value>>,

    /// Typeform's own name for the score entries
    #[serde(default)]
    pub variables: Option<Vec<Value>>,
}

impl RawFormResponse {
    /// Identifier used in logs: the response id, or the token.
    pub fn id(&self) -> Option<&str> {
        self.response_id.as_deref().or(self.token.as_deref())
    }

    /// Score entries, preferring `scores` over `variables`.
    pub fn score_entries(&self) -> Option<&[Value]> {
        self.scores.as_deref().or(self.variables.as_deref())
    }
}

/// One page of the Typeform responses API
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponsesPage {
    #[serde(default)]
    pub total_items: u64,

    #[serde(default)]
    pub page_count: u64,

    #[serde(default)]
    pub items: Vec<RawFormResponse>,
}

/// Response sent back to the webhook caller
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub warnings: Vec<String>,
}
