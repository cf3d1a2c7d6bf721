//! Response parser: raw Typeform payload -> [`ParsedResponse`].
//!
//! Parsing never fails on unknown or malformed entries. Each skipped entry is
//! reported as a [`ParseWarning`] next to the parsed response; only a missing
//! `answers` or `scores` container is an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::form_models::RawFormResponse;
use crate::scores::{ScoreKey, ScoreSet};

/// Score keys that carry the overall figures rather than one of the 14 scores.
const OVERALL_SCORE_KEYS: [&str; 2] = ["score", "finalpercentage"];

/// Known form fields and their Typeform field ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Respondent,
    Email,
    Role,
    Church,
}

impl FieldId {
    pub const ALL: [FieldId; 4] = [
        FieldId::Respondent,
        FieldId::Email,
        FieldId::Role,
        FieldId::Church,
    ];

    pub fn id(self) -> &'static str {
        match self {
            FieldId::Respondent => "Wz6EJ0SrP537",
            FieldId::Email => "mQQ6n4XODVE8",
            FieldId::Role => "7rGpb91gC5Zv",
            FieldId::Church => "4yBh92Cyp8hz",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.id() == id)
    }
}

/// Respondent details taken from the answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerFields {
    pub respondent: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub church: Option<String>,
}

impl AnswerFields {
    fn set(&mut self, field: FieldId, value: String) {
        let slot = match field {
            FieldId::Respondent => &mut self.respondent,
            FieldId::Email => &mut self.email,
            FieldId::Role => &mut self.role,
            FieldId::Church => &mut self.church,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("form response has no '{0}' container")]
    MissingContainer(&'static str),
}

/// An input problem the parser recovered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    UnknownField { index: usize, field_id: String },
    MalformedAnswer { index: usize, reason: String },
    MalformedScore { index: usize, reason: String },
    UnknownScoreKey { key: String },
    MissingScore { key: ScoreKey },
    InvalidSubmittedAt { value: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnknownField { index, field_id } => {
                write!(f, "answer #{} has unknown field id '{}'", index, field_id)
            }
            ParseWarning::MalformedAnswer { index, reason } => {
                write!(f, "answer #{} skipped: {}", index, reason)
            }
            ParseWarning::MalformedScore { index, reason } => {
                write!(f, "score #{} skipped: {}", index, reason)
            }
            ParseWarning::UnknownScoreKey { key } => write!(f, "unknown score key '{}'", key),
            ParseWarning::MissingScore { key } => {
                write!(f, "score '{}' missing, defaulted to 0", key)
            }
            ParseWarning::InvalidSubmittedAt { value } => {
                write!(f, "submitted_at '{}' is not RFC 3339", value)
            }
        }
    }
}

/// A parsed, immutable survey response.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedResponse {
    pub response_id: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: AnswerFields,
    pub scores: ScoreSet,
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub response: ParsedResponse,
    pub warnings: Vec<ParseWarning>,
}

/// Parses a raw form response.
pub fn parse(raw: &RawFormResponse) -> Result<ParseOutcome, ParseError> {
    let answers = raw
        .answers
        .as_deref()
        .ok_or(ParseError::MissingContainer("answers"))?;
    let score_entries = raw
        .score_entries()
        .ok_or(ParseError::MissingContainer("scores"))?;

    let mut warnings = Vec::new();

    let answer_fields = parse_answers(answers, &mut warnings);
    let lookup = map_scores(score_entries, &mut warnings);

    let (scores, missing) = ScoreSet::from_lookup(&lookup);
    warnings.extend(
        missing
            .into_iter()
            .map(|key| ParseWarning::MissingScore { key }),
    );

    let submitted_at = raw.submitted_at.as_deref().and_then(|value| {
        match DateTime::parse_from_rfc3339(value) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(_) => {
                warnings.push(ParseWarning::InvalidSubmittedAt {
                    value: value.to_string(),
                });
                None
            }
        }
    });

    for warning in &warnings {
        tracing::debug!("Parse warning for response {:?}: {}", raw.id(), warning);
    }

    Ok(ParseOutcome {
        response: ParsedResponse {
            response_id: raw.id().map(str::to_string),
            submitted_at,
            answers: answer_fields,
            scores,
        },
        warnings,
    })
}

fn parse_answers(answers: &[Value], warnings: &mut Vec<ParseWarning>) -> AnswerFields {
    let mut fields = AnswerFields::default();

    for (index, answer) in answers.iter().enumerate() {
        let Some(field_id) = answer
            .get("field")
            .and_then(|f| f.get("id"))
            .and_then(Value::as_str)
        else {
            warnings.push(ParseWarning::MalformedAnswer {
                index,
                reason: "missing field.id".to_string(),
            });
            continue;
        };

        let Some(field) = FieldId::from_id(field_id) else {
            warnings.push(ParseWarning::UnknownField {
                index,
                field_id: field_id.to_string(),
            });
            continue;
        };

        // Text answers carry `text`; every other known field is an email answer.
        let value_key = match answer.get("type").and_then(Value::as_str) {
            Some("text") => "text",
            _ => "email",
        };

        match answer.get(value_key).and_then(Value::as_str) {
            Some(value) => fields.set(field, value.trim().to_string()),
            None => warnings.push(ParseWarning::MalformedAnswer {
                index,
                reason: format!("no '{}' value for field {}", value_key, field_id),
            }),
        }
    }

    fields
}

fn map_scores(entries: &[Value], warnings: &mut Vec<ParseWarning>) -> HashMap<String, f64> {
    let mut lookup = HashMap::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some(key) = entry.get("key").and_then(Value::as_str) else {
            warnings.push(ParseWarning::MalformedScore {
                index,
                reason: "missing key".to_string(),
            });
            continue;
        };

        let Some(number) = entry.get("number").and_then(Value::as_f64) else {
            warnings.push(ParseWarning::MalformedScore {
                index,
                reason: format!("'{}' has no numeric value", key),
            });
            continue;
        };

        if ScoreKey::from_key(key).is_none() && !OVERALL_SCORE_KEYS.contains(&key) {
            warnings.push(ParseWarning::UnknownScoreKey {
                key: key.to_string(),
            });
            continue;
        }

        lookup.insert(key.to_string(), number);
    }

    lookup
}
