//! CMRA Report API Library
//!
//! Turns completed Church Missions Readiness Assessment (CMRA) responses from
//! Typeform into a scored PDF report and emails it to the respondent through
//! Gmail.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Scoring, report assembly and rendering.
//! - `integrations`: External service clients and payload models.
//! - `chart`: Radar chart image.
//! - `config`: Configuration management.
//! - `content`: Static report and email copy.
//! - `errors`: Error handling types.
//! - `form_models`: Typeform payload models.
//! - `gmail`: Gmail OAuth2 and message delivery.
//! - `handlers`: Shared state and HTTP request handlers.
//! - `pdf`: PDF rendering and cleanup.
//! - `pipeline`: End-to-end report delivery.
//! - `report`: Report document assembly.
//! - `response`: Response parsing.
//! - `scores`: Score model, ranking and stage classification.
//! - `typeform`: Typeform REST client.
//! - `webhook_handler`: Typeform webhook endpoint.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod chart;
pub mod config;
pub mod content;
pub mod errors;
pub mod form_models;
pub mod gmail;
pub mod handlers;
pub mod pdf;
pub mod pipeline;
pub mod report;
pub mod response;
pub mod scores;
pub mod typeform;
pub mod webhook_handler;
