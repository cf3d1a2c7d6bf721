//! Renders a report from a saved webhook payload without sending it.
//!
//! Usage: `render_report <payload.json> [output-dir]`

use cmra_report_api::form_models::WebhookEnvelope;
use cmra_report_api::pdf::render_report;
use cmra_report_api::report::{assemble, ReportContext};
use cmra_report_api::response::parse;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let payload_path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: render_report <payload.json> [output-dir]"))?;
    let out_dir: PathBuf = args.next().unwrap_or_else(|| "reports".to_string()).into();

    let data = std::fs::read_to_string(&payload_path)?;
    let envelope: WebhookEnvelope = serde_json::from_str(&data)?;

    let outcome = parse(&envelope.form_response)?;
    for warning in &outcome.warnings {
        tracing::warn!("{}", warning);
    }

    let document = assemble(&outcome.response, &ReportContext::for_response(&outcome.response))?;
    let rendered = render_report(&document, &out_dir)?;

    println!("{}", rendered.pdf_path.display());
    Ok(())
}
