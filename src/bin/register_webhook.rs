//! Registers (or updates) the Typeform webhook that delivers new CMRA responses.

use cmra_report_api::config::Config;
use cmra_report_api::typeform::TypeformClient;

/// Main entry point for the registration script.
///
/// Points the form's webhook at `{APP_URL}/webhook`, signing deliveries with
/// `TYPEFORM_WEBHOOK_SECRET` when one is configured.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let app_url = config
        .app_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("APP_URL must be set to register the webhook"))?;
    let target = url::Url::parse(&format!("{}/webhook", app_url))?;

    let client = TypeformClient::new(&config)?;
    let registered = client
        .register_webhook(
            &config.webhook_name,
            target.as_str(),
            config.webhook_secret.as_deref(),
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&registered)?);
    Ok(())
}
