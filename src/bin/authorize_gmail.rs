//! One-time Gmail authorization.
//!
//! Prints a consent URL, waits for Google to redirect back to a loopback
//! listener with the authorization code, and writes the resulting token file.

use axum::{extract::Query, routing::get, Router};
use cmra_report_api::gmail::{authorization_url, exchange_code, ClientSecret};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

fn path_var(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .into()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let credentials_path = path_var("GMAIL_CREDENTIALS_PATH", "credentials.json");
    let token_path = path_var("GMAIL_TOKEN_PATH", "token.json");

    let secret = ClientSecret::load(&credentials_path).await?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
    let consent_url = authorization_url(&secret, &redirect_uri)?;

    println!("Open this URL in a browser to authorize Gmail access:\n\n{}\n", consent_url);

    let (tx, rx) = oneshot::channel::<Result<String, String>>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let app = Router::new().route(
        "/",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let tx = tx.clone();
            async move {
                let result = match (params.get("code"), params.get("error")) {
                    (Some(code), _) => Ok(code.clone()),
                    (None, Some(error)) => Err(error.clone()),
                    (None, None) => Err("no authorization code in redirect".to_string()),
                };
                let sender = tx.lock().ok().and_then(|mut guard| guard.take());
                if let Some(sender) = sender {
                    let _ = sender.send(result);
                }
                "Authorization received. You can close this window."
            }
        }),
    );

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let code = rx
        .await
        .map_err(|_| anyhow::anyhow!("authorization listener stopped"))?
        .map_err(|e| anyhow::anyhow!("authorization denied: {}", e))?;
    server.abort();

    let user = exchange_code(&reqwest::Client::new(), &secret, &code, &redirect_uri).await?;
    user.save(&token_path).await?;

    tracing::info!("✓ Token written to {}", token_path.display());
    Ok(())
}
