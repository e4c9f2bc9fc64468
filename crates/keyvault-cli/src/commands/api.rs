//! REST API command handler

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::info;

use keyvault_core::{ApiConfig, ApiServer, Config, KeyStore};

use crate::output::Output;

/// Options from `start_api [port] [use_https] [cert_file] [key_file]`
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub port: Option<u16>,
    pub use_https: bool,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
}

/// Run the API server until Ctrl+C or SIGTERM
pub async fn start(config: &Config, options: StartOptions, output: &Output) -> Result<()> {
    if options.use_https {
        bail!(
            "HTTPS termination is not built in (cert {}, key {}). \
             Run behind a TLS-terminating proxy and start the API without use_https.",
            options.cert_file.as_deref().unwrap_or("server.crt"),
            options.key_file.as_deref().unwrap_or("server.key"),
        );
    }

    let mut api_config = ApiConfig::from_config(config).context(
        "No API key configured. Set api_key with `keyvault config set api_key <secret>` \
         or the KEYVAULT_API_KEY environment variable.",
    )?;
    if let Some(port) = options.port {
        api_config = api_config.with_port(port);
    }

    let store = Arc::new(KeyStore::open(config));
    let mut server = ApiServer::new(store, api_config);
    let addr = server
        .start()
        .await
        .with_context(|| format!("Failed to start API server on {}", server.config().socket_addr()))?;

    output.success(&format!(
        "API server started on http://{}. Press Ctrl+C to stop.",
        addr
    ));

    shutdown_signal().await?;
    output.message("Stopping API server...");
    server.stop().await.context("API server did not shut down cleanly")?;
    Ok(())
}

/// Wait for Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

/// Parse the positional `use_https` flag
pub fn parse_flag(value: &str) -> bool {
    matches!(value, "true" | "1")
}
