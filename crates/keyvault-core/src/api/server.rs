//! HTTP server lifecycle

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::router;
use crate::config::Config;
use crate::store::KeyStore;

/// Where the server listens and which key it accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub host: IpAddr,
    pub port: u16,
    pub api_key: String,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            api_key: api_key.into(),
        }
    }

    /// Build from the application config
    ///
    /// Returns `None` when no API key is configured; the server never runs
    /// without one. An unparseable host falls back to localhost.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        let host = config.api_host.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid api_host {:?}, listening on localhost",
                config.api_host
            );
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        });
        Some(Self {
            host,
            port: config.api_port,
            api_key,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

struct RunningServer {
    cancel: CancellationToken,
    handle: JoinHandle<io::Result<()>>,
    local_addr: SocketAddr,
}

/// Serves the key store over HTTP on a background task
pub struct ApiServer {
    config: ApiConfig,
    store: Arc<KeyStore>,
    running: Option<RunningServer>,
}

impl ApiServer {
    pub fn new(store: Arc<KeyStore>, config: ApiConfig) -> Self {
        Self {
            config,
            store,
            running: None,
        }
    }

    /// Bind and start serving
    ///
    /// Returns the bound address; with port 0 this is where the OS put us.
    /// Starting a running server is a no-op.
    pub async fn start(&mut self) -> io::Result<SocketAddr> {
        if let Some(running) = &self.running {
            info!("API server already running on {}", running.local_addr);
            return Ok(running.local_addr);
        }

        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;
        let app = router(Arc::clone(&self.store), &self.config.api_key);

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        });

        info!("API server listening on http://{}", local_addr);
        self.running = Some(RunningServer {
            cancel,
            handle,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Stop serving and wait for the listener to close
    ///
    /// Stopping a stopped server is a no-op.
    pub async fn stop(&mut self) -> io::Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.cancel.cancel();
        let result = match running.handle.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        };

        match &result {
            Ok(()) => info!("API server stopped"),
            Err(e) => error!("API server stopped with error: {}", e),
        }
        result
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}
