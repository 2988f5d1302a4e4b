use crate::config::Settings;
use crate::proxy::{ProxyConfig, ProxyService};
use crate::proxy::types::ListenPort;
use crate::{Error, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Main application struct that owns the validated configuration
pub struct Application {
    settings: Settings,
    proxy_config: ProxyConfig,
    listen_port: ListenPort,
}

impl Application {
    #[instrument(skip(settings))]
    pub fn new(settings: Settings) -> Result<Self> {
        let proxy_config = settings.proxy_config()?;
        let listen_port = settings.listen_port()?;

        Ok(Self {
            settings,
            proxy_config,
            listen_port,
        })
    }

    /// Bind the configured address without serving yet
    pub async fn bind(&self) -> Result<TcpListener> {
        let address = format!(
            "{}:{}",
            self.settings.application.host,
            self.listen_port.as_ref()
        );
        Ok(TcpListener::bind(address).await?)
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let cache_dir = self.proxy_config.cache_dir.clone();
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|source| Error::CacheDirectory {
                path: cache_dir.clone(),
                source,
            })?;

        let local_addr: SocketAddr = listener.local_addr()?;
        info!(
            listen = %local_addr,
            upstream_port = %self.proxy_config.upstream_port.as_ref(),
            cache_dir = %cache_dir.display(),
            skip_cache = self.proxy_config.skip_cache,
            "Starting fixture proxy"
        );
        if self.proxy_config.skip_cache {
            warn!("Cache lookups disabled; every request is forwarded and re-recorded");
        }

        let router = ProxyService::new(self.proxy_config).into_router();
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Fixture proxy stopped");
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn proxy_config(&self) -> &ProxyConfig {
        &self.proxy_config
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
