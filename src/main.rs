use anyhow::{Context, Result};
use clap::Parser;
use fixture_proxy::config::{LogFormat, LoggingSettings};
use fixture_proxy::{Application, CommandLine, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLine::parse();
    let settings = Settings::load(&cli).context("Failed to load configuration")?;

    init_tracing(&settings.logging)?;

    info!("Starting fixture proxy");

    let app = Application::new(settings)?;
    app.run().await?;

    Ok(())
}

/// `RUST_LOG` wins over the configured level when set
fn init_tracing(logging: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level {:?}", logging.level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed
        .map_err(|e| fixture_proxy::Error::Logging(e.to_string()))
        .context("Failed to install tracing subscriber")
}
