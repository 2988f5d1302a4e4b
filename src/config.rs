//! Layered configuration
//!
//! Sources, lowest precedence first: built-in defaults, `config/default`,
//! `config/local`, an explicit `--config` file, `FIXTURE_PROXY__*`
//! environment variables (for example `FIXTURE_PROXY__UPSTREAM__PORT=4000`),
//! then command-line flags.

use crate::proxy::types::{
    AllowedHeaderName, GraphqlPathPrefix, ListenPort, ProxyConfig, UpstreamPort,
    DEFAULT_CACHE_DIR, DEFAULT_FINGERPRINT_HEADER, DEFAULT_GRAPHQL_PATH, DEFAULT_UPSTREAM_PORT,
};
use crate::{Error, Result};
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "FIXTURE_PROXY";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Command-line flags; anything given here overrides every other source
#[derive(Debug, Default, Clone, Parser)]
#[command(
    name = "fixture_proxy",
    version,
    about = "Record backend responses to disk and replay them as fixtures"
)]
pub struct CommandLine {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Loopback port of the backend to record
    #[arg(short = 'u', long)]
    pub upstream_port: Option<u16>,

    /// Always forward to the backend and overwrite recorded fixtures
    #[arg(long)]
    pub skip_cache: bool,

    /// Directory holding recorded fixtures
    #[arg(short = 'd', long)]
    pub cache_dir: Option<PathBuf>,

    /// Request header folded into the fingerprint (repeatable)
    #[arg(long = "header", value_name = "NAME")]
    pub headers: Vec<String>,

    /// Path prefix of the GraphQL endpoint
    #[arg(long)]
    pub graphql_path: Option<String>,

    /// Extra configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
    pub fingerprint: FingerprintSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub skip: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FingerprintSettings {
    pub headers: Vec<String>,
    pub graphql_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Settings {
    /// Defaults, files and environment only
    pub fn new() -> std::result::Result<Self, ConfigError> {
        Self::load(&CommandLine::default())
    }

    pub fn load(cli: &CommandLine) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("application.host", DEFAULT_HOST)?
            .set_default("application.port", i64::from(DEFAULT_LISTEN_PORT))?
            .set_default("upstream.port", i64::from(DEFAULT_UPSTREAM_PORT))?
            .set_default("cache.directory", DEFAULT_CACHE_DIR)?
            .set_default("cache.skip", false)?
            .set_default("fingerprint.headers", vec![DEFAULT_FINGERPRINT_HEADER])?
            .set_default("fingerprint.graphql_path", DEFAULT_GRAPHQL_PATH)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::from(path.as_path()));
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("fingerprint.headers")
                    .try_parsing(true),
            )
            .set_override_option("application.port", cli.port.map(i64::from))?
            .set_override_option("upstream.port", cli.upstream_port.map(i64::from))?
            .set_override_option("cache.skip", cli.skip_cache.then_some(true))?
            .set_override_option(
                "cache.directory",
                cli.cache_dir
                    .as_ref()
                    .map(|path| path.to_string_lossy().into_owned()),
            )?
            .set_override_option("fingerprint.graphql_path", cli.graphql_path.clone())?;

        if !cli.headers.is_empty() {
            builder = builder.set_override("fingerprint.headers", cli.headers.clone())?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn listen_port(&self) -> Result<ListenPort> {
        ListenPort::try_new(self.application.port)
            .map_err(|e| Error::invalid_setting("application.port", e))
    }

    /// Validate the raw settings into the core proxy configuration
    pub fn proxy_config(&self) -> Result<ProxyConfig> {
        let upstream_port = UpstreamPort::try_new(self.upstream.port)
            .map_err(|e| Error::invalid_setting("upstream.port", e))?;

        let allowed_headers = self
            .fingerprint
            .headers
            .iter()
            .map(|name| {
                AllowedHeaderName::try_new(name.as_str())
                    .map_err(|e| Error::invalid_setting("fingerprint.headers", format!("{name:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let graphql_path = GraphqlPathPrefix::try_new(self.fingerprint.graphql_path.as_str())
            .map_err(|e| Error::invalid_setting("fingerprint.graphql_path", e))?;

        Ok(ProxyConfig {
            upstream_port,
            skip_cache: self.cache.skip,
            cache_dir: self.cache.directory.clone(),
            allowed_headers,
            graphql_path,
        })
    }
}
