//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `CUTOUT_CONFIG`
//! environment variable. A missing file is not an error: every key has a default, so the service
//! starts with no configuration at all.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `CUTOUT_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `CUTOUT_STORAGE__RETENTION=delete_after_response` sets the `storage.retention` field.
//!
//! ## Example
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 5000
//! storage:
//!   upload_dir: uploads
//!   result_dir: results
//!   retention: retain
//! removal:
//!   url: http://127.0.0.1:7000/api/remove
//! limits:
//!   max_upload_bytes: 26214400
//! ```

use anyhow::bail;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CUTOUT_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Artifact storage directories and retention policy
    pub storage: StorageConfig,
    /// Upstream background-removal model endpoint
    pub removal: RemovalConfig,
    /// Request size limits
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            storage: StorageConfig::default(),
            removal: RemovalConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Where request artifacts live and what happens to them after a response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory for uploaded input images (created at startup if absent)
    pub upload_dir: PathBuf,
    /// Directory for processed output images (created at startup if absent)
    pub result_dir: PathBuf,
    /// What to do with the artifact pair once a response has been served
    pub retention: ArtifactRetention,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            result_dir: PathBuf::from("results"),
            retention: ArtifactRetention::Retain,
        }
    }
}

/// Artifact retention policy.
///
/// `Retain` keeps every input/output pair on disk indefinitely.
/// `DeleteAfterResponse` removes both files once the response body has been
/// read back from disk; a failed deletion is logged and never surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRetention {
    Retain,
    DeleteAfterResponse,
}

/// Upstream model endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemovalConfig {
    /// Endpoint that accepts raw image bytes and returns them with the
    /// background removed, encoded as PNG
    pub url: Url,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:7000/api/remove").expect("default removal URL is valid"),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum accepted request body size in bytes (default: 25 MiB)
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let config: Self = Self::figment(args).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values.
            // CUTOUT_CONFIG names the config file itself (consumed by clap),
            // so it is not a config key.
            .merge(Env::prefixed("CUTOUT_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.limits.max_upload_bytes == 0 {
            bail!("Config validation: max_upload_bytes cannot be 0");
        }

        if self.storage.upload_dir == self.storage.result_dir {
            bail!(
                "Config validation: upload_dir and result_dir must differ (both set to {})",
                self.storage.upload_dir.display()
            );
        }

        match self.removal.url.scheme() {
            "http" | "https" => {}
            other => bail!("Config validation: removal.url must be http or https, got '{other}'"),
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
