//! Runtime configuration.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. Compiled-in defaults ([`DEFAULT_URLS`], [`DEFAULT_DATABASE`])
//! 2. An optional YAML file passed with `--config`
//! 3. Command-line flags and their environment variables
//!
//! ```yaml
//! database: /var/lib/article_stash/documents.json
//! urls:
//!   - https://apnews.com/article/...
//! attrs: [title, cleaned_text, authors]
//! extractor:
//!   browser_user_agent: "Mozilla/5.0 (X11; Linux x86_64)"
//!   http_timeout_secs: 20
//!   unknown_attrs: reject
//!   max_elements_to_parse: 20000
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::cli::Cli;
use crate::error::Result;
use crate::extractor::{ExtractorConfig, UnknownAttrPolicy};

/// Store location used when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "/tmp/documents.json";

/// Articles processed when no URLs are configured.
pub const DEFAULT_URLS: [&str; 3] = [
    "https://apnews.com/article/south-korea-martial-law-3210438b8663fe609bfe4cb8b748a114",
    "https://www.npr.org/2024/12/11/1218506698/code-switch-black-utopians",
    "https://www.npr.org/2024/12/09/nx-s1-5200587/mina-new-album-gassa-damante-italy",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Articles to extract, processed in order.
    pub urls: Vec<String>,
    /// Path of the JSON document store.
    pub database: PathBuf,
    /// Attribute allow-list; `None` stores the default `infos` bundle.
    pub attrs: Option<Vec<String>>,
    pub extractor: ExtractorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            urls: DEFAULT_URLS.iter().map(|u| u.to_string()).collect(),
            database: PathBuf::from(DEFAULT_DATABASE),
            attrs: None,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml_str(&yaml)?;
        info!(urls = config.urls.len(), "Loaded configuration");
        Ok(config)
    }

    /// Build the effective configuration for a CLI invocation.
    pub async fn resolve(cli: &Cli) -> Result<Self> {
        let base = match &cli.config {
            Some(path) => Self::load(path).await?,
            None => Self::default(),
        };
        Ok(base.with_cli_overrides(cli))
    }

    /// Overlay the flags that were actually given on the command line.
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if !cli.urls.is_empty() {
            self.urls = cli.urls.clone();
        }
        if let Some(db) = &cli.database {
            self.database = db.clone();
        }
        if !cli.attrs.is_empty() {
            self.attrs = Some(cli.attrs.clone());
        }
        if let Some(ua) = &cli.user_agent {
            self.extractor.browser_user_agent = ua.clone();
        }
        if let Some(secs) = cli.timeout_secs {
            self.extractor.http_timeout_secs = secs;
        }
        if cli.strict_attrs {
            self.extractor.unknown_attrs = UnknownAttrPolicy::Reject;
        }
        self
    }
}
