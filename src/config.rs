//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.propstat.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".propstat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Spreadsheet and table settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Text-generation service settings.
    #[serde(default)]
    pub ai: AiConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from any origin.
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Largest request body accepted by the analysis endpoint, in bytes.
    /// Covers the optional uploaded file.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

/// Spreadsheet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Workbook read on startup and on every reload.
    #[serde(default = "default_spreadsheet")]
    pub spreadsheet: PathBuf,

    /// Sheet to read. The first sheet when unset.
    #[serde(default)]
    pub sheet: Option<String>,

    /// Rows returned when a query names no location.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Load the workbook before the server starts accepting requests.
    #[serde(default = "default_true")]
    pub load_on_startup: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            spreadsheet: default_spreadsheet(),
            sheet: None,
            preview_rows: default_preview_rows(),
            load_on_startup: true,
        }
    }
}

fn default_spreadsheet() -> PathBuf {
    PathBuf::from("sample_data/Sample_data.xlsx")
}

fn default_preview_rows() -> usize {
    crate::analysis::table::DEFAULT_PREVIEW_ROWS
}

/// Text-generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key. Usually supplied through `OPENAI_API_KEY` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the generated summary.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Rows from the head of the table included in the prompt.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            sample_rows: default_sample_rows(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_sample_rows() -> usize {
    5
}

fn default_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line (or through their
    /// environment variables) override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref path) = args.data_file {
            self.data.spreadsheet = path.clone();
        }
        if let Some(ref sheet) = args.sheet {
            self.data.sheet = Some(sheet.clone());
        }

        if let Some(ref model) = args.model {
            self.ai.model = model.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.ai.api_url = api_url.clone();
        }
        if let Some(ref api_key) = args.api_key {
            self.ai.api_key = Some(api_key.clone());
        }
        if let Some(temperature) = args.temperature {
            self.ai.temperature = temperature;
        }
    }

    /// Check values that may have come from the file rather than the CLI.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be between 1 and 65535");
        }
        if self.server.max_upload_bytes == 0 {
            bail!("server.max_upload_bytes must be greater than 0");
        }
        if self.data.preview_rows == 0 {
            bail!("data.preview_rows must be greater than 0");
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            bail!(
                "ai.temperature must be between 0.0 and 2.0 (got {})",
                self.ai.temperature
            );
        }
        if self.ai.max_tokens == 0 {
            bail!("ai.max_tokens must be greater than 0");
        }
        if !self.ai.api_url.starts_with("http://") && !self.ai.api_url.starts_with("https://") {
            bail!("ai.api_url must start with 'http://' or 'https://'");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
