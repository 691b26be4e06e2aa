
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::encoder::EncoderModel;

const MAX_BATCH_SIZE: usize = 256;
const MAX_TIMEOUT_SECONDS: u64 = 300;
const MAX_IMAGE_BYTES_LIMIT: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Where images are read from and generated files are written to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub images_dir: PathBuf,
    /// Prefix of the `image` field in generated records
    pub image_url_prefix: String,
    pub embeddings_file: PathBuf,
    pub products_file: PathBuf,
}

impl Default for PathsConfig {
    #[inline]
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("public/images"),
            image_url_prefix: "/images".to_string(),
            embeddings_file: PathBuf::from("data/embeddings.json"),
            products_file: PathBuf::from("data/products.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub batch_size: usize,
    pub show_download_progress: bool,
}

impl Default for ModelConfig {
    #[inline]
    fn default() -> Self {
        Self {
            name: EncoderModel::ClipVitB32.name().to_string(),
            batch_size: 16,
            show_download_progress: true,
        }
    }
}

/// Settings for fetching query images by URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub max_image_bytes: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    #[inline]
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_image_bytes: 10 * 1024 * 1024,
            user_agent: concat!("product-matcher/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid model: {0} (expected one of: {models})", models = model_names())]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 256)")]
    InvalidBatchSize(usize),
    #[error("Invalid HTTP timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid image size limit: {0} bytes (must be between 1 byte and 100 MiB)")]
    InvalidMaxImageBytes(u64),
    #[error("Invalid image URL prefix: {0} (must start with '/' or be an http(s) URL)")]
    InvalidUrlPrefix(String),
    #[error("Invalid user agent: cannot be empty")]
    InvalidUserAgent,
    #[error("Path setting '{0}' cannot be empty")]
    EmptyPath(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn model_names() -> String {
    EncoderModel::ALL
        .iter()
        .map(|model| model.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Config {
    /// Default configuration directory, `~/.product-matcher`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".product-matcher"))
            .or_else(|| dirs::data_dir().map(|data| data.join("product-matcher")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when the file is absent
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Directory where downloaded model files are cached
    #[inline]
    pub fn model_cache_dir(&self) -> PathBuf {
        self.get_base_dir().join("models")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.paths.validate()?;
        self.model.validate()?;
        self.http.validate()?;
        Ok(())
    }
}

impl PathsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("images_dir", &self.images_dir),
            ("embeddings_file", &self.embeddings_file),
            ("products_file", &self.products_file),
        ];
        if let Some(&(name, _)) = required
            .iter()
            .find(|(_, path)| path.as_os_str().is_empty())
        {
            return Err(ConfigError::EmptyPath(name));
        }

        validate_url_prefix(&self.image_url_prefix)
    }

    pub fn set_image_url_prefix(&mut self, prefix: String) -> Result<(), ConfigError> {
        validate_url_prefix(&prefix)?;
        self.image_url_prefix = prefix;
        Ok(())
    }
}

fn validate_url_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.starts_with('/') {
        return Ok(());
    }

    match Url::parse(prefix) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(ConfigError::InvalidUrlPrefix(prefix.to_string())),
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if EncoderModel::from_name(&self.name).is_none() {
            return Err(ConfigError::InvalidModel(self.name.clone()));
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        Ok(())
    }

    /// The selected model
    pub fn encoder_model(&self) -> Result<EncoderModel, ConfigError> {
        EncoderModel::from_name(&self.name)
            .ok_or_else(|| ConfigError::InvalidModel(self.name.clone()))
    }

    pub fn set_name(&mut self, name: String) -> Result<(), ConfigError> {
        if EncoderModel::from_name(&name).is_none() {
            return Err(ConfigError::InvalidModel(name));
        }
        self.name = name;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 || self.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if self.max_image_bytes == 0 || self.max_image_bytes > MAX_IMAGE_BYTES_LIMIT {
            return Err(ConfigError::InvalidMaxImageBytes(self.max_image_bytes));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidUserAgent);
        }

        Ok(())
    }

    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if timeout_seconds == 0 || timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }

    pub fn set_max_image_bytes(&mut self, max_image_bytes: u64) -> Result<(), ConfigError> {
        if max_image_bytes == 0 || max_image_bytes > MAX_IMAGE_BYTES_LIMIT {
            return Err(ConfigError::InvalidMaxImageBytes(max_image_bytes));
        }
        self.max_image_bytes = max_image_bytes;
        Ok(())
    }
}
