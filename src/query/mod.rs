#[cfg(test)]
mod tests;

use anyhow::Context;
use image::RgbImage;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use ureq::Agent;
use url::Url;

use crate::config::HttpConfig;
use crate::embeddings::encoder::{ImageEncoder, decode_image, embed_image, load_image};
use crate::{MatcherError, Result};

/// Source of an ad-hoc query image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    Path(PathBuf),
    Url(Url),
}

impl QueryInput {
    /// Pick the query source from the command line flags.
    ///
    /// A path wins over a URL. Empty values count as absent. Returns `None`
    /// when neither flag carries a value.
    #[inline]
    pub fn resolve(path: Option<PathBuf>, url: Option<String>) -> Result<Option<Self>> {
        if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(Some(Self::Path(path)));
        }

        match url.filter(|u| !u.is_empty()) {
            Some(url) => Ok(Some(Self::Url(validate_url(&url)?))),
            None => Ok(None),
        }
    }

    /// Human readable origin, used in logs and error messages
    #[inline]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.to_string(),
        }
    }
}

/// Validate that a query URL is an absolute http(s) URL with a host
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str)
        .map_err(|e| MatcherError::Network(format!("Invalid URL format: {}: {}", url_str, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(MatcherError::Network(format!(
            "URL must use HTTP or HTTPS scheme: {}",
            url_str
        )));
    }

    if url.host_str().is_none() {
        return Err(MatcherError::Network(format!(
            "URL must have a valid host: {}",
            url_str
        )));
    }

    Ok(url)
}

/// Downloads query images. Each fetch is a single attempt.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    agent: Agent,
    max_bytes: u64,
}

impl ImageFetcher {
    #[inline]
    pub fn new(config: &HttpConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self {
            agent,
            max_bytes: config.max_image_bytes,
        }
    }

    /// Fetch the raw bytes behind `url`. Non-success statuses are errors.
    #[inline]
    pub fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        debug!("Fetching query image from {}", url);

        let mut response = match self.agent.get(url.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(MatcherError::Network(format!(
                    "HTTP error {} fetching {}",
                    status, url
                )));
            }
            Err(e) => {
                return Err(MatcherError::Network(format!(
                    "Failed to fetch {}: {}",
                    url, e
                )));
            }
        };

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_bytes)
            .read_to_vec()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(limit) => MatcherError::Network(format!(
                    "Image at {} exceeds the {} byte limit",
                    url, limit
                )),
                other => MatcherError::Network(format!(
                    "Failed to read response body from {}: {}",
                    url, other
                )),
            })?;

        debug!("Read {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}

/// Load and decode the query image from disk or over HTTP
#[inline]
pub fn load_query_image(input: &QueryInput, fetcher: &ImageFetcher) -> Result<RgbImage> {
    match input {
        QueryInput::Path(path) => load_image(path),
        QueryInput::Url(url) => {
            let bytes = fetcher.fetch(url)?;
            decode_image(&bytes, url.as_str())
        }
    }
}

/// Compute the unit-length embedding of the query image
#[inline]
pub fn query_embedding<E>(
    encoder: &mut E,
    input: &QueryInput,
    fetcher: &ImageFetcher,
) -> Result<Vec<f32>>
where
    E: ImageEncoder + ?Sized,
{
    let image = load_query_image(input, fetcher)?;
    let embedding = embed_image(encoder, &image)?;

    info!(
        "Computed {}-dimensional embedding for {}",
        embedding.len(),
        input.describe()
    );
    Ok(embedding)
}

/// Render a query result as a single-line JSON array, `[]` when there is no embedding
#[inline]
pub fn format_embedding(embedding: Option<&[f32]>) -> Result<String> {
    let Some(embedding) = embedding else {
        return Ok("[]".to_string());
    };

    serde_json::to_string(embedding)
        .context("Failed to serialize embedding")
        .map_err(MatcherError::from)
}
