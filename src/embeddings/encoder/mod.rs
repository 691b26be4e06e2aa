
use anyhow::{Context, anyhow};
use fastembed::{ImageEmbedding, ImageEmbeddingModel, ImageInitOptions};
use image::{ImageFormat, RgbImage};
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::slice;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::{MatcherError, Result};

/// Pretrained image models that can be selected in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderModel {
    /// CLIP ViT-B/32, the `openai/clip-vit-base-patch32` vision tower
    ClipVitB32,
    UnicomVitB32,
    UnicomVitB16,
    Resnet50,
    NomicEmbedVisionV15,
}

impl EncoderModel {
    pub const ALL: [Self; 5] = [
        Self::ClipVitB32,
        Self::UnicomVitB32,
        Self::UnicomVitB16,
        Self::Resnet50,
        Self::NomicEmbedVisionV15,
    ];

    /// Configuration key of the model
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::ClipVitB32 => "clip-vit-b32",
            Self::UnicomVitB32 => "unicom-vit-b32",
            Self::UnicomVitB16 => "unicom-vit-b16",
            Self::Resnet50 => "resnet50",
            Self::NomicEmbedVisionV15 => "nomic-embed-vision-v1.5",
        }
    }

    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(name))
    }

    fn fastembed_model(self) -> ImageEmbeddingModel {
        match self {
            Self::ClipVitB32 => ImageEmbeddingModel::ClipVitB32,
            Self::UnicomVitB32 => ImageEmbeddingModel::UnicomVitB32,
            Self::UnicomVitB16 => ImageEmbeddingModel::UnicomVitB16,
            Self::Resnet50 => ImageEmbeddingModel::Resnet50,
            Self::NomicEmbedVisionV15 => ImageEmbeddingModel::NomicEmbedVisionV15,
        }
    }
}

impl fmt::Display for EncoderModel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts raw image features from decoded RGB images
pub trait ImageEncoder {
    /// Return one feature vector per image, in input order. Vectors are not
    /// expected to be normalized.
    fn encode_batch(&mut self, images: &[RgbImage]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Pretrained vision model run locally through fastembed's ONNX runtime
pub struct ClipEncoder {
    model: ImageEmbedding,
    kind: EncoderModel,
    batch_size: usize,
}

impl fmt::Debug for ClipEncoder {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipEncoder")
            .field("kind", &self.kind)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl ClipEncoder {
    /// Load the configured model, downloading it into `cache_dir` on first use
    #[inline]
    pub fn new(config: &ModelConfig, cache_dir: PathBuf) -> Result<Self> {
        let kind = config.encoder_model()?;

        info!("Loading image model {} (cache: {})", kind, cache_dir.display());

        let options = ImageInitOptions::new(kind.fastembed_model())
            .with_cache_dir(cache_dir)
            .with_show_download_progress(config.show_download_progress);

        let model = ImageEmbedding::try_new(options)
            .with_context(|| format!("Failed to load image model {}", kind))?;

        info!("Image model {} loaded", kind);

        Ok(Self {
            model,
            kind,
            batch_size: config.batch_size,
        })
    }

    #[inline]
    pub fn kind(&self) -> EncoderModel {
        self.kind
    }
}

impl ImageEncoder for ClipEncoder {
    #[inline]
    fn encode_batch(&mut self, images: &[RgbImage]) -> anyhow::Result<Vec<Vec<f32>>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        // fastembed decodes and preprocesses from encoded bytes; PNG keeps the pixels lossless
        let encoded = images
            .iter()
            .map(encode_png)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let slices: Vec<&[u8]> = encoded.iter().map(Vec::as_slice).collect();

        debug!("Running {} on {} images", self.kind, images.len());

        self.model
            .embed_bytes(&slices, Some(self.batch_size))
            .with_context(|| format!("Feature extraction with {} failed", self.kind))
    }
}

fn encode_png(image: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| anyhow!("Failed to re-encode image for the model: {}", e))?;
    Ok(buffer.into_inner())
}

/// Decode image bytes of any supported format into 8-bit RGB.
///
/// `source` names the origin (a path or URL) in error messages.
#[inline]
pub fn decode_image(bytes: &[u8], source: &str) -> Result<RgbImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| MatcherError::Image(format!("Failed to decode image {}: {}", source, e)))?;

    debug!(
        "Decoded {} ({}x{}, {:?})",
        source,
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    Ok(decoded.into_rgb8())
}

/// Read and decode an image file into 8-bit RGB
#[inline]
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read image file: {}", path.display()))?;
    decode_image(&bytes, &path.display().to_string())
}

/// Scale a vector to unit Euclidean length
#[inline]
pub fn l2_normalize(mut vector: Vec<f32>) -> Result<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if !(norm.is_finite() && norm > 0.0) {
        return Err(MatcherError::Embedding(format!(
            "Cannot normalize a vector with norm {} ({} dimensions)",
            norm,
            vector.len()
        )));
    }

    for x in &mut vector {
        *x /= norm;
    }
    Ok(vector)
}

/// Encode a batch of images and normalize each feature vector
#[inline]
pub fn embed_images<E>(encoder: &mut E, images: &[RgbImage]) -> Result<Vec<Vec<f32>>>
where
    E: ImageEncoder + ?Sized,
{
    let features = encoder.encode_batch(images)?;

    if features.len() != images.len() {
        return Err(MatcherError::Embedding(format!(
            "Mismatch between image and embedding counts: {} vs {}",
            images.len(),
            features.len()
        )));
    }

    features.into_iter().map(l2_normalize).collect()
}

/// Compute the unit-length embedding of a single image
#[inline]
pub fn embed_image<E>(encoder: &mut E, image: &RgbImage) -> Result<Vec<f32>>
where
    E: ImageEncoder + ?Sized,
{
    embed_images(encoder, slice::from_ref(image))?
        .pop()
        .ok_or_else(|| MatcherError::Embedding("Encoder returned no embedding".to_string()))
}
