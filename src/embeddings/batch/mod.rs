
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::encoder::{ImageEncoder, embed_images, load_image};
use crate::Result;
use crate::output::{JsonLayout, read_json, write_json};
use crate::scan::ImageFile;

/// Embedding of one catalog image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Public path of the image, matching the catalog's `image` field
    pub image: String,
    /// Unit-length feature vector
    pub embedding: Vec<f32>,
}

/// Compute embedding records for `images`, preserving their order.
///
/// Images are decoded and encoded `batch_size` at a time. The first image
/// that fails to decode or encode aborts the whole run.
#[inline]
pub fn generate_embeddings<E>(
    encoder: &mut E,
    images: &[ImageFile],
    batch_size: usize,
    image_url_prefix: &str,
) -> Result<Vec<EmbeddingRecord>>
where
    E: ImageEncoder + ?Sized,
{
    let batch_size = batch_size.max(1);
    info!(
        "Generating embeddings for {} images (batch size {})",
        images.len(),
        batch_size
    );

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(images.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut records = Vec::with_capacity(images.len());

    for chunk in images.chunks(batch_size) {
        let decoded = chunk
            .iter()
            .map(|image| load_image(&image.path))
            .collect::<Result<Vec<_>>>()?;

        let embeddings = embed_images(encoder, &decoded)?;

        for (image, embedding) in chunk.iter().zip(embeddings) {
            debug!(
                "Embedded {} ({} dimensions)",
                image.file_name,
                embedding.len()
            );
            info!("Processed {}", image.file_name);
            bar.set_message(image.file_name.clone());
            bar.inc(1);

            records.push(EmbeddingRecord {
                image: image.public_path(image_url_prefix),
                embedding,
            });
        }
    }

    bar.finish_and_clear();
    info!("Generated {} embeddings", records.len());
    Ok(records)
}

/// Write embedding records as compact JSON, replacing any existing file
#[inline]
pub fn write_embeddings<P: AsRef<Path>>(path: P, records: &[EmbeddingRecord]) -> Result<()> {
    Ok(write_json(path, records, JsonLayout::Compact)?)
}

#[inline]
pub fn read_embeddings<P: AsRef<Path>>(path: P) -> Result<Vec<EmbeddingRecord>> {
    Ok(read_json(path)?)
}
