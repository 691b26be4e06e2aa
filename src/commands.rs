use console::style;
use std::path::Path;
use tracing::info;

use crate::Result;
use crate::catalog::{build_catalog, write_products};
use crate::config::{Config, HttpConfig};
use crate::embeddings::batch::{generate_embeddings, write_embeddings};
use crate::embeddings::encoder::{ClipEncoder, ImageEncoder};
use crate::matcher::{MatchOptions, MatchResponse, ProductIndex};
use crate::query::{ImageFetcher, QueryInput, format_embedding, query_embedding};
use crate::scan::{ImageFile, list_images};

/// Load the image model selected in `config`
#[inline]
pub fn load_encoder(config: &Config) -> Result<ClipEncoder> {
    ClipEncoder::new(&config.model, config.model_cache_dir())
}

/// Embed `images` and write the records to `output`.
///
/// Returns the number of records written.
#[inline]
pub fn embed_images_to_file<E>(
    encoder: &mut E,
    config: &Config,
    images: &[ImageFile],
    output: &Path,
) -> Result<usize>
where
    E: ImageEncoder + ?Sized,
{
    let records = generate_embeddings(
        encoder,
        images,
        config.model.batch_size,
        &config.paths.image_url_prefix,
    )?;

    write_embeddings(output, &records)?;
    info!("Wrote {} embeddings to {}", records.len(), output.display());

    Ok(records.len())
}

/// `embeddings` command: scan the image directory, load the model and embed every image.
///
/// Returns the number of records written.
#[inline]
pub fn generate_embeddings_file(
    config: &Config,
    images_dir: &Path,
    output: &Path,
) -> Result<usize> {
    // Scan first so a missing directory fails before the model is loaded
    let images = list_images(images_dir)?;

    let mut encoder = load_encoder(config)?;
    let count = embed_images_to_file(&mut encoder, config, &images, output)?;

    eprintln!(
        "{}",
        style(format!(
            "✓ Saved {} embeddings to {}",
            count,
            output.display()
        ))
        .green()
    );
    Ok(count)
}

/// `catalog` command: derive product records from image file names.
///
/// Returns the number of products written.
#[inline]
pub fn generate_catalog_file(config: &Config, images_dir: &Path, output: &Path) -> Result<usize> {
    let images = list_images(images_dir)?;
    let products = build_catalog(&images, &config.paths.image_url_prefix);

    write_products(output, &products)?;
    info!("Wrote {} products to {}", products.len(), output.display());

    eprintln!(
        "{}",
        style(format!(
            "✓ Rebuilt {} products in {}",
            products.len(),
            output.display()
        ))
        .green()
    );
    Ok(products.len())
}

/// Compute the query output line. The encoder is only loaded when there is an input.
#[inline]
pub fn run_query<E, F>(
    input: Option<&QueryInput>,
    http: &HttpConfig,
    load_encoder: F,
) -> Result<String>
where
    E: ImageEncoder,
    F: FnOnce() -> Result<E>,
{
    let Some(input) = input else {
        info!("No query image given");
        return format_embedding(None);
    };

    let mut encoder = load_encoder()?;
    let fetcher = ImageFetcher::new(http);
    let embedding = query_embedding(&mut encoder, input, &fetcher)?;

    format_embedding(Some(embedding.as_slice()))
}

/// Rank the catalog against a query image. The encoder is only loaded when
/// there is an input.
#[inline]
pub fn run_match<E, F>(
    input: Option<&QueryInput>,
    index: &ProductIndex,
    options: &MatchOptions,
    http: &HttpConfig,
    load_encoder: F,
) -> Result<MatchResponse>
where
    E: ImageEncoder,
    F: FnOnce() -> Result<E>,
{
    let Some(input) = input else {
        info!("No query image given");
        return Ok(MatchResponse::empty());
    };

    let mut encoder = load_encoder()?;
    let fetcher = ImageFetcher::new(http);
    let embedding = query_embedding(&mut encoder, input, &fetcher)?;
    let results = index.rank(&embedding, options)?;

    let query_image = match input {
        QueryInput::Url(url) => Some(url.to_string()),
        QueryInput::Path(_) => None,
    };

    Ok(MatchResponse {
        results,
        query_image,
    })
}
