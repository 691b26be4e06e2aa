
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::catalog::{Product, read_products};
use crate::embeddings::batch::{EmbeddingRecord, read_embeddings};
use crate::{MatcherError, Result};

pub const DEFAULT_TOP_K: usize = 10;

/// A catalog product scored against the query image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    #[serde(flatten)]
    pub product: Product,
    /// Cosine similarity to the query embedding
    pub score: f32,
}

/// Output of the match command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub results: Vec<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_image: Option<String>,
}

impl MatchResponse {
    /// Response for a run without a query image
    #[inline]
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            query_image: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Maximum number of results
    pub top_k: usize,
    /// Results scoring below this are dropped after truncation to `top_k`
    pub min_score: Option<f32>,
}

impl Default for MatchOptions {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: None,
        }
    }
}

/// Cosine similarity of two vectors.
///
/// Returns `None` when the lengths differ or either vector has zero length.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some(dot / (norm_a * norm_b))
}

/// Catalog products paired with their stored embeddings
#[derive(Debug, Clone, Default)]
pub struct ProductIndex {
    entries: Vec<(Product, Vec<f32>)>,
}

impl ProductIndex {
    /// Join embedding records to products by their `image` path.
    ///
    /// Records without a matching product are skipped. Entries keep the order
    /// of the embedding records.
    #[inline]
    pub fn new(embeddings: Vec<EmbeddingRecord>, products: Vec<Product>) -> Self {
        let mut by_image: HashMap<String, Product> = HashMap::with_capacity(products.len());
        for product in products {
            if let Some(previous) = by_image.insert(product.image.clone(), product) {
                warn!(
                    "Duplicate catalog entry for {}, replacing product {}",
                    previous.image, previous.id
                );
            }
        }

        let mut entries = Vec::with_capacity(embeddings.len());
        for record in embeddings {
            match by_image.remove(&record.image) {
                Some(product) => entries.push((product, record.embedding)),
                None => warn!("No catalog entry for embedded image {}", record.image),
            }
        }

        if !by_image.is_empty() {
            warn!("{} catalog entries have no embedding", by_image.len());
        }

        debug!("Indexed {} products with embeddings", entries.len());
        Self { entries }
    }

    /// Load and join the embedding and product files
    #[inline]
    pub fn load<P, Q>(embeddings_path: P, products_path: Q) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let embeddings = read_embeddings(embeddings_path)?;
        let products = read_products(products_path)
            .map_err(|e| MatcherError::Catalog(format!("{:#}", e)))?;

        info!(
            "Loaded {} embeddings and {} products",
            embeddings.len(),
            products.len()
        );
        Ok(Self::new(embeddings, products))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score every product against `query` and return the best matches,
    /// highest score first.
    #[inline]
    pub fn rank(&self, query: &[f32], options: &MatchOptions) -> Result<Vec<MatchResult>> {
        let mut results = Vec::with_capacity(self.entries.len());

        for (product, embedding) in &self.entries {
            let score = cosine_similarity(query, embedding).ok_or_else(|| {
                MatcherError::Embedding(format!(
                    "Cannot compare query ({} dimensions) with {} ({} dimensions)",
                    query.len(),
                    product.image,
                    embedding.len()
                ))
            })?;

            results.push(MatchResult {
                product: product.clone(),
                score,
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(options.top_k);

        if let Some(min_score) = options.min_score {
            results.retain(|result| result.score >= min_score);
        }

        debug!("Ranked {} matches", results.len());
        Ok(results)
    }
}
