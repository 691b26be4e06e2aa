#[cfg(test)]
mod tests;

use anyhow::Result;
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::output::{JsonLayout, read_json, write_json};
use crate::scan::ImageFile;

static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-]+").expect("valid regex"));

/// Product category, derived from keywords in the display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Footwear,
    Clothing,
    Accessories,
    Jewelry,
    General,
}

/// Keyword groups in priority order. The first group with a match wins.
const CATEGORY_KEYWORDS: [(Category, &[&str]); 4] = [
    (Category::Footwear, &["shoe", "sneaker", "boot"]),
    (Category::Clothing, &["shirt", "tshirt", "hoodie", "top"]),
    (Category::Accessories, &["bag", "purse", "backpack"]),
    (Category::Jewelry, &["watch", "necklace", "jewel"]),
];

impl Category {
    /// Classify a display name by case-insensitive keyword search.
    ///
    /// Names matching no keyword fall into [`Category::General`].
    #[inline]
    pub fn classify(name: &str) -> Self {
        let lower = name.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| lower.contains(keyword)))
            .map_or(Self::General, |(category, _)| *category)
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Footwear => "Footwear",
            Self::Clothing => "Clothing",
            Self::Accessories => "Accessories",
            Self::Jewelry => "Jewelry",
            Self::General => "General",
        }
    }
}

impl fmt::Display for Category {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub category: Category,
    pub image: String,
}

/// Derive a display name from an image file name.
///
/// `red_running--shoe.jpg` becomes `Red Running Shoe`.
#[inline]
pub fn clean_name(file_name: &str) -> String {
    // Leading dots never start an extension, so `..jpg` keeps its whole name
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if stem.chars().any(|c| c != '.') => stem,
        _ => file_name,
    };

    let spaced = SEPARATOR_RUNS.replace_all(stem, " ");
    title_case(&spaced).trim().to_string()
}

/// Upper-case every cased character that follows an uncased one and
/// lower-case the rest, so `air max90x` becomes `Air Max90X`.
fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_cased = false;

    for c in text.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if !cased {
            result.push(c);
        } else if previous_cased {
            result.extend(c.to_lowercase());
        } else {
            // Expansions like `ß` -> `SS` only capitalise their first letter
            let mut upper = c.to_uppercase();
            result.extend(upper.next());
            result.extend(upper.flat_map(char::to_lowercase));
        }
        previous_cased = cased;
    }

    result
}

/// Build catalog entries for images already sorted by file name.
///
/// IDs start at 1 and follow the order of `images`.
#[inline]
pub fn build_catalog(images: &[ImageFile], image_url_prefix: &str) -> Vec<Product> {
    (1_u32..)
        .zip(images)
        .map(|(id, image)| {
            let name = clean_name(&image.file_name);
            let category = Category::classify(&name);
            debug!("Catalog entry {}: {} ({})", id, name, category);

            Product {
                id,
                name,
                category,
                image: image.public_path(image_url_prefix),
            }
        })
        .collect()
}

/// Write the catalog as pretty-printed JSON, replacing any existing file
#[inline]
pub fn write_products<P: AsRef<Path>>(path: P, products: &[Product]) -> Result<()> {
    write_json(path, products, JsonLayout::Pretty)
}

#[inline]
pub fn read_products<P: AsRef<Path>>(path: P) -> Result<Vec<Product>> {
    read_json(path)
}
