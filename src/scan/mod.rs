
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extensions recognized as product images, compared case-insensitively
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// A supported image found in the images directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Bare file name, e.g. `red_running-shoe.jpg`
    pub file_name: String,
    /// Location on disk
    pub path: PathBuf,
}

impl ImageFile {
    /// Path under which the image is served, e.g. `/images/red_running-shoe.jpg`
    #[inline]
    pub fn public_path(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.file_name)
    }
}

/// Check whether a file name carries one of the supported image extensions
#[inline]
pub fn is_supported_image(file_name: &str) -> bool {
    file_name.rsplit_once('.').is_some_and(|(_, extension)| {
        SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| extension.eq_ignore_ascii_case(supported))
    })
}

/// List the supported images directly inside `dir`, sorted by file name.
///
/// Subdirectories are not traversed. Entries whose names are not valid UTF-8
/// or that are not regular files are skipped with a warning.
#[inline]
pub fn list_images<P: AsRef<Path>>(dir: P) -> Result<Vec<ImageFile>> {
    let dir = dir.as_ref();
    debug!("Scanning image directory {}", dir.display());

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read image directory: {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read entry in directory: {}", dir.display()))?;

        let file_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                warn!("Skipping file with non UTF-8 name: {:?}", name);
                continue;
            }
        };

        if !is_supported_image(&file_name) {
            debug!("Ignoring unsupported file {}", file_name);
            continue;
        }

        let path = entry.path();
        if !path.is_file() {
            warn!("Skipping {} because it is not a regular file", path.display());
            continue;
        }

        images.push(ImageFile { file_name, path });
    }

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    debug!("Found {} images in {}", images.len(), dir.display());
    Ok(images)
}
