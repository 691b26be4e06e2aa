// JSON file helpers shared by the catalog and embedding generators


use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Layout of a written JSON file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    Compact,
    /// Two-space indentation
    Pretty,
}

/// Serialize `value` to `path`, replacing any existing file and creating
/// missing parent directories.
#[inline]
pub fn write_json<T, P>(path: P, value: &T, layout: JsonLayout) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match layout {
        JsonLayout::Compact => serde_json::to_writer(&mut writer, value),
        JsonLayout::Pretty => serde_json::to_writer_pretty(&mut writer, value),
    }
    .with_context(|| format!("Failed to serialize JSON to {}", path.display()))?;

    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {}", path.display()))?;

    debug!("Wrote JSON output to {}", path.display());
    Ok(())
}

/// Deserialize a JSON file written by [`write_json`]
#[inline]
pub fn read_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open JSON file: {}", path.display()))?;

    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON file: {}", path.display()))
}
