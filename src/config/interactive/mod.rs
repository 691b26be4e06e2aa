
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::{Path, PathBuf};

use super::{Config, ConfigError, HttpConfig, ModelConfig, PathsConfig};
use crate::embeddings::encoder::EncoderModel;
use crate::scan::list_images;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Product Matcher Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Paths").bold().yellow());
    eprintln!("Where product images live and where generated files are written.");
    eprintln!();
    configure_paths(&mut config.paths)?;

    eprintln!();
    eprintln!("{}", style("Model").bold().yellow());
    eprintln!("The pretrained image model used for embeddings. It is downloaded on first use.");
    eprintln!();
    configure_model(&mut config.model)?;

    eprintln!();
    eprintln!("{}", style("URL Queries").bold().yellow());
    eprintln!();
    configure_http(&mut config.http)?;

    eprintln!();
    eprintln!("{}", style("Checking images directory...").yellow());
    match count_images(&config.paths.images_dir) {
        Ok(count) => eprintln!(
            "{}",
            style(format!("✓ Found {} product images", count)).green()
        ),
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("⚠ Warning: Could not read images directory: {:#}", e)).yellow()
            );
            eprintln!("You can continue, but make sure the directory exists before generating.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Paths:").bold().yellow());
    eprintln!(
        "  Images Directory: {}",
        style(config.paths.images_dir.display()).cyan()
    );
    eprintln!(
        "  Image URL Prefix: {}",
        style(&config.paths.image_url_prefix).cyan()
    );
    eprintln!(
        "  Embeddings File: {}",
        style(config.paths.embeddings_file.display()).cyan()
    );
    eprintln!(
        "  Products File: {}",
        style(config.paths.products_file.display()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Model:").bold().yellow());
    match config.model.encoder_model() {
        Ok(model) => eprintln!("  Name: {}", style(model).cyan()),
        Err(e) => eprintln!("  Name: {} ({})", style(&config.model.name).red(), e),
    }
    eprintln!("  Batch Size: {}", style(config.model.batch_size).cyan());
    eprintln!(
        "  Model Cache: {}",
        style(config.model_cache_dir().display()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("URL Queries:").bold().yellow());
    eprintln!("  Timeout: {}s", style(config.http.timeout_seconds).cyan());
    eprintln!(
        "  Max Image Size: {} bytes",
        style(config.http.max_image_bytes).cyan()
    );
    eprintln!("  User Agent: {}", style(&config.http.user_agent).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn count_images(images_dir: &Path) -> Result<usize> {
    Ok(list_images(images_dir)?.len())
}

fn configure_paths(paths: &mut PathsConfig) -> Result<()> {
    let images_dir: String = Input::new()
        .with_prompt("Images directory")
        .default(paths.images_dir.display().to_string())
        .validate_with(|input: &String| non_empty(input))
        .interact_text()?;

    let image_url_prefix: String = Input::new()
        .with_prompt("Image URL prefix")
        .default(paths.image_url_prefix.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let mut candidate = PathsConfig::default();
            candidate.set_image_url_prefix(input.clone())
        })
        .interact_text()?;

    let embeddings_file: String = Input::new()
        .with_prompt("Embeddings output file")
        .default(paths.embeddings_file.display().to_string())
        .validate_with(|input: &String| non_empty(input))
        .interact_text()?;

    let products_file: String = Input::new()
        .with_prompt("Products output file")
        .default(paths.products_file.display().to_string())
        .validate_with(|input: &String| non_empty(input))
        .interact_text()?;

    paths.images_dir = PathBuf::from(images_dir);
    paths.embeddings_file = PathBuf::from(embeddings_file);
    paths.products_file = PathBuf::from(products_file);
    paths.set_image_url_prefix(image_url_prefix)?;

    Ok(())
}

fn configure_model(model: &mut ModelConfig) -> Result<()> {
    let names: Vec<&str> = EncoderModel::ALL.iter().map(|m| m.name()).collect();
    let default_index = model_index(&model.name);

    let model_index = Select::new()
        .with_prompt("Image model")
        .default(default_index)
        .items(&names)
        .interact()?;

    let batch_size: usize = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(model.batch_size)
        .validate_with(|input: &usize| -> Result<(), ConfigError> {
            ModelConfig::default().set_batch_size(*input)
        })
        .interact_text()?;

    model.set_name(names[model_index].to_string())?;
    model.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_http(http: &mut HttpConfig) -> Result<()> {
    let timeout_seconds: u64 = Input::new()
        .with_prompt("Timeout for fetching query images (seconds)")
        .default(http.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), ConfigError> {
            HttpConfig::default().set_timeout_seconds(*input)
        })
        .interact_text()?;

    let max_image_bytes: u64 = Input::new()
        .with_prompt("Maximum query image size (bytes)")
        .default(http.max_image_bytes)
        .validate_with(|input: &u64| -> Result<(), ConfigError> {
            HttpConfig::default().set_max_image_bytes(*input)
        })
        .interact_text()?;

    http.set_timeout_seconds(timeout_seconds)?;
    http.set_max_image_bytes(max_image_bytes)?;

    Ok(())
}

/// Position of `name` in the model list, defaulting to the first model
fn model_index(name: &str) -> usize {
    EncoderModel::from_name(name)
        .and_then(|model| EncoderModel::ALL.iter().position(|m| *m == model))
        .unwrap_or(0)
}

fn non_empty(input: &str) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Value cannot be empty")
    } else {
        Ok(())
    }
}
