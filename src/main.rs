use clap::{Parser, Subcommand};
use product_matcher::Result;
use product_matcher::commands::{
    generate_catalog_file, generate_embeddings_file, load_encoder, run_match, run_query,
};
use product_matcher::config::{Config, get_config_dir, run_interactive_config, show_config};
use product_matcher::matcher::{DEFAULT_TOP_K, MatchOptions, MatchResponse, ProductIndex};
use product_matcher::query::{QueryInput, format_embedding};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "product-matcher")]
#[command(about = "Build a product catalog and CLIP image embeddings for visual product search")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.product-matcher)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure image locations, the embedding model and URL fetching
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Compute an embedding for every product image
    Embeddings {
        /// Directory holding the product images
        #[arg(long)]
        images_dir: Option<PathBuf>,
        /// Output JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Derive product names and categories from image file names
    Catalog {
        /// Directory holding the product images
        #[arg(long)]
        images_dir: Option<PathBuf>,
        /// Output JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the embedding of a single image as a JSON array
    Query {
        /// Image file on disk. Takes precedence over --url
        #[arg(long)]
        path: Option<PathBuf>,
        /// HTTP(S) URL of the image
        #[arg(long)]
        url: Option<String>,
    },
    /// Find the catalog products most similar to an image
    Match {
        /// Image file on disk. Takes precedence over --url
        #[arg(long)]
        path: Option<PathBuf>,
        /// HTTP(S) URL of the image
        #[arg(long)]
        url: Option<String>,
        /// Maximum number of results
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Drop results with a cosine similarity below this value
        #[arg(long, value_parser = parse_score)]
        min_score: Option<f32>,
        /// Embeddings file to search
        #[arg(long)]
        embeddings: Option<PathBuf>,
        /// Products file to join results with
        #[arg(long)]
        products: Option<PathBuf>,
    },
}

fn parse_score(value: &str) -> std::result::Result<f32, String> {
    let score: f32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (-1.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(format!("{} is outside the range -1.0..=1.0", score))
    }
}

fn resolve_config_dir(config_dir: Option<PathBuf>) -> Result<PathBuf> {
    match config_dir {
        Some(dir) => Ok(dir),
        None => Ok(get_config_dir()?),
    }
}

fn print_match_response(response: &MatchResponse) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(response).map_err(anyhow::Error::from)?
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        config_dir,
        command,
    } = Cli::parse();

    match command {
        Commands::Config { show } => {
            let config_dir = resolve_config_dir(config_dir)?;
            if show {
                show_config(&Config::load(&config_dir)?);
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Embeddings { images_dir, output } => {
            let config = Config::load(resolve_config_dir(config_dir)?)?;
            let images_dir = images_dir.unwrap_or_else(|| config.paths.images_dir.clone());
            let output = output.unwrap_or_else(|| config.paths.embeddings_file.clone());
            generate_embeddings_file(&config, &images_dir, &output)?;
        }
        Commands::Catalog { images_dir, output } => {
            let config = Config::load(resolve_config_dir(config_dir)?)?;
            let images_dir = images_dir.unwrap_or_else(|| config.paths.images_dir.clone());
            let output = output.unwrap_or_else(|| config.paths.products_file.clone());
            generate_catalog_file(&config, &images_dir, &output)?;
        }
        Commands::Query { path, url } => {
            // No input never reads the configuration
            let Some(input) = QueryInput::resolve(path, url)? else {
                println!("{}", format_embedding(None)?);
                return Ok(());
            };

            let config = Config::load(resolve_config_dir(config_dir)?)?;
            let line = run_query(Some(&input), &config.http, || load_encoder(&config))?;
            println!("{}", line);
        }
        Commands::Match {
            path,
            url,
            top_k,
            min_score,
            embeddings,
            products,
        } => {
            let Some(input) = QueryInput::resolve(path, url)? else {
                print_match_response(&MatchResponse::empty())?;
                return Ok(());
            };

            let config = Config::load(resolve_config_dir(config_dir)?)?;
            let embeddings = embeddings.unwrap_or_else(|| config.paths.embeddings_file.clone());
            let products = products.unwrap_or_else(|| config.paths.products_file.clone());
            let index = ProductIndex::load(&embeddings, &products)?;
            let options = MatchOptions { top_k, min_score };

            let response = run_match(Some(&input), &index, &options, &config.http, || {
                load_encoder(&config)
            })?;
            print_match_response(&response)?;
        }
    }

    Ok(())
}
