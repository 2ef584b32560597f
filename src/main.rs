use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use waste_vision::{Config, EnsembleClassifier};

#[derive(Parser)]
#[command(name = "waste-vision")]
#[command(about = "Dual-model ONNX waste classification")]
struct Args {
    /// Image file to classify
    image: PathBuf,

    /// Model directory path
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    /// Category descriptions, one per line (defaults to the built-in list)
    #[arg(long)]
    categories_file: Option<PathBuf>,

    /// Intra-op threads per ONNX session
    #[arg(long)]
    threads: Option<usize>,

    /// Print the structured result as JSON instead of the summary sentence
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Models directory: {}", args.models_dir.display());

    let mut config = Config::new(args.models_dir.clone(), args.threads)?;

    if let Some(path) = &args.categories_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read category file {}", path.display()))?;
        let categories: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        tracing::info!(
            "Loaded {} category descriptions from {}",
            categories.len(),
            path.display()
        );
        config = config.with_categories(categories)?;
    }

    let classifier = EnsembleClassifier::from_config(&config)?;

    let result = classifier
        .classify_path(&args.image)
        .with_context(|| format!("Failed to classify {}", args.image.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result);
    }

    Ok(())
}
