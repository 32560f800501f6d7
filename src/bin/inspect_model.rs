//! Inspect a model artifact the way the server would load it.
//!
//! ```sh
//! cargo run --bin inspect_model -- models/tilapia_forecast_best_model.json
//! ```

use anyhow::{Result, bail};
use clap::Parser;
use fishcast::application::ml::feature_synthesizer::FeatureSynthesizer;
use fishcast::application::ml::loaders::default_strategies;
use fishcast::domain::ml::Estimator;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the model artifact
    path: PathBuf,

    /// Show why each failing strategy was rejected
    #[arg(long, short)]
    verbose: bool,
}

fn print_names(label: &str, names: &[String]) {
    println!("\n{}:", label);
    for (i, name) in names.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    println!("Total features: {}", names.len());
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !args.path.exists() {
        bail!("Model not found at {:?}", args.path);
    }

    let mut loaded: Option<(&'static str, Arc<dyn Estimator>)> = None;
    for strategy in default_strategies() {
        match (strategy.load)(&args.path) {
            Ok(estimator) => {
                loaded = Some((strategy.name, estimator));
                break;
            }
            Err(e) if args.verbose => println!("{:<14} failed: {}", strategy.name, e),
            Err(_) => {}
        }
    }

    let Some((loader, estimator)) = loaded else {
        bail!("No load strategy accepted {:?}", args.path);
    };

    println!("Model loaded successfully with {}", loader);
    println!("Model type: {}", estimator.kind());
    println!("Prediction intervals: {}", estimator.supports_interval());

    match estimator.feature_names_in() {
        Some(names) => print_names("Feature names expected by model", &names),
        None => println!("\nModel does not advertise its input feature names"),
    }
    match estimator.feature_names_out() {
        Ok(names) => print_names("Output feature names", &names),
        Err(e) => println!("\nOutput feature names unavailable: {}", e),
    }

    let schema = FeatureSynthesizer::default().resolve_schema(estimator.as_ref());
    println!("\nColumns built at prediction time ({:?}):", schema.source);
    for column in &schema.columns {
        println!("  - {}", column);
    }

    Ok(())
}
