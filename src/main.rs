//! ReceiptScan command line front end

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use receipt_scan::capture::StillImageCamera;
use receipt_scan::config::{self, AppConfig};
use receipt_scan::ocr::{EndpointSubmitter, GoogleVisionSubmitter, OcrBackend, OcrSubmitter};
use receipt_scan::pipeline::{Pipeline, ProcessOutcome, SubmitOutcome};
use receipt_scan::vision::{self, EncodedImage, OcrResult};

/// ReceiptScan - capture a receipt and extract its text
#[derive(Parser, Debug)]
#[command(name = "receipt-scan")]
#[command(about = "Capture, compress and OCR receipt photos")]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture an image, compress it and run OCR
    Scan {
        /// Image standing in for the camera
        image: PathBuf,

        /// OCR endpoint URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Call Google Cloud Vision directly
        #[arg(long)]
        google: bool,

        /// Flatten to grayscale before upload
        #[arg(long)]
        grayscale: bool,

        /// Longest edge after compression
        #[arg(long)]
        max_dimension: Option<u32>,

        /// JPEG quality factor (0.0 - 1.0)
        #[arg(long)]
        quality: Option<f32>,

        /// Print only the full transcription
        #[arg(long, conflicts_with = "tokens")]
        full_text: bool,

        /// Print one line per detected token with its bounding box
        #[arg(long)]
        tokens: bool,
    },
    /// Compress an image without submitting it
    Compress {
        /// Input image
        input: PathBuf,

        /// Output JPEG
        #[arg(short, long)]
        output: PathBuf,

        /// Flatten to grayscale
        #[arg(long)]
        grayscale: bool,

        /// Longest edge after compression
        #[arg(long)]
        max_dimension: Option<u32>,

        /// JPEG quality factor (0.0 - 1.0)
        #[arg(long)]
        quality: Option<f32>,
    },
    /// Show the effective configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => config::default_config_path().ok(),
    };
    let mut config = load_or_default_config(config_path.as_deref());

    match args.command {
        Command::Scan {
            image,
            endpoint,
            google,
            grayscale,
            max_dimension,
            quality,
            full_text,
            tokens,
        } => {
            if let Some(endpoint) = endpoint {
                config.ocr.endpoint = endpoint;
            }
            if google {
                config.ocr.backend = OcrBackend::GoogleVision;
            }
            apply_compression_overrides(&mut config, grayscale, max_dimension, quality);
            run_scan(&config, &image, full_text, tokens).await
        }
        Command::Compress {
            input,
            output,
            grayscale,
            max_dimension,
            quality,
        } => {
            apply_compression_overrides(&mut config, grayscale, max_dimension, quality);
            run_compress(&config, &input, &output)
        }
        Command::Config { init } => run_config(&config, config_path.as_deref(), init),
    }
}

/// Load configuration from file or fall back to defaults
fn load_or_default_config(path: Option<&Path>) -> AppConfig {
    if let Some(path) = path {
        if path.exists() {
            match config::load_config(path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    return config;
                }
                Err(e) => tracing::warn!("Ignoring config {:?}: {:#}", path, e),
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

fn apply_compression_overrides(
    config: &mut AppConfig,
    grayscale: bool,
    max_dimension: Option<u32>,
    quality: Option<f32>,
) {
    if grayscale {
        config.compression.grayscale = true;
    }
    if let Some(max_dimension) = max_dimension {
        config.compression.max_dimension = max_dimension;
    }
    if let Some(quality) = quality {
        config.compression.quality = quality;
    }
}

/// Build the recognizer selected by the configuration
fn build_submitter(config: &AppConfig) -> Result<Arc<dyn OcrSubmitter>> {
    let timeout = config.ocr.request_timeout();
    let submitter: Arc<dyn OcrSubmitter> = match config.ocr.backend {
        OcrBackend::Endpoint => Arc::new(EndpointSubmitter::with_timeout(&config.ocr.endpoint, timeout)?),
        OcrBackend::GoogleVision => {
            let api_key = std::env::var(&config.ocr.api_key_env)
                .with_context(|| format!("{} is not set", config.ocr.api_key_env))?;
            Arc::new(GoogleVisionSubmitter::new(api_key, timeout)?)
        }
    };
    Ok(submitter)
}

/// Run the full capture → compress → OCR flow once
async fn run_scan(config: &AppConfig, image: &Path, full_text: bool, tokens: bool) -> Result<()> {
    let pipeline = Pipeline::new(build_submitter(config)?, config.compression.options());
    let camera = StillImageCamera::new(image);

    info!("Scanning {:?} (session {})", image, pipeline.id());

    let mut lease = pipeline
        .open_camera(&camera, config.camera.request(), config.camera.acquire_timeout())
        .await
        .with_context(|| format!("Could not open {:?}", image))?;

    let outcome = pipeline.capture(&mut lease).await;
    pipeline.close_camera(lease);
    if outcome? != ProcessOutcome::Compressed {
        bail!("Capture did not produce an image");
    }

    match pipeline.submit().await {
        SubmitOutcome::Completed => {}
        SubmitOutcome::Failed(e) => bail!("OCR failed: {}", e),
        other => bail!("OCR was not performed: {:?}", other),
    }

    let state = pipeline.snapshot();
    let Some(result) = state.result else {
        bail!("OCR finished without a result");
    };

    if full_text {
        println!("{}", result.full_text());
    } else if tokens {
        print_tokens(&result);
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}

/// Print each detected token, tab separated, as `x y width height text`
fn print_tokens(result: &OcrResult) {
    for token in result.tokens() {
        match token.bounding_poly.as_ref().and_then(|poly| poly.bounds()) {
            Some((x, y, width, height)) => {
                println!("{}\t{}\t{}\t{}\t{}", x, y, width, height, token.description)
            }
            None => println!("-\t-\t-\t-\t{}", token.description),
        }
    }
}

/// Compress a single file and report the size change
fn run_compress(config: &AppConfig, input: &Path, output: &Path) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let original = EncodedImage::from_bytes(bytes)
        .with_context(|| format!("{:?} is not a PNG, JPEG or WebP image", input))?;

    let compressed = vision::try_compress(&original, &config.compression.options())
        .with_context(|| format!("Failed to compress {:?}", input))?;
    std::fs::write(output, &compressed.bytes).with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "{:?}: {} KB -> {:?}: {} KB",
        input,
        original.len() / 1024,
        output,
        compressed.len() / 1024
    );

    Ok(())
}

/// Print the effective configuration, optionally writing it out first
fn run_config(config: &AppConfig, path: Option<&Path>, init: bool) -> Result<()> {
    if init {
        let path = path.context("No config path available")?;
        if path.exists() {
            bail!("{:?} already exists", path);
        }
        config::save_config(&AppConfig::default(), path)?;
        println!("Wrote default configuration to {:?}", path);
        return Ok(());
    }

    if let Some(path) = path {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
