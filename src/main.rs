use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docscan::tables::{self, JsonRegionFile, TableRegionSource};
use docscan::{DirectoryArtifacts, Pipeline, ScanConfig, ScanError};

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Turn a photo of a paper document into a flat black-and-white scan")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// File name of the final scan, written inside the output directory
    #[arg(value_name = "OUTPUT", default_value = "scanned_document.png")]
    output: PathBuf,

    /// Directory for stage artifacts and the final scan
    #[arg(long, value_name = "DIR", default_value = "proceso")]
    out_dir: PathBuf,

    /// JSON file with scan settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Working width used for document detection
    #[arg(long)]
    width: Option<u32>,

    /// Neighbourhood size for adaptive thresholding (odd)
    #[arg(long)]
    block_size: Option<u32>,

    /// Constant subtracted from the local mean when thresholding
    #[arg(long, allow_negative_numbers = true)]
    bias: Option<i32>,

    /// JSON file with table polygons to crop from the rectified document
    #[arg(long, value_name = "FILE")]
    tables: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn scan_config(&self) -> anyhow::Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::from_file(path)?,
            None => ScanConfig::default(),
        };
        if let Some(width) = self.width {
            config.working_width = width;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(bias) = self.bias {
            config.bias = bias;
        }
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let config = args.scan_config()?;
    let pipeline = Pipeline::new(&config)?;

    let img = docscan::load_image(&args.image_path)?;

    let mut artifacts = DirectoryArtifacts::new(&args.out_dir)?;
    let outcome = pipeline.run(img, &mut artifacts)?;

    for degradation in &outcome.degradations {
        warn!(?degradation, "Scan completed with a fallback");
    }

    let output_path = args.out_dir.join(&args.output);
    outcome
        .scan
        .save(&output_path)
        .map_err(|source| ScanError::Artifact {
            path: output_path.clone(),
            source,
        })?;
    info!(path = %output_path.display(), "Scan saved");

    if let Some(tables_path) = &args.tables {
        let regions = JsonRegionFile::new(tables_path).regions()?;
        let crops = tables::extract_tables(&outcome.rectified, &regions, pipeline.scanizer());
        let stem = args
            .image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let saved = tables::save_tables(&crops, &args.out_dir, &stem)?;
        info!(
            requested = regions.len(),
            saved = saved.len(),
            "Table regions extracted"
        );
    }

    println!("\n=== Scan Result ===");
    println!(
        "Document: {}x{} px",
        outcome.scan.width(),
        outcome.scan.height()
    );
    if outcome.is_degraded() {
        println!("Fallbacks used: {}", outcome.degradations.len());
    }
    println!("Saved to: {}", output_path.display());

    Ok(())
}
