//! CLI entry point for nexgen.
//!
//! # Usage
//!
//! ```bash
//! nexgen validate config/example_grid.toml
//! nexgen scan config/example_grid.toml --json
//! nexgen plan config/example_grid.toml --offset 20
//! nexgen generate config/example_grid.toml --output out/manifest.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nexgen::config::NexgenConfig;
use nexgen::encoder::{Encoder, ManifestEncoder};
use nexgen::pipeline::{self, LayoutOverrides};
use nexgen::tracing_setup::{self, OutputFormat, TracingConfig};
use nexgen::vds::{LayoutSegment, VirtualLayoutPlan};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "nexgen")]
#[command(about = "Experiment geometry and virtual data layout generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, compact, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Log span open/close events of the pipeline stages
    #[arg(long, global = true)]
    trace_spans: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration, building both axis chains
    Validate {
        /// Configuration file (.toml, .json, .yaml)
        config: PathBuf,
    },

    /// Print the per-frame positions of the scanning axes
    Scan {
        /// Configuration file (.toml, .json, .yaml)
        config: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the virtual layout of the configured data sources
    Plan {
        /// Configuration file (.toml, .json, .yaml)
        config: PathBuf,

        /// Physical frame that becomes logical frame 0
        #[arg(long)]
        offset: Option<usize>,

        /// Length of the logical array
        #[arg(long)]
        total_frames: Option<usize>,
    },

    /// Run the full pipeline and write the output file
    Generate {
        /// Configuration file (.toml, .json, .yaml)
        config: PathBuf,

        /// Output path; defaults to `output.path` of the configuration
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Hdf5,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Validate { config }
        | Commands::Scan { config, .. }
        | Commands::Plan { config, .. }
        | Commands::Generate { config, .. } => config.clone(),
    };
    let config = NexgenConfig::load_from(&config_path)
        .with_context(|| format!("Failed to load '{}'", config_path.display()))?;
    init_tracing(&cli, &config)?;

    match cli.command {
        Commands::Validate { .. } => validate(&config),
        Commands::Scan { json, .. } => print_scan(&config, json),
        Commands::Plan {
            offset,
            total_frames,
            ..
        } => print_plan(
            &config,
            LayoutOverrides {
                logical_offset: offset,
                total_frames,
            },
        ),
        Commands::Generate { output, format, .. } => {
            let output = output.unwrap_or_else(|| config.output.path.clone());
            generate(&config, &output, format)
        }
    }
}

fn init_tracing(cli: &Cli, config: &NexgenConfig) -> Result<()> {
    let mut tracing_config = TracingConfig::from_config(config).map_err(anyhow::Error::msg)?;
    if let Some(level) = &cli.log_level {
        tracing_config.level = tracing_setup::parse_log_level(level).map_err(anyhow::Error::msg)?;
    }
    if let Some(format) = &cli.log_format {
        let format: OutputFormat = format.parse().map_err(anyhow::Error::msg)?;
        tracing_config = tracing_config.with_format(format);
    }
    if cli.trace_spans {
        tracing_config = tracing_config.with_span_events(true);
    }
    tracing_setup::init(tracing_config).map_err(anyhow::Error::msg)
}

fn validate(config: &NexgenConfig) -> Result<()> {
    let collection = pipeline::prepare(config)?;
    println!("Configuration OK");
    println!("  goniometer axes: {}", collection.goniometer.len());
    println!("  detector axes:   {}", collection.detector.len());
    println!(
        "  scan:            {} frames over [{}]",
        collection.scan.len(),
        collection.scan.axes().join(", ")
    );
    if let Some(layout) = &collection.layout {
        println!("  layout:          {:?}, {}", layout.shape(), layout.dtype());
    }
    Ok(())
}

fn print_scan(config: &NexgenConfig, json: bool) -> Result<()> {
    let goniometer = pipeline::build_goniometer(config)?;
    let scan = pipeline::compute_collection_scan(config, &goniometer)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
        return Ok(());
    }
    println!("frame\t{}", scan.axes().join("\t"));
    for (k, frame) in scan.iter().enumerate() {
        let values: Vec<String> = frame.iter().map(|v| v.to_string()).collect();
        println!("{}\t{}", k, values.join("\t"));
    }
    Ok(())
}

fn print_plan(config: &NexgenConfig, overrides: LayoutOverrides) -> Result<()> {
    let goniometer = pipeline::build_goniometer(config)?;
    let scan = pipeline::compute_collection_scan(config, &goniometer)?;
    let Some(layout) = pipeline::plan_layout(config, scan.len(), overrides)? else {
        bail!("Configuration has no [data] section");
    };
    print_layout(&layout);
    Ok(())
}

fn print_layout(layout: &VirtualLayoutPlan) {
    println!(
        "logical array {:?} {} (offset {})",
        layout.shape(),
        layout.dtype(),
        layout.logical_offset()
    );
    for segment in layout.segments() {
        match segment {
            LayoutSegment::Backed {
                logical,
                source,
                local,
            } => println!(
                "  [{}, {}) <- {} [{}, {})",
                logical.start,
                logical.end,
                layout.sources()[*source].path,
                local.start,
                local.end
            ),
            LayoutSegment::Unbacked { logical } => {
                println!("  [{}, {}) <- fill", logical.start, logical.end)
            }
        }
    }
    for unused in layout.unused_sources() {
        println!("  unused: {}", unused.path);
    }
}

fn generate(config: &NexgenConfig, output: &Path, format: Format) -> Result<()> {
    let collection = pipeline::prepare(config)?;
    let mut encoder: Box<dyn Encoder> = match format {
        Format::Json => Box::new(ManifestEncoder::new(output)),
        Format::Hdf5 => hdf5_encoder(output)?,
    };
    pipeline::encode(&collection, encoder.as_mut())?;
    info!(output = %output.display(), "Collection written");
    Ok(())
}

#[cfg(feature = "storage_hdf5")]
fn hdf5_encoder(output: &Path) -> Result<Box<dyn Encoder>> {
    Ok(Box::new(nexgen::encoder::Hdf5Encoder::create(output)?))
}

#[cfg(not(feature = "storage_hdf5"))]
fn hdf5_encoder(_output: &Path) -> Result<Box<dyn Encoder>> {
    Err(nexgen::NexgenError::FeatureNotEnabled("storage_hdf5".to_string()).into())
}
