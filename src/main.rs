//! terra-repack - copy datasets of a Terra granule into a new netCDF-4 file.

use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use terra_repack::container::{NcDestination, NcSource, Target};
use terra_repack::engine::Context;
use terra_repack::transcode::{
    copy_attributes, copy_dataset, copy_dimensions, create_group, detect_decoder,
    set_string_attribute, unpack_dataset, DimensionOptions,
};
use terra_repack::TranscodeConfig;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "terra-repack")]
#[command(about = "Repackage Terra granule datasets into a netCDF-4/HDF5 file", long_about = None)]
struct Args {
    /// Source granule to read
    input: PathBuf,

    /// Output file to create; must not exist
    output: PathBuf,

    /// Dataset path to copy (repeatable)
    #[arg(long = "dataset", required = true)]
    datasets: Vec<String>,

    /// Group to write the datasets into
    #[arg(long)]
    group: Option<String>,

    /// Decode packed radiance and uncertainty datasets
    #[arg(long)]
    unpack: bool,

    /// Store each dataset as a single chunk
    #[arg(long, env = "TERRA_REPACK_CHUNKED")]
    chunked: bool,

    /// Deflate level 0-9, requires --chunked when non-zero
    #[arg(
        long,
        env = "TERRA_REPACK_COMPRESSION",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=9)
    )]
    compression: u8,

    /// Enable logging to specified file
    #[arg(long)]
    log: Option<PathBuf>,
}

fn init_logging(log: Option<&PathBuf>) -> Result<()> {
    match log {
        Some(log_path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(log_path)
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(Level::DEBUG)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = TranscodeConfig::new(args.unpack, args.chunked, args.compression)?;
    let source = NcSource::open(&args.input)?;
    let dest = NcDestination::create(&args.output)?;
    let mut ctx = Context::create(dest, config.write)?;

    let group = match &args.group {
        Some(name) => create_group(&mut ctx, "/", name)?,
        None => "/".to_string(),
    };
    let input_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    set_string_attribute(&mut ctx, Target::Group(&group), "FilePath", &input_name)?;

    let options = DimensionOptions {
        band_tables: true,
        ..Default::default()
    };
    for path in &args.datasets {
        let decoder = if config.unpack {
            detect_decoder(&source, path)?
        } else {
            None
        };
        let handle = match &decoder {
            Some(decoder) => unpack_dataset(&mut ctx, &source, path, &group, decoder)?,
            None => {
                let handle = copy_dataset(&mut ctx, &source, path, &group)?;
                copy_attributes(&mut ctx, &source, path, Target::Object(handle.id))?;
                handle
            }
        };
        copy_dimensions(&mut ctx, &source, path, &handle, &options)
            .with_context(|| format!("Failed to attach dimensions of {}", path))?;
    }

    ctx.close()?.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_ref())?;
    tracing::info!("Starting terra-repack");

    if !args.input.exists() {
        eprintln!("Error: Path not found: {}", args.input.display());
        std::process::exit(1);
    }

    run(&args)?;
    tracing::info!("terra-repack finished");
    Ok(())
}
