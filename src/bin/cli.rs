//! CLI for the HREA upload pipeline.
//!
//! Examples:
//! ```bash
//! hrea-cli upload ./zarr/lightscore "https://acct.blob.core.windows.net/sids?sv=...&sig=..."
//! hrea-cli upload ./zarr/lightscore --name zarr/Kenya --overwrite --timeout 3h
//! hrea-cli upload-file Kenya_set_lightscore_sy_2013.tif file:///srv/mirror/
//! hrea-cli list-cogs --country Kenya --variable lightscore --gdal
//! hrea-cli raster-env --gdal-version 3.7
//! hrea-cli levels --resolution 30
//! ```
//!
//! The destination SAS URL may be omitted wherever `HREA_SAS_URL` is set
//! (a `.env` file is honored).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hrea_pipeline::{
    catalog, container_for_url, upload_blob, upload_folder, CogQuery, GdalVersion,
    RasterAccessConfig, RetryPolicy, SasUrl, UploadConfig, UploadProgress,
};
use hrea_pipeline::constants::{
    DEFAULT_BLOCK_CONCURRENCY, DEFAULT_UPLOAD_CHUNK_SIZE, SAS_URL_ENV_VAR,
};
use hrea_pipeline::raster::plan_levels;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local folder tree (e.g. a zarr pyramid) into the container.
    Upload {
        /// Folder to upload; its relative structure is preserved
        src_folder: PathBuf,

        /// Destination: a SAS container URL or file:///path/ (falls back to $HREA_SAS_URL)
        dest: Option<String>,

        /// Destination prefix; defaults to the folder's base name
        #[arg(short = 'n', long = "name")]
        name: Option<String>,

        /// Overwrite blobs that already exist
        #[arg(short = 'o', long = "overwrite")]
        overwrite: bool,

        /// Concurrent block transfers per large blob
        #[arg(short = 'j', long = "jobs", default_value_t = DEFAULT_BLOCK_CONCURRENCY)]
        jobs: usize,

        /// Files uploaded concurrently per chunk
        #[arg(long = "chunk-size", default_value_t = DEFAULT_UPLOAD_CHUNK_SIZE)]
        chunk_size: usize,

        /// Per-chunk deadline, e.g. "90s" or "3h"; pending uploads are aborted
        #[arg(short = 't', long = "timeout", value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Retries per file for transient failures (0 = no retry)
        #[arg(long = "retries", default_value_t = 0)]
        retries: u32,
    },

    /// Upload one local file as a single blob.
    UploadFile {
        /// File to upload
        src: PathBuf,

        /// Destination: a SAS container URL or file:///path/ (falls back to $HREA_SAS_URL)
        dest: Option<String>,

        /// Blob name; defaults to the file's base name
        #[arg(short = 'n', long = "name")]
        name: Option<String>,

        /// Overwrite an existing blob
        #[arg(short = 'o', long = "overwrite")]
        overwrite: bool,

        /// Concurrent block transfers once the file exceeds the large-blob threshold
        #[arg(short = 'j', long = "jobs", default_value_t = DEFAULT_BLOCK_CONCURRENCY)]
        jobs: usize,
    },

    /// List the COG blobs in the container, filtered by dataset naming.
    ListCogs {
        /// Container: a SAS URL (falls back to $HREA_SAS_URL)
        dest: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        year: Option<u16>,

        #[arg(long)]
        variable: Option<String>,

        /// Print GDAL /vsiaz_streaming/ paths instead of names
        #[arg(long, conflicts_with = "urls")]
        gdal: bool,

        /// Print fully signed HTTPS URLs instead of names
        #[arg(long)]
        urls: bool,
    },

    /// Print the access variables a GDAL-based reader needs for the container.
    RasterEnv {
        /// Container: a SAS URL (falls back to $HREA_SAS_URL)
        dest: Option<String>,

        /// GDAL version of the consuming collaborator, e.g. "3.7"
        #[arg(long = "gdal-version", default_value = "3.7")]
        gdal_version: String,
    },

    /// Plan the pyramid coarsening levels for a native raster resolution.
    Levels {
        /// Native ground resolution in meters/pixel
        #[arg(short = 'r', long = "resolution")]
        resolution: f64,

        /// Maximum number of zoom levels to consider
        #[arg(short = 'l', long = "levels", default_value_t = 15)]
        levels: u32,

        /// Web-mercator tile edge in pixels
        #[arg(long = "tile-size", default_value_t = 256)]
        tile_size: u32,
    },
}

fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s).with_context(|| format!("invalid duration {s:?}"))
}

/// Explicit destination, else the HREA_SAS_URL environment variable.
fn resolve_dest(dest: Option<String>) -> Result<String> {
    match dest {
        Some(d) => Ok(d),
        None => std::env::var(SAS_URL_ENV_VAR).with_context(|| {
            format!("no destination given and {SAS_URL_ENV_VAR} is not set")
        }),
    }
}

// -----------------------------------------------------------------------------
// Command implementations
// -----------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn upload_cmd(
    src_folder: PathBuf,
    dest: Option<String>,
    name: Option<String>,
    overwrite: bool,
    jobs: usize,
    chunk_size: usize,
    timeout: Option<Duration>,
    retries: u32,
) -> Result<()> {
    let dest = resolve_dest(dest)?;
    let container = container_for_url(&dest)?;
    let src_folder = std::path::absolute(&src_folder)
        .with_context(|| format!("cannot resolve {}", src_folder.display()))?;

    let cfg = UploadConfig {
        overwrite,
        max_concurrency: jobs,
        chunk_size,
        timeout,
        retry: (retries > 0).then(|| RetryPolicy {
            attempts: retries + 1,
            backoff: Duration::from_secs(1),
        }),
        ..UploadConfig::default()
    };

    let progress = UploadProgress::new(0);
    let report = upload_folder(container, &src_folder, name.as_deref(), &cfg, Some(&progress)).await?;
    progress.finish(report.uploaded, report.failures.len());

    if !report.is_complete() {
        for failure in &report.failures {
            eprintln!("FAILED {} ({}): {}", failure.source.display(), failure.dst_name, failure.error);
        }
        bail!("{} file(s) were not uploaded", report.failures.len());
    }
    info!("uploaded {} file(s) in {} chunk(s)", report.uploaded, report.chunks);
    Ok(())
}

async fn upload_file_cmd(
    src: PathBuf,
    dest: Option<String>,
    name: Option<String>,
    overwrite: bool,
    jobs: usize,
) -> Result<()> {
    let dest = resolve_dest(dest)?;
    let container = container_for_url(&dest)?;
    let receipt = upload_blob(container.as_ref(), &src, name.as_deref(), overwrite, jobs).await?;
    println!("{} uploaded as {}", receipt.source.display(), receipt.name);
    Ok(())
}

async fn list_cogs_cmd(
    dest: Option<String>,
    query: CogQuery,
    gdal: bool,
    urls: bool,
) -> Result<()> {
    let dest = resolve_dest(dest)?;
    let container = container_for_url(&dest)?;
    let names = catalog::list_cogs(container.as_ref(), &query).await?;

    if names.is_empty() {
        info!(
            "no COG files were found for country {:?}, year {:?} and variable {:?}",
            query.country, query.year, query.variable
        );
        return Ok(());
    }

    // both URL forms only make sense for a SAS destination
    let sas = (gdal || urls).then(|| SasUrl::parse(&dest)).transpose()?;
    for name in &names {
        match &sas {
            Some(sas) if gdal => println!("{}", catalog::gdal_vsiaz_path(&sas.container, name)),
            Some(sas) => println!("{}", catalog::signed_url(sas, name)),
            None => println!("{name}"),
        }
    }
    Ok(())
}

fn raster_env_cmd(dest: Option<String>, gdal_version: &str) -> Result<()> {
    let dest = resolve_dest(dest)?;
    let sas = SasUrl::parse(&dest)?;
    let gdal: GdalVersion = gdal_version.parse()?;
    let vars = RasterAccessConfig::from_sas(&sas).gdal_variables(&gdal)?;
    for (key, value) in vars {
        println!("{key}={value}");
    }
    Ok(())
}

fn levels_cmd(resolution: f64, levels: u32, tile_size: u32) -> Result<()> {
    if resolution <= 0.0 {
        bail!("resolution must be positive, got {resolution}");
    }
    let planned = plan_levels(resolution, levels, tile_size);
    if planned.is_empty() {
        println!("native resolution {resolution} m is coarser than zoom 0; nothing to coarsen");
        return Ok(());
    }
    println!("{:<6} {:>16} {:>8}", "zoom", "resolution (m)", "factor");
    for level in planned {
        println!("{:<6} {:>16.3} {:>8}", level.zoom, level.resolution_m, level.coarsen_factor);
    }
    Ok(())
}

/// Main CLI function
#[tokio::main]
async fn main() -> Result<()> {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialise logging once, based on how many `-v` flags were given
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Bridge log-crate messages from dependencies into tracing
    tracing_log::LogTracer::init().ok();

    match cli.cmd {
        Command::Upload {
            src_folder,
            dest,
            name,
            overwrite,
            jobs,
            chunk_size,
            timeout,
            retries,
        } => {
            upload_cmd(src_folder, dest, name, overwrite, jobs, chunk_size, timeout, retries).await
        }

        Command::UploadFile { src, dest, name, overwrite, jobs } => {
            upload_file_cmd(src, dest, name, overwrite, jobs).await
        }

        Command::ListCogs { dest, country, year, variable, gdal, urls } => {
            let query = CogQuery { country, year, variable };
            list_cogs_cmd(dest, query, gdal, urls).await
        }

        Command::RasterEnv { dest, gdal_version } => raster_env_cmd(dest, &gdal_version),

        Command::Levels { resolution, levels, tile_size } => {
            levels_cmd(resolution, levels, tile_size)
        }
    }
}
