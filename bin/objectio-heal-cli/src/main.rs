//! ObjectIO Heal - object scan tool
//!
//! Scans one object across a set of local disk roots and prints a JSON
//! report of which drives hold intact data and which need healing.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use objectio_common::{Config, Error, HealScanMode};
use objectio_heal::{DiskSlot, LocalDisk, ObjectHealer};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-heal")]
#[command(about = "ObjectIO object scan and heal inspection")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/objectio/heal.toml")]
    config: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan an object and report per-drive state
    Scan {
        /// Disk root, in erasure-set order (repeat for each disk)
        #[arg(long = "disk", required = true)]
        disks: Vec<String>,

        #[arg(long)]
        bucket: String,

        #[arg(long)]
        object: String,

        /// normal or deep (overrides the config file)
        #[arg(long)]
        scan_mode: Option<HealScanMode>,

        /// Per-disk timeout in milliseconds (overrides the config file)
        #[arg(long)]
        disk_timeout_ms: Option<u64>,
    },
    /// Print every disk's metadata record for an object
    Inspect {
        #[arg(long = "disk", required = true)]
        disks: Vec<String>,

        #[arg(long)]
        bucket: String,

        #[arg(long)]
        object: String,
    },
}

/// Load the config file, or defaults when it does not exist
fn load_config(path: &str) -> objectio_common::Result<Config> {
    if !Path::new(path).exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::configuration(format!("failed to read {path}: {e}")))?;
    toml::from_str(&contents)
        .map_err(|e| Error::configuration(format!("failed to parse {path}: {e}")))
}

fn open_disks(paths: &[String]) -> Vec<DiskSlot> {
    paths
        .iter()
        .map(|p| Some(Arc::new(LocalDisk::new(p)) as objectio_heal::DiskHandle))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(&args.config)?;

    // CLI takes precedence over the config file
    let log_level = if args.log_level == "info" {
        config.logging.level.clone()
    } else {
        args.log_level.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Commands::Scan {
            disks,
            bucket,
            object,
            scan_mode,
            disk_timeout_ms,
        } => {
            if let Some(mode) = scan_mode {
                config.heal.scan_mode = mode;
            }
            if let Some(ms) = disk_timeout_ms {
                config.heal.disk_timeout_ms = ms;
            }
            if config.heal.disk_timeout_ms == 0 {
                bail!("disk timeout must be greater than zero");
            }

            info!(
                disks = disks.len(),
                scan_mode = %config.heal.scan_mode,
                "Scanning {}/{}",
                bucket,
                object
            );
            let healer = ObjectHealer::new(open_disks(&disks), config.heal);
            let report = healer
                .scan_object(&bucket, &object)
                .await
                .with_context(|| format!("scan of {bucket}/{object} failed"))?;

            if report.heal_required {
                warn!(bucket = %bucket, object = %object, "object needs healing");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Inspect {
            disks,
            bucket,
            object,
        } => {
            let healer = ObjectHealer::new(open_disks(&disks), config.heal);
            let (metas, errs) = healer.read_all_file_info(&bucket, &object).await;
            for ((path, meta), err) in disks.iter().zip(&metas).zip(&errs) {
                match err {
                    Some(e) => println!("{path}: error: {e}"),
                    None => println!("{path}: {}", serde_json::to_string_pretty(meta)?),
                }
            }
        }
    }

    Ok(())
}
