//! ospfvrfmgrd - OSPF VRF configuration manager daemon
//!
//! Reconciles a YAML manifest of OSPF VRF instances against a device. The
//! device state is kept in a JSON file and written back after each run.

use anyhow::Context;
use clap::Parser;
use sonic_cfgmgr_common::{CfgMgr, ResourceProvider};
use sonic_ospfvrfmgrd::{Manifest, MemoryDevice, OspfVrfMgr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// SONiC OSPF VRF configuration manager
#[derive(Parser, Debug)]
#[command(name = "ospfvrfmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Desired-state manifest (YAML)
    #[arg(short = 'm', long)]
    manifest: PathBuf,

    /// Device state file (JSON); created if missing
    #[arg(short = 'd', long, default_value = "ospf_vrf_state.json")]
    device_state: PathBuf,

    /// Report pending changes without applying them
    #[arg(short = 'n', long)]
    noop: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting ospfvrfmgrd ---");

    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("ospfvrfmgrd failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

fn load_device(path: &Path) -> anyhow::Result<MemoryDevice> {
    if !path.exists() {
        warn!("{} not found, starting from an empty device", path.display());
        return Ok(MemoryDevice::new());
    }
    MemoryDevice::load(path).with_context(|| format!("loading device state {}", path.display()))
}

/// Runs one pass. Returns false if any resource failed.
async fn run(args: &Args) -> anyhow::Result<bool> {
    let desired = Manifest::load(&args.manifest)
        .and_then(Manifest::into_desired)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    let device = load_device(&args.device_state)?;

    let mut mgr = OspfVrfMgr::new(device);
    info!(
        "{} managing {} {} resources",
        mgr.daemon_name(),
        desired.len(),
        mgr.resource_type()
    );

    if args.noop {
        let keys: Vec<_> = desired.iter().map(|d| d.key.clone()).collect();
        mgr.list_managed_resources(desired).await?;

        let mut ok = true;
        for key in &keys {
            match mgr.preview(key) {
                Ok(action) => info!("(noop) OSPF VRF {}: {}", key, action),
                Err(e) => {
                    error!("(noop) OSPF VRF {}: {}", key, e);
                    ok = false;
                }
            }
        }
        return Ok(ok);
    }

    let report = mgr.reconcile(desired).await?;
    for (key, e) in report.failures() {
        error!("OSPF VRF {} failed: {}", key, e);
    }

    let stats = mgr.stats();
    info!(
        "Done: {} created, {} updated, {} destroyed, {} mutations, {} failures",
        stats.created, stats.updated, stats.destroyed, stats.mutations, stats.failures
    );

    mgr.device()
        .save(&args.device_state)
        .with_context(|| format!("saving device state {}", args.device_state.display()))?;

    Ok(report.is_success())
}
