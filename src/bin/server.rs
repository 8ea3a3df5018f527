//! `kissaten-server`: serves the search/browse HTTP API (§6). Exit codes: 0
//! clean shutdown, 1 runtime failure, 2 configuration error.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use kissaten::canon::{CanonPaths, CanonTables};
use kissaten::cli::ServerArgs;
use kissaten::config::Config;
use kissaten::server;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let canon_paths = CanonPaths {
        region_mappings_dir: &args.region_mappings_dir,
        farm_mappings_file: &args.farm_mappings_file,
        varietal_mappings_file: &args.varietal_mappings_file,
        processing_mappings_file: &args.processing_mappings_file,
    };
    let canon = match CanonTables::load(&canon_paths) {
        Ok(canon) => canon,
        Err(e) => {
            error!(error = %e, "failed to load canonicalization tables");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::run_server(config, canon)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server exited with error");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
