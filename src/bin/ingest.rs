//! `kissaten-ingest`: one-shot loader run over a scraper data root (§4.3,
//! §6). Exit codes: 0 success, 1 loader failure, 2 configuration error.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use kissaten::canon::{CanonPaths, CanonTables};
use kissaten::cli::IngestArgs;
use kissaten::config::Config;
use kissaten::db;
use kissaten::ingest::{self, LoaderOptions};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = IngestArgs::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match run(&args, &config) {
        Ok(report) => {
            info!(
                upserted = report.beans_upserted,
                diffs_applied = report.diffs_applied,
                diffs_skipped = report.diffs_skipped,
                deleted = report.files_deleted,
                recoverable_errors = report.recoverable_errors.len(),
                "ingest run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "ingest run failed");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(args: &IngestArgs, config: &Config) -> kissaten::Result<ingest::LoadReport> {
    let canon_paths = CanonPaths {
        region_mappings_dir: &args.region_mappings_dir,
        farm_mappings_file: &args.farm_mappings_file,
        varietal_mappings_file: &args.varietal_mappings_file,
        processing_mappings_file: &args.processing_mappings_file,
    };
    let canon = CanonTables::load(&canon_paths)?;

    let mut conn = db::open(&config.database_path, false, &canon)?;

    let options = LoaderOptions {
        data_root: &args.data_root,
        incremental: config.incremental,
        check_for_changes: config.check_for_changes,
    };
    ingest::run(&mut conn, &canon, &options)
}
