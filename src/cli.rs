//! Command-line argument definitions shared by the `kissaten-ingest` and
//! `kissaten-server` binaries. The core crate only recognizes environment
//! variables and an optional `kissaten.toml` (§6); these flags are a thin
//! convenience layer that feeds [`crate::config::Config`].

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "kissaten-ingest")]
#[command(author, version, about = "Fold scraper JSON/diffJSON snapshots into the Kissaten warehouse", long_about = None)]
pub struct IngestArgs {
    /// Root of the `<roasters>/<roaster_slug>/<YYYYMMDD>/` directory tree.
    #[arg(long, value_name = "PATH")]
    pub data_root: PathBuf,

    /// Path to `kissaten.toml`; recognized environment variables still win.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory of `region_mappings/<ALPHA2>.json` files.
    #[arg(long, value_name = "PATH", default_value = "mappings/region_mappings")]
    pub region_mappings_dir: PathBuf,

    /// `farm_mappings.json` path.
    #[arg(long, value_name = "PATH", default_value = "mappings/farm_mappings.json")]
    pub farm_mappings_file: PathBuf,

    /// `varietal_mappings.json` path.
    #[arg(long, value_name = "PATH", default_value = "mappings/varietal_mappings.json")]
    pub varietal_mappings_file: PathBuf,

    /// `processing_methods_mappings.json` path.
    #[arg(
        long,
        value_name = "PATH",
        default_value = "mappings/processing_methods_mappings.json"
    )]
    pub processing_mappings_file: PathBuf,
}

#[derive(Parser, Debug)]
#[command(name = "kissaten-server")]
#[command(author, version, about = "Serve the Kissaten search/browse HTTP API", long_about = None)]
pub struct ServerArgs {
    /// Path to `kissaten.toml`; recognized environment variables still win.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory of `region_mappings/<ALPHA2>.json` files.
    #[arg(long, value_name = "PATH", default_value = "mappings/region_mappings")]
    pub region_mappings_dir: PathBuf,

    /// `farm_mappings.json` path.
    #[arg(long, value_name = "PATH", default_value = "mappings/farm_mappings.json")]
    pub farm_mappings_file: PathBuf,

    /// `varietal_mappings.json` path.
    #[arg(long, value_name = "PATH", default_value = "mappings/varietal_mappings.json")]
    pub varietal_mappings_file: PathBuf,

    /// `processing_methods_mappings.json` path.
    #[arg(
        long,
        value_name = "PATH",
        default_value = "mappings/processing_methods_mappings.json"
    )]
    pub processing_mappings_file: PathBuf,
}
