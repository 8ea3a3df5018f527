// build.rs

use clap::CommandFactory;
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

include!("src/cli.rs");

fn render(cmd: clap::Command, man_dir: &PathBuf, name: &str) {
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=failed to render man page for {name}: {e}");
        return;
    }
    let man_path = man_dir.join(format!("{name}.1"));
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=failed to write man page {}: {e}", man_path.display());
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/cli.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {e}");
            return;
        }
    };
    let man_dir = manifest_dir.join("man");
    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=failed to create man directory: {e}");
        return;
    }

    render(IngestArgs::command(), &man_dir, "kissaten-ingest");
    render(ServerArgs::command(), &man_dir, "kissaten-server");
}
