/*
cargo run --bin build_assets -- \
    data/master_database_v3.json \
    --web-dir app/public \
    --native-dir app/assets/separated_db \
    --backup app/public/web_spec_social_v3.json

cargo run --bin build_assets -- \
    data/master_database_v3.json \
    --chunk app/assets/separated_db/spec_mental.json \
    --chunk-dir app/public/chunks --chunk-group spec_mental
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use qbank_prep::assets::{self, AssetLayout, SpecSocialSource, DEFAULT_CHUNK_SIZE};
use qbank_prep::jsonio;
use qbank_prep::logging;

// Split the master question file into the web and native bundles.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    // Master question file
    master: PathBuf,

    #[arg(long, default_value = "app/public")]
    web_dir: PathBuf,

    #[arg(long, default_value = "app/assets/separated_db")]
    native_dir: PathBuf,

    // Older web spec_social bundle to fall back on when the master looks damaged
    #[arg(long)]
    backup: Option<PathBuf>,

    // Pick spec_social out of the master by folder code and subject keyword
    #[arg(long)]
    derive_spec_social: bool,

    // Pool files to additionally split into <stem>_<i>.json chunks
    #[arg(long)]
    chunk: Vec<PathBuf>,

    #[arg(long, default_value = "app/public/chunks")]
    chunk_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    // Group written into chunked records that have none
    #[arg(long, default_value = "common")]
    chunk_group: String,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_dir, "build_assets", args.log_level)?;

    let records = jsonio::read_array(&args.master)
        .with_context(|| format!("loading {}", args.master.display()))?;
    let backup = match &args.backup {
        Some(p) => Some(
            jsonio::read_array(p).with_context(|| format!("loading backup {}", p.display()))?,
        ),
        None => None,
    };

    let spec_social = SpecSocialSource {
        derive: args.derive_spec_social,
        backup: backup.as_deref(),
    };
    let layout = AssetLayout {
        web_dir: args.web_dir.clone(),
        native_dir: args.native_dir.clone(),
    };
    let mut reports = assets::build_bundles(records, spec_social, &layout)
        .context("writing bundles")?;

    for pool_file in &args.chunk {
        let pool = jsonio::read_array(pool_file)
            .with_context(|| format!("loading {}", pool_file.display()))?;
        let stem = pool_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk".into());
        let chunks = assets::write_chunks(pool, &args.chunk_dir, &stem, args.chunk_size, &args.chunk_group)
            .with_context(|| format!("chunking {}", pool_file.display()))?;
        reports.extend(chunks);
    }

    for r in &reports {
        println!("  {} ({} records)", r.path.display(), r.count);
    }
    println!("Wrote {} bundle file(s)", reports.len());
    Ok(())
}
