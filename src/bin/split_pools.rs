/*
cargo run --bin split_pools -- \
    data/past_social_complete.json \
    data/social_spec_v2.json \
    data/mental_special.json \
    data/master_database_v3.json \
    -o app/assets/separated_db
*/

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::{warn, LevelFilter};
use qbank_prep::assets;
use qbank_prep::jsonio;
use qbank_prep::logging;

// Rebuild the social / mental / care / common / daily databases from every
// legacy snapshot.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    // Source files, highest priority first
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    // Directory that receives one file per pool
    #[arg(short, long, default_value = "app/assets/separated_db")]
    output_dir: PathBuf,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_dir, "split_pools", args.log_level)?;

    let (sources, skipped) = jsonio::load_sources(&args.inputs);
    for path in &skipped {
        warn!("skipped {}", path.display());
    }
    if sources.is_empty() {
        bail!("none of the {} source file(s) could be loaded", args.inputs.len());
    }

    let pools = assets::partition_pools(sources.into_iter().map(|s| (s.path, s.records)).collect());
    let reports = assets::write_pools(&pools, &args.output_dir)?;

    for r in &reports {
        println!("  {}: {}", r.path.display(), r.count);
    }
    println!("Wrote {} pool file(s) to {}", reports.len(), args.output_dir.display());
    Ok(())
}
