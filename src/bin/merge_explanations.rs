/*
cargo run --bin merge_explanations -- \
    app/public/web_past_social.json \
    --donor backup/web_past_social_20250101.json \
    --donor data/past_explanations.json
*/

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use qbank_prep::explain;
use qbank_prep::jsonio::{self, Layout};
use qbank_prep::logging;

// Copy explanations from older snapshots into a question file, matching
// records by the start of their question text.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    target: PathBuf,

    // Files to take explanations from
    #[arg(long = "donor", required = true)]
    donors: Vec<PathBuf>,

    // Defaults to overwriting the target
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    compact: bool,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_dir, "merge_explanations", args.log_level)?;

    let mut target = jsonio::read_array(&args.target)
        .with_context(|| format!("loading {}", args.target.display()))?;

    let (sources, skipped) = jsonio::load_sources(&args.donors);
    for path in &skipped {
        warn!("donor {} skipped", path.display());
    }
    if sources.is_empty() {
        bail!("no donor file could be loaded");
    }
    let donors: Vec<_> = sources.into_iter().flat_map(|s| s.records).collect();
    info!("{} donor records", donors.len());

    let merged = explain::merge_explanations(&mut target, &donors);
    let still_missing = target.iter().filter(|r| explain::needs_explanation(r)).count();

    let output = args.output.as_ref().unwrap_or(&args.target);
    let layout = if args.compact { Layout::Compact } else { Layout::Pretty };
    jsonio::write_json(output, &target, layout)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Merged {merged} explanation(s) into {} ({still_missing} record(s) still need one)",
        output.display()
    );
    Ok(())
}
