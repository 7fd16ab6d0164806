/*
cargo run --bin merge_questions -- \
    data/master_database_v3.json \
    data/social_spec_v2.json \
    data/past_social_complete.json \
    -o data/merged_questions.json
*/

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{warn, LevelFilter};
use qbank_prep::dedup::{self, MergeOptions, DEFAULT_MIN_CHARS};
use qbank_prep::jsonio::{self, Layout};
use qbank_prep::logging;

// Merge question files in the given order, keeping the first record seen for
// each question text.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    // Input files, highest priority first
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    // Output file (created/overwritten)
    #[arg(short, long)]
    output: PathBuf,

    // Texts shorter than this (in characters) are never compared
    #[arg(long, default_value_t = DEFAULT_MIN_CHARS)]
    min_chars: usize,

    // Drop records whose text is shorter than --min-chars instead of keeping them
    #[arg(long)]
    drop_short: bool,

    #[arg(long)]
    compact: bool,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_dir, "merge_questions", args.log_level)?;

    let opts = MergeOptions {
        min_chars: args.min_chars,
        keep_short: !args.drop_short,
    };
    let outcome = dedup::merge_files(&args.inputs, &opts);

    if outcome.sources.is_empty() {
        bail!("none of the {} input file(s) could be loaded", args.inputs.len());
    }
    for path in &outcome.skipped {
        warn!("skipped {}", path.display());
    }

    let layout = if args.compact { Layout::Compact } else { Layout::Pretty };
    jsonio::write_json(&args.output, &outcome.records, layout)
        .with_context(|| format!("writing {}", args.output.display()))?;

    for s in &outcome.sources {
        println!(
            "  {}: {} loaded, +{} added, {} duplicate(s), {} short",
            s.path.display(),
            s.loaded,
            s.added,
            s.duplicates,
            s.short
        );
    }
    println!(
        "Merged {} file(s) ({} skipped) into {} with {} record(s)",
        outcome.sources.len(),
        outcome.skipped.len(),
        args.output.display(),
        outcome.records.len()
    );
    Ok(())
}
