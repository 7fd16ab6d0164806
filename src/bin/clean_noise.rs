/*
cargo run --bin clean_noise -- \
    data/master_database_v3.json \
    --roman --drop-noise \
    -o data/master_database_v3_clean.json
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use qbank_prep::clean::{self, CleanOptions};
use qbank_prep::jsonio::{self, Layout};
use qbank_prep::logging;

// Strip PDF-extraction noise from every text field of a question file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    // Question file (top-level JSON array)
    input: PathBuf,

    // Where to write the cleaned file; defaults to overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    // Also rewrite roman numerals (Ⅰ → 1, ...)
    #[arg(long)]
    roman: bool,

    // Drop boilerplate records (exam notices, table/figure references)
    #[arg(long)]
    drop_noise: bool,

    // Write compact JSON instead of indented
    #[arg(long)]
    compact: bool,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_dir, "clean_noise", args.log_level)?;

    let records = jsonio::read_array(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let opts = CleanOptions {
        roman: args.roman,
        drop_noise: args.drop_noise,
    };
    let (kept, report) = clean::clean_records(records, &opts);
    for line in &report.dropped {
        info!("dropped {line}");
    }

    let output = args.output.as_ref().unwrap_or(&args.input);
    let layout = if args.compact { Layout::Compact } else { Layout::Pretty };
    jsonio::write_json(output, &kept, layout)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Cleaned {} of {} record(s), dropped {}, wrote {} to {}",
        report.cleaned,
        report.total,
        report.dropped.len(),
        kept.len(),
        output.display()
    );
    Ok(())
}
