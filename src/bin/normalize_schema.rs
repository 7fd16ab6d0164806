/*
cargo run --bin normalize_schema -- \
    data/merged_questions.json \
    -o data/questions_canonical.json
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use qbank_prep::jsonio::{self, Layout};
use qbank_prep::{logging, Question};

// Rewrite a question file into the canonical snake_case schema.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    input: PathBuf,

    // Defaults to overwriting the input
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
    logging::init(&args.log_dir, "normalize_schema", args.log_level)?;

    let records = jsonio::read_array(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let total = records.len();

    let mut questions = Vec::with_capacity(total);
    let mut irregular = 0usize;
    for (i, rec) in records.into_iter().enumerate() {
        match Question::from_value(rec) {
            Ok(q) => {
                if !q.has_standard_options() {
                    irregular += 1;
                }
                questions.push(q);
            }
            Err(e) => warn!("record #{i} skipped: {e}"),
        }
    }
    info!("{irregular} question(s) do not have exactly five options");

    let output = args.output.as_ref().unwrap_or(&args.input);
    let layout = if args.compact { Layout::Compact } else { Layout::Pretty };
    jsonio::write_json(output, &questions, layout)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Normalized {} of {} record(s) into {}",
        questions.len(),
        total,
        output.display()
    );
    Ok(())
}
