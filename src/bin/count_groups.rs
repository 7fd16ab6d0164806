/*
cargo run --bin count_groups -- app/public/web_daily.json app/public/web_common.json

cargo run --bin count_groups -- \
    --check-separation \
    app/assets/separated_db/master_social.json \
    app/assets/separated_db/master_mental.json
*/

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{warn, LevelFilter};
use qbank_prep::census::{self, GroupCensus};
use qbank_prep::jsonio;
use qbank_prep::logging;

// Print record counts per group and category, or check that the social and
// mental databases hold only their own folders.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    // Treat the two inputs as <social> <mental> and report misplaced records
    #[arg(long)]
    check_separation: bool,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "warn", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logging::init(&args.log_dir, "count_groups", args.log_level)?;

    if args.check_separation {
        let [social, mental] = args.inputs.as_slice() else {
            bail!("--check-separation needs exactly two files: <social> <mental>");
        };
        let social_recs = jsonio::read_array(social)
            .with_context(|| format!("loading {}", social.display()))?;
        let mental_recs = jsonio::read_array(mental)
            .with_context(|| format!("loading {}", mental.display()))?;

        let report = census::separation_violations(&social_recs, &mental_recs);
        println!("Mental-only records in {}: {}", social.display(), report.mental_in_social.len());
        for (id, label) in report.mental_in_social.iter().take(10) {
            println!("  - {id} {label}");
        }
        println!("Social-only records in {}: {}", mental.display(), report.social_in_mental.len());
        for (id, label) in report.social_in_mental.iter().take(10) {
            println!("  - {id} {label}");
        }
        return Ok(if report.is_clean() {
            println!("Separation OK");
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    for path in &args.inputs {
        match jsonio::read_array(path) {
            Ok(records) => println!("{}:\n{}", path.display(), GroupCensus::of(&records)),
            Err(e) => warn!("{e}"),
        }
    }
    Ok(ExitCode::SUCCESS)
}
