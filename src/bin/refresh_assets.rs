/*
cargo run --bin refresh_assets -- \
    data/master_database_v3.json \
    --backup app/public/web_spec_social_v3.json
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use qbank_prep::assets::{self, AssetLayout, SpecSocialSource};
use qbank_prep::clean::{self, CleanOptions};
use qbank_prep::jsonio::{self, Layout};
use qbank_prep::logging;

// Clean the master file in place, then rebuild every bundle from it. Stops at
// the first failing step.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    master: PathBuf,

    #[arg(long, default_value = "app/public")]
    web_dir: PathBuf,

    #[arg(long, default_value = "app/assets/separated_db")]
    native_dir: PathBuf,

    #[arg(long)]
    backup: Option<PathBuf>,

    // Pick spec_social out of the master by folder code and subject keyword
    #[arg(long)]
    derive_spec_social: bool,

    #[arg(long)]
    roman: bool,

    // Keep boilerplate records instead of dropping them
    #[arg(long)]
    keep_noise: bool,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_dir, "refresh_assets", args.log_level)?;

    info!("step 1/2: cleaning {}", args.master.display());
    let records = jsonio::read_array(&args.master)
        .with_context(|| format!("loading {}", args.master.display()))?;
    let opts = CleanOptions {
        roman: args.roman,
        drop_noise: !args.keep_noise,
    };
    let (records, report) = clean::clean_records(records, &opts);
    jsonio::write_json(&args.master, &records, Layout::Pretty)
        .with_context(|| format!("cleaning step failed writing {}", args.master.display()))?;
    println!(
        "Cleaned {} of {} record(s), dropped {}",
        report.cleaned,
        report.total,
        report.dropped.len()
    );

    info!("step 2/2: building bundles");
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
    let bundles = assets::build_bundles(records, spec_social, &layout)
        .context("asset build step failed")?;

    for b in &bundles {
        println!("  {} ({} records)", b.path.display(), b.count);
    }
    println!("Refresh complete: {} bundle file(s)", bundles.len());
    Ok(())
}
