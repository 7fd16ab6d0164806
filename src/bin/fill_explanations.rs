/*
cargo run --bin fill_explanations -- \
    app/public/web_past_social.json \
    -o data/past_social_explained.json \
    --progress data/past_social_explained.progress.json \
    --model "gemini-2.5-flash" \
    --concurrency 10
*/

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use qbank_prep::explain::{self, FillConfig, GeminiClient};
use qbank_prep::jsonio::{self, Layout};
use qbank_prep::{env, logging};
use serde_json::Value;

// Generate missing explanations with Gemini. Interrupted runs resume from
// the progress file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    input: PathBuf,

    // Defaults to overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    // JSON array of ids already processed; defaults to <output>.progress.json
    #[arg(long)]
    progress: Option<PathBuf>,

    #[arg(long, default_value = "gemini-2.5-flash")]
    model: String,

    #[arg(long, default_value_t = 10)]
    concurrency: usize,

    #[arg(long, default_value_t = 3)]
    max_attempts: u8,

    // Save output and progress after this many completed records
    #[arg(long, default_value_t = 5)]
    flush_every: usize,

    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_dir, "fill_explanations", args.log_level)?;

    env::load_dotenv();
    let keys = match env::gemini_keys() {
        Ok(keys) => keys,
        Err(e) => {
            if env::openai_key().is_ok() {
                warn!("OPENAI_API_KEY is set, but only the Gemini API is supported");
            }
            return Err(e.into());
        }
    };
    info!("using {} API key(s)", keys.len());

    let output = args.output.clone().unwrap_or_else(|| args.input.clone());
    let progress = args
        .progress
        .clone()
        .unwrap_or_else(|| output.with_extension("progress.json"));

    let mut done: HashSet<String> = jsonio::read_array_or_empty(&progress)
        .with_context(|| format!("loading progress {}", progress.display()))?
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    // A partial output from an earlier run carries the explanations already generated
    let source = if !done.is_empty() && output.exists() {
        info!("resuming: {} ids already processed", done.len());
        &output
    } else {
        &args.input
    };
    let mut records = jsonio::read_array(source)
        .with_context(|| format!("loading {}", source.display()))?;

    let client = GeminiClient::new(&args.model, Duration::from_secs(args.timeout_secs))?;
    let cfg = FillConfig {
        concurrency: args.concurrency,
        max_attempts: args.max_attempts,
        flush_every: args.flush_every,
        ..FillConfig::default()
    };

    let bar = logging::progress_bar(0);
    let report = explain::fill_explanations(
        &mut records,
        &client,
        &keys,
        &cfg,
        &mut done,
        &bar,
        |recs, done| {
            jsonio::write_json(&output, recs, Layout::Pretty)?;
            let mut ids: Vec<&String> = done.iter().collect();
            ids.sort();
            let ids: Vec<Value> = ids.into_iter().map(|id| Value::String(id.clone())).collect();
            jsonio::write_json(&progress, &ids, Layout::Pretty)
        },
    )
    .await
    .with_context(|| format!("writing {}", output.display()))?;
    bar.finish_and_clear();

    for id in &report.failed {
        warn!("no explanation for {id}");
    }
    println!(
        "Filled {} of {} pending explanation(s), {} failed. Output: {}",
        report.filled,
        report.pending,
        report.failed.len(),
        output.display()
    );
    Ok(())
}
