//! Filling in question explanations: copied from older snapshots, or
//! generated through the Gemini API.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::error::DataError;
use crate::record;

/// Placeholder text the generators left in unfinished explanations.
pub const PLACEHOLDER: &str = "準備中";

const MERGE_KEY_CHARS: usize = 80;
const MIN_DONOR_CHARS: usize = 20;
const MIN_EXPLANATION_CHARS: usize = 30;

// ---------------------------------------------------------------- offline merge

/// Whitespace-free prefix of the question text used to match records across
/// snapshots.
pub fn merge_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .take(MERGE_KEY_CHARS)
        .collect()
}

fn is_meaningful(expl: &str) -> bool {
    expl.chars().count() > MIN_DONOR_CHARS && !expl.contains(PLACEHOLDER)
}

/// Copy the longest meaningful donor explanation into every matching target
/// record. Returns how many target records were updated.
pub fn merge_explanations(target: &mut [Value], donors: &[Value]) -> usize {
    let mut lookup: HashMap<String, &str> = HashMap::new();
    for d in donors {
        let Some(text) = record::question_text(d) else { continue };
        let Some(expl) = record::explanation(d).filter(|e| is_meaningful(e)) else {
            continue;
        };
        let key = merge_key(text);
        if key.is_empty() {
            continue;
        }
        let longer = lookup
            .get(&key)
            .map_or(true, |existing| expl.chars().count() > existing.chars().count());
        if longer {
            lookup.insert(key, expl);
        }
    }
    info!("explanation lookup holds {} entries", lookup.len());

    let mut merged = 0;
    for rec in target.iter_mut() {
        let Some(key) = record::question_text(rec).map(merge_key) else { continue };
        if let (Some(expl), Some(obj)) = (lookup.get(&key), rec.as_object_mut()) {
            obj.insert("explanation".into(), Value::String(expl.to_string()));
            merged += 1;
        }
    }
    merged
}

/// Explanation missing, too short, or still a placeholder.
pub fn needs_explanation(rec: &Value) -> bool {
    match record::explanation(rec) {
        None => true,
        Some(e) => e.chars().count() <= MIN_EXPLANATION_CHARS || e.contains(PLACEHOLDER),
    }
}

// ---------------------------------------------------------------- LLM output

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Pull the first balanced JSON object or array out of model output that may
/// be wrapped in fences or prose.
pub fn extract_json_text(raw: &str) -> Option<&str> {
    let body = FENCE_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    let start = body.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in body[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&body[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Read the `explanation` field from a model reply; a reply that is not JSON
/// at all is taken as the explanation itself.
pub fn parse_explanation(raw: &str) -> Result<String, DataError> {
    let text = match extract_json_text(raw) {
        Some(json_text) => {
            let v: Value = serde_json::from_str(json_text)
                .map_err(|e| DataError::Llm(format!("unparsable reply: {e}\n{json_text}")))?;
            v.get("explanation")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| DataError::Llm(format!("reply has no explanation field: {json_text}")))?
        }
        None => raw.trim().to_string(),
    };
    if text.is_empty() {
        return Err(DataError::Llm("empty explanation".into()));
    }
    Ok(text)
}

// ---------------------------------------------------------------- prompt

const SYSTEM_PROMPT: &str = "あなたは社会福祉士国家試験の専門講師です。\
受験生が理解しやすいように、問題の解説を作成してください。\n\
1. まず正解の選択肢を明示する\n\
2. なぜその選択肢が正解なのかを説明する\n\
3. 他の選択肢が不正解である理由も簡潔に説明する\n\
4. 関連する法律や制度があれば言及する\n\
5. 200〜400文字程度で簡潔にまとめる\n\
出力は {\"explanation\": \"...\"} のJSONオブジェクトのみ。";

pub fn build_prompt(rec: &Value) -> String {
    let text = record::question_text(rec).unwrap_or_default();
    let options = record::OPTION_KEYS
        .iter()
        .find_map(|k| rec.get(*k).and_then(Value::as_array))
        .map(|opts| {
            opts.iter()
                .enumerate()
                .map(|(i, o)| format!("{}. {}", i + 1, o.as_str().unwrap_or_default()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    let answer = record::ANSWER_KEYS
        .iter()
        .find_map(|k| rec.get(*k))
        .map(|v| record::canonical_answer(v).join(", "))
        .unwrap_or_default();

    format!("【問題】\n{text}\n\n【選択肢】\n{options}\n\n【正解】\n{answer}\n\n解説を作成してください。")
}

// ---------------------------------------------------------------- client

/// Anything that can turn a prompt into an explanation.
#[allow(async_fn_in_trait)]
pub trait ExplanationSource {
    async fn explain(&self, prompt: &str, api_key: &str) -> Result<String, DataError>;
}

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: reqwest::Client,
    model: String,
}

impl GeminiClient {
    pub fn new(model: &str, timeout: Duration) -> Result<Self, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Llm(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

impl ExplanationSource for GeminiClient {
    async fn explain(&self, prompt: &str, api_key: &str) -> Result<String, DataError> {
        let url = format!("{ENDPOINT}/models/{}:generateContent?key={api_key}", self.model);
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.7
            }
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DataError::Llm(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let msg = resp.text().await.unwrap_or_default();
            return Err(DataError::Llm(format!("{status}: {msg}")));
        }

        let resp_json: Value = resp.json().await.map_err(|e| DataError::Llm(e.to_string()))?;
        let text = resp_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| DataError::Llm(format!("unexpected response structure: {resp_json}")))?;
        parse_explanation(text)
    }
}

// ---------------------------------------------------------------- filler

#[derive(Debug, Clone)]
pub struct FillConfig {
    /// Requests in flight at once.
    pub concurrency: usize,
    pub max_attempts: u8,
    /// Flush output and progress after this many completed records.
    pub flush_every: usize,
    pub base_delay: Duration,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_attempts: 3,
            flush_every: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Delay before retry number `attempt` (1-based): base · 2^(attempt-1).
pub fn backoff_delay(base: Duration, attempt: u8) -> Duration {
    base.saturating_mul(1u32 << u32::from(attempt.saturating_sub(1)).min(16))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FillReport {
    pub pending: usize,
    pub filled: usize,
    pub failed: Vec<String>,
}

/// Progress key of every record: its id when that id is unique in the file,
/// otherwise `<id>#<index>`; `idx_<index>` when it has no id.
pub fn progress_ids(records: &[Value]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for id in records.iter().filter_map(record::id) {
        *counts.entry(id).or_default() += 1;
    }
    records
        .iter()
        .enumerate()
        .map(|(i, rec)| match record::id(rec) {
            Some(id) if counts.get(&id).copied().unwrap_or(0) > 1 => format!("{id}#{i}"),
            Some(id) => id,
            None => format!("idx_{i}"),
        })
        .collect()
}

async fn explain_with_retry<S: ExplanationSource>(
    source: &S,
    prompt: &str,
    key: &str,
    label: &str,
    cfg: &FillConfig,
) -> Option<String> {
    let attempts = cfg.max_attempts.max(1);
    for attempt in 1..=attempts {
        match source.explain(prompt, key).await {
            Ok(text) => return Some(text),
            Err(e) if attempt < attempts => {
                warn!("{label} attempt {attempt}/{attempts} failed: {e}");
                sleep(backoff_delay(cfg.base_delay, attempt)).await;
            }
            Err(e) => {
                error!("{label} failed after {attempts} attempts – skipping. Last error: {e}");
            }
        }
    }
    None
}

/// Generate explanations for every record that needs one and is not yet in
/// `done`. Requests run concurrently up to `cfg.concurrency`; completions are
/// applied by index as they arrive and `flush` is called every
/// `cfg.flush_every` completions.
pub async fn fill_explanations<S, F>(
    records: &mut [Value],
    source: &S,
    keys: &[String],
    cfg: &FillConfig,
    done: &mut HashSet<String>,
    bar: &ProgressBar,
    mut flush: F,
) -> Result<FillReport, DataError>
where
    S: ExplanationSource,
    F: FnMut(&[Value], &HashSet<String>) -> Result<(), DataError>,
{
    if keys.is_empty() {
        return Err(DataError::MissingApiKey {
            tried: "<no keys supplied>".into(),
        });
    }

    let work: Vec<(usize, String, String)> = records
        .iter()
        .zip(progress_ids(records))
        .enumerate()
        .filter(|(_, (r, pid))| needs_explanation(r) && !done.contains(pid))
        .map(|(i, (r, pid))| (i, pid, build_prompt(r)))
        .collect();

    let mut report = FillReport {
        pending: work.len(),
        ..Default::default()
    };
    info!("{} records need an explanation", work.len());
    bar.set_length(work.len() as u64);

    let semaphore = Semaphore::new(cfg.concurrency.max(1));
    let mut tasks = FuturesUnordered::new();
    for (n, (idx, pid, prompt)) in work.into_iter().enumerate() {
        let key = &keys[n % keys.len()];
        let semaphore = &semaphore;
        tasks.push(async move {
            let _permit = semaphore.acquire().await.ok();
            let text = explain_with_retry(source, &prompt, key, &pid, cfg).await;
            (idx, pid, text)
        });
    }

    let mut completed = 0usize;
    while let Some((idx, pid, text)) = tasks.next().await {
        completed += 1;
        bar.inc(1);
        match text {
            Some(text) => {
                if let Some(obj) = records[idx].as_object_mut() {
                    obj.insert("explanation".into(), Value::String(text));
                }
                done.insert(pid);
                report.filled += 1;
            }
            None => report.failed.push(pid),
        }
        if cfg.flush_every > 0 && completed % cfg.flush_every == 0 {
            flush(records, done)?;
            info!("progress saved: {} done", done.len());
        }
    }

    flush(records, done)?;
    Ok(report)
}
