//! Merge question records from several snapshots, keeping the first record
//! seen for each question text.
//!
//! The key is the exact text: no whitespace or punctuation folding, so
//! near-duplicates with cosmetic differences stay separate.

use std::collections::HashSet;
use std::path::PathBuf;

use log::{info, warn};
use serde_json::Value;

use crate::jsonio;
use crate::record;

/// Texts shorter than this (in characters) never take part in a collision.
pub const DEFAULT_MIN_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Added,
    Duplicate,
    /// Text missing or below the length floor.
    Short,
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub min_chars: usize,
    /// Pass short/empty-text records through instead of dropping them.
    pub keep_short: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            keep_short: true,
        }
    }
}

/// First-seen-wins accumulator.
#[derive(Debug)]
pub struct Deduper {
    opts: MergeOptions,
    seen: HashSet<String>,
    records: Vec<Value>,
}

impl Deduper {
    pub fn new(opts: MergeOptions) -> Self {
        Self {
            opts,
            seen: HashSet::new(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, rec: Value) -> Admission {
        let key = match record::question_text(&rec) {
            Some(text) if text.chars().count() >= self.opts.min_chars => text.to_string(),
            _ => {
                if self.opts.keep_short {
                    self.records.push(rec);
                }
                return Admission::Short;
            }
        };

        if self.seen.insert(key) {
            self.records.push(rec);
            Admission::Added
        } else {
            Admission::Duplicate
        }
    }

    pub fn into_records(self) -> Vec<Value> {
        self.records
    }
}

/// Per-input counters for the merge summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub path: PathBuf,
    pub loaded: usize,
    pub added: usize,
    pub duplicates: usize,
    pub short: usize,
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub records: Vec<Value>,
    pub sources: Vec<SourceStats>,
    pub skipped: Vec<PathBuf>,
}

/// Merge record lists in order.
pub fn merge_lists<I>(lists: I, opts: &MergeOptions) -> Vec<Value>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut dd = Deduper::new(opts.clone());
    for list in lists {
        for rec in list {
            dd.push(rec);
        }
    }
    dd.into_records()
}

/// Merge the files in `paths` in order. Unloadable files are skipped with a
/// warning and the rest still merge.
pub fn merge_files(paths: &[PathBuf], opts: &MergeOptions) -> MergeOutcome {
    let (sources, skipped) = jsonio::load_sources(paths);
    let mut dd = Deduper::new(opts.clone());
    let mut stats = Vec::with_capacity(sources.len());

    for source in sources {
        let mut s = SourceStats {
            path: source.path,
            loaded: source.records.len(),
            added: 0,
            duplicates: 0,
            short: 0,
        };
        for rec in source.records {
            match dd.push(rec) {
                Admission::Added => s.added += 1,
                Admission::Duplicate => s.duplicates += 1,
                Admission::Short => s.short += 1,
            }
        }
        info!(
            "{}: {} loaded, {} unique added, {} duplicates, {} short",
            s.path.display(),
            s.loaded,
            s.added,
            s.duplicates,
            s.short
        );
        stats.push(s);
    }

    let records = dd.into_records();
    warn_duplicate_ids(&records);

    MergeOutcome {
        records,
        sources: stats,
        skipped,
    }
}

// Ids are not unique across snapshots; report collisions without touching them.
fn warn_duplicate_ids(records: &[Value]) {
    let mut ids = HashSet::new();
    let mut clashes = 0usize;
    for id in records.iter().filter_map(record::id) {
        if !ids.insert(id.clone()) {
            clashes += 1;
            if clashes <= 20 {
                warn!("id {id} appears more than once in the merged output");
            }
        }
    }
    if clashes > 20 {
        warn!("... {} duplicate ids in total", clashes);
    }
}
