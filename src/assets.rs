//! Redistribution of a master question file into the bundles the app loads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::Value;

use crate::category::{self, Pool};
use crate::dedup::{Deduper, MergeOptions};
use crate::error::DataError;
use crate::jsonio::{self, Layout};
use crate::record::{self, CATEGORY_KEYS};

/// Below this many spec_social records the master file is considered damaged
/// and the backup bundle is consulted.
pub const SPEC_SOCIAL_FLOOR: usize = 100;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Rewrite both category spellings through [`category::normalize_category`].
pub fn normalize_categories(records: &mut [Value]) {
    for rec in records.iter_mut() {
        let Some(obj) = rec.as_object_mut() else { continue };
        for key in CATEGORY_KEYS {
            if let Some(Value::String(label)) = obj.get_mut(*key) {
                let normalized = category::normalize_category(label);
                *label = normalized;
            }
        }
    }
}

// Group as a plain string, "None" when absent (matches str(None) prefix checks)
fn group_or_none(rec: &Value) -> &str {
    rec.get("group").and_then(Value::as_str).unwrap_or("None")
}

/// The subsets cut from one master file.
#[derive(Debug, Default, Clone)]
pub struct Subsets {
    pub common: Vec<Value>,
    pub spec_social: Vec<Value>,
    pub past_social: Vec<Value>,
    pub daily: Vec<Value>,
}

impl Subsets {
    /// Normalize categories and cut the subsets. Only the primary `group`
    /// field is consulted, as the master file is written with that spelling.
    pub fn from_records(mut records: Vec<Value>) -> Self {
        normalize_categories(&mut records);

        let mut out = Subsets::default();
        for rec in records {
            let g = group_or_none(&rec);
            if g == "common" || g == "common_social" {
                out.common.push(rec.clone());
            }
            if g.starts_with("past_social") {
                out.past_social.push(rec.clone());
            }
            if g == "spec_social" {
                out.spec_social.push(rec.clone());
            }
            if !g.starts_with("past_") {
                out.daily.push(rec);
            }
        }
        out
    }

    /// Replace `spec_social` from `backup` when the master file has too few.
    /// Returns true when the backup was used.
    pub fn restore_from_backup(&mut self, backup: &[Value]) -> bool {
        if self.spec_social.len() >= SPEC_SOCIAL_FLOOR {
            return false;
        }
        let restored = restore_spec_social(backup);
        info!(
            "spec_social had {} records, restored {} from backup",
            self.spec_social.len(),
            restored.len()
        );
        self.spec_social = restored;
        true
    }
}

/// Pick spec_social records out of an older web bundle, excluding anything
/// that looks like a past-exam question.
pub fn restore_spec_social(backup: &[Value]) -> Vec<Value> {
    backup
        .iter()
        .filter(|rec| {
            let grp = record::group(rec);
            let id = record::id(rec).unwrap_or_default();
            if grp.is_some_and(|g| g.starts_with("past")) || id.starts_with("ps_") {
                return false;
            }
            match grp {
                Some("spec_social") => true,
                None => id.starts_with("ss_") || id.starts_with("social_"),
                Some(_) => false,
            }
        })
        .cloned()
        .collect()
}

/// Derive the social-specialized subset straight from the master file.
///
/// A record qualifies when [`category::social_spec_label`] finds its folder
/// code or subject keyword. The copy gets `group = spec_social`, the unified
/// label, and a `soc_spec_<n>` id when it has none.
pub fn extract_spec_social(records: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for rec in records {
        let Some(label) = category::social_spec_label(rec) else { continue };
        let mut copy = rec.clone();
        let n = out.len();
        let Some(obj) = copy.as_object_mut() else { continue };
        obj.insert("group".into(), Value::String("spec_social".into()));
        record::set_category_label(obj, label);
        if !obj.contains_key("id") {
            obj.insert("id".into(), Value::String(format!("soc_spec_{n}")));
        }
        out.push(copy);
    }
    info!("derived {} spec_social records from the master file", out.len());
    out
}

/// Where bundles are written.
#[derive(Debug, Clone)]
pub struct AssetLayout {
    /// Web bundles (compact JSON), e.g. `app/public`.
    pub web_dir: PathBuf,
    /// Native bundles (indented JSON), e.g. `app/assets/separated_db`.
    pub native_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub path: PathBuf,
    pub count: usize,
}

fn write_bundle(path: PathBuf, records: &[Value], layout: Layout) -> Result<BundleReport, DataError> {
    jsonio::write_json(&path, records, layout)?;
    info!("saved {} ({})", path.display(), records.len());
    Ok(BundleReport {
        path,
        count: records.len(),
    })
}

/// Write the web and native bundles. The native social bundle holds the
/// specialized records followed by the past-exam records.
pub fn write_bundles(subsets: &Subsets, layout: &AssetLayout) -> Result<Vec<BundleReport>, DataError> {
    let web = |name: &str| layout.web_dir.join(name);
    let native = |name: &str| layout.native_dir.join(name);

    let mut reports = vec![
        write_bundle(web("web_common.json"), &subsets.common, Layout::Compact)?,
        write_bundle(web("web_spec_social_v3.json"), &subsets.spec_social, Layout::Compact)?,
        write_bundle(web("web_past_social.json"), &subsets.past_social, Layout::Compact)?,
        write_bundle(web("web_daily.json"), &subsets.daily, Layout::Compact)?,
    ];

    let native_social: Vec<Value> = subsets
        .spec_social
        .iter()
        .chain(subsets.past_social.iter())
        .cloned()
        .collect();
    reports.push(write_bundle(native("master_social.json"), &native_social, Layout::Pretty)?);
    reports.push(write_bundle(native("master_common.json"), &subsets.common, Layout::Pretty)?);

    Ok(reports)
}

/// How [`build_bundles`] sources the spec_social subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecSocialSource<'a> {
    /// Use [`extract_spec_social`] instead of the records already grouped
    /// `spec_social`.
    pub derive: bool,
    /// Older bundle consulted when fewer than [`SPEC_SOCIAL_FLOOR`] remain.
    pub backup: Option<&'a [Value]>,
}

/// Cut `records` into subsets, optionally derive spec_social from folder
/// codes and keywords, fall back to the backup when spec_social looks
/// damaged, and write every bundle.
pub fn build_bundles(
    records: Vec<Value>,
    spec_social: SpecSocialSource<'_>,
    layout: &AssetLayout,
) -> Result<Vec<BundleReport>, DataError> {
    let derived = spec_social.derive.then(|| extract_spec_social(&records));
    let mut subsets = Subsets::from_records(records);
    if let Some(mut derived) = derived {
        normalize_categories(&mut derived);
        subsets.spec_social = derived;
    }
    match spec_social.backup {
        Some(backup) => {
            subsets.restore_from_backup(backup);
        }
        None if subsets.spec_social.len() < SPEC_SOCIAL_FLOOR => warn!(
            "only {} spec_social records and no backup given",
            subsets.spec_social.len()
        ),
        None => {}
    }
    write_bundles(&subsets, layout)
}

/// Split `records` into `<stem>_<i>.json` files of at most `chunk_size`
/// records each. Records with no group under either spelling get
/// `default_group`.
pub fn write_chunks(
    mut records: Vec<Value>,
    dir: &Path,
    stem: &str,
    chunk_size: usize,
    default_group: &str,
) -> Result<Vec<BundleReport>, DataError> {
    let chunk_size = chunk_size.max(1);
    for rec in records.iter_mut() {
        if record::group(rec).is_none() {
            if let Some(obj) = rec.as_object_mut() {
                obj.insert("group".into(), Value::String(default_group.to_string()));
            }
        }
    }

    records
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| write_bundle(dir.join(format!("{stem}_{i}.json")), chunk, Layout::Compact))
        .collect()
}

/// Tag applied to records by origin before pooling.
fn source_tag_for(path: &Path) -> Option<&'static str> {
    let name = path.to_string_lossy();
    if name.contains("past_social_complete") {
        Some("official_scrape")
    } else if name.contains("mental_special") {
        Some("mental_spec_file")
    } else if name.contains("social_spec") {
        Some("social_spec_file")
    } else if name.contains("master_data") || name.contains("master_database") {
        Some("legacy_mixed")
    } else {
        None
    }
}

// Legacy past-exam copies for recent years were superseded by the official scrape.
fn is_superseded_legacy(rec: &Value) -> bool {
    let Some(id) = rec.get("id").and_then(Value::as_str) else {
        return false;
    };
    id.starts_with("ps_") && ["R6", "R5", "R4", "_37_"].iter().any(|y| id.contains(y))
}

/// Records split into the five output databases, each sorted by id.
pub type PoolSet = BTreeMap<Pool, Vec<Value>>;

/// Merge every source (in order, first text wins), tag records by origin,
/// drop superseded past-exam copies, then classify into pools.
///
/// Official-scrape records are keyed by id instead of text, since scrape
/// errors can leave two real questions with the same text.
pub fn partition_pools(sources: Vec<(PathBuf, Vec<Value>)>) -> PoolSet {
    let mut by_text = Deduper::new(MergeOptions {
        min_chars: 5,
        keep_short: false,
    });
    let mut official: BTreeMap<String, Value> = BTreeMap::new();

    for (path, records) in sources {
        let tag = source_tag_for(&path);
        let from_mental_file = path.to_string_lossy().contains("mental");
        for mut rec in records {
            if is_superseded_legacy(&rec) {
                continue;
            }
            if tag != Some("official_scrape") {
                let gid = rec.get("group_id").and_then(Value::as_str).unwrap_or_default();
                let cat = rec.get("category_label").and_then(Value::as_str).unwrap_or_default();
                let is_past = gid.contains("past_social") || gid.contains("past_common") || cat.contains("過去問");
                if is_past && !gid.contains("mental") && !from_mental_file {
                    continue;
                }
            }
            if let (Some(tag), Some(obj)) = (tag, rec.as_object_mut()) {
                if tag == "official_scrape" || !obj.contains_key("source_tag") {
                    obj.insert("source_tag".into(), Value::String(tag.into()));
                }
            }
            if tag == Some("official_scrape") {
                if record::question_text(&rec).map_or(0, |t| t.chars().count()) < 5 {
                    warn!("official record with missing or garbage text dropped");
                    continue;
                }
                let key = record::id(&rec)
                    .or_else(|| rec.get("question_number").and_then(|v| v.as_str().map(str::to_string)))
                    .or_else(|| record::question_text(&rec).map(str::to_string));
                match key {
                    Some(key) => {
                        official.insert(key, rec);
                    }
                    None => warn!("official record without id or text in {}", path.display()),
                }
            } else {
                by_text.push(rec);
            }
        }
    }

    let mut pools: PoolSet = Pool::ALL.iter().map(|p| (*p, Vec::new())).collect();
    for mut rec in official.into_values().chain(by_text.into_records()) {
        for pool in category::classify(&mut rec) {
            if let Some(list) = pools.get_mut(&pool) {
                list.push(rec.clone());
            }
        }
    }
    for list in pools.values_mut() {
        list.sort_by(|a, b| record::id(a).cmp(&record::id(b)));
    }
    pools
}

/// Write each pool to `<dir>/<pool file name>` (indented).
pub fn write_pools(pools: &PoolSet, dir: &Path) -> Result<Vec<BundleReport>, DataError> {
    pools
        .iter()
        .map(|(pool, records)| write_bundle(dir.join(pool.file_name()), records, Layout::Pretty))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subsets_split_by_group() {
        let records = vec![
            json!({"id": "1", "group": "common_social", "category_label": "相談援助の理論と方法"}),
            json!({"id": "2", "group": "past_social_36"}),
            json!({"id": "3", "group": "spec_social", "categoryLabel": "高齢者に対する支援と介護保険制度"}),
            json!({"id": "4"}),
            json!({"id": "5", "group": "past_mental"}),
        ];
        let s = Subsets::from_records(records);

        assert_eq!(s.common.len(), 1);
        assert_eq!(s.common[0]["category_label"], "ソーシャルワークの理論と方法");
        assert_eq!(s.past_social.len(), 1);
        assert_eq!(s.spec_social[0]["categoryLabel"], "高齢者福祉");
        let daily: Vec<_> = s.daily.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(daily, vec![json!("1"), json!("3"), json!("4")]);
    }

    #[test]
    fn test_restore_spec_social_filters() {
        let backup = vec![
            json!({"id": "ss_1", "group": "spec_social"}),
            json!({"id": "ss_2"}),
            json!({"id": "social_3", "group_id": "spec_social"}),
            json!({"id": "ps_4", "group": "spec_social"}),
            json!({"id": "x_5", "group": "past_social"}),
            json!({"id": "x_6"}),
            json!({"id": "ss_7", "group": "common"}),
        ];
        let ids: Vec<_> = restore_spec_social(&backup)
            .iter()
            .filter_map(record::id)
            .collect();
        assert_eq!(ids, vec!["ss_1", "ss_2", "social_3"]);
    }

    #[test]
    fn test_restore_only_below_floor() {
        let mut s = Subsets {
            spec_social: vec![json!({"group": "spec_social"}); SPEC_SOCIAL_FLOOR],
            ..Default::default()
        };
        assert!(!s.restore_from_backup(&[]));
        assert_eq!(s.spec_social.len(), SPEC_SOCIAL_FLOOR);

        s.spec_social.truncate(3);
        assert!(s.restore_from_backup(&[json!({"id": "ss_1", "group": "spec_social"})]));
        assert_eq!(s.spec_social.len(), 1);
    }

    #[test]
    fn test_write_chunks_sizes_and_default_group() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<Value> = (0..5)
            .map(|i| if i == 0 { json!({"id": i, "group_id": "spec_mental_x"}) } else { json!({"id": i}) })
            .collect();
        let reports = write_chunks(records, dir.path(), "web_spec_mental", 2, "spec_mental").unwrap();

        let counts: Vec<_> = reports.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        let first = jsonio::read_array(&dir.path().join("web_spec_mental_0.json")).unwrap();
        assert!(first[0].get("group").is_none());
        assert_eq!(first[1]["group"], "spec_mental");
    }

    #[test]
    fn test_extract_spec_social_by_folder_code_and_keyword() {
        let master = vec![
            json!({"id": "a", "source": "SW専3/第2章", "category_label": "第2章"}),
            json!({"categoryLabel": "高齢者に対する支援と介護保険制度", "group": "common"}),
            json!({"id": "c", "category_label": "社会保障"}),
            json!({"category_label": "児童福祉論"}),
        ];
        let spec = extract_spec_social(&master);

        assert_eq!(spec.len(), 3);
        assert_eq!(spec[0]["category_label"], "児童・家庭福祉");
        assert_eq!(spec[0]["group"], "spec_social");
        assert_eq!(spec[1]["id"], "soc_spec_1");
        assert_eq!(spec[1]["categoryLabel"], "高齢者福祉");
        assert!(spec[1].get("category_label").is_none());
        assert_eq!(spec[1]["group"], "spec_social");
        assert_eq!(spec[2]["id"], "soc_spec_2");
        assert_eq!(master[1]["group"], "common");
    }

    #[test]
    fn test_build_bundles_derives_spec_social() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AssetLayout {
            web_dir: dir.path().join("web"),
            native_dir: dir.path().join("native"),
        };
        let master = vec![
            json!({"id": "s1", "source": "SW専1/ch1", "group": "common"}),
            json!({"id": "c1", "group": "common", "category_label": "社会保障"}),
        ];
        let source = SpecSocialSource {
            derive: true,
            backup: None,
        };
        build_bundles(master, source, &layout).unwrap();

        let spec = jsonio::read_array(&layout.web_dir.join("web_spec_social_v3.json")).unwrap();
        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["id"], "s1");
        assert_eq!(spec[0]["category_label"], "福祉サービスの組織と経営");
    }

    #[test]
    fn test_partition_pools_prefers_official_and_drops_legacy_past() {
        let official = vec![
            json!({"id": "ss37_002", "question_text": "同じ問題文です。"}),
            json!({"id": "ss37_001", "question_text": "同じ問題文です。"}),
            json!({"id": "ss37_003", "question_text": "問"}),
            json!({"id": "ss37_004"}),
        ];
        let legacy = vec![
            json!({"id": "ps_R6_1", "question_text": "古い過去問のコピーです"}),
            json!({"id": "m1", "question_text": "過去問カテゴリの問題です", "category_label": "過去問R5"}),
            json!({"id": "c1", "question_text": "社会保障の問題文です", "category_label": "社会保障"}),
            json!({"id": "d1", "question_text": "総合問題の問題文です", "category_label": "総合問題"}),
        ];
        let pools = partition_pools(vec![
            (PathBuf::from("assets/past_social_complete.json"), official),
            (PathBuf::from("assets/master_data.json"), legacy),
        ]);

        let ids = |p: Pool| -> Vec<String> { pools[&p].iter().filter_map(record::id).collect() };
        assert_eq!(ids(Pool::Social), vec!["ss37_001", "ss37_002"]);
        assert_eq!(ids(Pool::Common), vec!["c1"]);
        assert_eq!(ids(Pool::Daily), vec!["d1"]);
        assert!(pools[&Pool::Mental].is_empty());
        assert_eq!(pools[&Pool::Social][0]["source_tag"], "official_scrape");
        assert_eq!(pools[&Pool::Common][0]["source_tag"], "legacy_mixed");
    }
}
