use std::fs;
use std::path::{Path, PathBuf};

use qbank_prep::assets::{self, AssetLayout, SpecSocialSource};
use qbank_prep::clean::{self, CleanOptions};
use qbank_prep::dedup::{self, MergeOptions};
use qbank_prep::explain;
use qbank_prep::jsonio::{self, Layout};
use qbank_prep::{DataError, Question};
use serde_json::{json, Value};

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn cleaner_strips_cid_tokens_and_page_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "q.json",
        r#"[{"question_text": "Q (cid:123) 48", "options": ["a","b"]}]"#,
    );

    let records = jsonio::read_array(&path).unwrap();
    let (kept, report) = clean::clean_records(records, &CleanOptions::default());
    jsonio::write_json(&path, &kept, Layout::Pretty).unwrap();

    let back: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, json!([{"question_text": "Q", "options": ["a", "b"]}]));
    assert_eq!(report.cleaned, 1);
    assert!(report.dropped.is_empty());
}

#[test]
fn merge_keeps_first_copy_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.json", r#"[{"question_text":"What is X?"}]"#);
    let b = write_file(
        dir.path(),
        "b.json",
        r#"[{"question_text":"What is X?"},{"question_text":"What is Y?"}]"#,
    );

    let outcome = dedup::merge_files(&[a.clone(), b], &MergeOptions::default());
    let texts: Vec<_> = outcome
        .records
        .iter()
        .map(|r| r["question_text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["What is X?", "What is Y?"]);
    assert_eq!(outcome.sources[0].path, a);
    assert_eq!(outcome.sources[1].duplicates, 1);
}

#[test]
fn merge_skips_broken_and_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(dir.path(), "good.json", r#"[{"question_text":"生活保護法の目的について"}]"#);
    let broken = write_file(dir.path(), "broken.json", "[{");
    let object = write_file(dir.path(), "object.json", r#"{"question_text":"x"}"#);
    let missing = dir.path().join("missing.json");

    let outcome = dedup::merge_files(&[broken.clone(), good, object.clone(), missing.clone()], &MergeOptions::default());
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.skipped, vec![broken, object, missing]);
}

#[test]
fn bundles_land_in_web_and_native_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let layout = AssetLayout {
        web_dir: dir.path().join("public"),
        native_dir: dir.path().join("native"),
    };
    let master = vec![
        json!({"id": "c1", "group": "common", "category_label": "社会保障"}),
        json!({"id": "p1", "group": "past_social_36"}),
        json!({"id": "s1", "group": "spec_social", "category_label": "高齢者に対する支援と介護保険制度"}),
    ];
    let backup = vec![
        json!({"id": "ss_1", "group": "spec_social"}),
        json!({"id": "ss_2"}),
    ];

    let source = SpecSocialSource {
        derive: false,
        backup: Some(backup.as_slice()),
    };
    let reports = assets::build_bundles(master, source, &layout).unwrap();
    let count = |p: PathBuf| reports.iter().find(|r| r.path == p).map(|r| r.count);

    assert_eq!(count(layout.web_dir.join("web_common.json")), Some(1));
    // spec_social below the floor, so the backup replaced it
    assert_eq!(count(layout.web_dir.join("web_spec_social_v3.json")), Some(2));
    assert_eq!(count(layout.web_dir.join("web_past_social.json")), Some(1));
    assert_eq!(count(layout.web_dir.join("web_daily.json")), Some(2));
    assert_eq!(count(layout.native_dir.join("master_social.json")), Some(3));

    let web = fs::read_to_string(layout.web_dir.join("web_common.json")).unwrap();
    assert!(!web.contains('\n'));
    let native = fs::read_to_string(layout.native_dir.join("master_common.json")).unwrap();
    assert!(native.contains("\n  "));

    let social = jsonio::read_array(&layout.native_dir.join("master_social.json")).unwrap();
    assert_eq!(social.last().unwrap()["id"], "p1");
}

#[test]
fn schema_migration_unifies_spellings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "loose.json",
        r#"[
            {"id": 7, "questionText": "Q1", "optionsVal": ["a","b"], "correctAnswer": "1,3", "isFree": true, "tags": ["x"]},
            {"question_text": "Q2", "questionText": "ignored", "correct_answer": 2},
            "not a record"
        ]"#,
    );

    let records = jsonio::read_array(&path).unwrap();
    let results: Vec<Result<Question, DataError>> = records.into_iter().map(Question::from_value).collect();
    assert!(matches!(results[2], Err(DataError::NotObject { found: "string" })));

    let questions: Vec<Question> = results.into_iter().filter_map(Result::ok).collect();
    let out = dir.path().join("canonical.json");
    jsonio::write_json(&out, &questions, Layout::Pretty).unwrap();
    let back = jsonio::read_array(&out).unwrap();

    assert_eq!(
        back[0],
        json!({
            "id": "7",
            "question_text": "Q1",
            "options": ["a", "b"],
            "correct_answer": ["1", "3"],
            "is_free": true,
            "tags": ["x"]
        })
    );
    assert_eq!(back[1], json!({"question_text": "Q2", "correct_answer": ["2"]}));
}

#[test]
fn explanations_flow_from_donor_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = write_file(
        dir.path(),
        "target.json",
        r#"[{"id": "ps36_1", "question_text": "次のうち、正しいものを一つ選びなさい。", "explanation": "解説準備中"}]"#,
    );
    let donor = write_file(
        dir.path(),
        "donor.json",
        r#"[{"question_text": "次のうち、 正しいものを 一つ選びなさい。", "explanation": "正解は3。社会福祉法第1条に定める目的に関する記述であり、第2条の定義規定ではない点に注意する。"}]"#,
    );

    let mut records = jsonio::read_array(&target).unwrap();
    let donors = jsonio::read_array(&donor).unwrap();
    assert!(explain::needs_explanation(&records[0]));
    assert_eq!(explain::merge_explanations(&mut records, &donors), 1);
    assert!(!explain::needs_explanation(&records[0]));
}
