//! Cleaning of PDF-extraction noise in question records.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::record::{self, OPTION_KEYS, TEXT_KEYS};

// (cid:NNNN) glyph placeholders left by the PDF text extractor
static CID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(cid:\d+\)").unwrap());

// Page number at the end of a line: "text 48" or "text　48"
static PAGE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\u{3000}]+[0-9]+[\s\u{3000}]*$").unwrap());

static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"表\d|表[にのを]|次の表").unwrap());
static FIGURE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"図\d|図[にのを]|次の図").unwrap());

const LITERAL_NOISE: &[&str] = &["(cid12719)"];

/// Phrases that only show up in textbook front matter, never in a question.
pub const BANNED_KEYWORDS: &[&str] = &[
    "養成課程",
    "本書",
    "執筆",
    "編集委員",
    "カリキュラム",
    "テキスト",
    "履修",
    "教科書",
    "学習のポイント",
    "参照して",
    "次ページ",
    "前ページ",
];

const ROMAN: [(char, &str); 10] = [
    ('Ⅰ', "1"),
    ('Ⅱ', "2"),
    ('Ⅲ', "3"),
    ('Ⅳ', "4"),
    ('Ⅴ', "5"),
    ('Ⅵ', "6"),
    ('Ⅶ', "7"),
    ('Ⅷ', "8"),
    ('Ⅸ', "9"),
    ('Ⅹ', "10"),
];

fn clean_once(text: &str) -> String {
    let mut out = CID_RE.replace_all(text, "").into_owned();
    out = PAGE_NUMBER_RE.replace(&out, "").into_owned();
    for noise in LITERAL_NOISE {
        out = out.replace(noise, "");
    }
    out.trim().to_string()
}

/// Strip `(cid:N)` tokens and trailing page numbers, then trim.
///
/// Repeats until nothing changes, so `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(text: &str) -> String {
    let mut current = clean_once(text);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Replace Ⅰ..Ⅹ with their arabic values.
pub fn normalize_roman(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ROMAN.iter().find(|(r, _)| *r == ch) {
            Some((_, digits)) => out.push_str(digits),
            None => out.push(ch),
        }
    }
    out
}

/// Why a record was judged to be textbook boilerplate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoiseReason {
    Keyword(&'static str),
    TableReference,
    FigureReference,
    ExamMeta,
}

impl std::fmt::Display for NoiseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoiseReason::Keyword(k) => write!(f, "[{k}]"),
            NoiseReason::TableReference => f.write_str("[表-Pattern]"),
            NoiseReason::FigureReference => f.write_str("[図-Pattern]"),
            NoiseReason::ExamMeta => f.write_str("[試験meta]"),
        }
    }
}

/// Check text, explanation and options (whitespace removed) for boilerplate.
pub fn noise_reason(rec: &Value) -> Option<NoiseReason> {
    let mut combined = String::new();
    combined.push_str(record::question_text(rec).unwrap_or_default());
    combined.push_str(record::explanation(rec).unwrap_or_default());
    if let Some(opts) = options_of(rec) {
        for o in opts.iter().filter_map(Value::as_str) {
            combined.push_str(o);
        }
    }
    let check: String = combined.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(word) = BANNED_KEYWORDS.iter().find(|w| check.contains(*w)) {
        return Some(NoiseReason::Keyword(*word));
    }
    if TABLE_RE.is_match(&check) {
        return Some(NoiseReason::TableReference);
    }
    if FIGURE_RE.is_match(&check) {
        return Some(NoiseReason::FigureReference);
    }
    if check.contains("国家試験")
        && check.contains("出題")
        && (check.contains("対策") || check.contains("傾向"))
    {
        return Some(NoiseReason::ExamMeta);
    }
    None
}

fn options_of(rec: &Value) -> Option<&Vec<Value>> {
    OPTION_KEYS
        .iter()
        .find_map(|k| rec.get(*k).and_then(Value::as_array))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Also rewrite roman numerals (text, options, explanation).
    pub roman: bool,
    /// Drop records that [`noise_reason`] flags.
    pub drop_noise: bool,
}

fn clean_field(text: &str, opts: &CleanOptions) -> String {
    let cleaned = clean_text(text);
    if opts.roman {
        normalize_roman(&cleaned)
    } else {
        cleaned
    }
}

/// Clean one record in place, keeping whichever field spellings it already
/// uses. Returns true when anything changed.
pub fn clean_record(rec: &mut Value, opts: &CleanOptions) -> bool {
    let Some(obj) = rec.as_object_mut() else {
        return false;
    };
    let mut changed = false;

    for key in TEXT_KEYS {
        if let Some(Value::String(s)) = obj.get_mut(*key) {
            let cleaned = clean_field(s, opts);
            if cleaned != *s {
                *s = cleaned;
                changed = true;
            }
        }
    }

    for key in OPTION_KEYS {
        if let Some(Value::Array(items)) = obj.get_mut(*key) {
            for item in items.iter_mut() {
                if let Value::String(s) = item {
                    let cleaned = clean_field(s, opts);
                    if cleaned != *s {
                        *s = cleaned;
                        changed = true;
                    }
                }
            }
        }
    }

    if opts.roman {
        if let Some(Value::String(s)) = obj.get_mut("explanation") {
            let normalized = normalize_roman(s);
            if normalized != *s {
                *s = normalized;
                changed = true;
            }
        }
    }

    changed
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub total: usize,
    pub cleaned: usize,
    pub dropped: Vec<String>,
}

/// Clean every record and optionally drop boilerplate ones.
pub fn clean_records(records: Vec<Value>, opts: &CleanOptions) -> (Vec<Value>, CleanReport) {
    let mut report = CleanReport {
        total: records.len(),
        ..Default::default()
    };
    let mut kept = Vec::with_capacity(records.len());

    for mut rec in records {
        if clean_record(&mut rec, opts) {
            report.cleaned += 1;
        }
        if opts.drop_noise {
            if let Some(reason) = noise_reason(&rec) {
                let preview: String = record::question_text(&rec)
                    .unwrap_or_default()
                    .chars()
                    .take(30)
                    .collect();
                let id = record::id(&rec).unwrap_or_else(|| "-".into());
                report.dropped.push(format!("{reason} {id}: {preview}..."));
                continue;
            }
        }
        kept.push(rec);
    }

    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_removes_cid_and_page_number() {
        assert_eq!(clean_text("Q (cid:123) 48"), "Q");
        assert_eq!(clean_text("福祉(cid:12719)の理念"), "福祉の理念");
        assert_eq!(clean_text("社会保障　12"), "社会保障");
        assert_eq!(clean_text("noise (cid12719) here"), "noise  here");
    }

    #[test]
    fn test_clean_keeps_inner_numbers() {
        assert_eq!(clean_text("2024年 の改正"), "2024年 の改正");
        assert_eq!(clean_text("48"), "48");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "Q 12 34",
            "a (ci(cid:1)d:2) b",
            "  text　48　 ",
            "plain",
            "",
            "(cid:1)(cid:2) 3",
        ];
        for s in samples {
            let once = clean_text(s);
            assert_eq!(clean_text(&once), once, "not idempotent for {s:?}");
            assert!(!CID_RE.is_match(&once), "cid left in {once:?}");
        }
    }

    #[test]
    fn test_normalize_roman() {
        assert_eq!(normalize_roman("第Ⅲ章とⅩ"), "第3章と10");
    }

    #[test]
    fn test_noise_keyword_ignores_whitespace() {
        let rec = json!({"question_text": "この 教 科 書 の目的"});
        assert_eq!(noise_reason(&rec), Some(NoiseReason::Keyword("教科書")));
    }

    #[test]
    fn test_noise_patterns() {
        assert_eq!(
            noise_reason(&json!({"question_text": "次の表を見て答えよ"})),
            Some(NoiseReason::TableReference)
        );
        assert_eq!(
            noise_reason(&json!({"question_text": "問", "options": ["図1参照"]})),
            Some(NoiseReason::FigureReference)
        );
        assert_eq!(
            noise_reason(&json!({"question_text": "国家試験の出題傾向について"})),
            Some(NoiseReason::ExamMeta)
        );
        assert_eq!(noise_reason(&json!({"question_text": "生活保護法の目的"})), None);
    }

    #[test]
    fn test_clean_record_keeps_field_spelling() {
        let mut rec = json!({"questionText": "Q 5", "options": ["a (cid:9)", 3]});
        assert!(clean_record(&mut rec, &CleanOptions::default()));
        assert_eq!(rec, json!({"questionText": "Q", "options": ["a", 3]}));
        assert!(!clean_record(&mut rec, &CleanOptions::default()));
    }

    #[test]
    fn test_clean_records_drops_noise() {
        let records = vec![
            json!({"id": "a", "question_text": "本書の使い方"}),
            json!({"id": "b", "question_text": "第Ⅱ条の趣旨", "explanation": "Ⅳ項"}),
        ];
        let opts = CleanOptions {
            roman: true,
            drop_noise: true,
        };
        let (kept, report) = clean_records(records, &opts);
        assert_eq!(kept, vec![json!({"id": "b", "question_text": "第2条の趣旨", "explanation": "4項"})]);
        assert_eq!(report.total, 2);
        assert_eq!(report.cleaned, 1);
        assert_eq!(report.dropped.len(), 1);
        assert!(report.dropped[0].starts_with("[本書] a:"));
    }
}
