//! The quiz-question record.
//!
//! Source files spell the same field several ways (`question_text` /
//! `questionText`, `group` / `group_id`, ...). The accessors here are the only
//! place that knows the fallback order; [`Question`] is the canonical shape a
//! file is migrated into once.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{kind_of, DataError};

pub const TEXT_KEYS: &[&str] = &["question_text", "questionText"];
pub const OPTION_KEYS: &[&str] = &["options", "optionsVal"];
pub const ANSWER_KEYS: &[&str] = &["correct_answer", "correctAnswer"];
pub const GROUP_KEYS: &[&str] = &["group", "group_id"];
pub const CATEGORY_KEYS: &[&str] = &["category_label", "categoryLabel"];

/// First non-empty string stored under one of `keys`.
pub fn first_str<'a>(rec: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| rec.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

pub fn question_text(rec: &Value) -> Option<&str> {
    first_str(rec, TEXT_KEYS)
}

pub fn group(rec: &Value) -> Option<&str> {
    first_str(rec, GROUP_KEYS)
}

pub fn category_label(rec: &Value) -> Option<&str> {
    first_str(rec, CATEGORY_KEYS)
}

/// Overwrite the category label under whichever spellings the record already
/// uses, or `category_label` when it has none.
pub fn set_category_label(obj: &mut Map<String, Value>, label: &str) {
    let mut written = false;
    for key in CATEGORY_KEYS {
        if let Some(slot) = obj.get_mut(*key) {
            *slot = Value::String(label.to_string());
            written = true;
        }
    }
    if !written {
        obj.insert("category_label".into(), Value::String(label.to_string()));
    }
}

/// Record id as a string; numeric ids are rendered in decimal.
pub fn id(rec: &Value) -> Option<String> {
    scalar_string(rec.get("id")?)
}

pub fn explanation(rec: &Value) -> Option<&str> {
    rec.get("explanation").and_then(Value::as_str)
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonical `correct_answer`: always a list of trimmed strings.
///
/// Accepts a list, a JSON-encoded list inside a string, a comma separated
/// string (`"1,2"`), a single value, or a number.
pub fn canonical_answer(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::Number(n) => vec![n.to_string()],
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            if trimmed.starts_with('[') {
                if let Ok(parsed @ Value::Array(_)) = serde_json::from_str::<Value>(trimmed) {
                    return canonical_answer(&parsed);
                }
            }
            if trimmed.contains(',') {
                return trimmed.split(',').map(|p| p.trim().to_string()).collect();
            }
            vec![trimmed.to_string()]
        }
        _ => Vec::new(),
    }
}

/// A question in the canonical snake_case schema.
///
/// Unknown keys survive in `extra` so nothing is lost by the migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Question {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub question_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub correct_answer: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_free: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mastered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tag: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Question {
    /// Migrate a loose record. When both spellings of a field exist the
    /// snake_case one wins and the other is dropped.
    pub fn from_value(v: Value) -> Result<Self, DataError> {
        let mut obj = match v {
            Value::Object(obj) => obj,
            other => {
                return Err(DataError::NotObject {
                    found: kind_of(&other),
                })
            }
        };

        let id = take(&mut obj, &["id"]).as_ref().and_then(scalar_string);
        let question_text = take(&mut obj, TEXT_KEYS)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let options = take(&mut obj, OPTION_KEYS)
            .map(|v| string_list(&v))
            .unwrap_or_default();
        let correct_answer = take(&mut obj, ANSWER_KEYS)
            .map(|v| canonical_answer(&v))
            .unwrap_or_default();
        let group = take_string(&mut obj, GROUP_KEYS);
        let category_label = take_string(&mut obj, CATEGORY_KEYS);
        let year = take(&mut obj, &["year"]).as_ref().and_then(scalar_string);
        let explanation = take_string(&mut obj, &["explanation"]);
        let is_free = take(&mut obj, &["is_free", "isFree"]).and_then(|v| v.as_bool());
        let is_mastered = take(&mut obj, &["is_mastered", "isMastered"]).and_then(|v| v.as_bool());
        let quality_score =
            take(&mut obj, &["quality_score", "qualityScore"]).and_then(|v| v.as_f64());
        let source_tag = take_string(&mut obj, &["source_tag"]);

        Ok(Self {
            id,
            question_text,
            options,
            correct_answer,
            group,
            category_label,
            year,
            explanation,
            is_free,
            is_mastered,
            quality_score,
            source_tag,
            extra: obj,
        })
    }

    /// Standard exam questions have five options.
    pub fn has_standard_options(&self) -> bool {
        self.options.len() == 5
    }
}

// Remove every key in `keys`, returning the first non-null value in key order.
fn take(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for k in keys {
        if let Some(v) = obj.remove(*k) {
            if found.is_none() && !v.is_null() {
                found = Some(v);
            }
        }
    }
    found
}

fn take_string(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    take(obj, keys)
        .as_ref()
        .and_then(scalar_string)
}

fn string_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors_fall_back_to_camel_case() {
        let rec = json!({"questionText": "Q", "group_id": "spec_social", "categoryLabel": "高齢者福祉"});
        assert_eq!(question_text(&rec), Some("Q"));
        assert_eq!(group(&rec), Some("spec_social"));
        assert_eq!(category_label(&rec), Some("高齢者福祉"));
    }

    #[test]
    fn test_set_category_label_keeps_spelling() {
        let mut camel = json!({"categoryLabel": "old"});
        set_category_label(camel.as_object_mut().unwrap(), "new");
        assert_eq!(camel, json!({"categoryLabel": "new"}));

        let mut bare = json!({"id": "1"});
        set_category_label(bare.as_object_mut().unwrap(), "new");
        assert_eq!(bare["category_label"], "new");
    }

    #[test]
    fn test_empty_snake_case_falls_through() {
        let rec = json!({"group": "", "group_id": "common"});
        assert_eq!(group(&rec), Some("common"));
    }

    #[test]
    fn test_id_from_number() {
        assert_eq!(id(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(id(&json!({"id": "ss37_001"})), Some("ss37_001".to_string()));
        assert_eq!(id(&json!({})), None);
    }

    #[test]
    fn test_canonical_answer_shapes() {
        assert_eq!(canonical_answer(&json!("1,2")), vec!["1", "2"]);
        assert_eq!(canonical_answer(&json!(" 3 ")), vec!["3"]);
        assert_eq!(canonical_answer(&json!("[\"1\", 4]")), vec!["1", "4"]);
        assert_eq!(canonical_answer(&json!([" 2", 5])), vec!["2", "5"]);
        assert_eq!(canonical_answer(&json!(3)), vec!["3"]);
        assert!(canonical_answer(&json!("")).is_empty());
        assert!(canonical_answer(&json!(null)).is_empty());
        assert!(canonical_answer(&json!({"a": 1})).is_empty());
    }

    #[test]
    fn test_canonical_answer_bad_json_list_falls_back_to_commas() {
        assert_eq!(canonical_answer(&json!("[1, 2")), vec!["[1", "2"]);
    }

    #[test]
    fn test_from_value_migrates_aliases() {
        let q = Question::from_value(json!({
            "id": 7,
            "questionText": "問題",
            "optionsVal": ["a", "b", "c", "d", "e"],
            "correctAnswer": "1,3",
            "group_id": "common_social",
            "categoryLabel": "社会保障",
            "year": 2024,
            "isFree": true,
            "source": "R6"
        }))
        .unwrap();

        assert_eq!(q.id.as_deref(), Some("7"));
        assert_eq!(q.question_text, "問題");
        assert!(q.has_standard_options());
        assert_eq!(q.correct_answer, vec!["1", "3"]);
        assert_eq!(q.group.as_deref(), Some("common_social"));
        assert_eq!(q.category_label.as_deref(), Some("社会保障"));
        assert_eq!(q.year.as_deref(), Some("2024"));
        assert_eq!(q.is_free, Some(true));
        assert_eq!(q.extra.get("source"), Some(&json!("R6")));
    }

    #[test]
    fn test_from_value_prefers_snake_case() {
        let q = Question::from_value(json!({
            "question_text": "snake",
            "questionText": "camel",
            "correct_answer": ["2"],
            "correctAnswer": "5"
        }))
        .unwrap();
        assert_eq!(q.question_text, "snake");
        assert_eq!(q.correct_answer, vec!["2"]);
        assert!(q.extra.is_empty());
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(matches!(
            Question::from_value(json!("text")),
            Err(DataError::NotObject { found: "string" })
        ));
    }

    #[test]
    fn test_serialize_single_spelling() {
        let q = Question::from_value(json!({"questionText": "Q", "isMastered": false})).unwrap();
        let out = serde_json::to_value(&q).unwrap();
        assert_eq!(out, json!({"question_text": "Q", "is_mastered": false}));
    }
}
