//! Subject-name normalization and pool classification.
//!
//! Every table here is fixed curriculum knowledge, compiled in as `phf` maps
//! or ordered slices (where first match wins).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::record;

// Old curriculum subject names -> current ones
static CURRICULUM: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "児童や家庭に対する支援と児童・家庭福祉制度" => "児童・家庭福祉",
    "高齢者に対する支援と介護保険制度" => "高齢者福祉",
    "障害者に対する支援と障害者自立支援制度" => "障害者福祉",
    "低所得者に対する支援と生活保護制度" => "貧困に対する支援",
    "相談援助の理論と方法" => "ソーシャルワークの理論と方法",
    "相談援助の基盤と専門職" => "ソーシャルワークの基盤と専門職",
    "地域福祉の理論と方法" => "地域福祉と包括的支援体制",
};

// Exact label variants -> official subject name
static LABEL_VARIANTS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "障害福祉" => "障害者福祉",
    "心理学と心理的支援" => "心理学理論と心理的支援",
    "社会学と社会システム" => "社会理論と社会システム",
    "社会福祉調査の基礎" => "社会調査の基礎",
};

// Source folder codes of the social-worker specialized subjects (strongest evidence)
const SW_FOLDERS: &[(&str, &str)] = &[
    ("SW専1", "福祉サービスの組織と経営"),
    ("SW専2", "高齢者福祉"),
    ("SW専3", "児童・家庭福祉"),
    ("SW専4", "貧困に対する支援"),
    ("SW専5", "保健医療と福祉"),
    ("SW専6", "ソーシャルワークの理論と方法(社会専門)"),
    ("SW専7", "ソーシャルワーク演習(社会専門)"),
];

// Category-name keyword fallback; order matters, first hit wins
const SOCIAL_SPEC_KEYWORDS: &[(&str, &str)] = &[
    ("福祉サービスの組織と経営", "福祉サービスの組織と経営"),
    ("高齢者福祉", "高齢者福祉"),
    ("高齢者に対する支援", "高齢者福祉"),
    ("介護保険制度", "高齢者福祉"),
    ("児童・家庭福祉", "児童・家庭福祉"),
    ("児童や家庭に対する支援", "児童・家庭福祉"),
    ("貧困に対する支援", "貧困に対する支援"),
    ("低所得者に対する支援", "貧困に対する支援"),
    ("保健医療と福祉", "保健医療と福祉"),
    ("保健医療サービス", "保健医療と福祉"),
    ("保健医療", "保健医療と福祉"),
    ("医学", "保健医療と福祉"),
    ("リハビリ", "保健医療と福祉"),
    ("ソーシャルワークの理論と方法", "ソーシャルワークの理論と方法(社会専門)"),
    ("ソーシャルワーク演習", "ソーシャルワーク演習(社会専門)"),
    ("児童", "児童・家庭福祉"),
    ("家庭福祉", "児童・家庭福祉"),
];

const SOCIAL_SUBJECTS: &[&str] = &[
    "福祉サービスの組織と経営",
    "高齢者福祉",
    "高齢者に対する支援",
    "介護保険制度",
    "児童・家庭福祉",
    "児童や家庭に対する支援",
    "貧困に対する支援",
    "低所得者に対する支援",
    "保健医療と福祉",
    "保健医療サービス",
    "ソーシャルワークの理論と方法",
    "ソーシャルワーク演習",
    "更生保護制度",
    "就労支援サービス",
];
const MENTAL_SUBJECTS: &[&str] = &[
    "精神疾患とその治療",
    "精神保健の課題と支援",
    "精神保健福祉相談援助の基盤",
    "精神保健福祉の理論と相談援助",
    "精神保健",
    "精神障害",
];
const CARE_SUBJECTS: &[&str] = &[
    "介護の基本",
    "介護過程",
    "発達と老化の理解",
    "認知症の理解",
    "障害の理解",
    "こころとからだのしくみ",
    "医療的ケア",
    "生活支援技術",
];

const SOCIAL_CODES: &[&str] = &["SW専", "社会専門"];
const MENTAL_CODES: &[&str] = &["精神専", "精神専門", "PSW"];
const CARE_CODES: &[&str] = &["介護専", "介護専門"];

const DAILY_LABELS: &[&str] = &["共通科目（総合）", "総合問題"];
pub const DAILY_HIDDEN_LABEL: &str = "HIDDEN_DAILY";

static PART_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)_part_\d+").unwrap());
static VOL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)_vol_\d+").unwrap());
static FULLWIDTH_COUNTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"（\d+）").unwrap());
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s?").unwrap());
static SECOND_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s?\(2\)").unwrap());

/// Map an old curriculum subject name to the current one; anything else is
/// returned unchanged.
pub fn normalize_category(label: &str) -> String {
    CURRICULUM
        .get(label)
        .map(|s| s.to_string())
        .unwrap_or_else(|| label.to_string())
}

/// Strip chunk/volume markers and numbering from a folder-derived label and
/// unify known variants.
pub fn sanitize_label(label: &str) -> String {
    let mut cat = PART_SUFFIX.replace_all(label, "").into_owned();
    cat = VOL_SUFFIX.replace_all(&cat, "").into_owned();
    cat = FULLWIDTH_COUNTER.replace_all(&cat, "").trim().to_string();
    cat = LEADING_NUMBER.replace(&cat, "").into_owned();
    cat = SECOND_PART.replacen(&cat, 1, "").replacen("（共通）", "", 1);

    if cat.contains("地域福祉") && cat.contains("包括") {
        return "地域福祉と包括的支援体制".to_string();
    }
    match LABEL_VARIANTS.get(cat.as_str()) {
        Some(official) => official.to_string(),
        None => cat,
    }
}

/// Unified social-specialized subject for a record, if it belongs to one.
///
/// Folder codes are searched across the whole serialized record (paths and
/// source fields carry them); the category label is the fallback.
pub fn social_spec_label(rec: &Value) -> Option<&'static str> {
    let serialized = rec.to_string();
    if let Some((_, label)) = SW_FOLDERS.iter().find(|(code, _)| serialized.contains(code)) {
        return Some(*label);
    }
    let raw = record::category_label(rec)?;
    SOCIAL_SPEC_KEYWORDS
        .iter()
        .find(|(key, _)| raw.contains(key))
        .map(|(_, label)| *label)
}

/// Output database a record is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pool {
    Social,
    Mental,
    Care,
    Common,
    Daily,
}

impl Pool {
    pub const ALL: [Pool; 5] = [Pool::Social, Pool::Mental, Pool::Care, Pool::Common, Pool::Daily];

    pub fn file_name(self) -> &'static str {
        match self {
            Pool::Social => "master_social.json",
            Pool::Mental => "master_mental.json",
            Pool::Care => "master_care.json",
            Pool::Common => "master_common.json",
            Pool::Daily => "master_daily.json",
        }
    }
}

fn any_in(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Route a record into the pools it belongs to. A record can land in more
/// than one specialized pool; Common and Daily are exclusive.
///
/// The label is sanitized first and written back under the spelling the
/// record already uses;
/// daily-pool records get their label hidden and `group_id = daily_pool`.
pub fn classify(rec: &mut Value) -> Vec<Pool> {
    let cat = sanitize_label(record::category_label(rec).unwrap_or_default());
    let source_tag = rec
        .get("source_tag")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let Some(obj) = rec.as_object_mut() else {
        return vec![Pool::Common];
    };
    record::set_category_label(obj, &cat);

    if source_tag == "official_scrape" {
        return vec![Pool::Social];
    }
    if DAILY_LABELS.contains(&cat.as_str()) {
        obj.insert("group_id".into(), Value::String("daily_pool".into()));
        record::set_category_label(obj, DAILY_HIDDEN_LABEL);
        return vec![Pool::Daily];
    }

    let mut social = any_in(&cat, SOCIAL_CODES) && !cat.contains("精神") && !cat.contains("PSW");
    let mut mental = any_in(&cat, MENTAL_CODES);
    let mut care = any_in(&cat, CARE_CODES);

    if !(social || mental || care) {
        social = source_tag == "social_spec_file";
        mental = source_tag == "mental_spec_file";
    }
    if !(social || mental || care) {
        if any_in(&cat, SOCIAL_SUBJECTS) {
            social = true;
        } else if any_in(&cat, MENTAL_SUBJECTS) {
            mental = true;
        } else if any_in(&cat, CARE_SUBJECTS) {
            care = true;
        }
    }

    let pools: Vec<Pool> = [(social, Pool::Social), (mental, Pool::Mental), (care, Pool::Care)]
        .into_iter()
        .filter_map(|(hit, pool)| hit.then_some(pool))
        .collect();
    if pools.is_empty() {
        vec![Pool::Common]
    } else {
        pools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_known_keys() {
        for (old, new) in CURRICULUM.entries() {
            assert_eq!(normalize_category(old), *new);
        }
    }

    #[test]
    fn test_normalize_identity_on_unknown() {
        for s in ["", "社会保障", "高齢者福祉", "random text", "児童"] {
            assert_eq!(normalize_category(s), s);
        }
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("1医学概論_part_2"), "医学概論");
        assert_eq!(sanitize_label("12 ソーシャルワーク_vol_3"), "ソーシャルワーク");
        assert_eq!(sanitize_label("社会保障（3）"), "社会保障");
        assert_eq!(sanitize_label("権利擁護 (2)"), "権利擁護");
        assert_eq!(sanitize_label("心理学と心理的支援（共通）"), "心理学理論と心理的支援");
        assert_eq!(sanitize_label("地域福祉と包括的支援体制_PART_1"), "地域福祉と包括的支援体制");
        assert_eq!(sanitize_label("障害福祉"), "障害者福祉");
    }

    #[test]
    fn test_social_spec_label_prefers_folder_code() {
        let rec = json!({"source_path": "pdf/SW専3/ch1.pdf", "category_label": "高齢者福祉"});
        assert_eq!(social_spec_label(&rec), Some("児童・家庭福祉"));
    }

    #[test]
    fn test_social_spec_label_keyword_order() {
        let rec = json!({"categoryLabel": "低所得者に対する支援と生活保護制度"});
        assert_eq!(social_spec_label(&rec), Some("貧困に対する支援"));
        assert_eq!(social_spec_label(&json!({"category_label": "社会保障"})), None);
    }

    #[test]
    fn test_classify_pools() {
        let mut official = json!({"source_tag": "official_scrape", "category_label": "精神保健"});
        assert_eq!(classify(&mut official), vec![Pool::Social]);

        let mut daily = json!({"category_label": "総合問題"});
        assert_eq!(classify(&mut daily), vec![Pool::Daily]);
        assert_eq!(daily["group_id"], "daily_pool");
        assert_eq!(daily["category_label"], DAILY_HIDDEN_LABEL);

        let mut psw = json!({"category_label": "PSW専5 精神保健福祉の理論"});
        assert_eq!(classify(&mut psw), vec![Pool::Mental]);

        let mut tagged = json!({"category_label": "国家試験", "source_tag": "social_spec_file"});
        assert_eq!(classify(&mut tagged), vec![Pool::Social]);

        let mut care = json!({"category_label": "3認知症の理解"});
        assert_eq!(classify(&mut care), vec![Pool::Care]);
        assert_eq!(care["category_label"], "認知症の理解");

        let mut common = json!({"category_label": "社会保障"});
        assert_eq!(classify(&mut common), vec![Pool::Common]);
    }

    #[test]
    fn test_classify_writes_back_camel_case_label() {
        let mut rec = json!({"categoryLabel": "3認知症の理解"});
        assert_eq!(classify(&mut rec), vec![Pool::Care]);
        assert_eq!(rec, json!({"categoryLabel": "認知症の理解"}));
    }
}
