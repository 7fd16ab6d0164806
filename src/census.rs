//! Counting and sanity checks over finished question files.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::record;

const NONE_LABEL: &str = "<none>";

/// Record counts per group and per category label.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupCensus {
    pub total: usize,
    pub groups: Vec<(String, usize)>,
    pub categories: Vec<(String, usize)>,
}

impl GroupCensus {
    pub fn of(records: &[Value]) -> Self {
        let mut groups: HashMap<String, usize> = HashMap::new();
        let mut categories: HashMap<String, usize> = HashMap::new();

        for rec in records {
            let g = record::group(rec).unwrap_or(NONE_LABEL);
            *groups.entry(g.to_string()).or_default() += 1;
            let c = record::category_label(rec).unwrap_or(NONE_LABEL);
            *categories.entry(c.to_string()).or_default() += 1;
        }

        Self {
            total: records.len(),
            groups: most_common(groups),
            categories: most_common(categories),
        }
    }
}

// Descending by count, ties by name so output is stable
fn most_common(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut v: Vec<_> = counts.into_iter().collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v
}

impl fmt::Display for GroupCensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Total: {}", self.total)?;
        writeln!(f, "  Groups:")?;
        for (g, n) in &self.groups {
            writeln!(f, "    - {g}: {n}")?;
        }
        writeln!(f, "  Categories:")?;
        for (c, n) in &self.categories {
            writeln!(f, "    - {c}: {n}")?;
        }
        Ok(())
    }
}

fn has_social_code(s: &str) -> bool {
    // "SW専" inside "PSW専" is a mental-health code, not a social one
    let sw = s.replace("PSW専", "").replace("ＰＳＷ専", "");
    sw.contains("SW専") || sw.contains("ＳＷ専") || s.contains("社会専門")
}

fn has_mental_code(s: &str) -> bool {
    s.contains("精神専") || s.contains("精神専門") || s.contains("PSW専") || s.contains("ＰＳＷ専")
}

/// Records whose source folder code contradicts the database they sit in.
#[derive(Debug, Default, Clone)]
pub struct SeparationReport {
    /// Mental-only records found in the social database (id, label).
    pub mental_in_social: Vec<(String, String)>,
    /// Social-only records found in the mental database (id, label).
    pub social_in_mental: Vec<(String, String)>,
}

impl SeparationReport {
    pub fn is_clean(&self) -> bool {
        self.mental_in_social.is_empty() && self.social_in_mental.is_empty()
    }
}

fn describe(rec: &Value) -> (String, String) {
    let id: String = record::id(rec).unwrap_or_default().chars().take(20).collect();
    let label = record::category_label(rec).unwrap_or_default().to_string();
    (id, label)
}

/// Strict folder-code check of the social and mental databases.
pub fn separation_violations(social: &[Value], mental: &[Value]) -> SeparationReport {
    let mut report = SeparationReport::default();

    for rec in social {
        let s = rec.to_string();
        if has_mental_code(&s) && !has_social_code(&s) {
            report.mental_in_social.push(describe(rec));
        }
    }
    for rec in mental {
        let s = rec.to_string();
        if has_social_code(&s) && !has_mental_code(&s) {
            report.social_in_mental.push(describe(rec));
        }
    }
    report
}
