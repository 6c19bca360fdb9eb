//! Department classification, priority estimation, escalation risk.
//!
//! Classification strategies are tried in ranked order; the keyword
//! heuristic is always last and never fails, so `classify` is total.
//! A failing external provider is logged and skipped — complaint
//! creation is never blocked by an optional AI dependency.

use chrono::{DateTime, Utc};

use crate::complaint::{Complaint, Department, Priority, Status};

/// A department classification strategy. External providers (zero-shot
/// models, hosted APIs) implement this; the local keyword heuristic is
/// the guaranteed-total tail of every stack.
pub trait Classifier: Send {
    fn name(&self) -> &'static str;
    fn classify(&self, title: &str, description: &str) -> anyhow::Result<Department>;
}

// Fixed, ordered keyword table. First matching department wins, so
// declaration order is the tie-break.
const DEPARTMENT_KEYWORDS: &[(Department, &[&str])] = &[
    (
        Department::Electricity,
        &[
            "power",
            "electricity",
            "wire",
            "transformer",
            "outage",
            "blackout",
            "voltage",
            "short circuit",
            "street light",
            "pole",
        ],
    ),
    (
        Department::Roads,
        &[
            "road",
            "pothole",
            "street",
            "highway",
            "pavement",
            "traffic",
            "signal",
            "footpath",
            "sidewalk",
            "divider",
            "bridge",
        ],
    ),
    (
        Department::Water,
        &[
            "water",
            "supply",
            "tap",
            "leak",
            "pipeline",
            "drainage",
            "sewage",
            "pump",
            "tank",
            "overflow",
        ],
    ),
    (
        Department::Sanitation,
        &[
            "garbage",
            "waste",
            "trash",
            "cleanliness",
            "sweeping",
            "dustbin",
            "litter",
            "dump",
            "smell",
        ],
    ),
    (
        Department::Municipal,
        &[
            "tax",
            "property",
            "license",
            "permit",
            "certificate",
            "document",
            "stray",
            "dog",
            "cattle",
            "menace",
            "park",
            "garden",
            "playground",
        ],
    ),
];

const URGENT_KEYWORDS: &[&str] = &[
    "urgent",
    "emergency",
    "immediate",
    "danger",
    "critical",
    "severe",
    "life-threatening",
    "accident",
    "fire",
    "flood",
    "broken",
    "burst",
];

const CONCERN_KEYWORDS: &[&str] = &[
    "problem",
    "issue",
    "concern",
    "delay",
    "disruption",
    "inconvenience",
];

/// Keyword-table classifier. Total: always returns a department,
/// defaulting to `others` when nothing matches.
#[derive(Debug, Default)]
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn classify(&self, title: &str, description: &str) -> anyhow::Result<Department> {
        let text = format!("{title}. {description}").to_lowercase();
        for (department, keywords) in DEPARTMENT_KEYWORDS {
            if keywords.iter().any(|kw| text.contains(kw)) {
                return Ok(*department);
            }
        }
        Ok(Department::Others)
    }
}

/// Ranked strategy list. The keyword classifier is appended by the
/// constructor, so the stack as a whole is total.
pub struct ClassifierStack {
    strategies: Vec<Box<dyn Classifier>>,
}

impl ClassifierStack {
    /// Stack with only the local heuristic.
    pub fn local() -> Self {
        Self::with_providers(Vec::new())
    }

    /// Stack that tries `providers` in order before the local heuristic.
    pub fn with_providers(mut providers: Vec<Box<dyn Classifier>>) -> Self {
        providers.push(Box::new(KeywordClassifier));
        Self {
            strategies: providers,
        }
    }

    pub fn classify(&self, title: &str, description: &str) -> Department {
        for strategy in &self.strategies {
            match strategy.classify(title, description) {
                Ok(department) => return department,
                Err(e) => {
                    log::warn!("classifier '{}' failed, trying next: {e}", strategy.name());
                }
            }
        }
        // Unreachable while KeywordClassifier is the tail, but classify
        // must stay total even if the stack is mis-built.
        Department::Others
    }
}

/// Estimate priority from complaint text.
///
/// Two or more urgent-keyword hits → high; exactly one → medium; else a
/// concern-keyword hit → medium; else low. Total, stateless.
pub fn estimate_priority(title: &str, description: &str) -> Priority {
    let text = format!("{title}. {description}").to_lowercase();
    let urgent_hits = URGENT_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .count();
    if urgent_hits >= 2 {
        return Priority::High;
    }
    if urgent_hits == 1 {
        return Priority::Medium;
    }
    if CONCERN_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return Priority::Medium;
    }
    Priority::Low
}

/// Heuristic SLA-breach likelihood, 0–100.
///
/// Factors: priority tier, a flat departmental-workload term, time since
/// submission, and whether the complaint is still sitting in `submitted`.
pub fn estimate_escalation_risk(complaint: &Complaint, now: DateTime<Utc>) -> u8 {
    let mut risk: u32 = 0;

    risk += match complaint.priority {
        Priority::High => 40,
        Priority::Medium => 20,
        Priority::Low => 0,
    };

    // Departmental workload term, kept flat pending a real queue metric.
    risk += 20;

    let age_hours = (now - complaint.created_at).num_hours();
    if age_hours > 48 {
        risk += 30;
    } else if age_hours > 24 {
        risk += 15;
    }

    if complaint.status == Status::Submitted {
        risk += 10;
    }

    risk.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_keywords_classify_to_water() {
        let d = KeywordClassifier
            .classify("No supply", "water pipeline leaking near tap")
            .unwrap();
        assert_eq!(d, Department::Water);
    }

    #[test]
    fn unmatched_text_defaults_to_others() {
        let d = KeywordClassifier
            .classify("General note", "everything is fine here")
            .unwrap();
        assert_eq!(d, Department::Others);
    }

    #[test]
    fn table_order_breaks_ties() {
        // "pole" (electricity) and "street" (roads) both match;
        // electricity is declared first.
        let d = KeywordClassifier
            .classify("Lamp pole leaning over the street", "")
            .unwrap();
        assert_eq!(d, Department::Electricity);
    }

    #[test]
    fn two_urgent_hits_is_high() {
        assert_eq!(
            estimate_priority("Urgent", "burst pipe flooding the lane"),
            Priority::High
        );
    }

    #[test]
    fn one_urgent_hit_is_medium() {
        assert_eq!(
            estimate_priority("Broken bench", "in the park"),
            Priority::Medium
        );
    }

    #[test]
    fn concern_keywords_are_medium() {
        assert_eq!(
            estimate_priority("Ongoing issue", "with the collection schedule"),
            Priority::Medium
        );
    }

    #[test]
    fn bland_text_is_low() {
        assert_eq!(
            estimate_priority("Request", "please repaint the zebra crossing"),
            Priority::Low
        );
    }
}
