//! Aggregated statistics over problems.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::problem::ProblemStatus;
use super::setting::{upazila_slug, Taxonomy};

/// Problem counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn set(&mut self, status: ProblemStatus, count: i64) {
        match status {
            ProblemStatus::Pending => self.pending = count,
            ProblemStatus::Approved => self.approved = count,
            ProblemStatus::InProgress => self.in_progress = count,
            ProblemStatus::Resolved => self.resolved = count,
            ProblemStatus::Rejected => self.rejected = count,
        }
    }
}

/// Count of problems in one bucket (category or upazila).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub value: String,
    pub label: String,
    pub count: i64,
}

/// Response for the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemStats {
    pub status: StatusCounts,
    pub by_category: Vec<BucketCount>,
    pub by_upazila: Vec<BucketCount>,
}

/// Per-upazila card on the homepage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpazilaStats {
    pub name: String,
    pub slug: String,
    pub unions_count: i64,
    pub problems_count: i64,
    pub solved_count: i64,
}

impl UpazilaStats {
    /// Reduces `(upazila, status)` pairs into one card per configured upazila.
    ///
    /// Rows for upazilas that are not configured are ignored.
    pub fn from_pairs(taxonomy: &Taxonomy, pairs: &[(String, ProblemStatus)]) -> Vec<Self> {
        let mut totals: HashMap<&str, (i64, i64)> = HashMap::new();
        for (upazila, status) in pairs {
            let entry = totals.entry(upazila.as_str()).or_default();
            entry.0 += 1;
            if *status == ProblemStatus::Resolved {
                entry.1 += 1;
            }
        }

        taxonomy
            .upazilas
            .iter()
            .map(|upazila| {
                let (problems_count, solved_count) = totals
                    .get(upazila.value.as_str())
                    .copied()
                    .unwrap_or_default();
                UpazilaStats {
                    name: upazila.label.clone(),
                    slug: upazila_slug(&upazila.value),
                    unions_count: taxonomy.unions_for(&upazila.value).len() as i64,
                    problems_count,
                    solved_count,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_set() {
        let mut counts = StatusCounts::default();
        counts.set(ProblemStatus::InProgress, 4);
        counts.set(ProblemStatus::Resolved, 2);
        assert_eq!(counts.in_progress, 4);
        assert_eq!(counts.resolved, 2);
        assert_eq!(counts.pending, 0);
    }

    #[test]
    fn test_upazila_stats_from_pairs() {
        let taxonomy = Taxonomy::default_seed();
        let pairs = vec![
            ("গোয়াইনঘাট".to_string(), ProblemStatus::Resolved),
            ("গোয়াইনঘাট".to_string(), ProblemStatus::Pending),
            ("জৈন্তাপুর".to_string(), ProblemStatus::Resolved),
            ("অন্য".to_string(), ProblemStatus::Resolved),
        ];
        let stats = UpazilaStats::from_pairs(&taxonomy, &pairs);
        assert_eq!(stats.len(), 3);

        let gowainghat = stats.iter().find(|s| s.slug == "gowainghat").unwrap();
        assert_eq!(gowainghat.problems_count, 2);
        assert_eq!(gowainghat.solved_count, 1);
        assert_eq!(gowainghat.unions_count, 10);

        let companiganj = stats.iter().find(|s| s.slug == "companiganj").unwrap();
        assert_eq!(companiganj.problems_count, 0);
        assert_eq!(companiganj.unions_count, 6);
    }

    #[test]
    fn test_upazila_stats_serialize_camel_case() {
        let stats = UpazilaStats {
            name: "জৈন্তাপুর".to_string(),
            slug: "jaintapur".to_string(),
            unions_count: 6,
            problems_count: 1,
            solved_count: 1,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["unionsCount"], 6);
        assert_eq!(json["solvedCount"], 1);
    }
}
