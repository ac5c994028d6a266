//! Embedding coverage: how many groups carry an embedding under each key.

use crate::store::Group;
use std::collections::HashMap;

/// Keys with fewer groups than this are flagged for regeneration.
pub const LOW_COVERAGE_THRESHOLD: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct KeyCoverage {
    pub key: String,
    pub groups: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddingCoverage {
    pub total_groups: usize,
    /// Sorted by group count descending, then key.
    pub keys: Vec<KeyCoverage>,
}

impl EmbeddingCoverage {
    pub fn from_groups(groups: &[Group]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for group in groups {
            if let Some(embeddings) = &group.embeddings {
                for key in embeddings.keys() {
                    *counts.entry(key.as_str()).or_insert(0) += 1;
                }
            }
        }

        let total_groups = groups.len();
        let mut keys: Vec<KeyCoverage> = counts
            .into_iter()
            .map(|(key, count)| KeyCoverage {
                key: key.to_string(),
                groups: count,
                percent: count as f64 / total_groups as f64 * 100.0,
            })
            .collect();
        keys.sort_by(|a, b| b.groups.cmp(&a.groups).then_with(|| a.key.cmp(&b.key)));

        Self { total_groups, keys }
    }

    pub fn groups_for(&self, key: &str) -> Option<usize> {
        self.keys.iter().find(|k| k.key == key).map(|k| k.groups)
    }

    /// True when the key is absent or below [`LOW_COVERAGE_THRESHOLD`].
    pub fn is_low(&self, key: &str) -> bool {
        self.groups_for(key)
            .map_or(true, |count| count < LOW_COVERAGE_THRESHOLD)
    }
}
