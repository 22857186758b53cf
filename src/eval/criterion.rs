use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Running score state of one rubric item.
///
/// `score` only grows through statements the engine accepted. `possible_score`
/// also grows through statements that failed but look plausible, so it is the
/// ceiling a human reviewer could confirm. Both stay within
/// `0 <= score <= possible_score <= max_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    max_score: u32,
    #[serde(default)]
    query_type: String,
    #[serde(skip_deserializing)]
    score: f64,
    #[serde(skip_deserializing)]
    possible_score: f64,
    #[serde(skip_deserializing)]
    description: String,
    #[serde(skip_deserializing)]
    occurrences: u32,
}

impl Criterion {
    pub fn new(max_score: u32, query_type: impl Into<String>) -> Self {
        Self {
            max_score,
            query_type: query_type.into(),
            score: 0.0,
            possible_score: 0.0,
            description: String::new(),
            occurrences: 0,
        }
    }

    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn possible_score(&self) -> f64 {
        self.possible_score
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn occurrences(&self) -> u32 {
        self.occurrences
    }

    /// Add `increment` to the possible score, and to the score as well when
    /// the evidence is certain.
    pub fn credit(&mut self, increment: f64, certain: bool) {
        let max = f64::from(self.max_score);
        let increment = increment.max(0.0);
        if certain {
            self.score = (self.score + increment).min(max);
        }
        self.possible_score = (self.possible_score + increment).min(max).max(self.score);
    }

    pub fn credit_full(&mut self, certain: bool) {
        let max = f64::from(self.max_score);
        if certain {
            self.score = max;
        }
        self.possible_score = max;
    }

    pub fn describe(&mut self, text: &str) {
        self.description.push_str(text);
    }

    pub fn count_occurrence(&mut self) {
        self.occurrences += 1;
    }

    pub fn add_occurrences(&mut self, count: u32) {
        self.occurrences += count;
    }
}

/// Rubric items by name, iterated in name order.
///
/// The set of keys is fixed when the ledger is loaded; rules can only update
/// existing entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    criteria: BTreeMap<String, Criterion>,
}

impl Ledger {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid rubric JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rubric {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid rubric {}", path.display()))
    }

    pub fn get(&self, key: &str) -> Option<&Criterion> {
        self.criteria.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Criterion> {
        self.criteria.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.criteria.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Criterion)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (K, Criterion)>>(iter: I) -> Self {
        Self {
            criteria: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
