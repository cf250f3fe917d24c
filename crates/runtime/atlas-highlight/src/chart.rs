//! Chart-side selection
//!
//! Keys selected on the chart, in the order they were picked. The chart is
//! told about the whole set after every change, never about a single key.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSelection {
    keys: Vec<String>,
}

impl ChartSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key`, or drop it when already selected. Returns whether the key
    /// is selected afterwards.
    pub fn toggle(&mut self, key: &str) -> bool {
        if let Some(pos) = self.keys.iter().position(|k| k == key) {
            self.keys.remove(pos);
            false
        } else {
            self.keys.push(key.to_string());
            true
        }
    }

    /// Select `key` if it is not already
    pub fn insert(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }

    /// Deselect every key in `keys`. Returns whether anything was dropped.
    pub fn remove<S: AsRef<str>>(&mut self, keys: &[S]) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| !keys.iter().any(|r| r.as_ref() == k));
        self.keys.len() != before
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keep only keys that match one of `names`, ignoring case. Returns
    /// whether anything was dropped.
    pub fn retain_matching<S: AsRef<str>>(&mut self, names: &[S]) -> bool {
        let before = self.keys.len();
        self.keys
            .retain(|k| names.iter().any(|n| n.as_ref().eq_ignore_ascii_case(k)));
        self.keys.len() != before
    }

    pub fn clear(&mut self) -> bool {
        let had = !self.keys.is_empty();
        self.keys.clear();
        had
    }
}
