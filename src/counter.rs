use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::FieldError;

/// Frequency of extraction failures keyed by `(field, description)`.
/// Purely diagnostic: nothing reads it to make decisions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorCounter {
    counts: HashMap<(String, String), usize>,
}

impl ErrorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: &str, err: &FieldError) {
        *self
            .counts
            .entry((field.to_string(), err.to_string()))
            .or_default() += 1;
    }

    /// Turns a field lookup into an `Option`, counting the failure under `field`.
    pub fn absorb<T>(&mut self, field: &str, res: Result<T, FieldError>) -> Option<T> {
        match res {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(field, &err);
                None
            }
        }
    }

    pub fn merge(&mut self, other: ErrorCounter) {
        for (key, n) in other.counts {
            *self.counts.entry(key).or_default() += n;
        }
    }

    pub fn get(&self, field: &str, description: &str) -> usize {
        self.counts
            .get(&(field.to_string(), description.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of failures of `field`, across all descriptions.
    pub fn field_total(&self, field: &str) -> usize {
        self.counts
            .iter()
            .filter(|((f, _), _)| f == field)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Most frequent first.
    pub fn sorted(&self) -> Vec<(&str, &str, usize)> {
        let mut entries: Vec<_> = self
            .counts
            .iter()
            .map(|((f, d), n)| (f.as_str(), d.as_str(), *n))
            .collect();
        entries.sort_unstable_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(b.0)).then(a.1.cmp(b.1)));
        entries
    }

    pub fn log_summary(&self) {
        if self.is_empty() {
            info!("No extraction errors.");
            return;
        }
        info!(total = self.total(), "Extraction error summary:");
        for (field, description, n) in self.sorted() {
            warn!(field, count = n, "{description}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_counts_failures_only() {
        let mut counter = ErrorCounter::new();
        assert_eq!(counter.absorb("rating", Ok(7.5)), Some(7.5));
        assert_eq!(
            counter.absorb::<f64>("rating", Err(FieldError::Missing("b"))),
            None
        );
        assert_eq!(counter.total(), 1);
        assert_eq!(counter.get("rating", "missing node: b"), 1);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = ErrorCounter::new();
        let mut b = ErrorCounter::new();
        a.record("date", &FieldError::Missing("div.date"));
        b.record("date", &FieldError::Missing("div.date"));
        b.record("duration", &FieldError::Missing("span"));
        a.merge(b);

        assert_eq!(a.field_total("date"), 2);
        assert_eq!(a.sorted()[0], ("date", "missing node: div.date", 2));
    }
}
