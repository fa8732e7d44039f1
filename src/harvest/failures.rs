//! Failure bookkeeping for one run

/// Whether a failure concerns a whole target or a single item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureScope {
    Target,
    Item(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub target: String,
    pub scope: FailureScope,
    pub reason: String,
}

/// Append-only list of failures observed during a run
#[derive(Debug, Default)]
pub struct FailureCollector {
    entries: Vec<FailureEntry>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure of a whole target
    pub fn record(&mut self, target: impl Into<String>, reason: impl Into<String>) {
        self.entries.push(FailureEntry {
            target: target.into(),
            scope: FailureScope::Target,
            reason: reason.into(),
        });
    }

    /// Records a failure of one item within a target
    pub fn record_item(
        &mut self,
        target: impl Into<String>,
        item_id: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.entries.push(FailureEntry {
            target: target.into(),
            scope: FailureScope::Item(item_id.into()),
            reason: reason.into(),
        });
    }

    pub fn all(&self) -> &[FailureEntry] {
        &self.entries
    }

    /// Target-scope failures in the order they were recorded
    pub fn target_failures(&self) -> impl Iterator<Item = &FailureEntry> {
        self.entries
            .iter()
            .filter(|e| e.scope == FailureScope::Target)
    }

    pub fn item_failure_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.scope, FailureScope::Item(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_separates_scopes() {
        let mut collector = FailureCollector::new();
        collector.record("@a", "no_content_found");
        collector.record_item("@b", "x1", "enrich timeout");
        collector.record("#c", "scrape failed");

        assert_eq!(collector.all().len(), 3);
        assert_eq!(collector.item_failure_count(), 1);

        let targets: Vec<&str> = collector
            .target_failures()
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(targets, vec!["@a", "#c"]);

        assert_eq!(
            collector.all()[1].scope,
            FailureScope::Item("x1".to_string())
        );
    }

    #[test]
    fn test_empty_collector() {
        let collector = FailureCollector::new();
        assert!(collector.is_empty());
        assert_eq!(collector.target_failures().count(), 0);
    }
}
