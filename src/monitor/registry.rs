//! Series registry
//!
//! Gives every label combination of the current metric a stable identity,
//! visibility flag and color index across an unbounded stream of scrapes.

use std::collections::HashMap;

use crate::monitor::parser::Sample;

/// One known series of the current metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub identity: String,
    pub visible: bool,
    /// Insertion sequence number, never reassigned
    pub color_index: usize,
}

/// Series known to the current session, in first-seen order
#[derive(Debug, Default)]
pub struct SeriesRegistry {
    records: Vec<SeriesRecord>,
    positions: HashMap<String, usize>,
}

impl SeriesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register identities not seen before, visible and with the next color index
    ///
    /// Known identities keep their visibility and color. Returns the number of
    /// records added.
    pub fn reconcile(&mut self, samples: &[Sample]) -> usize {
        let before = self.records.len();
        for sample in samples {
            if self.positions.contains_key(&sample.identity) {
                continue;
            }
            let color_index = self.records.len();
            self.positions.insert(sample.identity.clone(), color_index);
            self.records.push(SeriesRecord {
                identity: sample.identity.clone(),
                visible: true,
                color_index,
            });
        }
        self.records.len() - before
    }

    pub fn records(&self) -> &[SeriesRecord] {
        &self.records
    }

    pub fn get(&self, identity: &str) -> Option<&SeriesRecord> {
        self.positions.get(identity).map(|&pos| &self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns false when the identity is unknown
    pub fn set_visible(&mut self, identity: &str, visible: bool) -> bool {
        match self.positions.get(identity) {
            Some(&pos) => {
                self.records[pos].visible = visible;
                true
            }
            None => false,
        }
    }

    /// Flip the visibility of the record at `position`
    pub fn toggle_at(&mut self, position: usize) {
        if let Some(record) = self.records.get_mut(position) {
            record.visible = !record.visible;
        }
    }

    pub fn toggle_all(&mut self, visible: bool) {
        for record in &mut self.records {
            record.visible = visible;
        }
    }

    pub fn all_visible(&self) -> bool {
        self.records.iter().all(|r| r.visible)
    }

    pub fn visibility_snapshot(&self) -> Vec<bool> {
        self.records.iter().map(|r| r.visible).collect()
    }

    /// Restore flags captured by [`Self::visibility_snapshot`]
    ///
    /// Records added after the snapshot keep their current flag.
    pub fn restore_visibility(&mut self, snapshot: &[bool]) {
        for (record, visible) in self.records.iter_mut().zip(snapshot) {
            record.visible = *visible;
        }
    }
}

/// Whether a scraped batch belongs to `metric`
///
/// Only the first sample is checked; a batch from a scrape issued before a
/// metric switch is rejected as a whole.
pub fn batch_matches_metric(samples: &[Sample], metric: &str) -> bool {
    match samples.first() {
        Some(first) => first.base_name() == metric,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(identity: &str) -> Sample {
        Sample {
            identity: identity.to_string(),
            value: 1.0,
        }
    }

    #[test]
    fn test_color_indices_are_stable() {
        let mut registry = SeriesRegistry::new();
        assert_eq!(registry.reconcile(&[sample("m{a}"), sample("m{b}")]), 2);
        assert_eq!(
            registry.reconcile(&[sample("m{a}"), sample("m{b}"), sample("m{c}")]),
            1
        );

        assert_eq!(registry.get("m{a}").unwrap().color_index, 0);
        assert_eq!(registry.get("m{b}").unwrap().color_index, 1);
        assert_eq!(registry.get("m{c}").unwrap().color_index, 2);
    }

    #[test]
    fn test_absent_series_keeps_its_slot() {
        let mut registry = SeriesRegistry::new();
        registry.reconcile(&[sample("m{a}"), sample("m{b}")]);
        registry.reconcile(&[sample("m{b}")]);
        registry.reconcile(&[sample("m{c}"), sample("m{a}")]);

        let order: Vec<_> = registry.records().iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(order, vec!["m{a}", "m{b}", "m{c}"]);
        assert_eq!(registry.get("m{a}").unwrap().color_index, 0);
    }

    #[test]
    fn test_duplicates_within_batch() {
        let mut registry = SeriesRegistry::new();
        assert_eq!(registry.reconcile(&[sample("m{}"), sample("m{}")]), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_visibility_survives_reconcile() {
        let mut registry = SeriesRegistry::new();
        registry.reconcile(&[sample("m{a}"), sample("m{b}")]);
        assert!(registry.set_visible("m{a}", false));
        assert!(!registry.set_visible("m{zzz}", false));

        registry.reconcile(&[sample("m{a}"), sample("m{b}")]);
        let a = registry.get("m{a}").unwrap();
        assert!(!a.visible);
        assert_eq!(a.color_index, 0);
    }

    #[test]
    fn test_toggle_all_and_snapshot() {
        let mut registry = SeriesRegistry::new();
        registry.reconcile(&[sample("m{a}"), sample("m{b}")]);
        let snapshot = registry.visibility_snapshot();

        registry.toggle_all(false);
        assert!(registry.records().iter().all(|r| !r.visible));
        registry.toggle_at(1);
        assert!(registry.records()[1].visible);
        assert!(!registry.all_visible());

        registry.restore_visibility(&snapshot);
        assert!(registry.all_visible());
    }

    #[test]
    fn test_batch_matches_metric() {
        assert!(batch_matches_metric(&[sample("up{job=\"x\"}")], "up"));
        assert!(!batch_matches_metric(&[sample("down{}")], "up"));
        assert!(!batch_matches_metric(&[sample("up_total{}")], "up"));
        assert!(batch_matches_metric(&[], "up"));
    }
}
