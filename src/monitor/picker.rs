//! Filterable metric picker

/// Selectable list of metric names with a substring filter
#[derive(Debug, Clone, Default)]
pub struct MetricPicker {
    items: Vec<String>,
    filter: String,
    filtering: bool,
    filtered: Vec<usize>,
    selected: usize,
    loading: bool,
}

impl MetricPicker {
    /// An empty picker waiting for discovery results
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
        self.loading = false;
        self.recompute();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    pub fn start_filter(&mut self) {
        self.filtering = true;
    }

    /// Leave filter entry, keeping the current filter applied
    pub fn accept_filter(&mut self) {
        self.filtering = false;
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.recompute();
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.recompute();
    }

    pub fn reset_filter(&mut self) {
        self.filter.clear();
        self.filtering = false;
        self.recompute();
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.filtered.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
    }

    /// Index of the highlighted row among [`Self::visible_items`]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Currently highlighted metric name
    pub fn selected_item(&self) -> Option<&str> {
        let idx = *self.filtered.get(self.selected)?;
        self.items.get(idx).map(String::as_str)
    }

    /// Items that pass the filter, in list order
    pub fn visible_items(&self) -> impl Iterator<Item = &str> {
        self.filtered.iter().map(|&idx| self.items[idx].as_str())
    }

    pub fn visible_len(&self) -> usize {
        self.filtered.len()
    }

    fn recompute(&mut self) {
        let needle = self.filter.trim().to_lowercase();
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || item.to_lowercase().contains(&needle))
            .map(|(idx, _)| idx)
            .collect();

        if self.filtered.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len() - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picker() -> MetricPicker {
        let mut picker = MetricPicker::loading();
        picker.set_items(vec![
            "go_goroutines".to_string(),
            "http_requests_total".to_string(),
            "process_cpu_seconds_total".to_string(),
        ]);
        picker
    }

    #[test]
    fn test_set_items_clears_loading() {
        let picker = picker();
        assert!(!picker.is_loading());
        assert_eq!(picker.visible_len(), 3);
        assert_eq!(picker.selected_item(), Some("go_goroutines"));
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut picker = picker();
        picker.move_selection(-1);
        assert_eq!(picker.selected(), 0);
        picker.move_selection(10);
        assert_eq!(picker.selected_item(), Some("process_cpu_seconds_total"));
    }

    #[test]
    fn test_substring_filter() {
        let mut picker = picker();
        picker.move_selection(2);
        picker.start_filter();
        for c in "TOTAL".chars() {
            picker.push_filter(c);
        }
        let visible: Vec<_> = picker.visible_items().collect();
        assert_eq!(visible, vec!["http_requests_total", "process_cpu_seconds_total"]);
        assert_eq!(picker.selected(), 1);

        picker.push_filter('x');
        assert_eq!(picker.selected_item(), None);
        picker.pop_filter();
        assert_eq!(picker.visible_len(), 2);

        picker.reset_filter();
        assert!(!picker.is_filtering());
        assert_eq!(picker.visible_len(), 3);
    }

    #[test]
    fn test_empty_picker() {
        let mut picker = MetricPicker::loading();
        assert!(picker.is_loading());
        picker.move_selection(1);
        assert_eq!(picker.selected_item(), None);
    }
}
