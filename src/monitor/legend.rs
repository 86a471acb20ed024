//! Scrollable viewport for the legend panel

use ratatui::style::Color;

/// One legend row: color marker plus label block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendLine {
    pub color: Color,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct LegendViewport {
    lines: Vec<LegendLine>,
    offset: usize,
    height: usize,
}

impl LegendViewport {
    pub fn new(height: usize) -> Self {
        Self {
            lines: Vec::new(),
            offset: 0,
            height: height.max(1),
        }
    }

    pub fn set_content(&mut self, lines: Vec<LegendLine>) {
        self.lines = lines;
        self.clamp_offset();
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.clamp_offset();
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.offset = self.offset.saturating_add_signed(delta);
        self.clamp_offset();
    }

    pub fn total_line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn visible_line_count(&self) -> usize {
        self.lines.len().saturating_sub(self.offset).min(self.height)
    }

    /// Whether the content overflows and a scroll hint should be shown
    pub fn can_scroll(&self) -> bool {
        self.total_line_count() > self.height
    }

    pub fn visible_lines(&self) -> &[LegendLine] {
        let end = self.offset + self.visible_line_count();
        &self.lines[self.offset..end]
    }

    fn clamp_offset(&mut self) {
        let max_offset = self.lines.len().saturating_sub(self.height);
        self.offset = self.offset.min(max_offset);
    }
}
