//! Exposition format line parser
//!
//! Each accepted line has the shape `<name>[{<labels>}] <value> [<timestamp>]`.
//! Type/help comments, histogram suffixes and the like get no special
//! treatment: they are opaque names with numeric values.

/// Marker that starts a comment line
const COMMENT_MARKER: char = '#';

/// Delimiter that opens the label block of a series
const LABEL_OPEN: char = '{';

/// One sample extracted from a scrape
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Base name plus the raw label block, `{}` when the line had no labels
    pub identity: String,
    pub value: f64,
}

impl Sample {
    /// Metric name without the label block
    pub fn base_name(&self) -> &str {
        base_name_of(&self.identity)
    }
}

/// A line accepted by [`parse_line`], borrowing from the input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedLine<'a> {
    /// The first token as written, labels included
    pub name: &'a str,
    pub base_name: &'a str,
    pub value: f64,
}

impl ParsedLine<'_> {
    /// Series identity, synthesizing an empty label block when absent
    pub fn identity(&self) -> String {
        if self.name.contains(LABEL_OPEN) {
            self.name.to_string()
        } else {
            format!("{}{{}}", self.name)
        }
    }

    pub fn into_sample(self) -> Sample {
        Sample {
            identity: self.identity(),
            value: self.value,
        }
    }
}

/// Strip the label block from a series name
pub fn base_name_of(name: &str) -> &str {
    match name.find(LABEL_OPEN) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Label block of a series identity, `{}` when it carries none
pub fn label_block_of(identity: &str) -> &str {
    match identity.find(LABEL_OPEN) {
        Some(idx) => &identity[idx..],
        None => "{}",
    }
}

/// Parse one exposition line
///
/// Returns `None` for blank lines, comments, lines with fewer than two
/// tokens and lines without a numeric value. The value is the last token;
/// when that is not a number and at least three tokens exist, the
/// second-to-last token is tried instead.
pub fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    let value = match parse_value(tokens[tokens.len() - 1]) {
        Some(v) => v,
        None if tokens.len() >= 3 => parse_value(tokens[tokens.len() - 2])?,
        None => return None,
    };

    let name = tokens[0];
    Some(ParsedLine {
        name,
        base_name: base_name_of(name),
        value,
    })
}

fn parse_value(token: &str) -> Option<f64> {
    token.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_metric() {
        let parsed = parse_line("metric_total 123.45").unwrap();
        assert_eq!(parsed.base_name, "metric_total");
        assert!((parsed.value - 123.45).abs() < 1e-9);
        assert_eq!(parsed.identity(), "metric_total{}");
    }

    #[test]
    fn test_metric_with_labels() {
        let parsed = parse_line("name{l=\"v\"} 12").unwrap();
        assert_eq!(parsed.base_name, "name");
        assert_eq!(parsed.identity(), "name{l=\"v\"}");
        assert_eq!(parsed.value, 12.0);
    }

    #[test]
    fn test_label_less_identity() {
        let sample = parse_line("name 5").unwrap().into_sample();
        assert_eq!(sample.identity, "name{}");
        assert_eq!(sample.base_name(), "name");
        assert_eq!(sample.value, 5.0);
    }

    #[test]
    fn test_falls_back_to_second_to_last_token() {
        let parsed = parse_line("name 7.89 not_a_number").unwrap();
        assert!((parsed.value - 7.89).abs() < 1e-9);
    }

    #[test]
    fn test_no_fallback_with_two_tokens() {
        assert!(parse_line("name not_a_number").is_none());
    }

    #[test]
    fn test_both_candidates_invalid() {
        assert!(parse_line("name abc def").is_none());
    }

    #[test]
    fn test_rejected_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   \t ").is_none());
        assert!(parse_line("# HELP up Whether the target is up").is_none());
        assert!(parse_line("  # TYPE up gauge").is_none());
        assert!(parse_line("not_a_metric_line").is_none());
    }

    #[test]
    fn test_special_float_values() {
        assert!(parse_line("gauge NaN").unwrap().value.is_nan());
        assert_eq!(parse_line("gauge +Inf").unwrap().value, f64::INFINITY);
        assert_eq!(parse_line("gauge -1e3").unwrap().value, -1000.0);
    }

    #[test]
    fn test_trailing_newline_is_ignored() {
        let parsed = parse_line("up{job=\"node\"} 1\r\n").unwrap();
        assert_eq!(parsed.identity(), "up{job=\"node\"}");
        assert_eq!(parsed.value, 1.0);
    }

    #[test]
    fn test_parsing_never_panics_on_garbage() {
        for line in ["{", "}", "{ }", "{{ 1", "\u{0}\u{1} 2", "💥 💥 💥", "a{ b} c"] {
            let _ = parse_line(line);
        }
        assert_eq!(parse_line("{ 1").unwrap().base_name, "");
    }

    #[test]
    fn test_label_block_of() {
        assert_eq!(label_block_of("up{job=\"a\"}"), "{job=\"a\"}");
        assert_eq!(label_block_of("up{}"), "{}");
        assert_eq!(label_block_of("up"), "{}");
    }
}
