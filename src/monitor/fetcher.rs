//! Scrape client for the metrics endpoint
//!
//! Each operation issues a single GET and streams the body line by line
//! through the exposition parser.

use std::collections::BTreeSet;

use futures::StreamExt;
use reqwest::Client;

use crate::error::{ScrapeError, ScrapeResult};
use crate::monitor::parser::{parse_line, Sample};

/// HTTP client wrapper for scraping one endpoint
#[derive(Debug, Clone)]
pub struct MetricsFetcher {
    client: Client,
    url: String,
}

impl MetricsFetcher {
    /// Create a new metrics fetcher
    ///
    /// # Arguments
    /// * `url` - Full URL to the metrics endpoint (e.g., "http://localhost:9100/metrics")
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Discover every distinct base name exposed by the endpoint
    ///
    /// # Returns
    /// Metric names sorted lexicographically, without duplicates
    ///
    /// # Errors
    /// Transport failures and non-success statuses
    pub async fn discover_metrics(&self) -> ScrapeResult<Vec<String>> {
        let mut names = BTreeSet::new();
        self.scrape_lines(|line| {
            if let Some(parsed) = parse_line(line) {
                if !names.contains(parsed.base_name) {
                    names.insert(parsed.base_name.to_string());
                }
            }
        })
        .await?;

        Ok(names.into_iter().collect())
    }

    /// Fetch every sample of `metric`, in the order the endpoint lists them
    ///
    /// # Errors
    /// Transport failures and non-success statuses, or
    /// [`ScrapeError::MetricNotFound`] when no line matched
    pub async fn fetch_series(&self, metric: &str) -> ScrapeResult<Vec<Sample>> {
        let mut samples = Vec::new();
        self.scrape_lines(|line| {
            if let Some(parsed) = parse_line(line) {
                if parsed.base_name == metric {
                    samples.push(parsed.into_sample());
                }
            }
        })
        .await?;

        if samples.is_empty() {
            return Err(ScrapeError::MetricNotFound(metric.to_string()));
        }

        Ok(samples)
    }

    async fn scrape_lines<F>(&self, mut visit: F) -> ScrapeResult<()>
    where
        F: FnMut(&str),
    {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let mut splitter = LineSplitter::default();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            splitter.push(&chunk?, &mut visit);
        }
        splitter.finish(&mut visit);

        Ok(())
    }
}

/// Reassembles lines from arbitrarily split body chunks
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push<F: FnMut(&str)>(&mut self, chunk: &[u8], visit: &mut F) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            if self.pending.is_empty() {
                visit(&String::from_utf8_lossy(head));
            } else {
                self.pending.extend_from_slice(head);
                visit(&String::from_utf8_lossy(&self.pending));
                self.pending.clear();
            }
            rest = &tail[1..];
        }
        self.pending.extend_from_slice(rest);
    }

    fn finish<F: FnMut(&str)>(&mut self, visit: &mut F) {
        if !self.pending.is_empty() {
            visit(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        let url = "http://localhost:9100/metrics".to_string();
        let fetcher = MetricsFetcher::new(url.clone());
        assert_eq!(fetcher.url(), url);
    }

    fn split(chunks: &[&str]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut splitter = LineSplitter::default();
        let mut visit = |line: &str| lines.push(line.to_string());
        for chunk in chunks {
            splitter.push(chunk.as_bytes(), &mut visit);
        }
        splitter.finish(&mut visit);
        lines
    }

    #[test]
    fn test_line_splitter_joins_chunks() {
        let lines = split(&["up 1\nmetric_a{env=", "\"prod\"} 10\n", "metric_b 5"]);
        assert_eq!(lines, vec!["up 1", "metric_a{env=\"prod\"} 10", "metric_b 5"]);
    }

    #[test]
    fn test_line_splitter_keeps_empty_lines() {
        let lines = split(&["a 1\n\nb 2\n"]);
        assert_eq!(lines, vec!["a 1", "", "b 2"]);
    }
}
