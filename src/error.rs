use thiserror::Error;

/// Errors produced while scraping the metrics endpoint
///
/// Malformed exposition lines are not errors; the parser skips them silently.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The request could not be sent or the body could not be read
    #[error("failed to fetch metrics: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("unexpected status code: {0}")]
    Status(u16),

    /// The scrape succeeded but no line matched the requested metric
    #[error("metric {0:?} not found")]
    MetricNotFound(String),
}

/// Coarse classification shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeErrorKind {
    Endpoint,
    MetricNotFound,
}

impl ScrapeError {
    pub fn kind(&self) -> ScrapeErrorKind {
        match self {
            Self::Transport(_) | Self::Status(_) => ScrapeErrorKind::Endpoint,
            Self::MetricNotFound(_) => ScrapeErrorKind::MetricNotFound,
        }
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ScrapeError::MetricNotFound("up".to_string());
        assert_eq!(error.to_string(), "metric \"up\" not found");

        let error = ScrapeError::Status(500);
        assert_eq!(error.to_string(), "unexpected status code: 500");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(ScrapeError::Status(503).kind(), ScrapeErrorKind::Endpoint);
        assert_eq!(
            ScrapeError::MetricNotFound("x".to_string()).kind(),
            ScrapeErrorKind::MetricNotFound
        );
    }
}
