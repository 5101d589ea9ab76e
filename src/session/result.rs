use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::client::CompletionRequest;
use crate::session::metrics::Metrics;

/// Local record of a finished session. Kept whether or not the server
/// acknowledged completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub text_id: Option<i64>,
    pub session_id: Option<i64>,
    pub wpm: u32,
    pub accuracy: i32,
    pub characters_typed: usize,
    pub errors: usize,
    pub elapsed_secs: f64,
    pub completed_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn new(
        text_id: Option<i64>,
        session_id: Option<i64>,
        metrics: Metrics,
        characters_typed: usize,
        errors: usize,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            text_id,
            session_id,
            wpm: metrics.wpm,
            accuracy: metrics.accuracy,
            characters_typed,
            errors,
            elapsed_secs,
            completed_at: Utc::now(),
        }
    }

    pub fn to_request(&self) -> CompletionRequest {
        CompletionRequest {
            wpm: self.wpm,
            accuracy: self.accuracy,
            characters_typed: self.characters_typed,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_counts() {
        let metrics = Metrics {
            wpm: 55,
            accuracy: 92,
        };
        let summary = SessionSummary::new(Some(4), Some(9), metrics, 120, 10, 31.5);
        let request = summary.to_request();
        assert_eq!(request.wpm, 55);
        assert_eq!(request.accuracy, 92);
        assert_eq!(request.characters_typed, 120);
        assert_eq!(request.errors, 10);
    }

    #[test]
    fn test_summary_serializes_timestamp() {
        let summary = SessionSummary::new(None, None, Metrics::default(), 0, 0, 0.0);
        let json = serde_json::to_string(&summary).unwrap();
        let back: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.completed_at, summary.completed_at);
        assert_eq!(back.session_id, None);
    }
}
