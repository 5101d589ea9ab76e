use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::PracticeApi;

pub const DEFAULT_TITLE: &str = "Quick Practice";
pub const DEFAULT_CONTENT: &str = "The quick brown fox jumps over the lazy dog. Practice typing this sentence to improve your speed and accuracy.";

/// Reference text a session is typed against. Immutable once a session holds it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetText {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub word_count: usize,
}

impl TargetText {
    pub fn new(id: Option<i64>, title: &str, content: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            content: content.to_string(),
            word_count: content.split_whitespace().count(),
        }
    }

    /// Built-in practice text used when nothing was requested or the fetch failed.
    pub fn quick_practice() -> Self {
        Self::new(Some(0), DEFAULT_TITLE, DEFAULT_CONTENT)
    }

    /// Texts without a positive id have no durable server identity.
    pub fn is_ephemeral(&self) -> bool {
        self.server_id().is_none()
    }

    pub fn server_id(&self) -> Option<i64> {
        self.id.filter(|&id| id > 0)
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn with_word_count_fallback(mut self) -> Self {
        if self.word_count == 0 {
            self.word_count = self.content.split_whitespace().count();
        }
        self
    }
}

/// Resolve the text to practice. Network or decode failures fall back to
/// the built-in text and never reach the caller.
pub fn load_text(api: &dyn PracticeApi, text_id: Option<i64>) -> TargetText {
    let Some(id) = text_id else {
        return TargetText::quick_practice();
    };
    match api.fetch_text(id) {
        Ok(text) => text.with_word_count_fallback(),
        Err(e) => {
            warn!(text_id = id, error = %e, "text fetch failed, using default practice text");
            TargetText::quick_practice()
        }
    }
}
