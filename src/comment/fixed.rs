//! Implements `CommentSource` with a canned reply.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without calling the chat completion API.

use crate::comment::CommentSource;
use crate::Result;

const DEFAULT_COMMENT: &str = "その一歩が未来の資産になる！今日も積み上げていこう！";

/// A `CommentSource` that always returns the same text.
#[derive(Debug, Clone)]
pub(crate) struct FixedComment {
    text: String,
}

impl FixedComment {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for FixedComment {
    fn default() -> Self {
        Self::new(DEFAULT_COMMENT)
    }
}

#[async_trait::async_trait]
impl CommentSource for FixedComment {
    async fn comment(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}
