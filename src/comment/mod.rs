//! Motivational comments shown alongside the balances.
//!
//! The `CommentSource` trait is the seam between the ledger and the text generation service. The
//! `ChatComment` implementation calls an OpenAI-compatible chat completion API. The `FixedComment`
//! implementation returns a canned reply so that the whole program can be exercised without
//! network access.

mod chat;
mod fixed;

use crate::config::CommentConfig;
use crate::Result;
use tracing::{debug, warn};

pub(crate) use chat::ChatComment;
pub(crate) use fixed::FixedComment;

/// Comments longer than this many characters are cut off.
pub const MAX_COMMENT_CHARS: usize = 80;

/// When this environment variable is set and non-empty, `Mode::from_env` returns `Mode::Testing`.
const TEST_MODE_ENV: &str = "ASSET_LEDGER_IN_TEST_MODE";

/// Selects which `CommentSource` implementation is used.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// Call the chat completion API.
    #[default]
    Chat,
    /// Use a fixed comment and make no network calls.
    Testing,
}

impl Mode {
    /// Returns `Mode::Testing` when `ASSET_LEDGER_IN_TEST_MODE` is set and non-empty, otherwise
    /// `Mode::Chat`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Chat,
        }
    }
}

/// Something that can produce a short motivational comment.
#[async_trait::async_trait]
pub trait CommentSource {
    /// Produces a comment. Errors are classified as `ExternalService`.
    async fn comment(&self) -> Result<String>;
}

/// Creates the `CommentSource` for `mode`.
pub(crate) fn comment_source(
    config: &CommentConfig,
    api_key: Option<&str>,
    mode: Mode,
) -> Box<dyn CommentSource + Send + Sync> {
    match mode {
        Mode::Chat => Box::new(ChatComment::new(config, api_key)),
        Mode::Testing => Box::new(FixedComment::default()),
    }
}

/// Asks `source` for a comment. Any failure is logged and results in `None` so that the caller
/// can carry on without a comment. Replies are trimmed and cut to `MAX_COMMENT_CHARS`.
pub(crate) async fn motivational_comment(source: &(dyn CommentSource + Send + Sync)) -> Option<String> {
    match source.comment().await {
        Ok(text) => {
            let text = tidy(&text);
            if text.is_empty() {
                debug!("The comment source returned an empty comment");
                None
            } else {
                Some(text)
            }
        }
        Err(e) => {
            warn!("Unable to get a motivational comment: {e}");
            None
        }
    }
}

fn tidy(text: &str) -> String {
    text.trim()
        .chars()
        .take(MAX_COMMENT_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Failing;

    #[async_trait::async_trait]
    impl CommentSource for Failing {
        async fn comment(&self) -> Result<String> {
            Err(Error::new(
                crate::error::ErrorType::ExternalService,
                anyhow::anyhow!("service unavailable"),
            ))
        }
    }

    #[tokio::test]
    async fn test_failure_degrades_to_none() {
        assert_eq!(motivational_comment(&Failing).await, None);
    }

    #[tokio::test]
    async fn test_fixed_comment() {
        let comment = motivational_comment(&FixedComment::new("  がんばれ！ ")).await;
        assert_eq!(comment.as_deref(), Some("がんばれ！"));
    }

    #[tokio::test]
    async fn test_blank_comment_is_none() {
        assert_eq!(motivational_comment(&FixedComment::new("   ")).await, None);
    }

    #[test]
    fn test_tidy_truncates_by_characters() {
        let long = "資".repeat(100);
        let tidied = tidy(&long);
        assert_eq!(tidied.chars().count(), MAX_COMMENT_CHARS);
    }

    #[tokio::test]
    async fn test_chat_without_api_key_degrades_to_none() {
        let source = comment_source(&CommentConfig::default(), None, Mode::Chat);
        assert_eq!(motivational_comment(source.as_ref()).await, None);
    }
}
