use crate::comment::{comment_source, motivational_comment, Mode};
use crate::commands::Out;
use crate::{Config, Result};

/// Prints one motivational comment. When the comment service is unavailable this still succeeds
/// and says so.
pub async fn comment(config: &Config, api_key: Option<&str>, mode: Mode) -> Result<Out<Option<String>>> {
    let source = comment_source(config.comment(), api_key, mode);
    let text = motivational_comment(source.as_ref()).await;
    let message = match &text {
        Some(text) => text.clone(),
        None => "No motivational comment is available right now".to_string(),
    };
    Ok(Out::new(message, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_comment_testing_mode() {
        let env = TestEnv::new().await;
        let out = comment(&env.config(), None, Mode::Testing).await.unwrap();
        assert!(out.structure().unwrap().is_some());
        assert!(!out.message().is_empty());
    }

    #[tokio::test]
    async fn test_comment_unavailable() {
        let env = TestEnv::new().await;
        let out = comment(&env.config(), None, Mode::Chat).await.unwrap();
        assert_eq!(out.structure(), Some(&None));
        assert_eq!(out.message(), "No motivational comment is available right now");
    }
}
