//! Nullable moderator: scripted verdicts for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use clashcast_engine::{EngineError, ModerationVerdict, Moderator};

/// A moderator with canned behavior:
/// - content containing the configured flag marker is inappropriate,
/// - exact-content overrides return scripted verdicts,
/// - everything else gets the default verdict.
pub struct NullModerator {
    default_verdict: ModerationVerdict,
    flag_marker: Option<String>,
    overrides: Mutex<HashMap<String, ModerationVerdict>>,
    fail_always: bool,
}

impl NullModerator {
    /// Everything passes with mid-range scores.
    pub fn permissive() -> Self {
        Self {
            default_verdict: ModerationVerdict {
                is_appropriate: true,
                quality: 5,
                relevance: 5,
                engagement: 5,
            },
            flag_marker: None,
            overrides: Mutex::new(HashMap::new()),
            fail_always: false,
        }
    }

    /// Flag any content containing `marker` as inappropriate.
    pub fn flagging(marker: &str) -> Self {
        let mut m = Self::permissive();
        m.flag_marker = Some(marker.to_string());
        m
    }

    /// Always error, for exercising the engine's degrade path.
    pub fn failing() -> Self {
        let mut m = Self::permissive();
        m.fail_always = true;
        m
    }

    /// Script a verdict for one exact content string.
    pub fn script(&self, content: &str, verdict: ModerationVerdict) {
        self.overrides
            .lock()
            .expect("override lock poisoned")
            .insert(content.to_string(), verdict);
    }
}

#[async_trait]
impl Moderator for NullModerator {
    async fn moderate(&self, content: &str, _topic: &str) -> Result<ModerationVerdict, EngineError> {
        if self.fail_always {
            return Err(EngineError::Moderation("moderation backend down".into()));
        }
        if let Some(v) = self
            .overrides
            .lock()
            .expect("override lock poisoned")
            .get(content)
        {
            return Ok(*v);
        }
        if let Some(marker) = &self.flag_marker {
            if content.contains(marker.as_str()) {
                return Ok(ModerationVerdict {
                    is_appropriate: false,
                    ..self.default_verdict
                });
            }
        }
        Ok(self.default_verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permissive_passes_everything() {
        let m = NullModerator::permissive();
        let v = m.moderate("any argument at all", "topic").await.unwrap();
        assert!(v.is_appropriate);
        assert_eq!(v.quality, 5);
    }

    #[tokio::test]
    async fn flagging_marks_marked_content() {
        let m = NullModerator::flagging("SPAM");
        assert!(!m.moderate("this is SPAM content", "t").await.unwrap().is_appropriate);
        assert!(m.moderate("this is fine", "t").await.unwrap().is_appropriate);
    }

    #[tokio::test]
    async fn scripted_verdict_wins() {
        let m = NullModerator::permissive();
        m.script(
            "special",
            ModerationVerdict {
                is_appropriate: true,
                quality: 9,
                relevance: 8,
                engagement: 7,
            },
        );
        let v = m.moderate("special", "t").await.unwrap();
        assert_eq!(v.quality, 9);
    }

    #[tokio::test]
    async fn failing_moderator_errors() {
        let m = NullModerator::failing();
        assert!(m.moderate("anything", "t").await.is_err());
    }
}
