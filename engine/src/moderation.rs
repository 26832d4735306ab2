//! Content moderation collaborator interface.
//!
//! Moderation is optional: with no moderator configured every cast is
//! eligible and the judge scores on likes alone. When a moderator is
//! present its verdicts gate eligibility and feed the quality,
//! relevance, and engagement sub-scores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use clashcast_judge::scoring::{ModerationScores, MAX_SCORE, MIN_SCORE};

use crate::error::EngineError;

/// Verdict for one cast.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub is_appropriate: bool,
    pub quality: u8,
    pub relevance: u8,
    pub engagement: u8,
}

impl ModerationVerdict {
    /// A permissive verdict with floor scores, what a cast gets when
    /// moderation output is unusable.
    pub fn fallback() -> Self {
        Self {
            is_appropriate: true,
            quality: MIN_SCORE,
            relevance: MIN_SCORE,
            engagement: MIN_SCORE,
        }
    }

    /// Decode a verdict from model output without ever failing.
    ///
    /// Moderation backends answer in JSON, but model output drifts:
    /// fields go missing, scores come back as strings or out of range.
    /// This decoder takes what validates, clamps scores into 1..=10,
    /// and substitutes the floor for everything else, so one bad
    /// response can never stall a completion sweep.
    pub fn from_json_lenient(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            return Self::fallback();
        };

        let score = |key: &str| -> u8 {
            let number = match &value[key] {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => None,
            };
            number
                .map(|n| (n.min(MAX_SCORE as u64) as u8).max(MIN_SCORE))
                .unwrap_or(MIN_SCORE)
        };

        Self {
            is_appropriate: value["is_appropriate"].as_bool().unwrap_or(true),
            quality: score("quality"),
            relevance: score("relevance"),
            engagement: score("engagement"),
        }
    }

    pub fn scores(&self) -> ModerationScores {
        ModerationScores {
            quality: self.quality,
            relevance: self.relevance,
            engagement: self.engagement,
        }
        .clamped()
    }
}

/// Moderates cast content against a battle topic.
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn moderate(&self, content: &str, topic: &str) -> Result<ModerationVerdict, EngineError>;
}
