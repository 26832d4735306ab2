//! Nullable topic source: cycles through canned topics.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use clashcast_engine::{EngineError, TopicBrief, TopicSource};

/// Supplies a fixed rotation of topics. With no topics configured it
/// serves a single built-in default forever.
pub struct NullTopicSource {
    topics: Vec<TopicBrief>,
    cursor: AtomicUsize,
}

impl NullTopicSource {
    pub fn new(topics: Vec<TopicBrief>) -> Self {
        Self {
            topics,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn single(title: &str) -> Self {
        Self::new(vec![TopicBrief {
            title: title.to_string(),
            description: format!("Debate: {title}"),
            category: "general".to_string(),
            side_a_points: vec!["It moves us forward".to_string()],
            side_b_points: vec!["It creates new problems".to_string()],
        }])
    }
}

impl Default for NullTopicSource {
    fn default() -> Self {
        Self::single("Should remote work be the default?")
    }
}

#[async_trait]
impl TopicSource for NullTopicSource {
    async fn next_topic(&self) -> Result<TopicBrief, EngineError> {
        if self.topics.is_empty() {
            return Err(EngineError::TopicSource("no topics configured".into()));
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.topics.len();
        Ok(self.topics[i].clone())
    }
}
