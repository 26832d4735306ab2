//! Topic supply collaborator interface.
//!
//! Topic generation (news sourcing, model prompting) happens outside
//! the engine; all the lifecycle needs is the next debatable topic
//! with two labeled side lists.

use async_trait::async_trait;

use crate::error::EngineError;

/// A ready-to-post battle topic.
#[derive(Clone, Debug)]
pub struct TopicBrief {
    pub title: String,
    pub description: String,
    pub category: String,
    pub side_a_points: Vec<String>,
    pub side_b_points: Vec<String>,
}

/// Supplies topics for new battles.
#[async_trait]
pub trait TopicSource: Send + Sync {
    async fn next_topic(&self) -> Result<TopicBrief, EngineError>;
}
