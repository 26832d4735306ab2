//! Nullable infrastructure: deterministic substitutes for the
//! engine's external collaborators, used throughout the test suites.

pub mod clock;
pub mod moderation;
pub mod topic;

pub use clock::NullClock;
pub use moderation::NullModerator;
pub use topic::NullTopicSource;
