//! Per-cast composite scoring.

use clashcast_types::{Address, CastId, Side, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lowest possible moderation sub-score; substituted for anything
/// missing so that a cast without scores can still be ranked.
pub const MIN_SCORE: u8 = 1;
/// Highest possible moderation sub-score.
pub const MAX_SCORE: u8 = 10;

/// Moderation sub-scores for one cast, each 1..=10.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ModerationScores {
    pub quality: u8,
    pub relevance: u8,
    pub engagement: u8,
}

impl ModerationScores {
    /// Clamp each sub-score into the valid 1..=10 range.
    pub fn clamped(self) -> Self {
        Self {
            quality: self.quality.clamp(MIN_SCORE, MAX_SCORE),
            relevance: self.relevance.clamp(MIN_SCORE, MAX_SCORE),
            engagement: self.engagement.clamp(MIN_SCORE, MAX_SCORE),
        }
    }
}

impl Default for ModerationScores {
    fn default() -> Self {
        Self {
            quality: MIN_SCORE,
            relevance: MIN_SCORE,
            engagement: MIN_SCORE,
        }
    }
}

/// A cast as the judge sees it.
#[derive(Clone, Debug)]
pub struct JudgeCast {
    pub id: CastId,
    pub user_id: UserId,
    pub address: Address,
    pub side: Side,
    pub content: String,
    pub like_count: u64,
    pub created_at: Timestamp,
}

/// Weights of the hybrid composite. They sum to 1.
#[derive(Clone, Copy, Debug)]
pub struct CompositeWeights {
    pub quality: f64,
    pub relevance: f64,
    pub engagement: f64,
    pub likes: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            quality: 0.30,
            relevance: 0.25,
            engagement: 0.25,
            likes: 0.20,
        }
    }
}

/// One cast's full score breakdown, kept in the verdict for audit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateScore {
    pub cast_id: CastId,
    pub user_id: UserId,
    pub side: Side,
    pub composite: f64,
    pub quality: u8,
    pub relevance: u8,
    pub engagement: u8,
    pub like_count: u64,
}

/// Compute composite scores for every cast.
///
/// Sub-scores normalize to 0..=1 as score/10; the like signal
/// normalizes against the most-liked cast in the battle (0 when no
/// cast has likes). Missing moderation entries score the minimum.
pub fn composite_scores(
    casts: &[JudgeCast],
    moderation: &HashMap<CastId, ModerationScores>,
    weights: CompositeWeights,
) -> Vec<CandidateScore> {
    let max_likes = casts.iter().map(|c| c.like_count).max().unwrap_or(0);

    casts
        .iter()
        .map(|cast| {
            let scores = moderation
                .get(&cast.id)
                .copied()
                .unwrap_or_default()
                .clamped();
            let like_norm = if max_likes == 0 {
                0.0
            } else {
                cast.like_count as f64 / max_likes as f64
            };
            let composite = weights.quality * scores.quality as f64 / MAX_SCORE as f64
                + weights.relevance * scores.relevance as f64 / MAX_SCORE as f64
                + weights.engagement * scores.engagement as f64 / MAX_SCORE as f64
                + weights.likes * like_norm;
            CandidateScore {
                cast_id: cast.id,
                user_id: cast.user_id.clone(),
                side: cast.side,
                composite,
                quality: scores.quality,
                relevance: scores.relevance,
                engagement: scores.engagement,
                like_count: cast.like_count,
            }
        })
        .collect()
}

/// Order candidates best-first: composite descending, then earliest
/// submission, then lowest cast id. The timestamp tie-break is the
/// documented rule; the id tie-break makes ordering total.
pub fn rank(candidates: &mut [CandidateScore], casts: &[JudgeCast]) {
    let created: HashMap<CastId, Timestamp> =
        casts.iter().map(|c| (c.id, c.created_at)).collect();
    candidates.sort_by(|a, b| {
        b.composite
            .partial_cmp(&a.composite)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| created[&a.cast_id].cmp(&created[&b.cast_id]))
            .then_with(|| a.cast_id.cmp(&b.cast_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast(id: u64, side: Side, likes: u64, created: u64) -> JudgeCast {
        JudgeCast {
            id: CastId(id),
            user_id: UserId::new(format!("user{id}")),
            address: Address::from_bytes([id as u8; 20]),
            side,
            content: format!("argument {id} with enough text"),
            like_count: likes,
            created_at: Timestamp::new(created),
        }
    }

    #[test]
    fn missing_scores_default_to_minimum() {
        let casts = vec![cast(1, Side::Support, 0, 10)];
        let out = composite_scores(&casts, &HashMap::new(), CompositeWeights::default());
        assert_eq!(out[0].quality, MIN_SCORE);
        assert_eq!(out[0].relevance, MIN_SCORE);
        assert_eq!(out[0].engagement, MIN_SCORE);
        // 0.8 * (1/10) + 0.2 * 0 likes
        assert!((out[0].composite - 0.08).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let casts = vec![cast(1, Side::Support, 0, 10)];
        let mut moderation = HashMap::new();
        moderation.insert(
            CastId(1),
            ModerationScores {
                quality: 99,
                relevance: 0,
                engagement: 5,
            },
        );
        let out = composite_scores(&casts, &moderation, CompositeWeights::default());
        assert_eq!(out[0].quality, MAX_SCORE);
        assert_eq!(out[0].relevance, MIN_SCORE);
        assert_eq!(out[0].engagement, 5);
    }

    #[test]
    fn like_norm_uses_battle_maximum() {
        let casts = vec![
            cast(1, Side::Support, 8, 10),
            cast(2, Side::Oppose, 4, 11),
        ];
        let out = composite_scores(&casts, &HashMap::new(), CompositeWeights::default());
        let by_id: HashMap<_, _> = out.iter().map(|c| (c.cast_id, c.composite)).collect();
        // Equal moderation floors; only the like term differs: 0.2 vs 0.1.
        assert!((by_id[&CastId(1)] - by_id[&CastId(2)] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn rank_breaks_ties_by_submission_time() {
        let casts = vec![
            cast(2, Side::Support, 3, 20),
            cast(1, Side::Support, 3, 10),
        ];
        let mut out = composite_scores(&casts, &HashMap::new(), CompositeWeights::default());
        rank(&mut out, &casts);
        assert_eq!(out[0].cast_id, CastId(1));
    }
}
