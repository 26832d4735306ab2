//! Winner selection across the supported methods.

use crate::error::JudgeError;
use crate::scoring::{composite_scores, rank, CandidateScore, CompositeWeights, JudgeCast,
    ModerationScores};
use clashcast_types::{Address, CastId, Side, UserId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// How many ranked candidates the verdict keeps for audit.
const TOP_CANDIDATES: usize = 3;

/// Winner-selection method. Hybrid is the production default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMethod {
    /// Uniform choice among eligible casts.
    Random,
    /// Most likes wins; earliest submission breaks ties.
    VoteBased,
    /// Highest moderation quality wins; earliest submission breaks ties.
    QualityBased,
    /// Weighted composite, aggregated per side, top cast of the
    /// stronger side wins.
    #[default]
    Hybrid,
}

impl SelectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionMethod::Random => "random",
            SelectionMethod::VoteBased => "vote-based",
            SelectionMethod::QualityBased => "quality-based",
            SelectionMethod::Hybrid => "hybrid",
        }
    }
}

impl FromStr for SelectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SelectionMethod::Random),
            "vote-based" => Ok(SelectionMethod::VoteBased),
            "quality-based" => Ok(SelectionMethod::QualityBased),
            "hybrid" => Ok(SelectionMethod::Hybrid),
            other => Err(format!("unknown selection method: {other}")),
        }
    }
}

/// Per-side composite aggregates, kept in the verdict for audit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SideTotals {
    pub support_avg: f64,
    pub support_count: usize,
    pub oppose_avg: f64,
    pub oppose_count: usize,
}

impl SideTotals {
    fn from_candidates(candidates: &[CandidateScore]) -> Self {
        let (mut s_sum, mut s_n, mut o_sum, mut o_n) = (0.0, 0usize, 0.0, 0usize);
        for c in candidates {
            match c.side {
                Side::Support => {
                    s_sum += c.composite;
                    s_n += 1;
                }
                Side::Oppose => {
                    o_sum += c.composite;
                    o_n += 1;
                }
            }
        }
        Self {
            support_avg: if s_n == 0 { 0.0 } else { s_sum / s_n as f64 },
            support_count: s_n,
            oppose_avg: if o_n == 0 { 0.0 } else { o_sum / o_n as f64 },
            oppose_count: o_n,
        }
    }

    /// The side with the higher average composite. With one side empty
    /// the populated side wins trivially; a dead-equal average falls
    /// back to the side of the top-ranked individual candidate.
    fn winning_side(&self, ranked: &[CandidateScore]) -> Side {
        if self.support_count == 0 {
            return Side::Oppose;
        }
        if self.oppose_count == 0 {
            return Side::Support;
        }
        if self.support_avg > self.oppose_avg {
            Side::Support
        } else if self.oppose_avg > self.support_avg {
            Side::Oppose
        } else {
            ranked[0].side
        }
    }
}

/// The judge's output: exactly one winner plus the audit trail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Verdict {
    pub winning_cast_id: CastId,
    pub winning_user_id: UserId,
    pub winning_address: Address,
    pub side: Side,
    /// Wire name of the method that produced this verdict; includes
    /// "single-participant" for the one-cast short circuit.
    pub method: String,
    pub rationale: String,
    /// Best-first candidate breakdown, at most three entries.
    pub top_candidates: Vec<CandidateScore>,
    pub side_totals: SideTotals,
}

/// The scoring engine. Construction is cheap; one instance per engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct Judge {
    pub method: SelectionMethod,
    pub weights: CompositeWeights,
}

impl Judge {
    pub fn new(method: SelectionMethod) -> Self {
        Self {
            method,
            weights: CompositeWeights::default(),
        }
    }

    /// Select the winner among `casts`.
    ///
    /// Never returns `None`-like outcomes for non-empty input: a
    /// single cast short-circuits to its author, and every method has
    /// a total tie-break order.
    pub fn select(
        &self,
        topic: &str,
        casts: &[JudgeCast],
        moderation: &HashMap<CastId, ModerationScores>,
    ) -> Result<Verdict, JudgeError> {
        if casts.is_empty() {
            return Err(JudgeError::NoEligibleCasts);
        }

        let mut candidates = composite_scores(casts, moderation, self.weights);
        rank(&mut candidates, casts);
        let side_totals = SideTotals::from_candidates(&candidates);

        if casts.len() == 1 {
            let only = &candidates[0];
            return Ok(self.verdict(
                casts,
                only.cast_id,
                "single-participant",
                format!(
                    "only one eligible cast on \"{topic}\"; {} wins automatically",
                    only.user_id
                ),
                candidates.clone(),
                side_totals,
            ));
        }

        let (winner_id, method, rationale) = match self.method {
            SelectionMethod::Random => {
                let pick = rand::thread_rng().gen_range(0..casts.len());
                let chosen = &casts[pick];
                (
                    chosen.id,
                    "random",
                    format!(
                        "uniform random choice among {} eligible casts on \"{topic}\"",
                        casts.len()
                    ),
                )
            }
            SelectionMethod::VoteBased => {
                let mut by_votes = candidates.clone();
                let created: HashMap<CastId, _> =
                    casts.iter().map(|c| (c.id, c.created_at)).collect();
                by_votes.sort_by(|a, b| {
                    b.like_count
                        .cmp(&a.like_count)
                        .then_with(|| created[&a.cast_id].cmp(&created[&b.cast_id]))
                        .then_with(|| a.cast_id.cmp(&b.cast_id))
                });
                let top = &by_votes[0];
                (
                    top.cast_id,
                    "vote-based",
                    format!(
                        "{} drew the most likes ({}) out of {} casts",
                        top.user_id,
                        top.like_count,
                        casts.len()
                    ),
                )
            }
            SelectionMethod::QualityBased => {
                let mut by_quality = candidates.clone();
                let created: HashMap<CastId, _> =
                    casts.iter().map(|c| (c.id, c.created_at)).collect();
                by_quality.sort_by(|a, b| {
                    b.quality
                        .cmp(&a.quality)
                        .then_with(|| created[&a.cast_id].cmp(&created[&b.cast_id]))
                        .then_with(|| a.cast_id.cmp(&b.cast_id))
                });
                let top = &by_quality[0];
                (
                    top.cast_id,
                    "quality-based",
                    format!(
                        "{} scored highest on quality ({}/10) out of {} casts",
                        top.user_id,
                        top.quality,
                        casts.len()
                    ),
                )
            }
            SelectionMethod::Hybrid => {
                let side = side_totals.winning_side(&candidates);
                let top = candidates
                    .iter()
                    .find(|c| c.side == side)
                    .expect("winning side always has at least one candidate");
                (
                    top.cast_id,
                    "hybrid",
                    format!(
                        "hybrid scoring on \"{topic}\": SUPPORT averaged {:.3} over {} casts, \
                         OPPOSE averaged {:.3} over {}; top cast on {side} scored {:.3} \
                         (quality {}, relevance {}, engagement {}, {} likes)",
                        side_totals.support_avg,
                        side_totals.support_count,
                        side_totals.oppose_avg,
                        side_totals.oppose_count,
                        top.composite,
                        top.quality,
                        top.relevance,
                        top.engagement,
                        top.like_count,
                    ),
                )
            }
        };

        Ok(self.verdict(casts, winner_id, method, rationale, candidates, side_totals))
    }

    fn verdict(
        &self,
        casts: &[JudgeCast],
        winner_id: CastId,
        method: &str,
        rationale: String,
        mut candidates: Vec<CandidateScore>,
        side_totals: SideTotals,
    ) -> Verdict {
        let winner = casts
            .iter()
            .find(|c| c.id == winner_id)
            .expect("winner id comes from the candidate list");
        candidates.truncate(TOP_CANDIDATES);
        Verdict {
            winning_cast_id: winner.id,
            winning_user_id: winner.user_id.clone(),
            winning_address: winner.address.clone(),
            side: winner.side,
            method: method.to_string(),
            rationale,
            top_candidates: candidates,
            side_totals,
        }
    }
}
