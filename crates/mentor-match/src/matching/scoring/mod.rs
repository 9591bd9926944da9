pub(crate) mod rules;
mod weights;

pub use rules::jaccard;
pub use weights::ScoreWeights;

use super::domain::{DemandProfile, MatchBreakdown, ScoreComponents, SupplyProfile};

/// Stateless scorer comparing a demand profile with a supply profile.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoreWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Weighted compatibility in `[0, 100]`, rounded to two decimals.
    pub fn score(&self, demand: &DemandProfile, supply: &SupplyProfile) -> MatchBreakdown {
        self.breakdown(&self.components(demand, supply))
    }

    /// Unrounded per-dimension points.
    pub fn components(&self, demand: &DemandProfile, supply: &SupplyProfile) -> ScoreComponents {
        rules::score_components(demand, supply, &self.weights)
    }

    /// Exact weighted sum clamped to the weight ceiling. Ranking orders on this value.
    pub fn exact_total(&self, components: &ScoreComponents) -> f64 {
        components.sum().clamp(0.0, self.weights.total().max(0.0))
    }

    /// Reported form of `components`: every figure rounded to two decimals.
    pub fn breakdown(&self, raw: &ScoreComponents) -> MatchBreakdown {
        MatchBreakdown {
            total: rules::round_points(self.exact_total(raw)),
            components: ScoreComponents {
                category: rules::round_points(raw.category),
                level: rules::round_points(raw.level),
                interests: rules::round_points(raw.interests),
                location: rules::round_points(raw.location),
                language: rules::round_points(raw.language),
            },
        }
    }

    /// Scores a pair where either side may be missing; an absent profile scores zero.
    pub fn score_optional(
        &self,
        demand: Option<&DemandProfile>,
        supply: Option<&SupplyProfile>,
    ) -> MatchBreakdown {
        match (demand, supply) {
            (Some(demand), Some(supply)) => self.score(demand, supply),
            _ => MatchBreakdown::default(),
        }
    }
}
