use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capacity::CapacityTracker;
use super::domain::{
    DemandId, MatchScore, ProfileSide, ScoreComponents, SupplyId, SupplySummary,
};
use super::error::MatchingError;
use super::repository::Ledger;
use super::scoring::ScoringEngine;

/// Slice of the ranked candidate list to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub supply_id: SupplyId,
    pub score: f64,
    pub components: ScoreComponents,
    pub profile: SupplySummary,
}

/// Greedy per-demand ranking of listed supply units with free capacity.
#[derive(Debug, Clone, Default)]
pub struct RecommendationRanker {
    engine: ScoringEngine,
    capacity: CapacityTracker,
}

impl RecommendationRanker {
    pub fn new(engine: ScoringEngine, capacity: CapacityTracker) -> Self {
        Self { engine, capacity }
    }

    /// Scores every eligible candidate, caches each score, and returns the requested page sorted
    /// by score descending with ties broken by supply id ascending.
    pub fn recommend(
        &self,
        ledger: &mut dyn Ledger,
        demand_id: &DemandId,
        category: Option<&str>,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>, MatchingError> {
        let demand = ledger
            .demand_profile(demand_id)?
            .ok_or(MatchingError::ProfileIncomplete(ProfileSide::Demand))?;

        let mut ranked = Vec::new();
        for supply in ledger.listed_supply(category)? {
            let capacity = self.capacity.snapshot(&*ledger, &supply)?;
            if capacity.available == 0 {
                continue;
            }

            let raw = self.engine.components(&demand, &supply);
            let breakdown = self.engine.breakdown(&raw);
            ledger.upsert_match_score(MatchScore {
                demand_id: demand_id.clone(),
                supply_id: supply.supply_id.clone(),
                breakdown,
                computed_at: now,
            })?;

            let mut profile = supply.summary();
            profile.available_slots = capacity.available;
            ranked.push((
                self.engine.exact_total(&raw),
                Recommendation {
                    supply_id: supply.supply_id,
                    score: breakdown.total,
                    components: breakdown.components,
                    profile,
                },
            ));
        }

        // order on the exact sum; rounded scores can tie where the real ones differ
        ranked.sort_by(|(left_exact, left), (right_exact, right)| {
            right_exact
                .partial_cmp(left_exact)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.supply_id.cmp(&right.supply_id))
        });

        tracing::debug!(
            demand_id = %demand_id,
            candidates = ranked.len(),
            limit = page.limit,
            offset = page.offset,
            "ranked supply candidates"
        );

        Ok(ranked
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|(_, recommendation)| recommendation)
            .collect())
    }
}
