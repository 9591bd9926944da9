use super::domain::{DemandId, ProfileSide, RetryCredits};
use super::error::MatchingError;
use super::repository::Ledger;

/// Capped, monotonically increasing retry counter granted to demand units on decline.
///
/// Credits are advisory: nothing in the lifecycle spends them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn credits(
        &self,
        ledger: &dyn Ledger,
        demand_id: &DemandId,
    ) -> Result<RetryCredits, MatchingError> {
        let profile = ledger
            .demand_profile(demand_id)?
            .ok_or(MatchingError::ProfileIncomplete(ProfileSide::Demand))?;
        Ok(RetryCredits {
            used: profile.retry_credits.min(self.max_retries),
            max: self.max_retries,
        })
    }

    /// Grants one credit unless the ceiling is reached. Returns `None` when the demand unit has no
    /// profile to credit.
    pub fn grant_if_eligible(
        &self,
        ledger: &mut dyn Ledger,
        demand_id: &DemandId,
    ) -> Result<Option<RetryCredits>, MatchingError> {
        let Some(mut profile) = ledger.demand_profile(demand_id)? else {
            return Ok(None);
        };

        if profile.retry_credits < self.max_retries {
            profile.retry_credits += 1;
        }
        let credits = RetryCredits {
            used: profile.retry_credits.min(self.max_retries),
            max: self.max_retries,
        };
        ledger.put_demand_profile(profile)?;
        Ok(Some(credits))
    }
}
