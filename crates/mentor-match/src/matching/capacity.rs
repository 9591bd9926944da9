use super::domain::{
    Assignment, AssignmentStatus, CapacitySnapshot, ProfileSide, SupplyId, SupplyProfile,
};
use super::error::MatchingError;
use super::repository::Ledger;

/// Tracks active assignments against each supply unit's ceiling.
///
/// Counts are always re-derived from the assignment set. Callers run these methods inside a
/// repository transaction, which makes check-and-reserve a single atomic step.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityTracker;

impl CapacityTracker {
    pub fn new() -> Self {
        Self
    }

    /// Number of assignments in the Active state referencing `supply_id`.
    pub fn active_count(
        &self,
        ledger: &dyn Ledger,
        supply_id: &SupplyId,
    ) -> Result<u32, MatchingError> {
        let count = ledger
            .assignments_for_supply(supply_id)?
            .iter()
            .filter(|assignment| assignment.status == AssignmentStatus::Active)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    pub fn snapshot(
        &self,
        ledger: &dyn Ledger,
        supply: &SupplyProfile,
    ) -> Result<CapacitySnapshot, MatchingError> {
        let active = self.active_count(ledger, &supply.supply_id)?;
        Ok(CapacitySnapshot {
            active,
            maximum: supply.max_capacity,
            available: supply.max_capacity.saturating_sub(active),
        })
    }

    pub fn has_capacity(
        &self,
        ledger: &dyn Ledger,
        supply_id: &SupplyId,
    ) -> Result<bool, MatchingError> {
        let supply = ledger
            .supply_profile(supply_id)?
            .ok_or(MatchingError::ProfileIncomplete(ProfileSide::Supply))?;
        Ok(self.snapshot(ledger, &supply)?.available > 0)
    }

    /// Consumes one slot by recording `assignment` when its supply unit still has room, then
    /// refreshes the cached count. Returns `false` without writing anything when it is full.
    pub fn reserve(
        &self,
        ledger: &mut dyn Ledger,
        assignment: Assignment,
    ) -> Result<bool, MatchingError> {
        let supply_id = assignment.supply_id.clone();
        if !self.has_capacity(&*ledger, &supply_id)? {
            return Ok(false);
        }

        ledger.insert_assignment(assignment)?;
        self.refresh(ledger, &supply_id)?;
        Ok(true)
    }

    /// Rewrites the cached active count on the supply profile from the assignment set.
    pub fn refresh(
        &self,
        ledger: &mut dyn Ledger,
        supply_id: &SupplyId,
    ) -> Result<CapacitySnapshot, MatchingError> {
        let mut supply = ledger
            .supply_profile(supply_id)?
            .ok_or(MatchingError::ProfileIncomplete(ProfileSide::Supply))?;
        let snapshot = self.snapshot(&*ledger, &supply)?;
        supply.current_active_count = snapshot.active;
        ledger.put_supply_profile(supply)?;
        Ok(snapshot)
    }
}
