use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    Assignment, AssignmentId, DemandId, DemandProfile, MatchScore, ProposalId, ProposalRequest,
    SupplyId, SupplyProfile,
};

/// Read/write view over the store inside one transaction.
pub trait Ledger {
    fn demand_profile(&self, id: &DemandId) -> Result<Option<DemandProfile>, RepositoryError>;
    fn put_demand_profile(&mut self, profile: DemandProfile) -> Result<(), RepositoryError>;

    fn supply_profile(&self, id: &SupplyId) -> Result<Option<SupplyProfile>, RepositoryError>;
    /// Supply profiles that are both active and verified, optionally restricted to one category.
    fn listed_supply(&self, category: Option<&str>) -> Result<Vec<SupplyProfile>, RepositoryError>;
    fn put_supply_profile(&mut self, profile: SupplyProfile) -> Result<(), RepositoryError>;

    fn next_proposal_id(&mut self) -> Result<ProposalId, RepositoryError>;
    fn proposal(&self, id: &ProposalId) -> Result<Option<ProposalRequest>, RepositoryError>;
    fn proposals_for_supply(&self, id: &SupplyId) -> Result<Vec<ProposalRequest>, RepositoryError>;
    fn proposals_for_demand(&self, id: &DemandId) -> Result<Vec<ProposalRequest>, RepositoryError>;
    fn put_proposal(&mut self, proposal: ProposalRequest) -> Result<(), RepositoryError>;

    fn next_assignment_id(&mut self) -> Result<AssignmentId, RepositoryError>;
    fn assignments_for_supply(&self, id: &SupplyId) -> Result<Vec<Assignment>, RepositoryError>;
    fn insert_assignment(&mut self, assignment: Assignment) -> Result<(), RepositoryError>;

    fn match_score(
        &self,
        demand_id: &DemandId,
        supply_id: &SupplyId,
    ) -> Result<Option<MatchScore>, RepositoryError>;
    fn upsert_match_score(&mut self, score: MatchScore) -> Result<(), RepositoryError>;
}

/// Storage abstraction; every call to `transaction` is applied atomically or not at all.
pub trait MatchingRepository: Send + Sync {
    /// Runs `work` against an isolated ledger. Writes are committed only when `work` returns `Ok`,
    /// and transactions touching the same store never interleave.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Ledger) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound audit trail hook (log shipper, database table, etc.).
pub trait AuditSink: Send + Sync {
    fn publish(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Audit payload emitted after each committed lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    pub proposal_id: ProposalId,
    pub details: BTreeMap<String, String>,
}

impl AuditEvent {
    pub fn new(action: &str, proposal_id: &ProposalId) -> Self {
        Self {
            action: action.to_string(),
            proposal_id: proposal_id.clone(),
            details: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}
