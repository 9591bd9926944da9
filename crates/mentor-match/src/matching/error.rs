use super::domain::{ProfileSide, ProposalId, ProposalState, SupplyId};
use super::repository::RepositoryError;

/// Typed outcome of every failed matching operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchingError {
    #[error("{0} profile is incomplete")]
    ProfileIncomplete(ProfileSide),
    #[error("proposal {proposal_id} is already pending for this pair")]
    AlreadyPending { proposal_id: ProposalId },
    #[error("supply unit {supply_id} has no remaining capacity")]
    NoCapacity { supply_id: SupplyId },
    #[error("acting supply unit is not the target of this proposal")]
    Unauthorized,
    #[error("proposal was already {state}")]
    AlreadyProcessed { state: ProposalState },
    #[error("proposal {0} not found")]
    NotFound(ProposalId),
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MatchingError {
    /// Stable machine-readable kind used in API payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            MatchingError::ProfileIncomplete(_) => "profile_incomplete",
            MatchingError::AlreadyPending { .. } => "already_pending",
            MatchingError::NoCapacity { .. } => "no_capacity",
            MatchingError::Unauthorized => "unauthorized",
            MatchingError::AlreadyProcessed { .. } => "already_processed",
            MatchingError::NotFound(_) => "not_found",
            MatchingError::InvalidProfile(_) => "invalid_profile",
            MatchingError::Repository(_) => "repository_unavailable",
        }
    }
}
