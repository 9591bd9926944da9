//! Mentor/mentee matching core: compatibility scoring, capacity tracking, recommendation ranking,
//! and the proposal lifecycle.

pub mod capacity;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod ranking;
pub mod repository;
pub mod retry;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use capacity::CapacityTracker;
pub use domain::{
    Assignment, AssignmentId, AssignmentStatus, CapacitySnapshot, DemandId, DemandProfile,
    DemandProfileDraft, MatchBreakdown, MatchScore, ProfileSide, ProposalId, ProposalRequest,
    ProposalState, RetryCredits, ScoreComponents, SupplyId, SupplyProfile, SupplyProfileDraft,
    SupplySummary,
};
pub use error::MatchingError;
pub use lifecycle::{AcceptOutcome, DeclineOutcome, ProposalAnswer, RequestLifecycle};
pub use memory::MemoryMatchingStore;
pub use ranking::{Page, Recommendation, RecommendationRanker};
pub use repository::{
    AuditError, AuditEvent, AuditSink, Ledger, MatchingRepository, RepositoryError,
};
pub use retry::RetryPolicy;
pub use router::{matching_router, CreateProposalRequest, RespondRequest};
pub use scoring::{jaccard, ScoreWeights, ScoringEngine};
pub use service::{MatchingConfig, MatchingService, RecommendQuery};
