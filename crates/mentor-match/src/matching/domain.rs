use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a demand unit (the mentee side).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DemandId(pub String);

/// Identifier of a supply unit (the mentor side).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SupplyId(pub String);

/// Store-allocated identifier of a proposal request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

/// Store-allocated identifier of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_id!(DemandId, SupplyId, ProposalId, AssignmentId);

/// Owner-editable fields of a demand profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandProfileDraft {
    pub category: String,
    pub level: String,
    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub goals: String,
    pub language: String,
    pub location: String,
}

/// Persisted demand profile; `retry_credits` is only ever moved by the retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandProfile {
    pub demand_id: DemandId,
    pub category: String,
    pub level: String,
    pub interests: String,
    pub goals: String,
    pub language: String,
    pub location: String,
    pub retry_credits: u32,
}

impl DemandProfile {
    pub fn from_draft(demand_id: DemandId, draft: DemandProfileDraft, retry_credits: u32) -> Self {
        Self {
            demand_id,
            category: draft.category,
            level: draft.level,
            interests: draft.interests,
            goals: draft.goals,
            language: draft.language,
            location: draft.location,
            retry_credits,
        }
    }
}

/// Owner-editable fields of a supply profile. A missing capacity falls back to the configured
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyProfileDraft {
    pub category: String,
    pub level: String,
    #[serde(default)]
    pub expertise: String,
    pub language: String,
    pub location: String,
    #[serde(default)]
    pub max_capacity: Option<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Persisted supply profile.
///
/// `current_active_count` is a cache of the number of active assignments and is recomputed from
/// the assignment set whenever it changes; it is never incremented on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyProfile {
    pub supply_id: SupplyId,
    pub category: String,
    pub level: String,
    pub expertise: String,
    pub language: String,
    pub location: String,
    pub max_capacity: u32,
    pub current_active_count: u32,
    pub verified: bool,
    pub active: bool,
}

impl SupplyProfile {
    pub fn summary(&self) -> SupplySummary {
        SupplySummary {
            category: self.category.clone(),
            level: self.level.clone(),
            language: self.language.clone(),
            location: self.location.clone(),
            available_slots: self.max_capacity.saturating_sub(self.current_active_count),
        }
    }
}

/// Public-facing slice of a supply profile returned with recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplySummary {
    pub category: String,
    pub level: String,
    pub language: String,
    pub location: String,
    pub available_slots: u32,
}

/// Per-dimension contribution to a compatibility score, already multiplied by its weight.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub category: f64,
    pub level: f64,
    pub interests: f64,
    pub location: f64,
    pub language: f64,
}

impl ScoreComponents {
    pub fn sum(&self) -> f64 {
        self.category + self.level + self.interests + self.location + self.language
    }
}

/// Result of scoring one demand profile against one supply profile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub total: f64,
    pub components: ScoreComponents,
}

/// Cached audit trail of the last score computed for a pair. Never consulted for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub demand_id: DemandId,
    pub supply_id: SupplyId,
    pub breakdown: MatchBreakdown,
    pub computed_at: DateTime<Utc>,
}

/// Lifecycle state of a proposal. Accepted and Declined are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Pending,
    Accepted,
    Declined,
}

impl ProposalState {
    pub const fn label(self) -> &'static str {
        match self {
            ProposalState::Pending => "pending",
            ProposalState::Accepted => "accepted",
            ProposalState::Declined => "declined",
        }
    }

    pub const fn is_terminal(self) -> bool {
        match self {
            ProposalState::Pending => false,
            ProposalState::Accepted | ProposalState::Declined => true,
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A demand unit's request to be assigned to a specific supply unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub proposal_id: ProposalId,
    pub demand_id: DemandId,
    pub supply_id: SupplyId,
    pub message: Option<String>,
    pub state: ProposalState,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl ProposalRequest {
    pub fn is_pending_between(&self, demand_id: &DemandId, supply_id: &SupplyId) -> bool {
        self.state == ProposalState::Pending
            && &self.demand_id == demand_id
            && &self.supply_id == supply_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Ended,
}

/// Realised pairing, created exactly once per accepted proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: AssignmentId,
    pub proposal_id: ProposalId,
    pub demand_id: DemandId,
    pub supply_id: SupplyId,
    pub started_at: DateTime<Utc>,
    pub status: AssignmentStatus,
}

/// Retry credits granted to a demand unit against the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCredits {
    pub used: u32,
    pub max: u32,
}

/// Live capacity figures for a supply unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub active: u32,
    pub maximum: u32,
    pub available: u32,
}

/// Which side of the pairing lacks a saved profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSide {
    Demand,
    Supply,
}

impl fmt::Display for ProfileSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileSide::Demand => f.write_str("demand"),
            ProfileSide::Supply => f.write_str("supply"),
        }
    }
}
