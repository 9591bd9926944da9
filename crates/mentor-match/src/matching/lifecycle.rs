use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capacity::CapacityTracker;
use super::domain::{
    Assignment, AssignmentStatus, DemandId, ProfileSide, ProposalId, ProposalRequest,
    ProposalState, RetryCredits, SupplyId,
};
use super::error::MatchingError;
use super::repository::Ledger;
use super::retry::RetryPolicy;

/// Result of a successful accept: the terminal proposal and the assignment it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptOutcome {
    pub proposal: ProposalRequest,
    pub assignment: Assignment,
    pub active_count: u32,
}

/// Result of a successful decline. `retry_credits` is absent when the demand profile is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineOutcome {
    pub proposal: ProposalRequest,
    pub retry_credits: Option<RetryCredits>,
}

/// Supply-side answer to a pending proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalAnswer {
    Accept,
    Decline,
}

impl ProposalState {
    /// Applies a supply-side answer. Only Pending may move.
    pub fn respond(self, answer: ProposalAnswer) -> Result<ProposalState, MatchingError> {
        match self {
            ProposalState::Pending => Ok(match answer {
                ProposalAnswer::Accept => ProposalState::Accepted,
                ProposalAnswer::Decline => ProposalState::Declined,
            }),
            ProposalState::Accepted | ProposalState::Declined => {
                Err(MatchingError::AlreadyProcessed { state: self })
            }
        }
    }
}

/// Free text with blank input treated as absent.
fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}

/// State machine for a single proposal from demand unit to supply unit.
///
/// Every method expects to run inside one repository transaction; an `Err` aborts the whole unit.
#[derive(Debug, Clone, Copy)]
pub struct RequestLifecycle {
    capacity: CapacityTracker,
    retry: RetryPolicy,
}

impl RequestLifecycle {
    pub fn new(capacity: CapacityTracker, retry: RetryPolicy) -> Self {
        Self { capacity, retry }
    }

    pub fn create(
        &self,
        ledger: &mut dyn Ledger,
        demand_id: &DemandId,
        supply_id: &SupplyId,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ProposalRequest, MatchingError> {
        if ledger.demand_profile(demand_id)?.is_none() {
            return Err(MatchingError::ProfileIncomplete(ProfileSide::Demand));
        }

        if let Some(existing) = ledger
            .proposals_for_demand(demand_id)?
            .into_iter()
            .find(|proposal| proposal.is_pending_between(demand_id, supply_id))
        {
            return Err(MatchingError::AlreadyPending {
                proposal_id: existing.proposal_id,
            });
        }

        // re-checked atomically on accept
        if !self.capacity.has_capacity(&*ledger, supply_id)? {
            return Err(MatchingError::NoCapacity {
                supply_id: supply_id.clone(),
            });
        }

        let proposal = ProposalRequest {
            proposal_id: ledger.next_proposal_id()?,
            demand_id: demand_id.clone(),
            supply_id: supply_id.clone(),
            message: non_blank(message),
            state: ProposalState::Pending,
            response: None,
            created_at: now,
            responded_at: None,
        };
        ledger.put_proposal(proposal.clone())?;
        Ok(proposal)
    }

    pub fn accept(
        &self,
        ledger: &mut dyn Ledger,
        proposal_id: &ProposalId,
        acting: &SupplyId,
        response: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, MatchingError> {
        let mut proposal = actionable(&*ledger, proposal_id, acting)?;

        let assignment = Assignment {
            assignment_id: ledger.next_assignment_id()?,
            proposal_id: proposal.proposal_id.clone(),
            demand_id: proposal.demand_id.clone(),
            supply_id: proposal.supply_id.clone(),
            started_at: now,
            status: AssignmentStatus::Active,
        };

        if !self.capacity.reserve(ledger, assignment.clone())? {
            return Err(MatchingError::NoCapacity {
                supply_id: proposal.supply_id,
            });
        }

        proposal.state = proposal.state.respond(ProposalAnswer::Accept)?;
        proposal.response = non_blank(response);
        proposal.responded_at = Some(now);
        ledger.put_proposal(proposal.clone())?;

        let active_count = self.capacity.active_count(&*ledger, &proposal.supply_id)?;
        Ok(AcceptOutcome {
            proposal,
            assignment,
            active_count,
        })
    }

    pub fn decline(
        &self,
        ledger: &mut dyn Ledger,
        proposal_id: &ProposalId,
        acting: &SupplyId,
        response: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DeclineOutcome, MatchingError> {
        let mut proposal = actionable(&*ledger, proposal_id, acting)?;

        proposal.state = proposal.state.respond(ProposalAnswer::Decline)?;
        proposal.response = non_blank(response);
        proposal.responded_at = Some(now);
        ledger.put_proposal(proposal.clone())?;

        let retry_credits = self.retry.grant_if_eligible(ledger, &proposal.demand_id)?;
        Ok(DeclineOutcome {
            proposal,
            retry_credits,
        })
    }
}

/// Loads a proposal the acting supply unit may respond to.
fn actionable(
    ledger: &dyn Ledger,
    proposal_id: &ProposalId,
    acting: &SupplyId,
) -> Result<ProposalRequest, MatchingError> {
    let proposal = ledger
        .proposal(proposal_id)?
        .ok_or_else(|| MatchingError::NotFound(proposal_id.clone()))?;

    if &proposal.supply_id != acting {
        return Err(MatchingError::Unauthorized);
    }
    if proposal.state.is_terminal() {
        return Err(MatchingError::AlreadyProcessed {
            state: proposal.state,
        });
    }
    Ok(proposal)
}
