use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::capacity::CapacityTracker;
use super::domain::{
    Assignment, CapacitySnapshot, DemandId, DemandProfile, DemandProfileDraft, MatchBreakdown,
    MatchScore, ProfileSide, ProposalId, ProposalRequest, ProposalState, RetryCredits, SupplyId,
    SupplyProfile, SupplyProfileDraft,
};
use super::error::MatchingError;
use super::lifecycle::{AcceptOutcome, DeclineOutcome, RequestLifecycle};
use super::ranking::{Page, Recommendation, RecommendationRanker};
use super::repository::{AuditEvent, AuditSink, MatchingRepository};
use super::retry::RetryPolicy;
use super::scoring::{ScoreWeights, ScoringEngine};

/// Tunables for the matching core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub default_capacity: u32,
    pub max_retries: u32,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub weights: ScoreWeights,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_capacity: 3,
            max_retries: 1,
            default_page_limit: 10,
            max_page_limit: 50,
            weights: ScoreWeights::default(),
        }
    }
}

/// Caller-facing recommendation request. Missing fields fall back to the configured page size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub category: Option<String>,
}

/// Service composing the scoring engine, capacity tracker, lifecycle, and retry policy over a
/// repository, with audit events published after each committed transition.
pub struct MatchingService<R, A> {
    repository: Arc<R>,
    audit: Arc<A>,
    config: MatchingConfig,
    engine: ScoringEngine,
    capacity: CapacityTracker,
    ranker: RecommendationRanker,
    lifecycle: RequestLifecycle,
    retry: RetryPolicy,
}

impl<R, A> MatchingService<R, A>
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<A>, config: MatchingConfig) -> Self {
        let engine = ScoringEngine::new(config.weights);
        let capacity = CapacityTracker::new();
        let retry = RetryPolicy::new(config.max_retries);

        Self {
            repository,
            audit,
            ranker: RecommendationRanker::new(engine.clone(), capacity),
            lifecycle: RequestLifecycle::new(capacity, retry),
            engine,
            capacity,
            retry,
            config,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Creates or replaces a demand profile, keeping its retry counter.
    pub fn save_demand_profile(
        &self,
        demand_id: DemandId,
        draft: DemandProfileDraft,
    ) -> Result<DemandProfile, MatchingError> {
        require_fields(&[
            ("category", &draft.category),
            ("level", &draft.level),
            ("language", &draft.language),
            ("location", &draft.location),
        ])?;

        self.repository.transaction(|ledger| {
            let retry_credits = ledger
                .demand_profile(&demand_id)?
                .map(|existing| existing.retry_credits)
                .unwrap_or(0);
            let profile = DemandProfile::from_draft(demand_id.clone(), draft, retry_credits);
            ledger.put_demand_profile(profile.clone())?;
            Ok(profile)
        })
    }

    /// Creates or replaces a supply profile, keeping its verification flag and recounting its
    /// active assignments. A capacity below the active count is rejected.
    pub fn save_supply_profile(
        &self,
        supply_id: SupplyId,
        draft: SupplyProfileDraft,
    ) -> Result<SupplyProfile, MatchingError> {
        require_fields(&[
            ("category", &draft.category),
            ("level", &draft.level),
            ("language", &draft.language),
            ("location", &draft.location),
        ])?;
        let max_capacity = draft.max_capacity.unwrap_or(self.config.default_capacity);
        if max_capacity == 0 {
            return Err(MatchingError::InvalidProfile(
                "max_capacity must be at least 1".to_string(),
            ));
        }

        self.repository.transaction(|ledger| {
            let verified = ledger
                .supply_profile(&supply_id)?
                .map(|existing| existing.verified)
                .unwrap_or(false);
            let active = self.capacity.active_count(&*ledger, &supply_id)?;
            if max_capacity < active {
                return Err(MatchingError::InvalidProfile(format!(
                    "max_capacity {max_capacity} is below the {active} active assignment(s)"
                )));
            }

            let profile = SupplyProfile {
                supply_id: supply_id.clone(),
                category: draft.category,
                level: draft.level,
                expertise: draft.expertise,
                language: draft.language,
                location: draft.location,
                max_capacity,
                current_active_count: active,
                verified,
                active: draft.active,
            };
            ledger.put_supply_profile(profile.clone())?;
            Ok(profile)
        })
    }

    /// Administrative verification gate for a supply unit.
    pub fn set_supply_verified(
        &self,
        supply_id: &SupplyId,
        verified: bool,
    ) -> Result<SupplyProfile, MatchingError> {
        let profile = self.repository.transaction(|ledger| {
            let mut profile = ledger
                .supply_profile(supply_id)?
                .ok_or(MatchingError::ProfileIncomplete(ProfileSide::Supply))?;
            profile.verified = verified;
            ledger.put_supply_profile(profile.clone())?;
            Ok::<_, MatchingError>(profile)
        })?;

        tracing::info!(supply_id = %supply_id, verified, "supply verification updated");
        Ok(profile)
    }

    /// Scores one pair and caches the result. Absent profiles score zero and are not cached.
    pub fn score_match(
        &self,
        demand_id: &DemandId,
        supply_id: &SupplyId,
    ) -> Result<MatchBreakdown, MatchingError> {
        self.repository.transaction(|ledger| {
            let demand = ledger.demand_profile(demand_id)?;
            let supply = ledger.supply_profile(supply_id)?;
            let breakdown = self.engine.score_optional(demand.as_ref(), supply.as_ref());

            if demand.is_some() && supply.is_some() {
                ledger.upsert_match_score(MatchScore {
                    demand_id: demand_id.clone(),
                    supply_id: supply_id.clone(),
                    breakdown,
                    computed_at: Utc::now(),
                })?;
            }
            Ok(breakdown)
        })
    }

    pub fn cached_score(
        &self,
        demand_id: &DemandId,
        supply_id: &SupplyId,
    ) -> Result<Option<MatchScore>, MatchingError> {
        self.repository
            .transaction(|ledger| Ok(ledger.match_score(demand_id, supply_id)?))
    }

    pub fn recommend(
        &self,
        demand_id: &DemandId,
        query: &RecommendQuery,
    ) -> Result<Vec<Recommendation>, MatchingError> {
        let page = Page {
            limit: query
                .limit
                .unwrap_or(self.config.default_page_limit)
                .min(self.config.max_page_limit),
            offset: query.offset,
        };
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        self.repository.transaction(|ledger| {
            self.ranker
                .recommend(ledger, demand_id, category, page, Utc::now())
        })
    }

    pub fn create_proposal(
        &self,
        demand_id: &DemandId,
        supply_id: &SupplyId,
        message: Option<String>,
    ) -> Result<ProposalRequest, MatchingError> {
        let proposal = self.repository.transaction(|ledger| {
            self.lifecycle
                .create(ledger, demand_id, supply_id, message, Utc::now())
        })?;

        tracing::info!(
            proposal_id = %proposal.proposal_id,
            demand_id = %demand_id,
            supply_id = %supply_id,
            "proposal created"
        );
        self.emit(
            AuditEvent::new("proposal_created", &proposal.proposal_id)
                .with("demand_id", demand_id.0.as_str())
                .with("supply_id", supply_id.0.as_str()),
        );
        Ok(proposal)
    }

    pub fn accept_proposal(
        &self,
        proposal_id: &ProposalId,
        acting: &SupplyId,
        response: Option<String>,
    ) -> Result<AcceptOutcome, MatchingError> {
        let outcome = self
            .repository
            .transaction(|ledger| {
                self.lifecycle
                    .accept(ledger, proposal_id, acting, response, Utc::now())
            })
            .inspect_err(|err| {
                tracing::info!(proposal_id = %proposal_id, error = %err, "proposal accept refused")
            })?;

        tracing::info!(
            proposal_id = %proposal_id,
            assignment_id = %outcome.assignment.assignment_id,
            active_count = outcome.active_count,
            "proposal accepted"
        );
        self.emit(
            AuditEvent::new("proposal_accepted", proposal_id)
                .with("assignment_id", outcome.assignment.assignment_id.0.as_str())
                .with("supply_id", acting.0.as_str())
                .with("active_count", outcome.active_count.to_string()),
        );
        Ok(outcome)
    }

    pub fn decline_proposal(
        &self,
        proposal_id: &ProposalId,
        acting: &SupplyId,
        response: Option<String>,
    ) -> Result<DeclineOutcome, MatchingError> {
        let outcome = self.repository.transaction(|ledger| {
            self.lifecycle
                .decline(ledger, proposal_id, acting, response, Utc::now())
        })?;

        tracing::info!(
            proposal_id = %proposal_id,
            demand_id = %outcome.proposal.demand_id,
            "proposal declined"
        );
        let mut event = AuditEvent::new("proposal_declined", proposal_id)
            .with("supply_id", acting.0.as_str())
            .with("demand_id", outcome.proposal.demand_id.0.as_str());
        if let Some(credits) = outcome.retry_credits {
            event = event.with("retry_credits", format!("{}/{}", credits.used, credits.max));
        }
        self.emit(event);
        Ok(outcome)
    }

    pub fn retry_credits(&self, demand_id: &DemandId) -> Result<RetryCredits, MatchingError> {
        self.repository
            .transaction(|ledger| self.retry.credits(&*ledger, demand_id))
    }

    pub fn get_proposal(&self, proposal_id: &ProposalId) -> Result<ProposalRequest, MatchingError> {
        self.repository.transaction(|ledger| {
            ledger
                .proposal(proposal_id)?
                .ok_or_else(|| MatchingError::NotFound(proposal_id.clone()))
        })
    }

    /// Proposals addressed to a supply unit, oldest first, optionally filtered by state.
    pub fn supply_inbox(
        &self,
        supply_id: &SupplyId,
        state: Option<ProposalState>,
    ) -> Result<Vec<ProposalRequest>, MatchingError> {
        let mut proposals = self.repository.transaction(|ledger| {
            Ok::<_, MatchingError>(ledger.proposals_for_supply(supply_id)?)
        })?;
        proposals.retain(|proposal| state.map_or(true, |wanted| proposal.state == wanted));
        proposals.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.proposal_id.cmp(&right.proposal_id))
        });
        Ok(proposals)
    }

    /// Proposals sent by a demand unit, newest first.
    pub fn demand_proposals(
        &self,
        demand_id: &DemandId,
    ) -> Result<Vec<ProposalRequest>, MatchingError> {
        let mut proposals = self.repository.transaction(|ledger| {
            Ok::<_, MatchingError>(ledger.proposals_for_demand(demand_id)?)
        })?;
        proposals.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.proposal_id.cmp(&left.proposal_id))
        });
        Ok(proposals)
    }

    pub fn supply_assignments(
        &self,
        supply_id: &SupplyId,
    ) -> Result<Vec<Assignment>, MatchingError> {
        self.repository
            .transaction(|ledger| Ok(ledger.assignments_for_supply(supply_id)?))
    }

    pub fn capacity(&self, supply_id: &SupplyId) -> Result<CapacitySnapshot, MatchingError> {
        self.repository.transaction(|ledger| {
            let supply = ledger
                .supply_profile(supply_id)?
                .ok_or(MatchingError::ProfileIncomplete(ProfileSide::Supply))?;
            self.capacity.snapshot(&*ledger, &supply)
        })
    }

    fn emit(&self, event: AuditEvent) {
        let action = event.action.clone();
        let proposal_id = event.proposal_id.clone();
        if let Err(err) = self.audit.publish(event) {
            tracing::warn!(
                action = %action,
                proposal_id = %proposal_id,
                error = %err,
                "audit event not delivered"
            );
        }
    }
}

fn require_fields(fields: &[(&str, &String)]) -> Result<(), MatchingError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(MatchingError::InvalidProfile(format!("{name} is required"))),
        None => Ok(()),
    }
}
