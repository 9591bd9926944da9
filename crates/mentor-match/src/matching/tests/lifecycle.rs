use std::sync::Arc;

use super::common::*;
use crate::matching::domain::{AssignmentStatus, ProfileSide, ProposalState, RetryCredits};
use crate::matching::repository::RepositoryError;
use crate::matching::{
    MatchingConfig, MatchingError, MatchingService, MemoryMatchingStore, ProposalAnswer,
};

#[test]
fn second_pending_proposal_for_same_pair_is_rejected() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    let demand_id = seed_demand(&service, "mentee-1");

    let first = service
        .create_proposal(&demand_id, &supply_id, Some("Hello".to_string()))
        .expect("first proposal");
    match service.create_proposal(&demand_id, &supply_id, None) {
        Err(MatchingError::AlreadyPending { proposal_id }) => {
            assert_eq!(proposal_id, first.proposal_id)
        }
        other => panic!("expected already pending, got {other:?}"),
    }

    service
        .decline_proposal(&first.proposal_id, &supply_id, None)
        .expect("decline succeeds");
    let retry = service
        .create_proposal(&demand_id, &supply_id, None)
        .expect("new proposal once the first is resolved");
    assert_ne!(retry.proposal_id, first.proposal_id);
}

#[test]
fn accept_creates_assignment_and_refreshes_capacity() {
    let (service, store, audit) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    let demand_id = seed_demand(&service, "mentee-1");
    let proposal = service
        .create_proposal(&demand_id, &supply_id, Some("  ".to_string()))
        .expect("proposal created");
    assert_eq!(proposal.message, None);

    let outcome = service
        .accept_proposal(&proposal.proposal_id, &supply_id, Some("Welcome".to_string()))
        .expect("accept succeeds");

    assert_eq!(outcome.proposal.state, ProposalState::Accepted);
    assert_eq!(outcome.proposal.response.as_deref(), Some("Welcome"));
    assert!(outcome.proposal.responded_at.is_some());
    assert_eq!(outcome.assignment.proposal_id, proposal.proposal_id);
    assert_eq!(outcome.assignment.status, AssignmentStatus::Active);
    assert_eq!(outcome.active_count, 1);

    let cached = store_supply_count(&store, &supply_id);
    assert_eq!(cached, 1);
    assert_eq!(
        service.supply_assignments(&supply_id).expect("assignments").len(),
        1
    );
    assert_eq!(
        audit.actions(),
        vec!["proposal_created".to_string(), "proposal_accepted".to_string()]
    );
}

fn store_supply_count(
    store: &Arc<MemoryMatchingStore>,
    supply_id: &crate::matching::SupplyId,
) -> u32 {
    use crate::matching::repository::MatchingRepository;
    store
        .transaction(|ledger| ledger.supply_profile(supply_id))
        .expect("store readable")
        .expect("supply present")
        .current_active_count
}

#[test]
fn only_the_targeted_supply_unit_may_respond() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    let other = seed_supply(&service, "mentor-2", 2);
    let demand_id = seed_demand(&service, "mentee-1");
    let proposal = service
        .create_proposal(&demand_id, &supply_id, None)
        .expect("proposal created");

    assert_eq!(
        service
            .accept_proposal(&proposal.proposal_id, &other, None)
            .unwrap_err(),
        MatchingError::Unauthorized
    );
    assert_eq!(
        service
            .decline_proposal(&proposal.proposal_id, &other, None)
            .unwrap_err(),
        MatchingError::Unauthorized
    );
    let stored = service
        .get_proposal(&proposal.proposal_id)
        .expect("proposal readable");
    assert_eq!(stored.state, ProposalState::Pending);
}

#[test]
fn unknown_proposals_are_not_found() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    let missing = crate::matching::ProposalId("prop-999999".to_string());

    assert_eq!(
        service
            .accept_proposal(&missing, &supply_id, None)
            .unwrap_err(),
        MatchingError::NotFound(missing.clone())
    );
    assert_eq!(
        service.get_proposal(&missing).unwrap_err(),
        MatchingError::NotFound(missing)
    );
}

#[test]
fn terminal_proposals_cannot_transition_again() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 3);
    let first = seed_demand(&service, "mentee-1");
    let second = seed_demand(&service, "mentee-2");

    let accepted = service
        .create_proposal(&first, &supply_id, None)
        .expect("proposal created");
    service
        .accept_proposal(&accepted.proposal_id, &supply_id, None)
        .expect("accept succeeds");

    let declined = service
        .create_proposal(&second, &supply_id, None)
        .expect("proposal created");
    service
        .decline_proposal(&declined.proposal_id, &supply_id, Some("Full".to_string()))
        .expect("decline succeeds");

    assert_eq!(
        service
            .accept_proposal(&declined.proposal_id, &supply_id, None)
            .unwrap_err(),
        MatchingError::AlreadyProcessed {
            state: ProposalState::Declined
        }
    );
    assert_eq!(
        service
            .decline_proposal(&accepted.proposal_id, &supply_id, None)
            .unwrap_err(),
        MatchingError::AlreadyProcessed {
            state: ProposalState::Accepted
        }
    );
    assert_eq!(
        service
            .accept_proposal(&accepted.proposal_id, &supply_id, None)
            .unwrap_err(),
        MatchingError::AlreadyProcessed {
            state: ProposalState::Accepted
        }
    );

    let still_declined = service
        .get_proposal(&declined.proposal_id)
        .expect("proposal readable");
    assert_eq!(still_declined.state, ProposalState::Declined);
    assert_eq!(still_declined.response.as_deref(), Some("Full"));
    assert_eq!(service.capacity(&supply_id).expect("capacity").active, 1);
}

#[test]
fn only_pending_proposals_take_an_answer() {
    assert_eq!(
        ProposalState::Pending.respond(ProposalAnswer::Accept),
        Ok(ProposalState::Accepted)
    );
    assert_eq!(
        ProposalState::Pending.respond(ProposalAnswer::Decline),
        Ok(ProposalState::Declined)
    );
    for state in [ProposalState::Accepted, ProposalState::Declined] {
        for answer in [ProposalAnswer::Accept, ProposalAnswer::Decline] {
            assert_eq!(
                state.respond(answer),
                Err(MatchingError::AlreadyProcessed { state })
            );
        }
    }
}

#[test]
fn blank_responses_are_stored_as_absent() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    let accepted = service
        .create_proposal(&seed_demand(&service, "mentee-1"), &supply_id, None)
        .expect("proposal created");
    let declined = service
        .create_proposal(&seed_demand(&service, "mentee-2"), &supply_id, None)
        .expect("proposal created");

    let outcome = service
        .accept_proposal(&accepted.proposal_id, &supply_id, Some(" \t".to_string()))
        .expect("accept succeeds");
    assert_eq!(outcome.proposal.response, None);

    let outcome = service
        .decline_proposal(&declined.proposal_id, &supply_id, Some(String::new()))
        .expect("decline succeeds");
    assert_eq!(outcome.proposal.response, None);
    assert_eq!(
        service
            .get_proposal(&declined.proposal_id)
            .expect("proposal readable")
            .response,
        None
    );
}

#[test]
fn accept_without_capacity_leaves_proposal_pending() {
    let (service, _, audit) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 1);
    let first = seed_demand(&service, "mentee-1");
    let second = seed_demand(&service, "mentee-2");
    let winner = service
        .create_proposal(&first, &supply_id, None)
        .expect("proposal created");
    let loser = service
        .create_proposal(&second, &supply_id, None)
        .expect("proposal created");

    service
        .accept_proposal(&winner.proposal_id, &supply_id, None)
        .expect("first accept succeeds");
    assert_eq!(
        service
            .accept_proposal(&loser.proposal_id, &supply_id, None)
            .unwrap_err(),
        MatchingError::NoCapacity {
            supply_id: supply_id.clone()
        }
    );

    let pending = service
        .supply_inbox(&supply_id, Some(ProposalState::Pending))
        .expect("inbox readable");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].proposal_id, loser.proposal_id);
    assert_eq!(service.supply_assignments(&supply_id).expect("assignments").len(), 1);
    assert_eq!(
        service.retry_credits(&second).expect("credits"),
        RetryCredits { used: 0, max: 1 }
    );
    assert!(!audit.actions().contains(&"proposal_declined".to_string()));

    service
        .decline_proposal(&loser.proposal_id, &supply_id, None)
        .expect("supply unit may still decline");
}

#[test]
fn retry_credits_are_capped() {
    let store = Arc::new(MemoryMatchingStore::new());
    let service = MatchingService::new(
        store,
        Arc::new(MemoryAudit::default()),
        MatchingConfig {
            max_retries: 2,
            ..MatchingConfig::default()
        },
    );
    let demand_id = seed_demand(&service, "mentee-1");

    let mut observed = Vec::new();
    for index in 0..4 {
        let supply_id = seed_supply(&service, &format!("mentor-{index}"), 2);
        let proposal = service
            .create_proposal(&demand_id, &supply_id, None)
            .expect("proposal created");
        let outcome = service
            .decline_proposal(&proposal.proposal_id, &supply_id, None)
            .expect("decline succeeds");
        observed.push(outcome.retry_credits.expect("credits granted").used);
    }

    assert_eq!(observed, vec![1, 2, 2, 2]);
    assert_eq!(
        service.retry_credits(&demand_id).expect("credits"),
        RetryCredits { used: 2, max: 2 }
    );
}

#[test]
fn resaving_a_demand_profile_keeps_retry_credits() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    let demand_id = seed_demand(&service, "mentee-1");
    let proposal = service
        .create_proposal(&demand_id, &supply_id, None)
        .expect("proposal created");
    service
        .decline_proposal(&proposal.proposal_id, &supply_id, None)
        .expect("decline succeeds");

    let mut draft = tax_law_demand();
    draft.goals = "Make partner".to_string();
    let saved = service
        .save_demand_profile(demand_id.clone(), draft)
        .expect("profile saves");
    assert_eq!(saved.retry_credits, 1);
}

#[test]
fn proposals_require_saved_profiles() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    let demand_id = seed_demand(&service, "mentee-1");

    assert_eq!(
        service
            .create_proposal(&demand("ghost"), &supply_id, None)
            .unwrap_err(),
        MatchingError::ProfileIncomplete(ProfileSide::Demand)
    );
    assert_eq!(
        service
            .create_proposal(&demand_id, &supply("ghost"), None)
            .unwrap_err(),
        MatchingError::ProfileIncomplete(ProfileSide::Supply)
    );
    assert_eq!(
        service.retry_credits(&demand("ghost")).unwrap_err(),
        MatchingError::ProfileIncomplete(ProfileSide::Demand)
    );
}

#[test]
fn capacity_cannot_drop_below_active_assignments() {
    let (service, _, _) = build_service();
    let supply_id = seed_supply(&service, "mentor-1", 2);
    for name in ["mentee-1", "mentee-2"] {
        let demand_id = seed_demand(&service, name);
        let proposal = service
            .create_proposal(&demand_id, &supply_id, None)
            .expect("proposal created");
        service
            .accept_proposal(&proposal.proposal_id, &supply_id, None)
            .expect("accept succeeds");
    }

    match service.save_supply_profile(supply_id.clone(), tax_law_supply(Some(1))) {
        Err(MatchingError::InvalidProfile(reason)) => assert!(reason.contains("below")),
        other => panic!("expected invalid profile, got {other:?}"),
    }

    let resaved = service
        .save_supply_profile(supply_id.clone(), tax_law_supply(Some(4)))
        .expect("raising capacity is allowed");
    assert!(resaved.verified, "verification survives a profile edit");
    assert_eq!(resaved.current_active_count, 2);
}

#[test]
fn blank_required_fields_are_rejected() {
    let (service, _, _) = build_service();
    let mut draft = tax_law_demand();
    draft.category = "   ".to_string();

    match service.save_demand_profile(demand("mentee-1"), draft) {
        Err(MatchingError::InvalidProfile(reason)) => assert_eq!(reason, "category is required"),
        other => panic!("expected invalid profile, got {other:?}"),
    }
}

#[test]
fn store_failures_surface_undecorated() {
    let service = MatchingService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryAudit::default()),
        matching_config(),
    );

    let error = service
        .create_proposal(&demand("mentee-1"), &supply("mentor-1"), None)
        .unwrap_err();
    assert_eq!(
        error,
        MatchingError::Repository(RepositoryError::Unavailable("database offline".to_string()))
    );
    assert_eq!(error.to_string(), "repository unavailable: database offline");
}

#[test]
fn audit_failures_do_not_undo_committed_transitions() {
    let service = MatchingService::new(
        Arc::new(MemoryMatchingStore::new()),
        Arc::new(OfflineAudit),
        matching_config(),
    );
    let supply_id = supply("mentor-1");
    service
        .save_supply_profile(supply_id.clone(), tax_law_supply(Some(1)))
        .expect("supply saves");
    let demand_id = demand("mentee-1");
    service
        .save_demand_profile(demand_id.clone(), tax_law_demand())
        .expect("demand saves");

    let proposal = service
        .create_proposal(&demand_id, &supply_id, None)
        .expect("create survives audit outage");
    service
        .accept_proposal(&proposal.proposal_id, &supply_id, None)
        .expect("accept survives audit outage");
    assert_eq!(service.capacity(&supply_id).expect("capacity").available, 0);
}

#[test]
fn listings_order_proposals() {
    let (service, _, _) = build_service();
    let first_supply = seed_supply(&service, "mentor-1", 2);
    let second_supply = seed_supply(&service, "mentor-2", 2);
    let demand_id = seed_demand(&service, "mentee-1");

    let older = service
        .create_proposal(&demand_id, &first_supply, None)
        .expect("proposal created");
    let newer = service
        .create_proposal(&demand_id, &second_supply, None)
        .expect("proposal created");

    let sent = service
        .demand_proposals(&demand_id)
        .expect("proposals readable");
    let ids: Vec<_> = sent.iter().map(|proposal| proposal.proposal_id.clone()).collect();
    assert_eq!(ids, vec![newer.proposal_id, older.proposal_id.clone()]);

    let inbox = service
        .supply_inbox(&first_supply, None)
        .expect("inbox readable");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].proposal_id, older.proposal_id);
    assert!(service
        .supply_inbox(&first_supply, Some(ProposalState::Accepted))
        .expect("inbox readable")
        .is_empty());
}
