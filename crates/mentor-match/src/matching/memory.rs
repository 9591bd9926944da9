//! Mutex-guarded in-process store.
//!
//! A transaction locks the whole store and stages its writes in an overlay over the committed
//! state. The overlay is applied only when the unit of work succeeds, so every transaction is
//! serialisable and all-or-nothing, and reads never copy the store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::{
    Assignment, AssignmentId, DemandId, DemandProfile, MatchScore, ProposalId, ProposalRequest,
    SupplyId, SupplyProfile,
};
use super::repository::{Ledger, MatchingRepository, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    demand: BTreeMap<DemandId, DemandProfile>,
    supply: BTreeMap<SupplyId, SupplyProfile>,
    proposals: BTreeMap<ProposalId, ProposalRequest>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    scores: BTreeMap<(DemandId, SupplyId), MatchScore>,
}

impl Tables {
    fn absorb(&mut self, writes: Tables) {
        self.demand.extend(writes.demand);
        self.supply.extend(writes.supply);
        self.proposals.extend(writes.proposals);
        self.assignments.extend(writes.assignments);
        self.scores.extend(writes.scores);
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    proposal_sequence: u64,
    assignment_sequence: u64,
}

/// Uncommitted writes of one transaction layered over the committed state.
struct Staged<'a> {
    committed: &'a Tables,
    writes: Tables,
    proposal_sequence: u64,
    assignment_sequence: u64,
}

impl<'a> Staged<'a> {
    fn over(state: &'a MemoryState) -> Self {
        Self {
            committed: &state.tables,
            writes: Tables::default(),
            proposal_sequence: state.proposal_sequence,
            assignment_sequence: state.assignment_sequence,
        }
    }
}

fn lookup<K: Ord, V: Clone>(
    committed: &BTreeMap<K, V>,
    staged: &BTreeMap<K, V>,
    key: &K,
) -> Option<V> {
    staged.get(key).or_else(|| committed.get(key)).cloned()
}

/// Committed rows with staged rows replacing them by key, in key order.
fn merged<'m, K: Ord, V>(
    committed: &'m BTreeMap<K, V>,
    staged: &'m BTreeMap<K, V>,
) -> impl Iterator<Item = &'m V> {
    let mut view: BTreeMap<&K, &V> = committed.iter().collect();
    view.extend(staged.iter());
    view.into_values()
}

#[derive(Debug, Default, Clone)]
pub struct MemoryMatchingStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryMatchingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchingRepository for MemoryMatchingStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Ledger) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        // a panicking unit of work never reaches the commit below
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut staged = Staged::over(&guard);
        let ledger: &mut dyn Ledger = &mut staged;
        let value = work(ledger)?;

        let Staged {
            writes,
            proposal_sequence,
            assignment_sequence,
            ..
        } = staged;
        guard.tables.absorb(writes);
        guard.proposal_sequence = proposal_sequence;
        guard.assignment_sequence = assignment_sequence;
        Ok(value)
    }
}

impl Ledger for Staged<'_> {
    fn demand_profile(&self, id: &DemandId) -> Result<Option<DemandProfile>, RepositoryError> {
        Ok(lookup(&self.committed.demand, &self.writes.demand, id))
    }

    fn put_demand_profile(&mut self, profile: DemandProfile) -> Result<(), RepositoryError> {
        self.writes.demand.insert(profile.demand_id.clone(), profile);
        Ok(())
    }

    fn supply_profile(&self, id: &SupplyId) -> Result<Option<SupplyProfile>, RepositoryError> {
        Ok(lookup(&self.committed.supply, &self.writes.supply, id))
    }

    fn listed_supply(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<SupplyProfile>, RepositoryError> {
        Ok(merged(&self.committed.supply, &self.writes.supply)
            .filter(|profile| profile.active && profile.verified)
            .filter(|profile| category.map_or(true, |wanted| profile.category == wanted))
            .cloned()
            .collect())
    }

    fn put_supply_profile(&mut self, profile: SupplyProfile) -> Result<(), RepositoryError> {
        self.writes.supply.insert(profile.supply_id.clone(), profile);
        Ok(())
    }

    fn next_proposal_id(&mut self) -> Result<ProposalId, RepositoryError> {
        self.proposal_sequence += 1;
        Ok(ProposalId(format!("prop-{:06}", self.proposal_sequence)))
    }

    fn proposal(&self, id: &ProposalId) -> Result<Option<ProposalRequest>, RepositoryError> {
        Ok(lookup(&self.committed.proposals, &self.writes.proposals, id))
    }

    fn proposals_for_supply(
        &self,
        id: &SupplyId,
    ) -> Result<Vec<ProposalRequest>, RepositoryError> {
        Ok(merged(&self.committed.proposals, &self.writes.proposals)
            .filter(|proposal| &proposal.supply_id == id)
            .cloned()
            .collect())
    }

    fn proposals_for_demand(
        &self,
        id: &DemandId,
    ) -> Result<Vec<ProposalRequest>, RepositoryError> {
        Ok(merged(&self.committed.proposals, &self.writes.proposals)
            .filter(|proposal| &proposal.demand_id == id)
            .cloned()
            .collect())
    }

    fn put_proposal(&mut self, proposal: ProposalRequest) -> Result<(), RepositoryError> {
        self.writes
            .proposals
            .insert(proposal.proposal_id.clone(), proposal);
        Ok(())
    }

    fn next_assignment_id(&mut self) -> Result<AssignmentId, RepositoryError> {
        self.assignment_sequence += 1;
        Ok(AssignmentId(format!("asg-{:06}", self.assignment_sequence)))
    }

    fn assignments_for_supply(&self, id: &SupplyId) -> Result<Vec<Assignment>, RepositoryError> {
        Ok(merged(&self.committed.assignments, &self.writes.assignments)
            .filter(|assignment| &assignment.supply_id == id)
            .cloned()
            .collect())
    }

    fn insert_assignment(&mut self, assignment: Assignment) -> Result<(), RepositoryError> {
        let taken = self.committed.assignments.contains_key(&assignment.assignment_id)
            || self.writes.assignments.contains_key(&assignment.assignment_id)
            || merged(&self.committed.assignments, &self.writes.assignments)
                .any(|existing| existing.proposal_id == assignment.proposal_id);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        self.writes
            .assignments
            .insert(assignment.assignment_id.clone(), assignment);
        Ok(())
    }

    fn match_score(
        &self,
        demand_id: &DemandId,
        supply_id: &SupplyId,
    ) -> Result<Option<MatchScore>, RepositoryError> {
        let key = (demand_id.clone(), supply_id.clone());
        Ok(lookup(&self.committed.scores, &self.writes.scores, &key))
    }

    fn upsert_match_score(&mut self, score: MatchScore) -> Result<(), RepositoryError> {
        self.writes
            .scores
            .insert((score.demand_id.clone(), score.supply_id.clone()), score);
        Ok(())
    }
}
