use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::matching::domain::{
    DemandId, DemandProfile, DemandProfileDraft, SupplyId, SupplyProfile, SupplyProfileDraft,
};
use crate::matching::repository::{
    AuditError, AuditEvent, AuditSink, Ledger, MatchingRepository, RepositoryError,
};
use crate::matching::{MatchingConfig, MatchingService, MemoryMatchingStore};

pub(super) fn matching_config() -> MatchingConfig {
    MatchingConfig::default()
}

pub(super) fn tax_law_demand() -> DemandProfileDraft {
    DemandProfileDraft {
        category: "Tax Law".to_string(),
        level: "JD".to_string(),
        interests: "finance audits".to_string(),
        goals: "Pass the bar".to_string(),
        language: "English".to_string(),
        location: "HK".to_string(),
    }
}

pub(super) fn tax_law_supply(max_capacity: Option<u32>) -> SupplyProfileDraft {
    SupplyProfileDraft {
        category: "Tax Law".to_string(),
        level: "JD".to_string(),
        expertise: "tax audits finance".to_string(),
        language: "english".to_string(),
        location: "hk".to_string(),
        max_capacity,
        active: true,
    }
}

pub(super) fn demand_profile(draft: DemandProfileDraft) -> DemandProfile {
    DemandProfile::from_draft(DemandId("mentee-1".to_string()), draft, 0)
}

pub(super) fn supply_profile(draft: SupplyProfileDraft) -> SupplyProfile {
    SupplyProfile {
        supply_id: SupplyId("mentor-1".to_string()),
        category: draft.category,
        level: draft.level,
        expertise: draft.expertise,
        language: draft.language,
        location: draft.location,
        max_capacity: draft.max_capacity.unwrap_or(3),
        current_active_count: 0,
        verified: true,
        active: draft.active,
    }
}

pub(super) type TestService = MatchingService<MemoryMatchingStore, MemoryAudit>;

pub(super) fn build_service() -> (TestService, Arc<MemoryMatchingStore>, Arc<MemoryAudit>) {
    let store = Arc::new(MemoryMatchingStore::new());
    let audit = Arc::new(MemoryAudit::default());
    let service = MatchingService::new(store.clone(), audit.clone(), matching_config());
    (service, store, audit)
}

pub(super) fn demand(id: &str) -> DemandId {
    DemandId(id.to_string())
}

pub(super) fn supply(id: &str) -> SupplyId {
    SupplyId(id.to_string())
}

/// Saves and verifies a supply unit offering the tax-law draft.
pub(super) fn seed_supply(service: &TestService, id: &str, capacity: u32) -> SupplyId {
    let supply_id = supply(id);
    service
        .save_supply_profile(supply_id.clone(), tax_law_supply(Some(capacity)))
        .expect("supply profile saves");
    service
        .set_supply_verified(&supply_id, true)
        .expect("supply verifies");
    supply_id
}

pub(super) fn seed_demand(service: &TestService, id: &str) -> DemandId {
    let demand_id = demand(id);
    service
        .save_demand_profile(demand_id.clone(), tax_law_demand())
        .expect("demand profile saves");
    demand_id
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAudit {
    pub(super) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }

    pub(super) fn actions(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.action)
            .collect()
    }
}

impl AuditSink for MemoryAudit {
    fn publish(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .expect("audit mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct OfflineAudit;

impl AuditSink for OfflineAudit {
    fn publish(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Transport("collector offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl MatchingRepository for UnavailableRepository {
    fn transaction<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Ledger) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
