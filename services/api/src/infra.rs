use mentor_match::matching::{AuditError, AuditEvent, AuditSink};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Audit sink that writes each event to the tracing pipeline.
#[derive(Default, Clone)]
pub(crate) struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn publish(&self, event: AuditEvent) -> Result<(), AuditError> {
        let details = event
            .details
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(
            target: "audit",
            action = %event.action,
            proposal_id = %event.proposal_id,
            %details,
            "audit event"
        );
        Ok(())
    }
}

/// Keeps events in memory so the demo can print the trail it produced.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl AuditSink for InMemoryAuditSink {
    fn publish(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AuditError::Transport("audit buffer poisoned".to_string()))?;
        guard.push(event);
        Ok(())
    }
}

impl InMemoryAuditSink {
    pub(crate) fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
