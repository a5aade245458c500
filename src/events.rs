//! Lifecycle events handed to the notification side
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalEvent {
    Submitted {
        document_id: String,
        document_number: String,
        drafter_id: String,
        approver_id: String, // the first approver
    },
    StepAdvanced {
        document_id: String,
        sequence: u32,
        new_approver_id: String,
    },
    Approved {
        document_id: String,
    },
    Rejected {
        document_id: String,
        sequence: u32,
        comment: Option<String>,
    },
}

impl ApprovalEvent {
    pub fn document_id(&self) -> &str {
        match self {
            ApprovalEvent::Submitted { document_id, .. }
            | ApprovalEvent::StepAdvanced { document_id, .. }
            | ApprovalEvent::Approved { document_id }
            | ApprovalEvent::Rejected { document_id, .. } => document_id,
        }
    }
}

/// Receives events after the state change is committed. Delivery failures are
/// logged by the processor and never undo the transition.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &ApprovalEvent) -> anyhow::Result<()>;
}

/// Writes every event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &ApprovalEvent) -> anyhow::Result<()> {
        match event {
            ApprovalEvent::Submitted {
                document_id,
                document_number,
                approver_id,
                ..
            } => {
                tracing::info!(document_id = %document_id, number = %document_number, approver = %approver_id, "Document submitted");
            }
            ApprovalEvent::StepAdvanced {
                document_id,
                sequence,
                new_approver_id,
            } => {
                tracing::info!(document_id = %document_id, step = sequence, approver = %new_approver_id, "Step advanced");
            }
            ApprovalEvent::Approved { document_id } => {
                tracing::info!(document_id = %document_id, "Document approved");
            }
            ApprovalEvent::Rejected {
                document_id,
                sequence,
                ..
            } => {
                tracing::info!(document_id = %document_id, step = sequence, "Document rejected");
            }
        }
        Ok(())
    }
}

/// Keeps events in memory in publish order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ApprovalEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events(&self) -> Vec<ApprovalEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
    pub fn for_document(&self, document_id: &str) -> Vec<ApprovalEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.document_id() == document_id)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &ApprovalEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}
