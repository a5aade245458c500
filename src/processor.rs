//! Service layer API for the approval workflow
use super::clock::{ClockSource, SystemClock};
use super::config::EngineConfig;
use super::directory::DepartmentDirectory;
use super::document::{Document, DocumentSummary, DraftDocument};
use super::error::{ApprovalError, ValidationError};
use super::events::{ApprovalEvent, EventSink, TracingSink};
use super::line::{Decision, Transition};
use super::numbering::DocumentNumberGenerator;
use super::participant::Participant;
use super::step::ApprovalStep;
use super::store::DocumentStore;
use super::utils::{new_uuid_to_bech32, normalise_comment};
use std::sync::Arc;

pub struct ApprovalProcessor {
    store: DocumentStore,
    directory: Arc<dyn DepartmentDirectory>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn ClockSource>,
    config: EngineConfig,
}

impl ApprovalProcessor {
    pub fn new(
        instance: Arc<sled::Db>,
        directory: Arc<dyn DepartmentDirectory>,
    ) -> Result<Self, ApprovalError> {
        Ok(Self {
            store: DocumentStore::open(instance)?,
            directory,
            sink: Arc::new(TracingSink),
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Standalone number generator over the same counters submissions use.
    pub fn numbering(&self) -> DocumentNumberGenerator {
        self.store.numbering()
    }

    /// Submit a new document for approval. Either the whole document (number,
    /// steps, participants, body) is stored or nothing is.
    pub fn submit(&self, draft: DraftDocument) -> Result<Document, ApprovalError> {
        let draft = draft.validate_and_finalise(self.config.line_policy())?;

        let department_name = self
            .directory
            .name_of(&draft.department_id)
            .map_err(|err| ApprovalError::DependencyUnavailable {
                department_id: draft.department_id.clone(),
                reason: err.to_string(),
            })?;

        let id = new_uuid_to_bech32(&self.config.document_hrp)
            .map_err(|err| ApprovalError::Identifier(err.to_string()))?;

        let document = Document::from_draft(id, &draft, self.clock.now());
        let document = self.store.insert_new(document, &draft, &department_name)?;

        tracing::info!(
            document_id = %document.id,
            number = %document.document_number,
            kind = %document.document_type,
            steps = document.line().len(),
            "Document stored"
        );
        self.publish(ApprovalEvent::Submitted {
            document_id: document.id.clone(),
            document_number: document.document_number.clone(),
            drafter_id: document.drafter_id.clone(),
            approver_id: document.current_approver().unwrap_or_default().to_string(),
        });

        Ok(document)
    }

    /// Apply an approve/reject decision to the document's current step.
    pub fn decide(
        &self,
        document_id: &str,
        acting_user_id: &str,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<Document, ApprovalError> {
        let snapshot = self.store.load(document_id)?;
        snapshot.ensure_open()?;

        // authorization is reported ahead of comment validation
        let sequence = snapshot
            .line()
            .check_turn(acting_user_id)
            .map_err(|err| ApprovalError::from_step(document_id, err))?
            .sequence;

        let comment = normalise_comment(comment);
        if decision == Decision::Reject && comment.is_none() && self.config.require_reject_comment {
            return Err(ValidationError::BlankRejectComment.into());
        }

        let now = self.clock.now();
        // the line only changes through decisions, each settling the step
        // that was current in the snapshot; participant edits are kept
        let (document, transition) = self
            .store
            .update(document_id, Some(acting_user_id), |stored| {
                if stored.line() != snapshot.line() {
                    return Err(ApprovalError::AlreadyProcessed {
                        document_id: document_id.to_string(),
                        sequence,
                    });
                }
                stored.apply_decision(acting_user_id, decision, comment.clone(), now.clone())
            })
            .inspect_err(|err| {
                tracing::warn!(document_id, step = sequence, error = %err, "Decision not recorded")
            })?;

        tracing::info!(
            document_id,
            step = sequence,
            user = acting_user_id,
            status = %document.status(),
            "Decision recorded"
        );

        let event = match transition {
            Transition::Advanced {
                next_sequence,
                next_approver_id,
                ..
            } => ApprovalEvent::StepAdvanced {
                document_id: document.id.clone(),
                sequence: next_sequence,
                new_approver_id: next_approver_id,
            },
            Transition::Completed { .. } => ApprovalEvent::Approved {
                document_id: document.id.clone(),
            },
            Transition::Rejected { sequence, comment } => ApprovalEvent::Rejected {
                document_id: document.id.clone(),
                sequence,
                comment,
            },
        };
        self.publish(event);

        Ok(document)
    }

    pub fn approve(
        &self,
        document_id: &str,
        acting_user_id: &str,
        comment: Option<String>,
    ) -> Result<Document, ApprovalError> {
        self.decide(document_id, acting_user_id, Decision::Approve, comment)
    }

    pub fn reject(
        &self,
        document_id: &str,
        acting_user_id: &str,
        comment: &str,
    ) -> Result<Document, ApprovalError> {
        self.decide(
            document_id,
            acting_user_id,
            Decision::Reject,
            Some(comment.to_string()),
        )
    }

    /// Approver of the PENDING step, or None once the document is final.
    pub fn current_approver(&self, document_id: &str) -> Result<Option<String>, ApprovalError> {
        let document = self.store.load(document_id)?;
        Ok(document.current_approver().map(str::to_string))
    }

    pub fn approval_line(&self, document_id: &str) -> Result<Vec<ApprovalStep>, ApprovalError> {
        let document = self.store.load(document_id)?;
        Ok(document.line().steps().to_vec())
    }

    pub fn document(&self, document_id: &str) -> Result<Document, ApprovalError> {
        self.store.load(document_id)
    }

    pub fn summary(&self, document_id: &str) -> Result<DocumentSummary, ApprovalError> {
        Ok(self.store.load(document_id)?.summary())
    }

    /// The opaque body payload stored with the document.
    pub fn body(&self, document_id: &str) -> Result<Vec<u8>, ApprovalError> {
        let document = self.store.load(document_id)?;
        self.store.load_body(&document.body_ref)
    }

    /// Documents currently waiting on `approver_id`.
    pub fn pending_for(&self, approver_id: &str) -> Result<Vec<DocumentSummary>, ApprovalError> {
        Ok(summaries(self.store.pending_for(approver_id)?))
    }

    pub fn drafted_by(&self, drafter_id: &str) -> Result<Vec<DocumentSummary>, ApprovalError> {
        Ok(summaries(self.store.drafted_by(drafter_id)?))
    }

    pub fn participating(&self, user_id: &str) -> Result<Vec<DocumentSummary>, ApprovalError> {
        Ok(summaries(self.store.participating(user_id)?))
    }

    /// Add reference/receive participants. Only allowed until the first decision.
    pub fn add_participants(
        &self,
        document_id: &str,
        participants: Vec<Participant>,
    ) -> Result<Document, ApprovalError> {
        let (document, added) = self
            .store
            .update(document_id, None, |stored| stored.add_participants(participants.clone()))?;

        tracing::info!(document_id, added = added.len(), "Participants added");
        Ok(document)
    }

    /// Flush every pending write to disk.
    pub fn flush(&self) -> Result<(), ApprovalError> {
        self.store.flush()
    }

    // delivery problems are the sink's to retry; the transition stays committed
    fn publish(&self, event: ApprovalEvent) {
        if let Err(err) = self.sink.publish(&event) {
            tracing::warn!(document_id = event.document_id(), error = %err, "Event delivery failed");
        }
    }
}

fn summaries(documents: Vec<Document>) -> Vec<DocumentSummary> {
    let mut summaries: Vec<_> = documents.iter().map(Document::summary).collect();
    summaries.sort_by(|a, b| a.draft_date.cmp(&b.draft_date).then_with(|| a.id.cmp(&b.id)));
    summaries
}
