//! The approval envelope: document metadata, its approval line and participants
use super::clock::TimeStamp;
use super::error::{ApprovalError, ValidationError};
use super::line::{ApprovalLine, Decision, LinePolicy, Transition};
use super::participant::{Participant, ParticipantRegistry};
use chrono::Utc;
use std::fmt;

/// Tag selecting the body schema. The engine never looks inside the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum DocumentType {
    #[n(0)]
    Leave,
    #[n(1)]
    ExpenseDraft,
    #[n(2)]
    CarFuel,
    #[n(3)]
    OverseasTrip,
    #[n(4)]
    General,
}

impl DocumentType {
    /// Form name printed at the front of the document number.
    pub fn form_name(self) -> &'static str {
        match self {
            DocumentType::Leave => "LEAVE",
            DocumentType::ExpenseDraft => "EXPENSE",
            DocumentType::CarFuel => "FUEL",
            DocumentType::OverseasTrip => "TRIP",
            DocumentType::General => "GENERAL",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DocumentType::Leave => "LEAVE",
            DocumentType::ExpenseDraft => "EXPENSE_DRAFT",
            DocumentType::CarFuel => "CAR_FUEL",
            DocumentType::OverseasTrip => "OVERSEAS_TRIP",
            DocumentType::General => "GENERAL",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DocumentStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        self != DocumentStatus::Pending
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentStatus::Pending => "PENDING",
            DocumentStatus::Approved => "APPROVED",
            DocumentStatus::Rejected => "REJECTED",
        };
        f.write_str(label)
    }
}

// Used for constructing submissions
#[derive(Debug, Default, Clone)]
pub struct DraftDocument {
    drafter_id: Option<String>,
    department_id: Option<String>,
    document_type: Option<DocumentType>,
    title: Option<String>,
    content: String,
    body: Vec<u8>, // opaque, owned by the body collaborator for this type
    approver_ids: Vec<String>,
    participants: Vec<Participant>,
}

/// A draft that passed validation, with its approval line already built.
#[derive(Debug, Clone)]
pub struct FinalisedDraft {
    pub drafter_id: String,
    pub department_id: String,
    pub document_type: DocumentType,
    pub title: String,
    pub content: String,
    pub body: Vec<u8>,
    pub body_ref: String, // sha256 of body
    pub line: ApprovalLine,
    pub participants: ParticipantRegistry,
}

impl DraftDocument {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_drafter(mut self, drafter_id: &str) -> Self {
        self.drafter_id = Some(drafter_id.to_string());
        self
    }
    pub fn set_department(mut self, department_id: &str) -> Self {
        self.department_id = Some(department_id.to_string());
        self
    }
    pub fn set_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn set_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }
    pub fn set_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
    pub fn add_approver(mut self, approver_id: &str) -> Self {
        self.approver_ids.push(approver_id.to_string());
        self
    }
    pub fn set_approvers<S: AsRef<str>>(mut self, approver_ids: &[S]) -> Self {
        self.approver_ids = approver_ids.iter().map(|a| a.as_ref().to_string()).collect();
        self
    }
    pub fn add_participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    // Checks fields and builds the approval line. Nothing is stored yet.
    pub fn validate_and_finalise(self, policy: LinePolicy) -> Result<FinalisedDraft, ValidationError> {
        let drafter_id = non_blank(self.drafter_id, "drafter id")?;
        let department_id = non_blank(self.department_id, "department id")?;
        let document_type = self
            .document_type
            .ok_or(ValidationError::MissingField("document type"))?;
        let title = non_blank(self.title, "title")?;

        let line = ApprovalLine::build(&drafter_id, &self.approver_ids, policy)?;

        let mut participants = ParticipantRegistry::new();
        participants.extend(self.participants)?;

        let body_ref = sha256::digest(&self.body);

        Ok(FinalisedDraft {
            drafter_id,
            department_id,
            document_type,
            title,
            content: self.content,
            body: self.body,
            body_ref,
            line,
            participants,
        })
    }
}

fn non_blank(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

// Stored under its id in the documents tree
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Document {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7
    #[n(1)]
    pub document_type: DocumentType,
    #[n(2)]
    pub document_number: String,
    #[n(3)]
    pub title: String,
    #[n(4)]
    pub content: String,
    #[n(5)]
    pub drafter_id: String,
    #[n(6)]
    pub department_id: String,
    #[n(7)]
    pub draft_date: TimeStamp<Utc>,
    #[n(8)]
    status: DocumentStatus,
    #[n(9)]
    pub body_ref: String,
    #[n(10)]
    line: ApprovalLine,
    #[n(11)]
    participants: ParticipantRegistry,
    #[n(12)]
    version: u64, // bumped on every committed change
}

/// Listing view of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: String,
    pub document_number: String,
    pub document_type: DocumentType,
    pub title: String,
    pub drafter_id: String,
    pub draft_date: TimeStamp<Utc>,
    pub status: DocumentStatus,
    pub current_approver_id: Option<String>,
}

/// Result surface of a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub status: DocumentStatus,
    pub current_approver_id: Option<String>,
}

impl Document {
    /// A fresh PENDING document. The number is filled in when it is allocated.
    pub(crate) fn from_draft(id: String, draft: &FinalisedDraft, draft_date: TimeStamp<Utc>) -> Self {
        Self {
            id,
            document_type: draft.document_type,
            document_number: String::new(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            drafter_id: draft.drafter_id.clone(),
            department_id: draft.department_id.clone(),
            draft_date,
            status: DocumentStatus::Pending,
            body_ref: draft.body_ref.clone(),
            line: draft.line.clone(),
            participants: draft.participants.clone(),
            version: 0,
        }
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn line(&self) -> &ApprovalLine {
        &self.line
    }

    pub fn participants(&self) -> &ParticipantRegistry {
        &self.participants
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn current_approver(&self) -> Option<&str> {
        if self.is_terminal() {
            return None;
        }
        self.line.current_approver()
    }

    pub fn outcome(&self) -> DecisionOutcome {
        DecisionOutcome {
            status: self.status,
            current_approver_id: self.current_approver().map(str::to_string),
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            document_number: self.document_number.clone(),
            document_type: self.document_type,
            title: self.title.clone(),
            drafter_id: self.drafter_id.clone(),
            draft_date: self.draft_date.clone(),
            status: self.status,
            current_approver_id: self.current_approver().map(str::to_string),
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ApprovalError> {
        if self.is_terminal() {
            return Err(ApprovalError::AlreadyFinalized {
                document_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Run a decision through the line and derive the document status from it.
    pub(crate) fn apply_decision(
        &mut self,
        user_id: &str,
        decision: Decision,
        comment: Option<String>,
        now: TimeStamp<Utc>,
    ) -> Result<Transition, ApprovalError> {
        self.ensure_open()?;

        let transition = self
            .line
            .decide(user_id, decision, comment, now)
            .map_err(|err| ApprovalError::from_step(&self.id, err))?;

        self.status = match transition {
            Transition::Advanced { .. } => DocumentStatus::Pending,
            Transition::Completed { .. } => DocumentStatus::Approved,
            Transition::Rejected { .. } => DocumentStatus::Rejected,
        };
        self.version += 1;

        Ok(transition)
    }

    /// Edit-flow participant additions; only allowed before the first decision.
    pub(crate) fn add_participants(
        &mut self,
        participants: Vec<Participant>,
    ) -> Result<Vec<Participant>, ApprovalError> {
        if self.is_terminal() || self.line.has_decisions() {
            return Err(ApprovalError::ParticipantsLocked(self.id.clone()));
        }
        let added = self.participants.extend(participants)?;
        if !added.is_empty() {
            self.version += 1;
        }
        Ok(added)
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, ApprovalError> {
        Ok(minicbor::to_vec(self)?)
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, ApprovalError> {
        Ok(minicbor::decode(bytes)?)
    }
}
