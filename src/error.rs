use super::document::DocumentStatus;
use super::step::{StepAction, StepError, StepStatus};
use sled::transaction::TransactionError;

/// Input problems caught before any state changes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("approval line must contain at least one approver")]
    EmptyApprovalLine,
    #[error("approver {0} appears more than once in the approval line")]
    DuplicateApprover(String),
    #[error("approval line has {got} approvers, the limit is {max}")]
    TooManyApprovers { max: usize, got: usize },
    #[error("drafter {0} cannot approve their own document")]
    SelfApproval(String),
    #[error("a comment is required when rejecting")]
    BlankRejectComment,
    #[error("{0} is not set")]
    MissingField(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum ApprovalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("user {user_id} may not act on step {sequence} of document {document_id}")]
    NotAuthorized {
        document_id: String,
        sequence: u32,
        user_id: String,
    },
    #[error("step {sequence} of document {document_id} has already been processed")]
    AlreadyProcessed { document_id: String, sequence: u32 },
    #[error("document {document_id} is already finalized ({status})")]
    AlreadyFinalized {
        document_id: String,
        status: DocumentStatus,
    },
    #[error("step {sequence} of document {document_id} cannot {action} while {from}")]
    InvalidTransition {
        document_id: String,
        sequence: u32,
        from: StepStatus,
        action: StepAction,
    },
    #[error("department {department_id} could not be resolved: {reason}")]
    DependencyUnavailable {
        department_id: String,
        reason: String,
    },
    #[error("document {0} does not exist")]
    NotFound(String),
    #[error("participants of document {0} can no longer be changed")]
    ParticipantsLocked(String),
    #[error("document {0} was modified concurrently, re-read it before retrying")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("encoding failure: {0}")]
    Encoding(String),
    #[error("identifier generation failed: {0}")]
    Identifier(String),
}

impl ApprovalError {
    /// Attach document context to a state-machine failure.
    pub fn from_step(document_id: &str, err: StepError) -> Self {
        let document_id = document_id.to_string();
        match err {
            StepError::InvalidTransition {
                sequence,
                from,
                action,
            } => Self::InvalidTransition {
                document_id,
                sequence,
                from,
                action,
            },
            StepError::NotAuthorized { sequence, user_id } => Self::NotAuthorized {
                document_id,
                sequence,
                user_id,
            },
            StepError::AlreadyProcessed { sequence, .. } => Self::AlreadyProcessed {
                document_id,
                sequence,
            },
        }
    }
}

impl From<TransactionError<ApprovalError>> for ApprovalError {
    fn from(value: TransactionError<ApprovalError>) -> Self {
        match value {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => ApprovalError::Storage(err),
        }
    }
}

impl<E: std::fmt::Debug> From<minicbor::encode::Error<E>> for ApprovalError {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        ApprovalError::Encoding(format!("{value:?}"))
    }
}

impl From<minicbor::decode::Error> for ApprovalError {
    fn from(value: minicbor::decode::Error) -> Self {
        ApprovalError::Encoding(value.to_string())
    }
}
