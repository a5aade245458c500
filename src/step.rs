//! State machine for a single position in an approval line
use super::clock::TimeStamp;
use chrono::Utc;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum StepStatus {
    #[n(0)]
    Waiting,
    #[n(1)]
    Pending,
    #[n(2)]
    Approved,
    #[n(3)]
    Rejected,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Approved | StepStatus::Rejected)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Waiting => "WAITING",
            StepStatus::Pending => "PENDING",
            StepStatus::Approved => "APPROVED",
            StepStatus::Rejected => "REJECTED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Activate,
    Approve,
    Reject,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepAction::Activate => "activate",
            StepAction::Approve => "approve",
            StepAction::Reject => "reject",
        };
        f.write_str(label)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("step {sequence} cannot {action} while {from}")]
    InvalidTransition {
        sequence: u32,
        from: StepStatus,
        action: StepAction,
    },
    #[error("user {user_id} is not the approver of step {sequence}")]
    NotAuthorized { sequence: u32, user_id: String },
    #[error("step {sequence} is already {status}")]
    AlreadyProcessed { sequence: u32, status: StepStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ApprovalStep {
    #[n(0)]
    pub sequence: u32, // 1-based
    #[n(1)]
    pub approver_id: String,
    #[n(2)]
    pub status: StepStatus,
    #[n(3)]
    pub comment: Option<String>,
    #[n(4)]
    pub processed_at: Option<TimeStamp<Utc>>, // set once, when leaving PENDING
}

impl ApprovalStep {
    pub fn new(sequence: u32, approver_id: String) -> Self {
        Self {
            sequence,
            approver_id,
            status: StepStatus::Waiting,
            comment: None,
            processed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// WAITING -> PENDING. Which step may be activated is decided by the line.
    pub fn activate(&mut self) -> Result<(), StepError> {
        if self.status != StepStatus::Waiting {
            return Err(StepError::InvalidTransition {
                sequence: self.sequence,
                from: self.status,
                action: StepAction::Activate,
            });
        }
        self.status = StepStatus::Pending;
        Ok(())
    }

    pub fn approve(
        &mut self,
        by_user_id: &str,
        comment: Option<String>,
        now: TimeStamp<Utc>,
    ) -> Result<(), StepError> {
        self.conclude(by_user_id, StepAction::Approve, comment, now)
    }

    pub fn reject(
        &mut self,
        by_user_id: &str,
        comment: Option<String>,
        now: TimeStamp<Utc>,
    ) -> Result<(), StepError> {
        self.conclude(by_user_id, StepAction::Reject, comment, now)
    }

    fn conclude(
        &mut self,
        by_user_id: &str,
        action: StepAction,
        comment: Option<String>,
        now: TimeStamp<Utc>,
    ) -> Result<(), StepError> {
        if self.is_terminal() {
            return Err(StepError::AlreadyProcessed {
                sequence: self.sequence,
                status: self.status,
            });
        }
        if by_user_id != self.approver_id {
            return Err(StepError::NotAuthorized {
                sequence: self.sequence,
                user_id: by_user_id.to_string(),
            });
        }
        if self.status != StepStatus::Pending {
            return Err(StepError::InvalidTransition {
                sequence: self.sequence,
                from: self.status,
                action,
            });
        }

        self.status = match action {
            StepAction::Reject => StepStatus::Rejected,
            _ => StepStatus::Approved,
        };
        self.comment = comment;
        self.processed_at = Some(now);
        Ok(())
    }
}
