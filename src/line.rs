//! The ordered approval line of a document and the rules that move it forward
use super::clock::TimeStamp;
use super::error::ValidationError;
use super::step::{ApprovalStep, StepAction, StepError, StepStatus};
use chrono::Utc;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

/// What a single decision did to the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The decided step was approved and the next one is now current.
    Advanced {
        sequence: u32,
        next_sequence: u32,
        next_approver_id: String,
    },
    /// The last step was approved.
    Completed { sequence: u32 },
    Rejected {
        sequence: u32,
        comment: Option<String>,
    },
}

impl Transition {
    pub fn sequence(&self) -> u32 {
        match self {
            Transition::Advanced { sequence, .. }
            | Transition::Completed { sequence }
            | Transition::Rejected { sequence, .. } => *sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ApprovalLine {
    #[n(0)]
    steps: Vec<ApprovalStep>,
}

/// Limits applied while building a line.
#[derive(Debug, Clone, Copy)]
pub struct LinePolicy {
    pub max_approvers: usize,
    pub allow_self_approval: bool,
}

impl Default for LinePolicy {
    fn default() -> Self {
        Self {
            max_approvers: usize::MAX,
            allow_self_approval: true,
        }
    }
}

impl ApprovalLine {
    /// Materialize steps 1..N in input order, with step 1 already PENDING.
    pub fn build(
        drafter_id: &str,
        approver_ids: &[String],
        policy: LinePolicy,
    ) -> Result<Self, ValidationError> {
        if drafter_id.trim().is_empty() {
            return Err(ValidationError::MissingField("drafter id"));
        }
        if approver_ids.is_empty() {
            return Err(ValidationError::EmptyApprovalLine);
        }
        if approver_ids.len() > policy.max_approvers {
            return Err(ValidationError::TooManyApprovers {
                max: policy.max_approvers,
                got: approver_ids.len(),
            });
        }

        let mut seen = HashSet::new();
        for approver in approver_ids {
            if approver.trim().is_empty() {
                return Err(ValidationError::MissingField("approver id"));
            }
            if !policy.allow_self_approval && approver == drafter_id {
                return Err(ValidationError::SelfApproval(approver.clone()));
            }
            if !seen.insert(approver.as_str()) {
                return Err(ValidationError::DuplicateApprover(approver.clone()));
            }
        }

        let mut steps: Vec<ApprovalStep> = approver_ids
            .iter()
            .zip(1u32..)
            .map(|(approver, sequence)| ApprovalStep::new(sequence, approver.clone()))
            .collect();

        let activated = steps.first_mut().map(ApprovalStep::activate);
        debug_assert!(matches!(activated, Some(Ok(()))));

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ApprovalStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The unique PENDING step, if the line is still running.
    pub fn current(&self) -> Option<&ApprovalStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Pending)
    }

    pub fn current_approver(&self) -> Option<&str> {
        self.current().map(|s| s.approver_id.as_str())
    }

    pub fn is_approved(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Approved)
    }

    pub fn is_rejected(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Rejected)
    }

    /// True once any step has left PENDING for a terminal state.
    pub fn has_decisions(&self) -> bool {
        self.steps.iter().any(|s| s.is_terminal())
    }

    /// The step the given user already decided, if any.
    pub fn processed_by(&self, user_id: &str) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .find(|s| s.approver_id == user_id && s.is_terminal())
    }

    fn last_processed(&self) -> Option<&ApprovalStep> {
        self.steps.iter().rev().find(|s| s.is_terminal())
    }

    /// Confirm it is `user_id`'s turn and return the current step.
    pub fn check_turn(&self, user_id: &str) -> Result<&ApprovalStep, StepError> {
        let Some(current) = self.current() else {
            return Err(match self.last_processed() {
                Some(step) => StepError::AlreadyProcessed {
                    sequence: step.sequence,
                    status: step.status,
                },
                // corrupt record: nothing decided and nothing PENDING
                None => StepError::InvalidTransition {
                    sequence: self.steps.first().map_or(1, |s| s.sequence),
                    from: StepStatus::Waiting,
                    action: StepAction::Approve,
                },
            });
        };

        if current.approver_id != user_id {
            // a repeated click from someone whose step is already behind us
            if let Some(mine) = self.processed_by(user_id) {
                return Err(StepError::AlreadyProcessed {
                    sequence: mine.sequence,
                    status: mine.status,
                });
            }
            return Err(StepError::NotAuthorized {
                sequence: current.sequence,
                user_id: user_id.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply a decision to the current step and move the line accordingly.
    pub fn decide(
        &mut self,
        user_id: &str,
        decision: Decision,
        comment: Option<String>,
        now: TimeStamp<Utc>,
    ) -> Result<Transition, StepError> {
        let index = self.check_turn(user_id)?.sequence as usize - 1;
        let step = &mut self.steps[index];

        match decision {
            Decision::Reject => {
                step.reject(user_id, comment.clone(), now)?;
                Ok(Transition::Rejected {
                    sequence: step.sequence,
                    comment,
                })
            }
            Decision::Approve => {
                step.approve(user_id, comment, now)?;
                let sequence = step.sequence;
                match self.advance()? {
                    Some(next) => Ok(Transition::Advanced {
                        sequence,
                        next_sequence: next.sequence,
                        next_approver_id: next.approver_id.clone(),
                    }),
                    None => Ok(Transition::Completed { sequence }),
                }
            }
        }
    }

    /// Activate the step right after the last APPROVED one.
    fn advance(&mut self) -> Result<Option<&ApprovalStep>, StepError> {
        if self.is_rejected() {
            return Ok(None);
        }
        let next = self
            .steps
            .iter()
            .position(|s| s.status != StepStatus::Approved);

        match next {
            Some(index) => {
                self.steps[index].activate()?;
                Ok(Some(&self.steps[index]))
            }
            None => Ok(None),
        }
    }

    /// Checks the single-current-step shape of the line.
    pub fn is_well_formed(&self) -> bool {
        let numbered = self
            .steps
            .iter()
            .zip(1u32..)
            .all(|(s, expected)| s.sequence == expected);
        if !numbered || self.steps.is_empty() {
            return false;
        }

        if let Some(rejected) = self
            .steps
            .iter()
            .position(|s| s.status == StepStatus::Rejected)
        {
            let (before, after) = self.steps.split_at(rejected);
            return before.iter().all(|s| s.status == StepStatus::Approved)
                && after[1..].iter().all(|s| s.status == StepStatus::Waiting);
        }

        match self
            .steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
        {
            Some(current) => {
                let (before, after) = self.steps.split_at(current);
                before.iter().all(|s| s.status == StepStatus::Approved)
                    && after[1..].iter().all(|s| s.status == StepStatus::Waiting)
            }
            None => self.is_approved(),
        }
    }
}
