//! Electronic approval routing: documents submitted by a drafter pass an
//! ordered line of approvers before they are final.

pub mod clock;
pub mod config;
pub mod directory;
pub mod document;
pub mod error;
pub mod events;
pub mod line;
pub mod numbering;
pub mod participant;
pub mod processor;
pub mod step;
pub mod store;
pub mod utils;

pub use document::{DecisionOutcome, Document, DocumentStatus, DocumentSummary, DocumentType, DraftDocument};
pub use error::{ApprovalError, ValidationError};
pub use line::{ApprovalLine, Decision};
pub use processor::ApprovalProcessor;
pub use step::{ApprovalStep, StepStatus};
