//! Smoke Screen Unit tests for the approval routing components
//!
//! These test are unit tests that span the codebase, testing behavior in
//! isolation from integration scenarios. These are intended as smoke-screen
//! and generally test the happy-path.
//!

use approval_routing::{
    DocumentStatus, DocumentType, DraftDocument, ValidationError,
    clock::{ClockSource, FixedClock, SystemClock, TimeStamp},
    config::EngineConfig,
    directory::{DepartmentDirectory, StaticDirectory},
    events::{ApprovalEvent, EventSink, MemorySink, TracingSink},
    line::LinePolicy,
    participant::{Participant, ParticipantType},
    utils::{index_key, index_prefix, new_uuid_to_bech32, normalise_comment},
};
use chrono::{Datelike, Utc};

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Test that new_uuid_to_bech32 generates valid bech32-encoded strings
    /// with the correct human-readable prefix
    #[test]
    fn generates_valid_bech32_with_hrp() {
        let encoded = new_uuid_to_bech32("doc_").unwrap();

        assert!(encoded.starts_with("doc_1"));
        assert!(encoded.len() > 10);
    }

    /// Test that the function handles empty strings appropriately
    #[test]
    fn handles_empty_hrp() {
        assert!(new_uuid_to_bech32("").is_err());
    }

    /// Test that multiple calls generate unique identifiers
    #[test]
    fn generates_unique_ids() {
        let id1 = new_uuid_to_bech32("doc_").unwrap();
        let id2 = new_uuid_to_bech32("doc_").unwrap();

        assert_ne!(id1, id2);
    }

    /// Index keys of one owner share a prefix no other owner matches
    #[test]
    fn index_keys_are_prefix_scoped() {
        let key = index_key("user_a", "doc_1xyz");

        assert!(key.starts_with(&index_prefix("user_a")));
        // "user_a" must not match "user_ab"'s entries
        assert!(!index_key("user_ab", "doc_1xyz").starts_with(&index_prefix("user_a")));
    }

    #[test]
    fn blank_comments_become_none() {
        assert_eq!(normalise_comment(Some("  ".into())), None);
        assert_eq!(normalise_comment(None), None);
        assert_eq!(
            normalise_comment(Some(" missing receipt ".into())),
            Some("missing receipt".to_string())
        );
    }
}

// CLOCK MODULE TESTS
#[cfg(test)]
mod clock_tests {
    use super::*;

    /// Test that the system clock reports the current time
    #[test]
    fn system_clock_is_current() {
        let ts = SystemClock.now();
        let diff = (Utc::now() - ts.to_datetime_utc()).num_seconds().abs();
        assert!(diff < 1);
    }

    /// Test that TimeStamp can be created with specific date/time values
    #[test]
    fn timestamp_new_with_creates_specific_time() {
        let ts = TimeStamp::new_with(2024, 6, 15, 10, 30, 0).unwrap();
        let dt = ts.to_datetime_utc();

        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 6);
        assert_eq!(dt.day(), 15);
    }

    #[test]
    fn fixed_clock_can_be_moved() {
        let clock = FixedClock::new(TimeStamp::new_with(2025, 4, 7, 0, 0, 0).unwrap());
        clock.set(TimeStamp::new_with(2025, 12, 31, 23, 59, 59).unwrap());

        assert_eq!(clock.now().to_datetime_utc().month(), 12);
    }
}

// DOCUMENT MODULE TESTS
#[cfg(test)]
mod document_tests {
    use super::*;

    fn complete_draft() -> DraftDocument {
        DraftDocument::new()
            .set_drafter("drafter")
            .set_department("dept")
            .set_document_type(DocumentType::OverseasTrip)
            .set_title("Conference settlement")
            .set_body(b"receipts".to_vec())
            .add_approver("A")
            .add_approver("B")
            .add_participant(Participant::reference("R"))
    }

    /// Test that a complete draft finalises and builds its line
    #[test]
    fn complete_draft_finalises() {
        let draft = complete_draft()
            .validate_and_finalise(LinePolicy::default())
            .unwrap();

        assert_eq!(draft.line.len(), 2);
        assert_eq!(draft.line.current_approver(), Some("A"));
        assert_eq!(draft.participants.len(), 1);
        assert_eq!(draft.body_ref, sha256::digest(&b"receipts".to_vec()));
    }

    /// Test each missing field is reported by name
    #[test]
    fn missing_fields_are_reported() {
        let no_title = DraftDocument::new()
            .set_drafter("drafter")
            .set_department("dept")
            .set_document_type(DocumentType::Leave)
            .add_approver("A");
        assert_eq!(
            no_title.validate_and_finalise(LinePolicy::default()).unwrap_err(),
            ValidationError::MissingField("title")
        );

        let no_type = DraftDocument::new()
            .set_drafter("drafter")
            .set_department("dept")
            .set_title("t")
            .add_approver("A");
        assert_eq!(
            no_type.validate_and_finalise(LinePolicy::default()).unwrap_err(),
            ValidationError::MissingField("document type")
        );

        let no_department = DraftDocument::new()
            .set_drafter("drafter")
            .set_document_type(DocumentType::Leave)
            .set_title("t")
            .add_approver("A");
        assert_eq!(
            no_department.validate_and_finalise(LinePolicy::default()).unwrap_err(),
            ValidationError::MissingField("department id")
        );
    }

    #[test]
    fn approver_limit_is_enforced() {
        let policy = LinePolicy {
            max_approvers: 1,
            allow_self_approval: true,
        };
        assert_eq!(
            complete_draft().validate_and_finalise(policy).unwrap_err(),
            ValidationError::TooManyApprovers { max: 1, got: 2 }
        );
    }

    #[test]
    fn form_names_and_tags() {
        assert_eq!(DocumentType::ExpenseDraft.form_name(), "EXPENSE");
        assert_eq!(DocumentType::ExpenseDraft.to_string(), "EXPENSE_DRAFT");
        assert_eq!(DocumentType::CarFuel.to_string(), "CAR_FUEL");
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!DocumentStatus::Pending.is_terminal());
        assert!(DocumentStatus::Approved.is_terminal());
        assert!(DocumentStatus::Rejected.is_terminal());
    }
}

// PARTICIPANT MODULE TESTS
#[cfg(test)]
mod participant_tests {
    use super::*;
    use approval_routing::participant::ParticipantRegistry;

    #[test]
    fn extend_returns_only_new_entries() {
        let mut registry = ParticipantRegistry::new();
        registry.add(Participant::reference("R")).unwrap();

        let added = registry
            .extend(vec![Participant::reference("R"), Participant::receive("CC")])
            .unwrap();

        assert_eq!(added, vec![Participant::receive("CC")]);
        assert!(registry.contains_user("CC"));
        assert_eq!(registry.of_type(ParticipantType::Reference).count(), 1);
    }
}

// COLLABORATOR TESTS
#[cfg(test)]
mod collaborator_tests {
    use super::*;

    #[test]
    fn static_directory_resolves_known_departments() {
        let directory = StaticDirectory::new().with_department("d1", "Finance");

        assert_eq!(directory.name_of("d1").unwrap(), "Finance");
        assert!(directory.name_of("d2").is_err());
    }

    #[test]
    fn memory_sink_keeps_publish_order() {
        let sink = MemorySink::new();
        let approved = ApprovalEvent::Approved {
            document_id: "doc_a".into(),
        };
        let advanced = ApprovalEvent::StepAdvanced {
            document_id: "doc_b".into(),
            sequence: 2,
            new_approver_id: "B".into(),
        };

        sink.publish(&approved).unwrap();
        sink.publish(&advanced).unwrap();

        assert_eq!(sink.events(), vec![approved.clone(), advanced]);
        assert_eq!(sink.for_document("doc_a"), vec![approved]);
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let event = ApprovalEvent::Rejected {
            document_id: "doc_a".into(),
            sequence: 1,
            comment: Some("no".into()),
        };
        assert!(TracingSink.publish(&event).is_ok());
    }

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.line_policy().max_approvers, 16);
    }
}
