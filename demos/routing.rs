//! Walks one expense draft through a three step approval line against a
//! throwaway sled database, logging every event.
//!
//! RUST_LOG=debug cargo run --example routing

use approval_routing::{
    ApprovalProcessor, DocumentType, DraftDocument,
    config::EngineConfig,
    directory::StaticDirectory,
    participant::Participant,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_toml_str(
        r#"
        require_reject_comment = true
        max_approvers = 5
        "#,
    )?;

    let db = Arc::new(sled::Config::new().temporary(true).open()?);
    let directory = StaticDirectory::new().with_department("dept-fin", "Finance");
    let processor = ApprovalProcessor::new(db, Arc::new(directory))?.with_config(config);

    let draft = DraftDocument::new()
        .set_drafter("kim")
        .set_department("dept-fin")
        .set_document_type(DocumentType::ExpenseDraft)
        .set_title("Client dinner")
        .set_content("Dinner with the vendor team")
        .set_body(br#"{"amount":184000,"currency":"KRW"}"#.to_vec())
        .set_approvers(&["lee", "park", "choi"])
        .add_participant(Participant::receive("accounting"));

    let doc = processor.submit(draft)?;
    println!("{} submitted as {}", doc.id, doc.document_number);

    processor.approve(&doc.id, "lee", Some("ok".into()))?;
    processor.approve(&doc.id, "park", None)?;

    if let Err(err) = processor.reject(&doc.id, "park", "changed my mind") {
        println!("second click by park refused: {err}");
    }

    let doc = processor.approve(&doc.id, "choi", None)?;
    println!("final status: {}", doc.status());

    for step in processor.approval_line(&doc.id)? {
        println!(
            "  {}. {:<6} {:<9} {}",
            step.sequence,
            step.approver_id,
            step.status,
            step.comment.unwrap_or_default()
        );
    }

    processor.flush()?;
    Ok(())
}
