//! Races on the same step and on the same number key.
//!
//! Each scenario starts its threads behind a barrier so the calls overlap as
//! much as the scheduler allows. Whatever the interleaving, exactly one writer
//! may win.

use approval_routing::{
    ApprovalError, ApprovalProcessor, Decision, DocumentType, DraftDocument,
    directory::StaticDirectory, events::MemorySink,
};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn processor(db: Arc<sled::Db>) -> anyhow::Result<ApprovalProcessor> {
    let directory = StaticDirectory::new().with_department("dept", "DEPT");
    Ok(ApprovalProcessor::new(db, Arc::new(directory))?.with_sink(Arc::new(MemorySink::new())))
}

fn draft(approvers: &[&str]) -> DraftDocument {
    DraftDocument::new()
        .set_drafter("drafter")
        .set_department("dept")
        .set_document_type(DocumentType::CarFuel)
        .set_title("Fuel")
        .set_approvers(approvers)
}

fn race(
    processor: &Arc<ApprovalProcessor>,
    document_id: &str,
    calls: Vec<(&'static str, Decision)>,
) -> Vec<Result<(), ApprovalError>> {
    let barrier = Arc::new(Barrier::new(calls.len()));
    thread::scope(|scope| {
        let handles: Vec<_> = calls
            .into_iter()
            .map(|(user, decision)| {
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    processor
                        .decide(document_id, user, decision, Some("race".to_string()))
                        .map(|_| ())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("decider panicked"))
            .collect()
    })
}

fn is_lost_race(err: &ApprovalError) -> bool {
    matches!(
        err,
        ApprovalError::AlreadyProcessed { .. } | ApprovalError::AlreadyFinalized { .. }
    )
}

#[test]
fn duplicate_decisions_have_exactly_one_winner() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("duplicates.db"))?);
    let processor = Arc::new(processor(db)?);

    for _ in 0..20 {
        let doc = processor.submit(draft(&["A", "B"]))?;

        let results = race(
            &processor,
            &doc.id,
            vec![("A", Decision::Approve), ("A", Decision::Approve)],
        );

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "results: {results:?}");
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(is_lost_race));

        let stored = processor.document(&doc.id)?;
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.current_approver(), Some("B"));
        assert!(stored.line().is_well_formed());
    }
    Ok(())
}

#[test]
fn approve_and_reject_race_on_the_last_step() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("approve_reject.db"))?);
    let processor = Arc::new(processor(db)?);

    for _ in 0..20 {
        let doc = processor.submit(draft(&["A"]))?;

        let results = race(
            &processor,
            &doc.id,
            vec![("A", Decision::Approve), ("A", Decision::Reject)],
        );

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(is_lost_race));

        let stored = processor.document(&doc.id)?;
        assert!(stored.is_terminal());
        assert_eq!(stored.version(), 1);
        assert!(stored.line().is_well_formed());
    }
    Ok(())
}

#[test]
fn concurrent_numbering_never_repeats() -> anyhow::Result<()> {
    let db = sled::Config::new().temporary(true).open()?;
    let generator = Arc::new(approval_routing::numbering::DocumentNumberGenerator::new(
        db.open_tree("counters")?,
    ));
    let date = NaiveDate::from_ymd_opt(2025, 4, 7).expect("valid date");
    let threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let numbers: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let generator = generator.clone();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    (0..per_thread)
                        .map(|_| generator.generate("FORM", "DEPT", date))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("generator panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?
    .into_iter()
    .flatten()
    .collect();

    let unique: HashSet<_> = numbers.iter().collect();
    assert_eq!(unique.len(), threads * per_thread);
    assert!(unique.contains(&"FORM DEPT 20250407-1".to_string()));
    assert!(unique.contains(&format!("FORM DEPT 20250407-{}", threads * per_thread)));
    Ok(())
}

#[test]
fn concurrent_submissions_get_distinct_numbers() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("submissions.db"))?);
    let processor = Arc::new(processor(db)?);
    let submitters = 10;
    let barrier = Arc::new(Barrier::new(submitters));

    let numbers: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..submitters)
            .map(|_| {
                let processor = processor.clone();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    processor.submit(draft(&["A"])).map(|d| d.document_number)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("submitter panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let unique: HashSet<_> = numbers.iter().collect();
    assert_eq!(unique.len(), submitters);
    assert!(numbers.iter().all(|n| n.starts_with("FUEL DEPT ")));
    Ok(())
}
