//! sled persistence for documents, bodies, numbering counters and the
//! secondary indexes (approver inbox, drafter outbox, participants).
//!
//! Every write that touches a document goes through a multi-tree transaction so
//! the indexes can never disagree with the document record.
use super::document::{Document, FinalisedDraft};
use super::error::ApprovalError;
use super::numbering::DocumentNumberGenerator;
use super::utils::{index_key, index_prefix};
use sled::Transactional;
use sled::transaction::{ConflictableTransactionResult, abort};
use std::sync::Arc;

pub struct DocumentStore {
    instance: Arc<sled::Db>,
    documents: sled::Tree,
    counters: sled::Tree,
    bodies: sled::Tree,
    inbox: sled::Tree,          // current approver -> document
    drafts: sled::Tree,         // drafter -> document
    participations: sled::Tree, // participant -> document
}

impl DocumentStore {
    pub fn open(instance: Arc<sled::Db>) -> Result<Self, ApprovalError> {
        Ok(Self {
            documents: instance.open_tree("documents")?,
            counters: instance.open_tree("counters")?,
            bodies: instance.open_tree("bodies")?,
            inbox: instance.open_tree("inbox")?,
            drafts: instance.open_tree("drafts")?,
            participations: instance.open_tree("participations")?,
            instance,
        })
    }

    /// Number generator sharing this store's counters.
    pub fn numbering(&self) -> DocumentNumberGenerator {
        DocumentNumberGenerator::new(self.counters.clone())
    }

    pub fn load(&self, document_id: &str) -> Result<Document, ApprovalError> {
        match self.documents.get(document_id.as_bytes())? {
            Some(bytes) => Document::decode(&bytes),
            None => Err(ApprovalError::NotFound(document_id.to_string())),
        }
    }

    pub fn load_body(&self, body_ref: &str) -> Result<Vec<u8>, ApprovalError> {
        self.bodies
            .get(body_ref.as_bytes())?
            .map(|b| b.to_vec())
            .ok_or_else(|| ApprovalError::NotFound(body_ref.to_string()))
    }

    /// Allocate the document number and write everything belonging to a new
    /// document in a single transaction.
    pub fn insert_new(
        &self,
        mut document: Document,
        draft: &FinalisedDraft,
        department_name: &str,
    ) -> Result<Document, ApprovalError> {
        let form_name = document.document_type.form_name();
        let date = document.draft_date.date();

        let trees = (
            &self.counters,
            &self.documents,
            &self.bodies,
            &self.inbox,
            &self.drafts,
            &self.participations,
        );
        let number = trees.transaction(
            |(counters, documents, bodies, inbox, drafts, participations)| -> ConflictableTransactionResult<String, ApprovalError> {
                let number =
                    DocumentNumberGenerator::allocate(counters, form_name, department_name, date)?;

                let mut stored = document.clone();
                stored.document_number = number.clone();
                let encoded = match stored.encode() {
                    Ok(bytes) => bytes,
                    Err(err) => return abort(err),
                };

                if documents.get(stored.id.as_bytes())?.is_some() {
                    return abort(ApprovalError::Conflict(stored.id.clone()));
                }
                documents.insert(stored.id.as_bytes(), encoded)?;
                bodies.insert(stored.body_ref.as_bytes(), draft.body.clone())?;
                drafts.insert(index_key(&stored.drafter_id, &stored.id), stored.id.as_bytes())?;
                if let Some(approver) = stored.current_approver() {
                    inbox.insert(index_key(approver, &stored.id), stored.id.as_bytes())?;
                }
                for participant in stored.participants().iter() {
                    participations.insert(
                        index_key(&participant.user_id, &stored.id),
                        stored.id.as_bytes(),
                    )?;
                }
                Ok(number)
            },
        )?;

        document.document_number = number;
        Ok(document)
    }

    /// Read-modify-write of one document inside a transaction. `apply` runs on
    /// the stored record, so changes committed since the caller last read it
    /// are kept. `released` is the approver whose inbox entry this change drops.
    pub fn update<T>(
        &self,
        document_id: &str,
        released: Option<&str>,
        apply: impl Fn(&mut Document) -> Result<T, ApprovalError>,
    ) -> Result<(Document, T), ApprovalError> {
        let updated = (&self.documents, &self.inbox, &self.participations).transaction(
            |(documents, inbox, participations)| -> ConflictableTransactionResult<(Document, T), ApprovalError> {
                let stored = match documents.get(document_id.as_bytes())? {
                    Some(bytes) => Document::decode(&bytes),
                    None => Err(ApprovalError::NotFound(document_id.to_string())),
                };
                let mut document = match stored {
                    Ok(stored) => stored,
                    Err(err) => return abort(err),
                };
                let applied = match apply(&mut document) {
                    Ok(applied) => applied,
                    Err(err) => return abort(err),
                };
                let encoded = match document.encode() {
                    Ok(bytes) => bytes,
                    Err(err) => return abort(err),
                };

                documents.insert(document_id.as_bytes(), encoded)?;
                if let Some(released) = released {
                    inbox.remove(index_key(released, document_id))?;
                }
                if let Some(approver) = document.current_approver() {
                    inbox.insert(index_key(approver, document_id), document_id.as_bytes())?;
                }
                for participant in document.participants().iter() {
                    participations.insert(
                        index_key(&participant.user_id, document_id),
                        document_id.as_bytes(),
                    )?;
                }
                Ok((document, applied))
            },
        )?;

        Ok(updated)
    }

    pub fn pending_for(&self, approver_id: &str) -> Result<Vec<Document>, ApprovalError> {
        self.scan_index(&self.inbox, approver_id)
    }

    pub fn drafted_by(&self, drafter_id: &str) -> Result<Vec<Document>, ApprovalError> {
        self.scan_index(&self.drafts, drafter_id)
    }

    pub fn participating(&self, user_id: &str) -> Result<Vec<Document>, ApprovalError> {
        self.scan_index(&self.participations, user_id)
    }

    fn scan_index(&self, index: &sled::Tree, owner_id: &str) -> Result<Vec<Document>, ApprovalError> {
        let mut found = vec![];
        for entry in index.scan_prefix(index_prefix(owner_id)) {
            let (_, document_id) = entry?;
            let document_id = String::from_utf8_lossy(&document_id);
            found.push(self.load(&document_id)?);
        }
        Ok(found)
    }

    pub fn flush(&self) -> Result<(), ApprovalError> {
        self.instance.flush()?;
        Ok(())
    }
}
