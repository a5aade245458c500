//! Human readable document numbers: `"<form> <department> <YYYYMMDD>-<seq>"`
//!
//! The sequence is kept per (form, department, day) in its own sled tree. During
//! submission the increment runs inside the same transaction that writes the
//! document, so a number is only consumed when a document is stored.
use super::error::ApprovalError;
use chrono::NaiveDate;
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};

pub struct DocumentNumberGenerator {
    counters: sled::Tree,
}

impl DocumentNumberGenerator {
    pub fn new(counters: sled::Tree) -> Self {
        Self { counters }
    }

    /// Issue the next number for the key with an atomic increment.
    pub fn generate(
        &self,
        form_name: &str,
        department_name: &str,
        date: NaiveDate,
    ) -> Result<String, ApprovalError> {
        let key = sequence_key(form_name, department_name, date);
        let updated = self.counters.update_and_fetch(key.as_bytes(), increment)?;
        let seq = decode_counter(updated.as_deref());

        tracing::debug!(form = form_name, department = department_name, seq, "issued document number");
        Ok(format_number(form_name, department_name, date, seq))
    }

    /// Issue the next number inside an open transaction on the counters tree.
    pub fn allocate(
        counters: &TransactionalTree,
        form_name: &str,
        department_name: &str,
        date: NaiveDate,
    ) -> ConflictableTransactionResult<String, ApprovalError> {
        let key = sequence_key(form_name, department_name, date);
        let seq = decode_counter(counters.get(key.as_bytes())?.as_deref()) + 1;
        counters.insert(key.as_bytes(), &seq.to_be_bytes()[..])?;

        Ok(format_number(form_name, department_name, date, seq))
    }

    /// The last sequence issued for the key, 0 when none was.
    pub fn last_issued(
        &self,
        form_name: &str,
        department_name: &str,
        date: NaiveDate,
    ) -> Result<u64, ApprovalError> {
        let key = sequence_key(form_name, department_name, date);
        Ok(decode_counter(self.counters.get(key.as_bytes())?.as_deref()))
    }
}

pub fn format_number(form_name: &str, department_name: &str, date: NaiveDate, seq: u64) -> String {
    format!("{form_name} {department_name} {}-{seq}", date.format("%Y%m%d"))
}

fn sequence_key(form_name: &str, department_name: &str, date: NaiveDate) -> String {
    format!("{form_name}\u{0}{department_name}\u{0}{}", date.format("%Y%m%d"))
}

fn decode_counter(bytes: Option<&[u8]>) -> u64 {
    bytes
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0)
}

fn increment(old: Option<&[u8]>) -> Option<Vec<u8>> {
    let next = decode_counter(old) + 1;
    Some(next.to_be_bytes().to_vec())
}
