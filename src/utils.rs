//! Identifier and key helpers

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Secondary index key: `<owner>\0<document id>`.
pub fn index_key(owner_id: &str, document_id: &str) -> Vec<u8> {
    let mut key = index_prefix(owner_id);
    key.extend_from_slice(document_id.as_bytes());
    key
}

pub fn index_prefix(owner_id: &str) -> Vec<u8> {
    let mut prefix = owner_id.as_bytes().to_vec();
    prefix.push(0);
    prefix
}

/// Trim a free-text comment, treating blank input as no comment.
pub fn normalise_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
