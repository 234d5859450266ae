//! Rule/tape identifier helpers and emulator entropy derivation.

use sha2::{Digest, Sha256};

use crate::abi::keccak256;

pub const RULE_ID_BYTES: usize = 20;
pub const TRUNCATED_TAPE_ID_BYTES: usize = 12;

fn strip_0x(value: &str) -> &str {
    value.strip_prefix("0x").unwrap_or(value)
}

fn hex_prefix(value: &str, bytes: usize) -> &str {
    let raw = strip_0x(value);
    let end = raw.len().min(2 * bytes);
    raw.get(..end).unwrap_or(raw)
}

/// Leading 20 bytes of a rule id, as hex without prefix.
pub fn rule_id_from_bytes(id: &str) -> &str {
    hex_prefix(id, RULE_ID_BYTES)
}

pub fn truncate_tape_hash(id: &str) -> &str {
    hex_prefix(id, TRUNCATED_TAPE_ID_BYTES)
}

/// Rule id widened to a 0x-prefixed bytes32 by right-padding with zeros.
pub fn format_rule_id_to_bytes(id: &str) -> String {
    format!(
        "0x{}{}",
        rule_id_from_bytes(id),
        "0".repeat(2 * (32 - RULE_ID_BYTES))
    )
}

/// Tape id: rule id (20 bytes) followed by the first 12 bytes of keccak256(log).
pub fn calculate_tape_id(rule_id: &str, log: &[u8]) -> String {
    let digest = hex::encode(keccak256(log));
    format!("{}{}", rule_id_from_bytes(rule_id), truncate_tape_hash(&digest))
}

/// Per-player emulator entropy: sha256 over the address bytes followed by the
/// rule id bytes. Empty when either input is malformed.
pub fn generate_entropy(user_address: &str, rule_id: &str) -> String {
    let Some(address_hex) = user_address.strip_prefix("0x") else {
        return String::new();
    };
    if user_address.len() != 42 || rule_id.len() != 2 * RULE_ID_BYTES {
        return String::new();
    }
    let (Ok(address), Ok(rule)) = (hex::decode(address_hex), hex::decode(rule_id)) else {
        return String::new();
    };

    let mut hasher = Sha256::new();
    hasher.update(address);
    hasher.update(rule);
    hex::encode(hasher.finalize())
}
