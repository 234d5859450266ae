use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CartridgeId, RuleId, WalletAddress};

pub const INSPECT_ACCEPTED: &str = "Accepted";

/// Envelope returned by the rollups node inspect endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectResponse {
    pub status: String,
    #[serde(default)]
    pub reports: Vec<InspectReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InspectResponse {
    /// First report payload of an accepted response, if any.
    pub fn first_payload(&self) -> Option<&str> {
        if self.status != INSPECT_ACCEPTED {
            return None;
        }
        self.reports.first().map(|report| report.payload.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectReport {
    /// 0x-prefixed hex of a UTF-8 JSON document.
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapeInfo {
    pub id: String,
    pub cartridge_id: CartridgeId,
    pub rule_id: RuleId,
    pub user_address: WalletAddress,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// One verified score notice as returned by the tag-keyed indexer query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default, rename = "_msgSender", skip_serializing_if = "Option::is_none")]
    pub msg_sender: Option<String>,
    #[serde(default, rename = "_timestamp")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address: Option<WalletAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tape_id: Option<String>,
    pub score: i64,
}

impl LeaderboardEntry {
    /// `0x1234...abcd` style short form of the player address.
    pub fn short_address(&self) -> String {
        let Some(address) = self.user_address.as_ref().map(WalletAddress::as_str) else {
            return String::new();
        };
        let head = address.get(..6);
        let tail = address.len().checked_sub(4).and_then(|start| address.get(start..));
        match (head, tail) {
            (Some(head), Some(tail)) if address.len() > 10 => format!("{head}...{tail}"),
            _ => address.to_string(),
        }
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

/// Parameters of the external verification call, all byte fields 0x-hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPayload {
    pub rule_id: String,
    pub outcard_hash: String,
    pub tape: String,
    pub claimed_score: i64,
    pub tapes: Vec<String>,
    pub in_card: String,
}

/// Formats a unix timestamp as `Mon/DD/YYYY, HH:MM:SS UTC`.
pub fn format_timestamp_utc(seconds: i64) -> Option<String> {
    let date = Utc.timestamp_opt(seconds, 0).single()?;
    Some(date.format("%b/%d/%Y, %H:%M:%S UTC").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_payload_requires_accepted_status() {
        let rejected = InspectResponse {
            status: "Rejected".into(),
            reports: vec![InspectReport {
                payload: "0x7b7d".into(),
            }],
            message: None,
        };
        assert!(rejected.first_payload().is_none());

        let empty = InspectResponse {
            status: INSPECT_ACCEPTED.into(),
            reports: Vec::new(),
            message: None,
        };
        assert!(empty.first_payload().is_none());
    }

    #[test]
    fn leaderboard_entry_decodes_indexer_fields() {
        let entry: LeaderboardEntry = serde_json::from_str(
            r#"{"_msgSender":"0xabc","_timestamp":1700000000,"user_address":"0x1234567890abcdef1234567890abcdef12345678","score":42}"#,
        )
        .expect("decode entry");
        assert_eq!(entry.score, 42);
        assert_eq!(entry.short_address(), "0x1234...5678");
    }

    #[test]
    fn short_address_keeps_unsliceable_addresses_whole() {
        let entry = |address: &str| LeaderboardEntry {
            msg_sender: None,
            timestamp: 0,
            user_address: Some(WalletAddress::new(address)),
            tape_id: None,
            score: 1,
        };
        assert_eq!(entry("0x123é4567890abcdef").short_address(), "0x123é4567890abcdef");
        assert_eq!(entry("0xabcdef123456é789").short_address(), "0xabcdef123456é789");
        assert_eq!(entry("0xabc").short_address(), "0xabc");
        assert_eq!(entry("0xé234567890abcdef").short_address(), "0xé23...cdef");
    }

    #[test]
    fn formats_timestamp_in_utc() {
        assert_eq!(
            format_timestamp_utc(0).as_deref(),
            Some("Jan/01/1970, 00:00:00 UTC")
        );
    }
}
