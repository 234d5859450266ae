use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(RuleId);
id_newtype!(CartridgeId);
id_newtype!(WalletAddress);
id_newtype!(TxHash);

/// Contest configuration applied to a cartridge. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cartridge_id: CartridgeId,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_index: Option<i64>,
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub in_card: String,
    #[serde(default)]
    pub score_function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_tapes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_in_card: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tapes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

impl RuleInfo {
    /// Description shown on the help panel; the default rule has a fixed label.
    pub fn display_description(&self) -> &str {
        if self.name == "default" {
            "Standard Contest"
        } else {
            &self.description
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoCartridge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub links: Vec<String>,
}

/// Static metadata about a playable program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeInfo {
    pub id: CartridgeId,
    pub name: String,
    #[serde(default)]
    pub user_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoCartridge>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CartridgeInfo {
    pub fn description(&self) -> Option<&str> {
        self.info.as_ref()?.description.as_deref()
    }
}

/// Final structured output of a run plus its content hash (hex, no 0x prefix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcard {
    pub value: Vec<u8>,
    pub hash: String,
}

/// A finalized gameplay record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gameplay {
    pub cartridge_id: CartridgeId,
    pub log: Vec<u8>,
    pub outcard: Outcard,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    pub rule_id: RuleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tapes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_card: Option<Vec<u8>>,
}

impl Gameplay {
    pub fn claimed_score(&self) -> i64 {
        self.score.unwrap_or(0)
    }
}
