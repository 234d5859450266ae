use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{CartridgeId, CartridgeInfo, RuleId, RuleInfo},
    error::{ApiError, ErrorCode},
    protocol::{InspectResponse, LeaderboardEntry, Paged, TapeInfo},
};
use thiserror::Error;
use tracing::{debug, warn};

pub mod leaderboard;

pub use leaderboard::{LeaderboardPager, LeaderboardQuery, RankingCursor};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node payload is not valid hex: {0}")]
    PayloadHex(#[from] hex::FromHexError),
    #[error("node payload is not valid json: {0}")]
    PayloadJson(#[from] serde_json::Error),
    #[error("node rejected query: {0}")]
    Rejected(String),
}

impl NodeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NodeError::Transport(_) => ErrorCode::Transport,
            NodeError::PayloadHex(_) | NodeError::PayloadJson(_) => ErrorCode::Decode,
            NodeError::Rejected(_) => ErrorCode::Rejected,
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(value: NodeError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

/// Joins `base` and `path` with exactly one separating slash.
pub fn build_url(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{path}")
}

/// Read-only rule and cartridge metadata. `Ok(None)` means not found.
#[async_trait]
pub trait ContestSource: Send + Sync {
    async fn rule(&self, rule_id: &RuleId) -> Result<Option<RuleInfo>, NodeError>;
    async fn cartridge_info(
        &self,
        cartridge_id: &CartridgeId,
    ) -> Result<Option<CartridgeInfo>, NodeError>;
}

#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    async fn leaderboard_page(
        &self,
        query: &LeaderboardQuery,
        page: u32,
    ) -> Result<Paged<LeaderboardEntry>, NodeError>;
}

/// HTTP client for the rollups node inspect endpoint.
#[derive(Clone)]
pub struct NodeClient {
    http: Client,
    node_url: String,
}

impl NodeClient {
    pub fn new(node_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            node_url: node_url.into(),
        }
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    async fn inspect(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<InspectResponse, NodeError> {
        let url = build_url(&self.node_url, path);
        debug!(%url, "node: inspect");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    fn decode_payload<T: DeserializeOwned>(payload: &str) -> Result<T, NodeError> {
        let raw = hex::decode(payload.strip_prefix("0x").unwrap_or(payload))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Tapes submitted for a rule, best score first.
    pub async fn contest_tapes(
        &self,
        rule_id: &RuleId,
    ) -> Result<Option<Paged<TapeInfo>>, NodeError> {
        let response = self
            .inspect(
                "inspect/core/tapes",
                &[
                    ("rule_id", rule_id.to_string()),
                    ("order_by", "score".into()),
                    ("order_dir", "desc".into()),
                    ("full", "true".into()),
                ],
            )
            .await?;
        let Some(payload) = response.first_payload() else {
            warn!(
                rule_id = %rule_id,
                message = response.message.as_deref().unwrap_or_default(),
                "node: tapes query returned no report"
            );
            return Ok(None);
        };
        Self::decode_payload(payload).map(Some)
    }
}

#[async_trait]
impl ContestSource for NodeClient {
    async fn rule(&self, rule_id: &RuleId) -> Result<Option<RuleInfo>, NodeError> {
        let response = self
            .inspect("inspect/core/rules", &[("id", rule_id.to_string())])
            .await?;
        let Some(payload) = response.first_payload() else {
            return Ok(None);
        };
        let rules: Paged<RuleInfo> = Self::decode_payload(payload)?;
        Ok(rules.data.into_iter().next())
    }

    async fn cartridge_info(
        &self,
        cartridge_id: &CartridgeId,
    ) -> Result<Option<CartridgeInfo>, NodeError> {
        let response = self
            .inspect(
                "inspect/core/cartridge_info",
                &[("id", cartridge_id.to_string())],
            )
            .await?;
        let Some(payload) = response.first_payload() else {
            return Ok(None);
        };
        Self::decode_payload(payload).map(Some)
    }
}

#[async_trait]
impl LeaderboardSource for NodeClient {
    async fn leaderboard_page(
        &self,
        query: &LeaderboardQuery,
        page: u32,
    ) -> Result<Paged<LeaderboardEntry>, NodeError> {
        let mut params: Vec<(&str, String)> = query
            .tags()
            .into_iter()
            .map(|tag| ("tags", tag))
            .collect();
        params.extend([
            ("type", "notice".to_string()),
            ("page", page.to_string()),
            ("page_size", query.page_size.to_string()),
            ("order_by", "value".to_string()),
            ("order_dir", "desc".to_string()),
        ]);

        let response = self.inspect("inspect/indexer/indexer_query", &params).await?;
        let Some(payload) = response.first_payload() else {
            return Err(NodeError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| format!("status {}", response.status)),
            ));
        };
        Self::decode_payload(payload)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
