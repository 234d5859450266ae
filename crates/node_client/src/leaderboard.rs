//! Incremental leaderboard paging and the ranking focus cursor.

use shared::{
    domain::{CartridgeId, RuleId},
    protocol::{LeaderboardEntry, Paged},
};
use tracing::info;

use crate::{LeaderboardSource, NodeError};

pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const SCORE_METRIC_TAG: &str = "score";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub metric_tag: String,
    pub cartridge_id: CartridgeId,
    pub rule_id: RuleId,
    pub page_size: u32,
}

impl LeaderboardQuery {
    pub fn scores(cartridge_id: CartridgeId, rule_id: RuleId) -> Self {
        Self {
            metric_tag: SCORE_METRIC_TAG.to_string(),
            cartridge_id,
            rule_id,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn tags(&self) -> Vec<String> {
        vec![
            self.metric_tag.clone(),
            self.cartridge_id.to_string(),
            self.rule_id.to_string(),
        ]
    }
}

/// Pages loaded so far for one query, in fetch order.
#[derive(Debug, Clone)]
pub struct LeaderboardPager {
    query: LeaderboardQuery,
    pages: Vec<Paged<LeaderboardEntry>>,
    total: u64,
    fetching: bool,
}

impl LeaderboardPager {
    pub fn new(query: LeaderboardQuery) -> Self {
        Self {
            query,
            pages: Vec::new(),
            total: 0,
            fetching: false,
        }
    }

    pub fn query(&self) -> &LeaderboardQuery {
        &self.query
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.query.page_size))
    }

    pub fn pages(&self) -> &[Paged<LeaderboardEntry>] {
        &self.pages
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// Page to request next; `None` once every page reported by `total` is loaded.
    pub fn next_page(&self) -> Option<u32> {
        match self.pages.len() {
            0 => Some(1),
            loaded => {
                let next = loaded as u32 + 1;
                (u64::from(next) <= self.total_pages()).then_some(next)
            }
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page().is_some()
    }

    /// Fetches the next page. Returns `Ok(false)` when nothing is left to load.
    pub async fn fetch_next(&mut self, source: &dyn LeaderboardSource) -> Result<bool, NodeError> {
        let Some(page) = self.next_page() else {
            return Ok(false);
        };

        self.fetching = true;
        let result = source.leaderboard_page(&self.query, page).await;
        self.fetching = false;

        let loaded = result?;
        self.total = loaded.total;
        info!(
            rule_id = %self.query.rule_id,
            page,
            rows = loaded.data.len(),
            total = loaded.total,
            "leaderboard: page loaded"
        );
        self.pages.push(loaded);
        Ok(true)
    }

    /// Rows with their 1-based ranking.
    pub fn rows(&self) -> impl Iterator<Item = (u64, &LeaderboardEntry)> {
        let page_size = u64::from(self.query.page_size);
        self.pages.iter().enumerate().flat_map(move |(page_index, page)| {
            page.data
                .iter()
                .enumerate()
                .map(move |(row, entry)| (page_index as u64 * page_size + row as u64 + 1, entry))
        })
    }
}

/// Highlighted ranking on the leaderboard panel, kept within `1..=total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingCursor {
    focus: u64,
}

impl Default for RankingCursor {
    fn default() -> Self {
        Self { focus: 1 }
    }
}

impl RankingCursor {
    pub fn focus(&self) -> u64 {
        self.focus
    }

    pub fn up(&mut self) {
        self.focus = self.focus.saturating_sub(1).max(1);
    }

    /// Moving down is ignored while a page fetch is outstanding.
    pub fn down(&mut self, total: u64, fetching: bool) {
        if fetching {
            return;
        }
        self.focus = (self.focus + 1).min(total.max(1));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;

    struct FixedBoard {
        total: u64,
        requested: Arc<Mutex<Vec<u32>>>,
    }

    #[async_trait]
    impl LeaderboardSource for FixedBoard {
        async fn leaderboard_page(
            &self,
            query: &LeaderboardQuery,
            page: u32,
        ) -> Result<Paged<LeaderboardEntry>, NodeError> {
            self.requested.lock().expect("requested").push(page);
            let start = u64::from(page - 1) * u64::from(query.page_size);
            let end = (start + u64::from(query.page_size)).min(self.total);
            let data = (start..end)
                .map(|i| LeaderboardEntry {
                    msg_sender: None,
                    timestamp: i as i64,
                    user_address: None,
                    tape_id: None,
                    score: (self.total - i) as i64,
                })
                .collect();
            Ok(Paged {
                data,
                total: self.total,
                page,
            })
        }
    }

    fn query() -> LeaderboardQuery {
        LeaderboardQuery::scores(CartridgeId::new("cart"), RuleId::new("R")).with_page_size(15)
    }

    #[tokio::test]
    async fn sixteen_entries_at_fifteen_per_page_load_in_two_pages() {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let board = FixedBoard {
            total: 16,
            requested: requested.clone(),
        };
        let mut pager = LeaderboardPager::new(query());

        while pager.fetch_next(&board).await.expect("fetch") {}

        assert_eq!(pager.total_pages(), 2);
        assert_eq!(pager.pages().len(), 2);
        assert_eq!(pager.pages()[1].data.len(), 1);
        assert_eq!(*requested.lock().expect("requested"), vec![1, 2]);
        assert!(!pager.has_next_page());

        let ranks: Vec<u64> = pager.rows().map(|(rank, _)| rank).collect();
        assert_eq!(ranks, (1..=16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_board_stops_after_first_page() {
        let board = FixedBoard {
            total: 0,
            requested: Arc::new(Mutex::new(Vec::new())),
        };
        let mut pager = LeaderboardPager::new(query());

        assert!(pager.fetch_next(&board).await.expect("first"));
        assert!(!pager.fetch_next(&board).await.expect("second"));
        assert_eq!(pager.rows().count(), 0);
    }

    #[test]
    fn tags_are_metric_cartridge_rule() {
        assert_eq!(query().tags(), vec!["score", "cart", "R"]);
    }

    #[test]
    fn cursor_is_clamped_and_waits_for_fetches() {
        let mut cursor = RankingCursor::default();
        cursor.up();
        assert_eq!(cursor.focus(), 1);

        cursor.down(3, false);
        cursor.down(3, false);
        cursor.down(3, false);
        assert_eq!(cursor.focus(), 3);

        cursor.up();
        cursor.down(3, true);
        assert_eq!(cursor.focus(), 2);
    }
}
