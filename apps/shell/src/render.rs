//! Plain-text renderings of the console panels.

use node_client::leaderboard::LeaderboardPager;
use shared::{
    domain::{CartridgeInfo, RuleInfo},
    protocol::{format_timestamp_utc, Paged, TapeInfo},
};

const NO_DESCRIPTION: &str = "No description available.";

pub fn rule_not_found(rule_id: &str) -> String {
    format!("Rule {rule_id} not found!")
}

pub fn cartridge_not_found(cartridge_id: &str) -> String {
    format!("Cartridge {cartridge_id} not found!")
}

/// The help panel.
pub fn help(rule: &RuleInfo, cartridge: &CartridgeInfo) -> String {
    let rule_description = Some(rule.display_description()).filter(|d| !d.is_empty());
    format!(
        "{} / {}\n\nContest Description\n{}\n\nCartridge Description\n{}\n",
        rule.name,
        cartridge.name,
        rule_description.unwrap_or(NO_DESCRIPTION),
        cartridge
            .description()
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DESCRIPTION),
    )
}

pub fn leaderboard(rule: &RuleInfo, pager: &LeaderboardPager) -> String {
    let mut out = format!("{} Leaderboard\n", rule.name);
    if pager.pages().is_empty() {
        out.push_str("No data available\n");
        return out;
    }
    for (ranking, entry) in pager.rows() {
        let when = format_timestamp_utc(entry.timestamp).unwrap_or_default();
        out.push_str(&format!(
            "{ranking:>4}  {:<13}  {when:<26}  {}\n",
            entry.short_address(),
            entry.score
        ));
    }
    if pager.has_next_page() {
        out.push_str(&format!(
            "... {} of {} shown\n",
            pager.rows().count(),
            pager.total()
        ));
    }
    out
}

pub fn tapes(tapes: &Paged<TapeInfo>) -> String {
    let mut out = format!("{} tapes\n", tapes.total);
    for tape in &tapes.data {
        let score = tape.score.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        let status = match tape.verified {
            Some(true) => "verified",
            _ => "pending",
        };
        out.push_str(&format!(
            "{:<12}  {}  {score:>8}  {status}\n",
            tape.id, tape.user_address
        ));
    }
    out
}
