use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::{bail, Context};
use chain::{Address, ChainTarget};
use node_client::leaderboard::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use shared::domain::RuleId;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "shell.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    pub app_addr: String,
    pub world_addr: String,
    pub node_url: String,
    pub network_chain_id: String,
    pub contest_id: String,
    pub cartridges_url: String,
    pub emulator_url: String,
    pub leaderboard_page_size: u32,
    pub receipt_timeout_secs: u64,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            app_addr: String::new(),
            world_addr: String::new(),
            node_url: "http://127.0.0.1:8080".into(),
            network_chain_id: String::new(),
            contest_id: String::new(),
            cartridges_url: String::new(),
            emulator_url: String::new(),
            leaderboard_page_size: DEFAULT_PAGE_SIZE,
            receipt_timeout_secs: 120,
        }
    }
}

/// Validated settings, ready for the node client and the session core.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub node_url: Url,
    pub contest_id: RuleId,
    pub target: ChainTarget,
    pub cartridges_url: Url,
    pub emulator_url: Url,
    pub leaderboard_page_size: u32,
    pub receipt_timeout: Duration,
}

/// Defaults, then the optional config file, then the environment.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ShellSettings> {
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
    let raw = match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    settings_from(raw.as_deref(), |name| std::env::var(name).ok())
        .with_context(|| format!("invalid configuration in '{}'", path.display()))
}

pub(crate) fn settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ShellSettings> {
    let mut settings = match file {
        Some(raw) => toml::from_str::<ShellSettings>(raw)?,
        None => ShellSettings::default(),
    };

    let text_fields: [(&str, &mut String); 7] = [
        ("APP_ADDR", &mut settings.app_addr),
        ("WORLD_ADDR", &mut settings.world_addr),
        ("NODE_URL", &mut settings.node_url),
        ("NETWORK_CHAIN_ID", &mut settings.network_chain_id),
        ("CONTEST_ID", &mut settings.contest_id),
        ("CARTRIDGES_URL", &mut settings.cartridges_url),
        ("EMULATOR_URL", &mut settings.emulator_url),
    ];
    for (name, field) in text_fields {
        if let Some(v) = lookup(&env, name) {
            *field = v;
        }
    }

    if let Some(v) = lookup(&env, "LEADERBOARD_PAGE_SIZE") {
        settings.leaderboard_page_size = v
            .parse()
            .with_context(|| format!("LEADERBOARD_PAGE_SIZE is not a number: '{v}'"))?;
    }
    if let Some(v) = lookup(&env, "RECEIPT_TIMEOUT_SECS") {
        settings.receipt_timeout_secs = v
            .parse()
            .with_context(|| format!("RECEIPT_TIMEOUT_SECS is not a number: '{v}'"))?;
    }

    Ok(settings)
}

/// `RIVES_<NAME>`, overridden by `APP__<NAME>` when both are set.
fn lookup(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(&format!("APP__{name}")).or_else(|| env(&format!("RIVES_{name}")))
}

impl ShellSettings {
    pub fn validate(&self) -> anyhow::Result<ShellConfig> {
        let contest_id = self.contest_id.trim();
        if contest_id.is_empty() {
            bail!("contest_id is required");
        }
        if self.leaderboard_page_size == 0 {
            bail!("leaderboard_page_size must be positive");
        }

        Ok(ShellConfig {
            node_url: parse_url("node_url", &self.node_url)?,
            contest_id: RuleId::new(contest_id),
            target: ChainTarget {
                chain_id: parse_chain_id(&self.network_chain_id)
                    .context("invalid network_chain_id")?,
                world_address: parse_address("world_addr", &self.world_addr)?,
                app_address: parse_address("app_addr", &self.app_addr)?,
            },
            cartridges_url: parse_url("cartridges_url", &self.cartridges_url)?,
            emulator_url: parse_url("emulator_url", &self.emulator_url)?,
            leaderboard_page_size: self.leaderboard_page_size,
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
        })
    }
}

/// Hex (`0x14a34`) or decimal chain id.
pub fn parse_chain_id(raw: &str) -> anyhow::Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("chain id is empty");
    }
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.with_context(|| format!("'{raw}' is not a chain id"))
}

fn parse_url(field: &str, raw: &str) -> anyhow::Result<Url> {
    if raw.trim().is_empty() {
        bail!("{field} is required");
    }
    Url::parse(raw.trim()).with_context(|| format!("{field} is not a valid url: '{raw}'"))
}

fn parse_address(field: &str, raw: &str) -> anyhow::Result<Address> {
    if raw.trim().is_empty() {
        bail!("{field} is required");
    }
    raw.trim()
        .parse()
        .with_context(|| format!("{field} is not an address: '{raw}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
