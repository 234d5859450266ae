mod config;
mod render;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{load_settings, ShellConfig};
use console_core::{EmulatorLaunch, ScoreEvaluator};
use node_client::{
    leaderboard::{LeaderboardPager, LeaderboardQuery},
    ContestSource, NodeClient,
};
use sha2::{Digest, Sha256};
use shared::domain::{CartridgeId, CartridgeInfo, Gameplay, Outcard, RuleInfo, WalletAddress};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Contest console shell")]
struct Cli {
    /// Settings file; defaults to ./shell.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the contest and cartridge descriptions.
    Rule,
    /// List leaderboard rankings.
    Leaderboard {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// List the tapes submitted to the contest, best score first.
    Tapes,
    /// Build the verification payload and addInput calldata for a recorded run.
    EncodeClaim {
        #[arg(long)]
        tape: PathBuf,
        #[arg(long)]
        outcard: PathBuf,
        /// Overrides the contest's score function; fetched from the node otherwise.
        #[arg(long)]
        score_function: Option<String>,
    },
    /// Print the emulator URL a player would be launched with.
    LaunchUrl {
        #[arg(long)]
        player: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let config = settings.validate()?;
    let node = NodeClient::new(config.node_url.as_str());
    info!(
        node_url = %config.node_url,
        contest_id = %config.contest_id,
        chain_id = config.target.chain_id,
        receipt_timeout_secs = config.receipt_timeout.as_secs(),
        "shell: configured"
    );

    match cli.command {
        Command::Rule => {
            let Some((rule, cartridge)) = fetch_contest(&node, &config).await? else {
                return Ok(());
            };
            print!("{}", render::help(&rule, &cartridge));
        }
        Command::Leaderboard { pages } => {
            let Some((rule, _)) = fetch_contest(&node, &config).await? else {
                return Ok(());
            };
            let query = LeaderboardQuery::scores(rule.cartridge_id.clone(), rule.id.clone())
                .with_page_size(config.leaderboard_page_size);
            let mut pager = LeaderboardPager::new(query);
            for _ in 0..pages {
                if !pager.fetch_next(&node).await? {
                    break;
                }
            }
            print!("{}", render::leaderboard(&rule, &pager));
        }
        Command::Tapes => match node.contest_tapes(&config.contest_id).await? {
            Some(tapes) => print!("{}", render::tapes(&tapes)),
            None => println!("{}", render::rule_not_found(config.contest_id.as_str())),
        },
        Command::EncodeClaim {
            tape,
            outcard,
            score_function,
        } => {
            let log = fs::read(&tape)
                .with_context(|| format!("failed to read tape '{}'", tape.display()))?;
            let outcard = fs::read(&outcard)
                .with_context(|| format!("failed to read outcard '{}'", outcard.display()))?;

            let rule = match score_function {
                Some(_) => None,
                None => {
                    let Some((rule, _)) = fetch_contest(&node, &config).await? else {
                        return Ok(());
                    };
                    Some(rule)
                }
            };
            let score_function = score_function
                .or_else(|| rule.as_ref().map(|rule| rule.score_function.clone()))
                .unwrap_or_default();
            let outcome = ScoreEvaluator::new(&score_function).evaluate(&outcard);
            info!(?outcome, "shell: outcard scored");

            let gameplay = Gameplay {
                cartridge_id: rule
                    .as_ref()
                    .map(|rule| rule.cartridge_id.clone())
                    .unwrap_or_else(|| CartridgeId::new("")),
                outcard: Outcard {
                    hash: hex::encode(Sha256::digest(&outcard)),
                    value: outcard,
                },
                log,
                score: outcome.score(),
                rule_id: config.contest_id.clone(),
                tapes: rule.and_then(|rule| rule.tapes).filter(|tapes| !tapes.is_empty()),
                in_card: None,
            };
            let call = chain::AddInputCall::for_gameplay(&config.target, &gameplay)?;

            println!(
                "tape_id: {}",
                chain::ids::calculate_tape_id(config.contest_id.as_str(), &gameplay.log)
            );
            println!(
                "payload: {}",
                serde_json::to_string_pretty(&chain::verify_payload(&gameplay))?
            );
            println!("to: {}", call.world_address);
            println!("calldata: {}", chain::to_hex(&call.calldata()));
        }
        Command::LaunchUrl { player } => {
            let Some((rule, _)) = fetch_contest(&node, &config).await? else {
                return Ok(());
            };
            let launch = EmulatorLaunch::for_rule(
                &rule,
                config.cartridges_url.as_str(),
                &WalletAddress::new(player),
            );
            println!("{}", launch.emulator_url(config.emulator_url.as_str())?);
        }
    }

    Ok(())
}

/// Rule and cartridge, or `None` after printing which one is missing.
async fn fetch_contest(
    node: &NodeClient,
    config: &ShellConfig,
) -> Result<Option<(RuleInfo, CartridgeInfo)>> {
    let Some(rule) = node.rule(&config.contest_id).await? else {
        println!("{}", render::rule_not_found(config.contest_id.as_str()));
        return Ok(None);
    };
    let Some(cartridge) = node.cartridge_info(&rule.cartridge_id).await? else {
        println!("{}", render::cartridge_not_found(rule.cartridge_id.as_str()));
        return Ok(None);
    };
    Ok(Some((rule, cartridge)))
}
