//! Session coordination core of the console shell: emulator lifecycle, panel
//! state, gameplay capture, and claim submission.

use shared::domain::{RuleInfo, WalletAddress};
use thiserror::Error;
use url::Url;

pub mod console_state;
pub mod frames;
pub mod game_state;
pub mod gameplay;
pub mod input;
pub mod orchestrator;
pub mod score;
pub mod submission;
pub mod wallet;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub use console_state::{ConsolePanel, ConsoleStateMachine};
pub use frames::{EncodedFrame, FrameRing, GifParameters, PreviewUnavailable};
pub use game_state::{GameCommand, GameState, GameStateMachine};
pub use gameplay::{GameplaySession, GameplaySnapshot, GameplayStore};
pub use input::{map_key, ConsoleButton, KeyAction};
pub use orchestrator::{ConsoleView, SessionOrchestrator, SessionParts, UserCommand};
pub use score::{ScoreEvaluator, ScoreOutcome};
pub use submission::{SubmissionController, SubmissionPhase, SubmissionState, SubmitOutcome};
pub use wallet::{wallet_channel, WalletFeed, WalletHandle};

/// Playback control surface of the external emulator.
///
/// Only [`GameStateMachine`] drives these calls.
pub trait Emulator: Send {
    fn start(&mut self);
    fn stop(&mut self);
    fn set_speed(&mut self, multiplier: f64);
}

/// Raw image of the emulator screen at the moment of capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Grabs the current screen for the gameplay preview.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Option<CapturedFrame>;
}

/// `onBegin(width, height, target_fps, total_frames, info)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunBegin {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    pub total_frames: u32,
    pub info: Vec<u8>,
}

/// `onFrame(outcard, frame, cycles, fps, cpu_cost, cpu_speed, cpu_usage, cpu_quota)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTick {
    pub outcard: Vec<u8>,
    pub frame: u64,
    pub cycles: u64,
    pub fps: u32,
    pub cpu_cost: f64,
    pub cpu_speed: f64,
    pub cpu_usage: f64,
    pub cpu_quota: f64,
}

impl FrameTick {
    pub fn new(outcard: impl Into<Vec<u8>>, frame: u64, fps: u32) -> Self {
        Self {
            outcard: outcard.into(),
            frame,
            cycles: 0,
            fps,
            cpu_cost: 0.0,
            cpu_speed: 0.0,
            cpu_usage: 0.0,
            cpu_quota: 0.0,
        }
    }
}

/// `onFinish(log, outcard, outhash)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFinish {
    pub log: Vec<u8>,
    pub outcard: Vec<u8>,
    pub outhash: String,
}

/// Typed stream of emulator callbacks, in `Begin, Frame*, Finish` order per run.
#[derive(Debug, Clone, PartialEq)]
pub enum EmulatorEvent {
    Begin(RunBegin),
    Frame(FrameTick),
    Finish(RunFinish),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("gameplay cannot be finalized without a connected wallet address")]
    WalletNotConnected,
    #[error("invalid emulator launch url: {0}")]
    LaunchUrl(String),
}

/// Parameters the emulator is launched with for a rule and player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorLaunch {
    pub cartridge_url: String,
    pub args: String,
    pub entropy: String,
}

impl EmulatorLaunch {
    pub fn for_rule(rule: &RuleInfo, cartridges_url: &str, player: &WalletAddress) -> Self {
        let base = cartridges_url.strip_suffix('/').unwrap_or(cartridges_url);
        Self {
            cartridge_url: format!("{base}/{}", rule.cartridge_id),
            args: rule.args.clone(),
            entropy: chain::ids::generate_entropy(player.as_str(), rule.id.as_str()),
        }
    }

    /// Fragment-style URL understood by the web emulator.
    pub fn emulator_url(&self, emulator_url: &str) -> Result<Url, SessionError> {
        let mut url =
            Url::parse(emulator_url).map_err(|e| SessionError::LaunchUrl(e.to_string()))?;
        let fragment: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("simple", "true")
            .append_pair("cartridge", &self.cartridge_url)
            .append_pair("args", &self.args)
            .append_pair("entropy", &self.entropy)
            .finish();
        url.set_fragment(Some(&fragment));
        Ok(url)
    }
}
