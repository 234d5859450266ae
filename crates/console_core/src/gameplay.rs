//! Gameplay capture: the record store and the per-run session reducer fed by
//! emulator callbacks.

use std::sync::Arc;

use shared::domain::{CartridgeId, Gameplay, Outcard, RuleId, RuleInfo, WalletAddress};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    frames::{capture_interval, EncodedFrame, GifParameters, PreviewFrames, PreviewUnavailable},
    score::{ScoreEvaluator, ScoreOutcome},
    wallet::WalletHandle,
    FrameSource, FrameTick, RunBegin, RunFinish, SessionError,
};

#[derive(Debug, Clone, Default)]
pub struct GameplaySnapshot {
    pub record: Option<Arc<Gameplay>>,
    pub player: Option<WalletAddress>,
}

/// Holder of the single current gameplay record and its declared owner.
#[derive(Clone)]
pub struct GameplayStore {
    tx: Arc<watch::Sender<GameplaySnapshot>>,
}

impl Default for GameplayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameplayStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GameplaySnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<GameplaySnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Arc<Gameplay>> {
        self.tx.borrow().record.clone()
    }

    pub fn player(&self) -> Option<WalletAddress> {
        self.tx.borrow().player.clone()
    }

    pub fn set_owner(&self, player: WalletAddress) {
        self.tx.send_modify(|snapshot| snapshot.player = Some(player));
    }

    pub(crate) fn publish(&self, record: Arc<Gameplay>) {
        self.tx.send_modify(|snapshot| snapshot.record = Some(record));
    }

    /// Drops the record; the declared player goes with it.
    pub fn clear(&self) {
        self.tx.send_if_modified(|snapshot| {
            let changed = snapshot.record.is_some() || snapshot.player.is_some();
            snapshot.record = None;
            snapshot.player = None;
            changed
        });
    }
}

/// Turns one run's callbacks into a preview and a finalized [`Gameplay`].
pub struct GameplaySession {
    rule_id: RuleId,
    cartridge_id: CartridgeId,
    tapes: Option<Vec<String>>,
    score: ScoreEvaluator,
    live_score: Option<i64>,
    last_outcome: ScoreOutcome,
    resolution: Option<(u32, u32)>,
    total_frames: u32,
    frames: PreviewFrames,
    frame_source: Box<dyn FrameSource>,
    store: GameplayStore,
    wallet: WalletHandle,
}

impl GameplaySession {
    pub fn new(
        rule: &RuleInfo,
        frame_source: Box<dyn FrameSource>,
        store: GameplayStore,
        wallet: WalletHandle,
    ) -> Self {
        Self {
            rule_id: rule.id.clone(),
            cartridge_id: rule.cartridge_id.clone(),
            tapes: rule.tapes.clone().filter(|tapes| !tapes.is_empty()),
            score: ScoreEvaluator::new(&rule.score_function),
            live_score: None,
            last_outcome: ScoreOutcome::NotConfigured,
            resolution: None,
            total_frames: 0,
            frames: PreviewFrames::new(),
            frame_source,
            store,
            wallet,
        }
    }

    pub fn store(&self) -> &GameplayStore {
        &self.store
    }

    pub fn live_score(&self) -> Option<i64> {
        self.live_score
    }

    /// Diagnostic behind the latest live score (or its absence).
    pub fn last_outcome(&self) -> &ScoreOutcome {
        &self.last_outcome
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn on_begin(&mut self, begin: &RunBegin) -> Result<(), SessionError> {
        let owner = self.wallet.address().ok_or(SessionError::WalletNotConnected)?;

        self.live_score = None;
        self.last_outcome = ScoreOutcome::NotConfigured;
        self.store.clear();
        self.frames.clear();
        self.resolution = Some((begin.width, begin.height));
        self.total_frames = begin.total_frames;
        info!(
            rule_id = %self.rule_id,
            player = %owner,
            width = begin.width,
            height = begin.height,
            total_frames = begin.total_frames,
            "gameplay: run started"
        );
        self.store.set_owner(owner);
        Ok(())
    }

    pub fn on_frame(&mut self, tick: &FrameTick) {
        if self.score.is_configured() {
            self.last_outcome = self.score.evaluate(&tick.outcard);
            if let ScoreOutcome::Malformed(reason) = &self.last_outcome {
                debug!(frame = tick.frame, %reason, "gameplay: live score unavailable");
            }
            self.live_score = self.last_outcome.score();
        }

        if self.resolution.is_none() || tick.frame % capture_interval(tick.fps) != 0 {
            return;
        }
        if let Some(capture) = self.frame_source.capture() {
            self.frames.push(EncodedFrame::from_capture(&capture));
        }
    }

    /// Builds and publishes the immutable record for the run.
    pub fn on_finish(&mut self, finish: RunFinish) -> Result<Arc<Gameplay>, SessionError> {
        // the wallet must still be connected, not only declared at begin
        self.wallet.address().ok_or(SessionError::WalletNotConnected)?;
        let owner = self.store.player().ok_or(SessionError::WalletNotConnected)?;

        self.last_outcome = self.score.evaluate(&finish.outcard);
        let score = self.last_outcome.score();
        self.live_score = score;

        let record = Arc::new(Gameplay {
            cartridge_id: self.cartridge_id.clone(),
            log: finish.log,
            outcard: Outcard {
                value: finish.outcard,
                hash: finish.outhash,
            },
            score,
            rule_id: self.rule_id.clone(),
            tapes: self.tapes.clone(),
            in_card: None,
        });
        info!(
            rule_id = %self.rule_id,
            player = %owner,
            score = ?score,
            outcome = ?self.last_outcome,
            log_bytes = record.log.len(),
            "gameplay: run finished"
        );
        self.store.publish(record.clone());
        Ok(record)
    }

    pub fn gif_parameters(&self) -> Result<GifParameters, PreviewUnavailable> {
        let (width, height) = self.resolution.ok_or(PreviewUnavailable::NoResolution)?;
        if self.frames.is_empty() {
            return Err(PreviewUnavailable::NoFrames);
        }
        Ok(GifParameters {
            width,
            height,
            frames: self.frames.iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
#[path = "tests/gameplay_tests.rs"]
mod tests;
