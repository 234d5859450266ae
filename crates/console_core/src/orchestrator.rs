//! Wires the game, console, gameplay and submission machines together.

use std::{sync::Arc, time::Duration};

use chain::{ChainReader, ChainTarget};
use shared::domain::{Gameplay, RuleInfo};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    console_state::{ConsolePanel, ConsoleStateMachine},
    game_state::{GameCommand, GameState, GameStateMachine},
    gameplay::{GameplaySession, GameplaySnapshot, GameplayStore},
    submission::{SubmissionController, SubmissionState, SubmitOutcome},
    wallet::WalletHandle,
    Emulator, EmulatorEvent, FrameSource, SessionError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Pause,
    Restart,
    ToggleLeaderboard,
    ToggleHelp,
    ConfirmSubmit,
    CancelSubmit,
}

pub struct SessionParts {
    pub rule: RuleInfo,
    pub emulator: Box<dyn Emulator>,
    pub frames: Box<dyn FrameSource>,
    pub wallet: WalletHandle,
    pub chain: Arc<dyn ChainReader>,
    pub target: ChainTarget,
    pub receipt_timeout: Duration,
}

/// Everything a front end needs to draw the console.
#[derive(Debug, Clone)]
pub struct ConsoleView {
    pub panel: ConsolePanel,
    pub game: GameState,
    pub record: Option<Arc<Gameplay>>,
    pub live_score: Option<i64>,
    pub submission: SubmissionState,
}

pub struct SessionOrchestrator {
    game: GameStateMachine,
    console: ConsoleStateMachine,
    session: GameplaySession,
    submission: SubmissionController,
    wallet: WalletHandle,
    gameplay_rx: watch::Receiver<GameplaySnapshot>,
    seen_record: Option<Arc<Gameplay>>,
    inflight: Option<JoinHandle<SubmitOutcome>>,
}

impl SessionOrchestrator {
    pub fn new(parts: SessionParts) -> Self {
        let store = GameplayStore::new();
        let gameplay_rx = store.subscribe();
        let submission = SubmissionController::new(
            store.clone(),
            parts.wallet.clone(),
            parts.chain,
            parts.target,
        )
        .with_receipt_timeout(parts.receipt_timeout);
        let session = GameplaySession::new(&parts.rule, parts.frames, store, parts.wallet.clone());

        Self {
            game: GameStateMachine::new(parts.emulator),
            console: ConsoleStateMachine::new(),
            session,
            submission,
            wallet: parts.wallet,
            gameplay_rx,
            seen_record: None,
            inflight: None,
        }
    }

    pub fn game(&self) -> &GameStateMachine {
        &self.game
    }

    pub fn console(&self) -> &ConsoleStateMachine {
        &self.console
    }

    pub fn session(&self) -> &GameplaySession {
        &self.session
    }

    pub fn submission(&self) -> &SubmissionController {
        &self.submission
    }

    pub fn view(&self) -> ConsoleView {
        ConsoleView {
            panel: self.console.panel(),
            game: self.game.state(),
            record: self.seen_record.clone(),
            live_score: self.session.live_score(),
            submission: self.submission.state(),
        }
    }

    /// Takes the handle of the submission started by the last confirm, if any.
    pub fn take_inflight(&mut self) -> Option<JoinHandle<SubmitOutcome>> {
        self.inflight.take()
    }

    pub fn handle_event(&mut self, event: EmulatorEvent) -> Result<(), SessionError> {
        match event {
            EmulatorEvent::Begin(begin) => {
                self.session.on_begin(&begin)?;
                if self.seen_record.take().is_some() {
                    warn!("orchestrator: run began while a gameplay record was pending");
                    self.console.leave_submit();
                }
            }
            EmulatorEvent::Frame(tick) => self.session.on_frame(&tick),
            EmulatorEvent::Finish(finish) => {
                self.session.on_finish(finish)?;
                self.game.halt();
            }
        }
        self.sync_gameplay();
        Ok(())
    }

    /// Must be called from within a Tokio runtime: `ConfirmSubmit` spawns
    /// the send as a task.
    pub fn handle_command(&mut self, command: UserCommand) {
        let panel = self.console.panel();
        match command {
            UserCommand::Pause if panel == ConsolePanel::Play => {
                self.game.issue(GameCommand::Pause);
            }
            UserCommand::Restart if panel == ConsolePanel::Play => {
                self.game.issue(GameCommand::Restart);
            }
            UserCommand::ToggleLeaderboard => {
                self.console.toggle(ConsolePanel::Leaderboard, &mut self.game);
            }
            UserCommand::ToggleHelp => {
                self.console.toggle(ConsolePanel::Help, &mut self.game);
            }
            UserCommand::ConfirmSubmit if panel == ConsolePanel::Submit => {
                let controller = self.submission.clone();
                self.inflight = Some(tokio::spawn(async move { controller.submit().await }));
            }
            UserCommand::CancelSubmit if panel == ConsolePanel::Submit => {
                self.submission.cancel();
            }
            ignored => info!(command = ?ignored, ?panel, "orchestrator: command ignored"),
        }
        self.sync_gameplay();
    }

    /// Applies record appearance/removal to the console and game machines.
    pub fn sync_gameplay(&mut self) {
        let current = self.gameplay_rx.borrow_and_update().record.clone();
        let previous = std::mem::replace(&mut self.seen_record, current.clone());
        match (previous, current) {
            (None, Some(record)) => self.on_record_published(&record),
            (Some(old), Some(new)) if !Arc::ptr_eq(&old, &new) => self.on_record_published(&new),
            (Some(_), None) => {
                info!("orchestrator: gameplay cleared, restarting");
                self.console.leave_submit();
                self.game.issue(GameCommand::Restart);
            }
            _ => {}
        }
    }

    fn on_record_published(&mut self, record: &Gameplay) {
        info!(
            rule_id = %record.rule_id,
            score = ?record.score,
            "orchestrator: gameplay ready for submission"
        );
        self.submission.reset();
        self.console.enter_submit();
    }

    /// Powers the emulator on when a wallet connects and off when it leaves.
    pub fn sync_wallet(&mut self) {
        if !self.wallet.is_connected() {
            self.game.power_off();
            return;
        }
        if self.game.state() == GameState::Off && self.seen_record.is_none() {
            self.game.issue(GameCommand::Restart);
        }
    }

    /// Event loop over emulator callbacks, user commands and record/wallet
    /// changes. Emulator events are drained before commands. Returns when the
    /// command channel closes, or on a fatal session error.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<EmulatorEvent>,
        mut commands: mpsc::Receiver<UserCommand>,
    ) -> Result<(), SessionError> {
        let mut gameplay_rx = self.gameplay_rx.clone();
        let mut wallet = self.wallet.clone();
        let mut events_open = true;

        self.sync_wallet();
        loop {
            tokio::select! {
                biased;
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event)?,
                    None => {
                        info!("orchestrator: emulator event stream closed");
                        events_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Ok(()) = gameplay_rx.changed() => self.sync_gameplay(),
                Ok(()) = wallet.changed() => self.sync_wallet(),
            }
        }

        info!("orchestrator: command stream closed, session ending");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
