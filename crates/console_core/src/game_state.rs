//! Emulator run state and the single-shot commands that move it.

use tracing::{debug, info};

use crate::Emulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    Off,
    Restarting,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameCommand {
    #[default]
    None,
    Pause,
    Restart,
}

pub struct GameStateMachine {
    state: GameState,
    command: GameCommand,
    emulator: Box<dyn Emulator>,
}

impl GameStateMachine {
    pub fn new(emulator: Box<dyn Emulator>) -> Self {
        Self {
            state: GameState::Off,
            command: GameCommand::None,
            emulator,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Always `None` outside of [`issue`](Self::issue).
    pub fn command(&self) -> GameCommand {
        self.command
    }

    pub fn is_running(&self) -> bool {
        self.state == GameState::Running
    }

    /// Processes one command and returns the resulting state.
    pub fn issue(&mut self, command: GameCommand) -> GameState {
        self.command = command;
        let previous = self.state;

        match command {
            GameCommand::Restart => {
                self.state = GameState::Restarting;
                self.emulator.start();
                self.state = GameState::Running;
            }
            GameCommand::Pause => match self.state {
                GameState::Running => {
                    self.emulator.set_speed(0.0);
                    self.state = GameState::Paused;
                }
                GameState::Paused => {
                    self.emulator.set_speed(1.0);
                    self.state = GameState::Running;
                }
                GameState::Off | GameState::Restarting => {
                    debug!(state = ?self.state, "game: pause ignored");
                }
            },
            GameCommand::None => {}
        }

        self.command = GameCommand::None;
        if previous != self.state {
            info!(?command, from = ?previous, to = ?self.state, "game: transition");
        }
        self.state
    }

    /// The emulator ended the run on its own.
    pub fn halt(&mut self) {
        if self.state != GameState::Off {
            info!(from = ?self.state, "game: run finished");
        }
        self.state = GameState::Off;
    }

    /// Stops playback, e.g. when the wallet disconnects.
    pub fn power_off(&mut self) {
        if self.state == GameState::Off {
            return;
        }
        self.emulator.stop();
        self.state = GameState::Off;
        info!("game: powered off");
    }
}

#[cfg(test)]
#[path = "tests/game_state_tests.rs"]
mod tests;
