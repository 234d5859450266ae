//! Which panel the console shows.

use tracing::{debug, info};

use crate::game_state::{GameCommand, GameStateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsolePanel {
    #[default]
    Play,
    Leaderboard,
    Help,
    Submit,
}

impl ConsolePanel {
    pub fn is_overlay(self) -> bool {
        matches!(self, ConsolePanel::Leaderboard | ConsolePanel::Help)
    }
}

#[derive(Debug, Default)]
pub struct ConsoleStateMachine {
    panel: ConsolePanel,
}

impl ConsoleStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panel(&self) -> ConsolePanel {
        self.panel
    }

    /// User toggle of an overlay. Opening an overlay pauses a running game
    /// first. SUBMIT is neither a valid target nor left by toggling.
    pub fn toggle(&mut self, target: ConsolePanel, game: &mut GameStateMachine) -> ConsolePanel {
        if target == ConsolePanel::Submit || self.panel == ConsolePanel::Submit {
            debug!(?target, current = ?self.panel, "console: toggle ignored");
            return self.panel;
        }

        if target.is_overlay() && game.is_running() {
            game.issue(GameCommand::Pause);
        }

        let next = if self.panel == target {
            ConsolePanel::Play
        } else {
            target
        };
        self.set(next);
        self.panel
    }

    pub(crate) fn enter_submit(&mut self) {
        self.set(ConsolePanel::Submit);
    }

    pub(crate) fn leave_submit(&mut self) {
        self.set(ConsolePanel::Play);
    }

    fn set(&mut self, next: ConsolePanel) {
        if next != self.panel {
            info!(from = ?self.panel, to = ?next, "console: panel changed");
            self.panel = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::GameState;

    struct NullEmulator;

    impl crate::Emulator for NullEmulator {
        fn start(&mut self) {}
        fn stop(&mut self) {}
        fn set_speed(&mut self, _multiplier: f64) {}
    }

    fn running_game() -> GameStateMachine {
        let mut game = GameStateMachine::new(Box::new(NullEmulator));
        game.issue(GameCommand::Restart);
        game
    }

    #[test]
    fn toggling_twice_returns_to_play() {
        let mut console = ConsoleStateMachine::new();
        let mut game = running_game();

        assert_eq!(
            console.toggle(ConsolePanel::Help, &mut game),
            ConsolePanel::Help
        );
        assert_eq!(
            console.toggle(ConsolePanel::Help, &mut game),
            ConsolePanel::Play
        );
    }

    #[test]
    fn opening_overlay_pauses_running_game() {
        let mut console = ConsoleStateMachine::new();
        let mut game = running_game();

        console.toggle(ConsolePanel::Leaderboard, &mut game);
        assert_eq!(game.state(), GameState::Paused);

        // switching overlays keeps the game paused
        console.toggle(ConsolePanel::Help, &mut game);
        assert_eq!(console.panel(), ConsolePanel::Help);
        assert_eq!(game.state(), GameState::Paused);

        console.toggle(ConsolePanel::Help, &mut game);
        assert_eq!(console.panel(), ConsolePanel::Play);
        assert_eq!(game.state(), GameState::Paused);
    }

    #[test]
    fn submit_is_not_user_toggleable() {
        let mut console = ConsoleStateMachine::new();
        let mut game = running_game();

        assert_eq!(
            console.toggle(ConsolePanel::Submit, &mut game),
            ConsolePanel::Play
        );

        console.enter_submit();
        assert_eq!(
            console.toggle(ConsolePanel::Help, &mut game),
            ConsolePanel::Submit
        );
        console.leave_submit();
        assert_eq!(console.panel(), ConsolePanel::Play);
    }
}
