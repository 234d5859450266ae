//! Keyboard and on-screen button routing per console panel.

use crate::{console_state::ConsolePanel, orchestrator::UserCommand};

/// A key the emulator understands, as forwarded from the on-screen gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorKey {
    pub key: &'static str,
    pub code: &'static str,
    pub key_code: u16,
}

const GAMEPAD: [EmulatorKey; 16] = [
    pad("a", "KeyA", 65),
    pad("d", "KeyD", 68),
    pad("s", "KeyS", 83),
    pad("f", "KeyF", 70),
    pad("v", "KeyV", 86),
    pad("x", "KeyX", 88),
    pad("z", "KeyZ", 90),
    pad("c", "KeyC", 67),
    pad("e", "KeyE", 69),
    pad("w", "KeyW", 87),
    pad("q", "KeyQ", 81),
    pad("r", "KeyR", 82),
    pad("ArrowUp", "ArrowUp", 38),
    pad("ArrowDown", "ArrowDown", 40),
    pad("ArrowLeft", "ArrowLeft", 37),
    pad("ArrowRight", "ArrowRight", 39),
];

const fn pad(key: &'static str, code: &'static str, key_code: u16) -> EmulatorKey {
    EmulatorKey {
        key,
        code,
        key_code,
    }
}

/// Looks up a gamepad key by its `key` value; letters are case-insensitive.
pub fn gamepad_key(key: &str) -> Option<EmulatorKey> {
    GAMEPAD
        .iter()
        .copied()
        .find(|pad| pad.key == key || (pad.key.len() == 1 && pad.key.eq_ignore_ascii_case(key)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Command(UserCommand),
    Emulator(EmulatorKey),
    /// Move the leaderboard ranking cursor.
    CursorUp,
    CursorDown,
    /// Scroll the help text.
    ScrollUp,
    ScrollDown,
    Ignored,
}

/// Routes a key press (DOM `key` value) according to the visible panel.
pub fn map_key(panel: ConsolePanel, key: &str) -> KeyAction {
    match (panel, key) {
        (ConsolePanel::Submit, "z") => KeyAction::Command(UserCommand::ConfirmSubmit),
        (ConsolePanel::Submit, "x") => KeyAction::Command(UserCommand::CancelSubmit),
        (ConsolePanel::Leaderboard, "ArrowUp") => KeyAction::CursorUp,
        (ConsolePanel::Leaderboard, "ArrowDown") => KeyAction::CursorDown,
        (ConsolePanel::Help, "ArrowUp") => KeyAction::ScrollUp,
        (ConsolePanel::Help, "ArrowDown") => KeyAction::ScrollDown,
        (ConsolePanel::Play, key) => gamepad_key(key)
            .map(KeyAction::Emulator)
            .unwrap_or(KeyAction::Ignored),
        _ => KeyAction::Ignored,
    }
}

/// Console buttons around the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleButton {
    Pause,
    Restart,
    Leaderboard,
    Help,
}

impl From<ConsoleButton> for UserCommand {
    fn from(button: ConsoleButton) -> Self {
        match button {
            ConsoleButton::Pause => UserCommand::Pause,
            ConsoleButton::Restart => UserCommand::Restart,
            ConsoleButton::Leaderboard => UserCommand::ToggleLeaderboard,
            ConsoleButton::Help => UserCommand::ToggleHelp,
        }
    }
}
