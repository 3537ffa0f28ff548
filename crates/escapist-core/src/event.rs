//! Messages consumed by a [`Session`](crate::Session).

use crate::config::Config;
use crate::mode::Mode;
use crossterm::event::KeyEvent;

/// Everything that reaches a [`Session`](crate::Session), one at a time.
///
/// Keys, mode entries, timer expiries and reconfiguration all travel through
/// the same queue, so they are handled strictly in arrival order and never
/// concurrently.
///
/// # Example
///
/// ```rust,ignore
/// handle.send(Message::Input(KeyEvent::new(KeyCode::Char('i'), KeyModifiers::NONE)));
/// handle.send(Message::Input(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE)));
/// ```
#[derive(Debug, Clone)]
pub enum Message {
    /// A user keystroke for the session to apply to the host and then
    /// classify.
    Input(KeyEvent),
    /// The host already applied `key` while in `mode`. Only for hosts that
    /// apply keys in lockstep with the session.
    Key { key: char, mode: Mode },
    /// The host entered `mode` by some means other than [`Message::Input`].
    ModeEntered(Mode),
    /// The timer armed with this generation ran out.
    TimerExpired(u64),
    /// Replace the configuration.
    Setup(Box<Config>),
}
