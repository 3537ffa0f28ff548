//! Effects the detector asks for.

use crate::keys::KeySequence;
use std::time::Duration;

/// Side effects requested by the [`Detector`](crate::Detector).
///
/// The detector never touches the host or the clock directly. It returns a
/// `Command` describing what should happen, and the
/// [`Session`](crate::Session) executes it in order.
///
/// # Examples
///
/// ```rust,ignore
/// // Nothing to do:
/// let cmd = Command::none();
///
/// // Escape insert mode and forget the running timer:
/// let cmd = Command::batch([
///     Command::cancel_timer(),
///     Command::feed(KeySequence::parse("<BS><BS><Esc>")),
///     Command::reconcile(),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    inner: CommandInner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CommandInner {
    None,
    Effect(Effect),
    Batch(Vec<Command>),
}

/// A single effect, executed by the session against the host or the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Push keys into the host input stream ahead of anything typed since.
    Feed(KeySequence),
    /// Drive the combination timer.
    Timer(TimerCommand),
    /// Check, once the host has applied this update's keys, whether the
    /// document is back to its mode-entry content.
    Reconcile,
}

/// Instructions for the single combination timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Start (or restart) the countdown. Any earlier arming is forgotten.
    Arm { duration: Duration, generation: u64 },
    /// Stop the countdown. Inert if nothing is armed.
    Cancel,
}

impl Command {
    /// No-op command.
    pub fn none() -> Self {
        Command {
            inner: CommandInner::None,
        }
    }

    /// Dispatch keys to the host.
    pub fn feed(keys: KeySequence) -> Self {
        Self::effect(Effect::Feed(keys))
    }

    /// Arm the timer for `duration`, tagged with `generation`.
    pub fn arm_timer(duration: Duration, generation: u64) -> Self {
        Self::effect(Effect::Timer(TimerCommand::Arm {
            duration,
            generation,
        }))
    }

    /// Cancel the timer.
    pub fn cancel_timer() -> Self {
        Self::effect(Effect::Timer(TimerCommand::Cancel))
    }

    /// Schedule modification reconciliation for the next quiescent point.
    pub fn reconcile() -> Self {
        Self::effect(Effect::Reconcile)
    }

    fn effect(effect: Effect) -> Self {
        Command {
            inner: CommandInner::Effect(effect),
        }
    }

    /// Run several commands in order.
    pub fn batch(cmds: impl IntoIterator<Item = Command>) -> Self {
        let mut cmds: Vec<_> = cmds.into_iter().filter(|cmd| !cmd.is_none()).collect();
        match cmds.len() {
            0 => Command::none(),
            1 => cmds.remove(0),
            _ => Command {
                inner: CommandInner::Batch(cmds),
            },
        }
    }

    /// Returns `true` if this is a no-op command.
    pub fn is_none(&self) -> bool {
        matches!(self.inner, CommandInner::None)
    }

    /// Flatten into effects, in execution order.
    pub fn into_effects(self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.collect_into(&mut effects);
        effects
    }

    fn collect_into(self, effects: &mut Vec<Effect>) {
        match self.inner {
            CommandInner::None => {}
            CommandInner::Effect(effect) => effects.push(effect),
            CommandInner::Batch(cmds) => {
                for cmd in cmds {
                    cmd.collect_into(effects);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_none_is_none() {
        assert!(Command::none().is_none());
        assert!(Command::none().into_effects().is_empty());
    }

    #[test]
    fn batch_empty_returns_none() {
        assert!(Command::batch(vec![]).is_none());
    }

    #[test]
    fn batch_drops_none_entries() {
        let cmd = Command::batch([Command::none(), Command::cancel_timer(), Command::none()]);
        assert_eq!(cmd, Command::cancel_timer());
    }

    #[test]
    fn batch_preserves_order_when_flattened() {
        let keys = KeySequence::parse("<Esc>");
        let cmd = Command::batch([
            Command::cancel_timer(),
            Command::batch([Command::feed(keys.clone()), Command::reconcile()]),
        ]);
        assert_eq!(
            cmd.into_effects(),
            vec![
                Effect::Timer(TimerCommand::Cancel),
                Effect::Feed(keys),
                Effect::Reconcile,
            ]
        );
    }

    #[test]
    fn arm_timer_carries_generation() {
        let cmd = Command::arm_timer(Duration::from_millis(10), 7);
        assert_eq!(
            cmd.into_effects(),
            vec![Effect::Timer(TimerCommand::Arm {
                duration: Duration::from_millis(10),
                generation: 7,
            })]
        );
    }
}
