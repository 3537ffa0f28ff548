//! Executes what the detector decides.

use crate::command::{Command, Effect};
use crate::config::ConfigError;
use crate::detector::Detector;
use crate::event::Message;
use crate::host::Host;
use crate::keys::typed_char;
use crate::mode::Mode;
use crate::modified::{ModificationTracker, ReconcileOutcome, ReconcileTicket};
use crate::timer::TimerDriver;
use std::collections::VecDeque;
use tracing::trace;

/// A [`Detector`] wired to a [`Host`] and a [`TimerDriver`].
///
/// The session is the single consumer of [`Message`]s. A
/// [`Message::Input`] is applied to the host and classified in the same
/// step, so the keys a match feeds land before the next queued keystroke.
/// Host and timer effects run immediately inside
/// [`handle`](Session::handle); modified-flag
/// reconciliations are deferred until the host has applied the dispatched
/// keys, and run when the owner calls
/// [`flush_deferred`](Session::flush_deferred).
pub struct Session<H: Host, T: TimerDriver> {
    detector: Detector,
    modified: ModificationTracker,
    deferred: VecDeque<ReconcileTicket>,
    host: H,
    timer: T,
}

impl<H: Host, T: TimerDriver> Session<H, T> {
    /// Wire `detector` to `host` and `timer`. No snapshot is held yet.
    pub fn new(detector: Detector, host: H, timer: T) -> Self {
        Self {
            detector,
            modified: ModificationTracker::new(),
            deferred: VecDeque::new(),
            host,
            timer,
        }
    }

    /// Process one message. Returns the diagnostics of a
    /// [`Message::Setup`], and nothing otherwise.
    pub fn handle(&mut self, msg: Message) -> Vec<ConfigError> {
        match msg {
            Message::Input(key) => {
                let mode = self.host.mode();
                let entered = self.host.apply_key(key);
                if let Some(ch) = typed_char(&key) {
                    let cmd = self.detector.on_key(ch, mode);
                    self.execute(cmd);
                }
                if let Some(mode) = entered {
                    self.mode_entered(mode);
                }
            }
            Message::Key { key, mode } => {
                let cmd = self.detector.on_key(key, mode);
                self.execute(cmd);
            }
            Message::ModeEntered(mode) => self.mode_entered(mode),
            Message::TimerExpired(generation) => {
                self.detector.on_timer_expired(generation);
            }
            Message::Setup(config) => {
                self.timer.cancel();
                self.modified.clear();
                return self.detector.setup(*config);
            }
        }
        Vec::new()
    }

    fn mode_entered(&mut self, mode: Mode) {
        let enabled = self.detector.settings().suppress_modified();
        self.modified
            .snapshot_on_mode_entry(mode, enabled, &self.host);
    }

    fn execute(&mut self, cmd: Command) {
        for effect in cmd.into_effects() {
            match effect {
                Effect::Feed(keys) => {
                    trace!(%keys, "feeding keys");
                    self.host.feed_keys(&keys);
                }
                Effect::Timer(timer) => self.timer.execute(timer),
                Effect::Reconcile => match self.modified.take_ticket() {
                    Some(ticket) => self.deferred.push_back(ticket),
                    None => trace!("no snapshot to reconcile against"),
                },
            }
        }
    }

    /// Whether reconciliations are waiting for [`flush_deferred`](Session::flush_deferred).
    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Run every deferred reconciliation, oldest first.
    pub fn flush_deferred(&mut self) -> Vec<ReconcileOutcome> {
        let mut outcomes = Vec::with_capacity(self.deferred.len());
        while let Some(ticket) = self.deferred.pop_front() {
            outcomes.push(ticket.reconcile(&mut self.host));
        }
        outcomes
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host, for changes the session does not see.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Mutable access to the timer, e.g. to fire a manual one.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Give the host back, dropping the timer and any deferred work.
    pub fn into_host(self) -> H {
        self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::TimerCommand;
    use crate::config::{Config, DEFAULT_TIMEOUT};
    use crate::keys::KeySequence;
    use crate::testing::{ManualTimer, ScratchBuffer};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::time::Duration;

    fn session(config: Config, text: &str) -> Session<ScratchBuffer, ManualTimer> {
        let (detector, diagnostics) = Detector::new(config);
        assert!(diagnostics.is_empty());
        Session::new(detector, ScratchBuffer::with_content(text), ManualTimer::new())
    }

    #[test]
    fn key_messages_drive_timer() {
        let mut s = session(Config::new().with_timeout(Duration::from_millis(250)), "");
        s.handle(Message::Key { key: 'j', mode: Mode::Insert });
        assert_eq!(s.timer().armed(), Some((Duration::from_millis(250), 1)));
        s.handle(Message::Key { key: 'x', mode: Mode::Insert });
        assert_eq!(s.timer().armed(), None);
        assert_eq!(s.timer().cancellations(), 1);
    }

    #[test]
    fn match_feeds_host() {
        let mut s = session(Config::new(), "");
        s.handle(Message::Key { key: 'j', mode: Mode::Terminal });
        s.handle(Message::Key { key: 'k', mode: Mode::Terminal });
        assert_eq!(s.host().fed(), [KeySequence::parse("<BS><BS><C-\\><C-n>")]);
        assert!(!s.has_deferred());
    }

    #[test]
    fn reconcile_waits_for_flush() {
        let mut s = session(Config::new(), "abc");
        s.host_mut().set_mode(Mode::Insert);
        s.handle(Message::ModeEntered(Mode::Insert));
        s.host_mut().type_char('j');
        s.host_mut().type_char('k');
        s.handle(Message::Key { key: 'j', mode: Mode::Insert });
        s.handle(Message::Key { key: 'k', mode: Mode::Insert });

        assert!(s.has_deferred());
        assert!(s.host().modified());
        assert_eq!(s.flush_deferred(), vec![ReconcileOutcome::Restored]);
        assert!(!s.host().modified());
        assert!(!s.has_deferred());
    }

    #[test]
    fn reconcile_without_snapshot_is_skipped() {
        let mut s = session(Config::new(), "abc");
        s.handle(Message::Key { key: 'j', mode: Mode::Insert });
        s.handle(Message::Key { key: 'k', mode: Mode::Insert });
        assert!(!s.has_deferred());
    }

    fn input(s: &mut Session<ScratchBuffer, ManualTimer>, text: &str) {
        for ch in text.chars() {
            s.handle(Message::Input(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE)));
        }
    }

    #[test]
    fn input_is_applied_then_classified() {
        let mut s = session(Config::new(), "hello");
        input(&mut s, "ijk");
        assert_eq!(s.host().text(), "hello");
        assert_eq!(s.host().mode(), Mode::Normal);
        assert_eq!(
            s.timer().history(),
            [
                TimerCommand::Arm {
                    duration: DEFAULT_TIMEOUT,
                    generation: 1
                },
                TimerCommand::Cancel,
            ]
        );
        assert_eq!(s.flush_deferred(), vec![ReconcileOutcome::Restored]);
        assert!(!s.host().modified());
    }

    #[test]
    fn fed_keys_land_before_next_input() {
        let mut s = session(Config::new(), "hello");
        input(&mut s, "ijkx");
        // `x` reaches normal mode and deletes instead of being inserted.
        assert_eq!(s.host().text(), "ello");
        assert_eq!(s.host().mode(), Mode::Normal);
    }

    #[test]
    fn non_character_input_only_reaches_host() {
        let mut s = session(Config::new(), "");
        input(&mut s, "ij");
        s.handle(Message::Input(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)));
        assert_eq!(s.host().text(), "");
        assert_eq!(s.detector().pending(), Some('j'));
    }

    #[test]
    fn expiry_message_clears_pending() {
        let mut s = session(Config::new(), "");
        s.handle(Message::Key { key: 'j', mode: Mode::Insert });
        s.handle(Message::TimerExpired(1));
        assert_eq!(s.detector().pending(), None);
    }

    #[test]
    fn setup_cancels_timer_and_reports() {
        let mut s = session(Config::new(), "");
        s.handle(Message::Key { key: 'j', mode: Mode::Insert });
        let diagnostics = s.handle(Message::Setup(Box::new(Config::new().with_mappings(["x"]))));
        assert_eq!(
            diagnostics,
            vec![ConfigError::InvalidMapping("x".into()), ConfigError::NoValidMappings]
        );
        assert_eq!(s.timer().armed(), None);
        assert_eq!(s.detector().pending(), None);
    }
}
