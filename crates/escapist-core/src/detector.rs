//! The per-keystroke state machine.

use crate::action::Resolution;
use crate::command::Command;
use crate::config::{Config, ConfigError, Settings};
use crate::key_sequence::KeySequenceTracker;
use crate::mode::Mode;
use tracing::{debug, trace, warn};

/// Watches a keystroke stream for configured two-key combinations.
///
/// A detector owns its settings and its single pending key. It is purely a
/// state machine: every entry point returns a [`Command`] describing the
/// timer and host effects to carry out, and never fails. Independent
/// detectors can coexist.
///
/// # Example
///
/// ```
/// use escapist_core::{Config, Detector, Effect, Mode};
///
/// let (mut detector, diagnostics) = Detector::new(Config::new());
/// assert!(diagnostics.is_empty());
///
/// // `j` arms the timer...
/// detector.on_key('j', Mode::Insert);
/// assert_eq!(detector.pending(), Some('j'));
///
/// // ...and `k` completes `jk`.
/// let effects = detector.on_key('k', Mode::Insert).into_effects();
/// assert!(effects.iter().any(|e| matches!(e, Effect::Feed(_))));
/// assert_eq!(detector.pending(), None);
/// ```
#[derive(Debug, Clone)]
pub struct Detector {
    settings: Settings,
    tracker: KeySequenceTracker,
}

impl Default for Detector {
    fn default() -> Self {
        let settings = Settings::default();
        let tracker = KeySequenceTracker::with_timeout(settings.timeout());
        Self { settings, tracker }
    }
}

impl Detector {
    /// Create a detector from `config`, returning any diagnostics.
    pub fn new(config: Config) -> (Self, Vec<ConfigError>) {
        let mut detector = Self::default();
        let diagnostics = detector.setup(config);
        (detector, diagnostics)
    }

    /// Replace the whole configuration.
    ///
    /// Rebuilds the combination table and drops any pending key; nothing from
    /// the previous configuration survives. The caller should also cancel its
    /// timer (the [`Session`](crate::Session) does).
    pub fn setup(&mut self, config: Config) -> Vec<ConfigError> {
        let (settings, diagnostics) = config.normalize();
        for diagnostic in &diagnostics {
            warn!("escapist configuration: {diagnostic}");
        }
        self.tracker.reset(settings.timeout());
        self.settings = settings;
        debug!(
            pairs = self.settings.pairs().len(),
            timeout_ms = self.settings.timeout().as_millis() as u64,
            "detector configured"
        );
        diagnostics
    }

    /// Classify one keystroke typed in `mode`.
    ///
    /// Keys typed in a mode without an enabled action are ignored and leave
    /// the pending key untouched. Otherwise, in priority order: completing the
    /// pending key's combination fires the action; a key that can start a
    /// combination (re)arms; anything else clears the pending key.
    pub fn on_key(&mut self, key: char, mode: Mode) -> Command {
        if !self.settings.actions().is_enabled(mode) {
            trace!(%key, %mode, "mode not enabled");
            return Command::none();
        }

        let table = self.settings.table();
        if let Some(first) = self.tracker.live() {
            if table.completes(first, key) {
                return self.matched(mode, first, key);
            }
        }

        if table.is_first(key) {
            let generation = self.tracker.arm(key);
            debug!(%key, generation, "armed");
            return Command::arm_timer(self.settings.timeout(), generation);
        }

        if self.tracker.clear() {
            trace!(%key, "pending key cleared");
            return Command::cancel_timer();
        }
        Command::none()
    }

    /// Handle the timer expiry tagged `generation`. Stale expiries are ignored.
    pub fn on_timer_expired(&mut self, generation: u64) {
        if self.tracker.expire(generation) {
            debug!(generation, "combination timed out");
        } else {
            trace!(generation, "stale timer expiry");
        }
    }

    fn matched(&mut self, mode: Mode, first: char, second: char) -> Command {
        self.tracker.clear();
        let resolution = self.settings.actions().resolve(mode, first, second);
        debug!(%mode, %first, %second, ?resolution, "combination matched");

        // Nothing dispatched means nothing to undo; the snapshot stays for a
        // later escape in the same mode.
        let Resolution::Keys(keys) = resolution else {
            return Command::cancel_timer();
        };
        let reconcile = if self.settings.suppress_modified() && mode.is_editing() {
            Command::reconcile()
        } else {
            Command::none()
        };
        Command::batch([Command::cancel_timer(), Command::feed(keys), reconcile])
    }

    /// The pending first key, if armed.
    pub fn pending(&self) -> Option<char> {
        self.tracker.pending()
    }

    /// The validated configuration currently in effect.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether keys typed in `mode` are classified at all.
    pub fn is_enabled(&self, mode: Mode) -> bool {
        self.settings.actions().is_enabled(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::EscapeAction;
    use crate::command::{Effect, TimerCommand};
    use crate::keys::KeySequence;
    use std::time::Duration;

    fn detector(config: Config) -> Detector {
        let (detector, diagnostics) = Detector::new(config);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        detector
    }

    fn fed(cmd: Command) -> Vec<KeySequence> {
        cmd.into_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Feed(keys) => Some(keys),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_key_arms_timer() {
        let mut d = detector(Config::new().with_timeout(Duration::from_millis(300)));
        let effects = d.on_key('j', Mode::Insert).into_effects();
        assert_eq!(
            effects,
            vec![Effect::Timer(TimerCommand::Arm {
                duration: Duration::from_millis(300),
                generation: 1,
            })]
        );
        assert_eq!(d.pending(), Some('j'));
    }

    #[test]
    fn every_configured_pair_matches_once() {
        let mut d = detector(Config::new().with_mappings(["jk", "fd", "df"]));
        for (first, second) in [('j', 'k'), ('f', 'd'), ('d', 'f')] {
            d.on_key(first, Mode::Insert);
            let keys = fed(d.on_key(second, Mode::Insert));
            assert_eq!(keys, vec![KeySequence::parse("<BS><BS><Esc>")]);
            assert_eq!(d.pending(), None);
        }
    }

    #[test]
    fn match_cancels_timer_before_dispatch() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Insert);
        let effects = d.on_key('k', Mode::Insert).into_effects();
        assert_eq!(effects[0], Effect::Timer(TimerCommand::Cancel));
        assert!(matches!(effects[1], Effect::Feed(_)));
        assert_eq!(effects[2], Effect::Reconcile);
    }

    #[test]
    fn non_editing_mode_skips_reconcile() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Terminal);
        let effects = d.on_key('k', Mode::Terminal).into_effects();
        assert!(!effects.contains(&Effect::Reconcile));
        assert!(effects.contains(&Effect::Feed(KeySequence::parse("<BS><BS><C-\\><C-n>"))));
    }

    #[test]
    fn suppression_off_skips_reconcile() {
        let mut d = detector(Config::new().with_suppress_modified(false));
        d.on_key('j', Mode::Insert);
        let effects = d.on_key('k', Mode::Insert).into_effects();
        assert!(!effects.contains(&Effect::Reconcile));
    }

    #[test]
    fn unrelated_key_clears_pending() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Insert);
        let effects = d.on_key('x', Mode::Insert).into_effects();
        assert_eq!(effects, vec![Effect::Timer(TimerCommand::Cancel)]);
        assert_eq!(d.pending(), None);
        assert!(fed(d.on_key('k', Mode::Insert)).is_empty());
    }

    #[test]
    fn non_matching_first_key_becomes_new_pending() {
        let mut d = detector(Config::new().with_mappings(["jk", "fd"]));
        d.on_key('j', Mode::Insert);
        d.on_key('f', Mode::Insert);
        assert_eq!(d.pending(), Some('f'));
        assert!(fed(d.on_key('k', Mode::Insert)).is_empty());
    }

    #[test]
    fn rearm_matches_the_newer_combination() {
        let mut d = detector(
            Config::new()
                .with_mappings(["jk", "fd"])
                .with_escape(Mode::Insert, EscapeAction::computed(|a, b| format!("{a}{b}"))),
        );
        d.on_key('j', Mode::Insert);
        d.on_key('f', Mode::Insert);
        let keys = fed(d.on_key('d', Mode::Insert));
        assert_eq!(keys, vec![KeySequence::parse("fd")]);
    }

    #[test]
    fn completion_beats_starting_a_new_combination() {
        // `k` both completes `jk` and starts `kj`.
        let mut d = detector(Config::new().with_mappings(["jk", "kj"]));
        d.on_key('j', Mode::Insert);
        assert_eq!(fed(d.on_key('k', Mode::Insert)).len(), 1);
        assert_eq!(d.pending(), None);
    }

    #[test]
    fn repeated_key_combination_matches() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Insert);
        assert_eq!(fed(d.on_key('j', Mode::Insert)).len(), 1);
        // A third `j` starts over rather than matching again.
        assert!(fed(d.on_key('j', Mode::Insert)).is_empty());
        assert_eq!(d.pending(), Some('j'));
    }

    #[test]
    fn pair_after_timeout_does_not_match() {
        let mut d = detector(Config::new().with_timeout(Duration::from_millis(1)));
        d.on_key('j', Mode::Insert);
        std::thread::sleep(Duration::from_millis(5));
        assert!(fed(d.on_key('k', Mode::Insert)).is_empty());
        assert_eq!(d.pending(), None);
    }

    #[test]
    fn expiry_clears_pending() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Insert);
        d.on_timer_expired(1);
        assert_eq!(d.pending(), None);
        assert!(fed(d.on_key('k', Mode::Insert)).is_empty());
    }

    #[test]
    fn stale_expiry_keeps_newer_pending() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Insert);
        d.on_key('j', Mode::Insert); // match
        d.on_key('j', Mode::Insert); // re-armed, generation 2
        d.on_timer_expired(1);
        assert_eq!(d.pending(), Some('j'));
    }

    #[test]
    fn disabled_mode_ignores_keys_and_keeps_pending() {
        let mut d = detector(Config::new().with_escape(Mode::CommandLine, EscapeAction::Disabled));
        d.on_key('j', Mode::Insert);
        assert!(d.on_key('x', Mode::CommandLine).is_none());
        assert_eq!(d.pending(), Some('j'));
        assert!(d.on_key('k', Mode::CommandLine).is_none());
    }

    #[test]
    fn unsupported_mode_is_ignored() {
        let mut d = detector(Config::new());
        assert!(d.on_key('j', Mode::Normal).is_none());
        assert_eq!(d.pending(), None);
    }

    #[test]
    fn mode_switch_mid_combination_matches_in_new_enabled_mode() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Insert);
        let effects = d.on_key('k', Mode::CommandLine).into_effects();
        assert!(effects.contains(&Effect::Feed(KeySequence::parse("<BS><BS><C-c>"))));
        assert!(!effects.contains(&Effect::Reconcile));
    }

    #[test]
    fn empty_computed_action_dispatches_nothing() {
        let mut d = detector(
            Config::new()
                .with_mappings(["AA"])
                .with_escape(Mode::Insert, EscapeAction::computed(|_, _| String::new())),
        );
        d.on_key('A', Mode::Insert);
        let effects = d.on_key('A', Mode::Insert).into_effects();
        assert_eq!(effects, vec![Effect::Timer(TimerCommand::Cancel)]);
        assert_eq!(d.pending(), None);
    }

    #[test]
    fn setup_replaces_previous_mappings() {
        let mut d = detector(Config::new().with_mappings(["jk"]));
        let diagnostics = d.setup(Config::new().with_mappings(["fd"]));
        assert!(diagnostics.is_empty());
        d.on_key('j', Mode::Insert);
        assert_eq!(d.pending(), None);
        assert!(fed(d.on_key('k', Mode::Insert)).is_empty());
        d.on_key('f', Mode::Insert);
        assert_eq!(fed(d.on_key('d', Mode::Insert)).len(), 1);
    }

    #[test]
    fn setup_drops_pending_key() {
        let mut d = detector(Config::new());
        d.on_key('j', Mode::Insert);
        d.setup(Config::new());
        assert_eq!(d.pending(), None);
        assert!(fed(d.on_key('k', Mode::Insert)).is_empty());
    }

    #[test]
    fn invalid_setup_reports_and_falls_back() {
        let (mut d, diagnostics) = Detector::new(Config::new().with_mappings(["abc"]));
        assert_eq!(
            diagnostics,
            vec![ConfigError::InvalidMapping("abc".into()), ConfigError::NoValidMappings]
        );
        d.on_key('j', Mode::Insert);
        assert_eq!(fed(d.on_key('k', Mode::Insert)).len(), 1);
    }
}
