//! Tracks the pending first key of a combination with a timeout.

use std::time::{Duration, Instant};

/// Holds at most one pending first key and the moment it was typed.
///
/// Every [`arm`](KeySequenceTracker::arm) hands out a fresh generation
/// number. A timer expiry carries the generation it was armed with, so an
/// expiry that lost a race against a newer key is recognized as stale and
/// ignored.
///
/// # Example
///
/// ```
/// use escapist_core::key_sequence::KeySequenceTracker;
/// use std::time::Duration;
///
/// let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
/// let generation = tracker.arm('j');
/// assert_eq!(tracker.pending(), Some('j'));
///
/// // A newer arm makes the old expiry stale.
/// tracker.arm('f');
/// assert!(!tracker.expire(generation));
/// assert_eq!(tracker.pending(), Some('f'));
/// ```
#[derive(Debug, Clone)]
pub struct KeySequenceTracker {
    pending: Option<Pending>,
    timeout: Duration,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    key: char,
    since: Instant,
    generation: u64,
}

impl KeySequenceTracker {
    /// Create an idle tracker with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: None,
            timeout,
            generation: 0,
        }
    }

    /// Record `key` as the pending first key, replacing any previous one.
    /// Returns the generation to attach to this arming's timer.
    pub fn arm(&mut self, key: char) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.pending = Some(Pending {
            key,
            since: Instant::now(),
            generation: self.generation,
        });
        self.generation
    }

    /// The pending key, if one is armed and its timeout has not elapsed.
    ///
    /// The timer normally clears an expired key, but its expiry can still be
    /// queued behind the next keystroke; the elapsed check covers that gap.
    pub fn live(&self) -> Option<char> {
        self.pending
            .filter(|p| p.since.elapsed() < self.timeout)
            .map(|p| p.key)
    }

    /// The pending key regardless of elapsed time.
    pub fn pending(&self) -> Option<char> {
        self.pending.map(|p| p.key)
    }

    /// Clear the pending key. Returns `true` if one was armed.
    pub fn clear(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Handle a timer expiry for `generation`.
    ///
    /// Clears the pending key only if it is still the one that arming
    /// scheduled. Returns `true` if something was cleared.
    pub fn expire(&mut self, generation: u64) -> bool {
        match self.pending {
            Some(p) if p.generation == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending key and switch to a new timeout.
    ///
    /// The generation counter keeps counting, so expiries armed before the
    /// reset stay stale.
    pub fn reset(&mut self, timeout: Duration) {
        self.pending = None;
        self.timeout = timeout;
    }

    /// Returns `true` if a key is waiting for its partner.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_tracker_has_nothing_pending() {
        let tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
        assert!(!tracker.has_pending());
        assert_eq!(tracker.live(), None);
    }

    #[test]
    fn armed_key_is_live_within_timeout() {
        let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
        tracker.arm('j');
        assert_eq!(tracker.live(), Some('j'));
    }

    #[test]
    fn armed_key_goes_stale_after_timeout() {
        let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(1));
        tracker.arm('j');
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(tracker.live(), None);
        // Still recorded until the expiry clears it.
        assert_eq!(tracker.pending(), Some('j'));
    }

    #[test]
    fn rearm_replaces_pending_key() {
        let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
        let first = tracker.arm('j');
        let second = tracker.arm('f');
        assert_ne!(first, second);
        assert_eq!(tracker.pending(), Some('f'));
    }

    #[test]
    fn matching_expiry_clears() {
        let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
        let generation = tracker.arm('j');
        assert!(tracker.expire(generation));
        assert!(!tracker.has_pending());
    }

    #[test]
    fn stale_expiry_is_ignored() {
        let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
        let stale = tracker.arm('j');
        tracker.arm('j');
        assert!(!tracker.expire(stale));
        assert_eq!(tracker.pending(), Some('j'));
    }

    #[test]
    fn expiry_after_clear_is_inert() {
        let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
        let generation = tracker.arm('j');
        assert!(tracker.clear());
        assert!(!tracker.expire(generation));
        assert!(!tracker.clear());
    }

    #[test]
    fn reset_keeps_old_generations_stale() {
        let mut tracker = KeySequenceTracker::with_timeout(Duration::from_millis(500));
        let old = tracker.arm('j');
        tracker.reset(Duration::from_millis(100));
        assert!(!tracker.has_pending());
        assert_eq!(tracker.timeout(), Duration::from_millis(100));
        let new = tracker.arm('j');
        assert_ne!(old, new);
        assert!(!tracker.expire(old));
        assert!(tracker.expire(new));
    }
}
