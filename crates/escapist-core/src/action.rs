//! Escape actions per mode and their resolution on a match.

use crate::keys::KeySequence;
use crate::mode::Mode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a computed escape action: receives the matched pair and
/// returns key notation to dispatch. An empty string means "do nothing".
pub type EscapeFn = dyn Fn(char, char) -> String + Send + Sync;

/// What to do when a combination matches in a given mode.
#[derive(Clone)]
pub enum EscapeAction {
    /// Dispatch a fixed key sequence.
    Sequence(KeySequence),
    /// Compute the key sequence from the matched pair.
    Computed(Arc<EscapeFn>),
    /// Detection is turned off for the mode.
    Disabled,
}

impl EscapeAction {
    /// A fixed action written in key notation.
    pub fn keys(notation: &str) -> Self {
        EscapeAction::Sequence(KeySequence::parse(notation))
    }

    /// An action computed by `f(first, second)`.
    pub fn computed(f: impl Fn(char, char) -> String + Send + Sync + 'static) -> Self {
        EscapeAction::Computed(Arc::new(f))
    }

    /// The built-in action for `mode`: delete the two inserted characters,
    /// then leave the mode. `None` for modes without escape support.
    pub fn default_for(mode: Mode) -> Option<Self> {
        let notation = match mode {
            Mode::Insert | Mode::Replace => "<BS><BS><Esc>",
            Mode::CommandLine => "<BS><BS><C-c>",
            Mode::Terminal => "<BS><BS><C-\\><C-n>",
            _ => return None,
        };
        Some(Self::keys(notation))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, EscapeAction::Disabled)
    }
}

impl fmt::Debug for EscapeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscapeAction::Sequence(seq) => {
                f.debug_tuple("Sequence").field(&seq.to_string()).finish()
            }
            EscapeAction::Computed(_) => f.write_str("Computed(..)"),
            EscapeAction::Disabled => f.write_str("Disabled"),
        }
    }
}

/// The outcome of resolving a matched pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The mode has no enabled action.
    Disabled,
    /// The action resolved to nothing; the match is a no-op.
    Empty,
    /// Keys to dispatch to the host. Never empty.
    Keys(KeySequence),
}

/// Per-mode escape actions, fully populated for every supported mode.
#[derive(Debug, Clone)]
pub struct ActionResolver {
    actions: HashMap<Mode, EscapeAction>,
}

impl Default for ActionResolver {
    fn default() -> Self {
        let actions = Mode::SUPPORTED
            .into_iter()
            .filter_map(|mode| EscapeAction::default_for(mode).map(|action| (mode, action)))
            .collect();
        Self { actions }
    }
}

impl ActionResolver {
    /// Replace the action for a supported mode. Unsupported modes are ignored;
    /// configuration validation rejects them before they get here.
    pub(crate) fn set(&mut self, mode: Mode, action: EscapeAction) {
        if mode.supports_escape() {
            self.actions.insert(mode, action);
        }
    }

    /// The configured action for `mode`, if the mode is supported.
    pub fn get(&self, mode: Mode) -> Option<&EscapeAction> {
        self.actions.get(&mode)
    }

    /// Whether keys typed in `mode` take part in detection.
    pub fn is_enabled(&self, mode: Mode) -> bool {
        self.get(mode).is_some_and(|action| !action.is_disabled())
    }

    /// Resolve the action for a matched `(first, second)` pair in `mode`.
    ///
    /// Fixed sequences come back unchanged; computed actions are invoked with
    /// the pair and their notation parsed verbatim.
    pub fn resolve(&self, mode: Mode, first: char, second: char) -> Resolution {
        let keys = match self.get(mode) {
            None | Some(EscapeAction::Disabled) => return Resolution::Disabled,
            Some(EscapeAction::Sequence(seq)) => seq.clone(),
            Some(EscapeAction::Computed(f)) => KeySequence::parse(&f(first, second)),
        };
        if keys.is_empty() {
            Resolution::Empty
        } else {
            Resolution::Keys(keys)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_supported_mode() {
        let resolver = ActionResolver::default();
        for mode in Mode::SUPPORTED {
            assert!(resolver.is_enabled(mode), "{mode} should be enabled");
        }
        assert!(!resolver.is_enabled(Mode::Normal));
        assert!(!resolver.is_enabled(Mode::Visual));
    }

    #[test]
    fn fixed_sequence_is_returned_unchanged() {
        let resolver = ActionResolver::default();
        assert_eq!(
            resolver.resolve(Mode::Insert, 'j', 'k'),
            Resolution::Keys(KeySequence::parse("<BS><BS><Esc>")),
        );
        assert_eq!(
            resolver.resolve(Mode::Terminal, 'j', 'k'),
            Resolution::Keys(KeySequence::parse("<BS><BS><C-\\><C-n>")),
        );
    }

    #[test]
    fn computed_action_receives_the_pair() {
        let mut resolver = ActionResolver::default();
        resolver.set(
            Mode::Insert,
            EscapeAction::computed(|first, second| format!("<BS><BS>{second}{first}")),
        );
        assert_eq!(
            resolver.resolve(Mode::Insert, 'j', 'k'),
            Resolution::Keys(KeySequence::parse("<BS><BS>kj")),
        );
    }

    #[test]
    fn computed_empty_result_is_empty_resolution() {
        let mut resolver = ActionResolver::default();
        resolver.set(Mode::Insert, EscapeAction::computed(|_, _| String::new()));
        assert_eq!(resolver.resolve(Mode::Insert, 'A', 'A'), Resolution::Empty);
        assert!(resolver.is_enabled(Mode::Insert));
    }

    #[test]
    fn disabled_mode_resolves_disabled() {
        let mut resolver = ActionResolver::default();
        resolver.set(Mode::CommandLine, EscapeAction::Disabled);
        assert!(!resolver.is_enabled(Mode::CommandLine));
        assert_eq!(
            resolver.resolve(Mode::CommandLine, 'j', 'k'),
            Resolution::Disabled
        );
    }

    #[test]
    fn unsupported_modes_are_never_set() {
        let mut resolver = ActionResolver::default();
        resolver.set(Mode::Visual, EscapeAction::keys("<Esc>"));
        assert!(resolver.get(Mode::Visual).is_none());
    }
}
