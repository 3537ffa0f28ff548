//! Key notation and the synthesized key sequences dispatched to the host.
//!
//! Escape actions are written the way editors write mappings: plain
//! characters stand for themselves and special keys go in angle brackets,
//! optionally with modifier prefixes.
//!
//! ```
//! use escapist_core::keys::KeySequence;
//! use crossterm::event::{KeyCode, KeyModifiers};
//!
//! let seq = KeySequence::parse("<BS><BS><C-c>");
//! assert_eq!(seq.len(), 3);
//! assert_eq!(seq.keys()[0].code, KeyCode::Backspace);
//! assert_eq!(seq.keys()[2].modifiers, KeyModifiers::CONTROL);
//! assert_eq!(seq.to_string(), "<BS><BS><C-c>");
//! ```

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The character a key press types, if it is a plain character.
///
/// Shift is allowed since it only selects the character; any other modifier
/// makes the press a command rather than text.
pub fn typed_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(ch) if key.modifiers.difference(KeyModifiers::SHIFT).is_empty() => Some(ch),
        _ => None,
    }
}

/// An ordered list of virtual key presses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySequence {
    keys: Vec<KeyEvent>,
}

impl KeySequence {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from already-constructed key events.
    pub fn from_keys(keys: Vec<KeyEvent>) -> Self {
        Self { keys }
    }

    /// Parse key notation.
    ///
    /// Parsing never fails: a `<...>` group that is not a known key name is
    /// taken literally, one character at a time, as is an unterminated `<`.
    pub fn parse(notation: &str) -> Self {
        let chars: Vec<char> = notation.chars().collect();
        let mut keys = Vec::with_capacity(chars.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '<' {
                if let Some(len) = chars[i + 1..].iter().position(|&c| c == '>') {
                    let inner: String = chars[i + 1..i + 1 + len].iter().collect();
                    if let Some(key) = parse_group(&inner) {
                        keys.push(key);
                        i += len + 2;
                        continue;
                    }
                }
            }
            keys.push(KeyEvent::new(KeyCode::Char(chars[i]), KeyModifiers::NONE));
            i += 1;
        }
        Self { keys }
    }

    /// The key events in dispatch order.
    pub fn keys(&self) -> &[KeyEvent] {
        &self.keys
    }

    /// Number of key presses.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the sequence has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the key events.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyEvent> {
        self.keys.iter()
    }
}

impl FromStr for KeySequence {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl<'a> IntoIterator for &'a KeySequence {
    type Item = &'a KeyEvent;
    type IntoIter = std::slice::Iter<'a, KeyEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.keys {
            write_key(f, key)?;
        }
        Ok(())
    }
}

/// Parse the inside of a `<...>` group: modifier prefixes, then a single
/// character or a key name.
fn parse_group(inner: &str) -> Option<KeyEvent> {
    let mut modifiers = KeyModifiers::NONE;
    let mut rest = inner;
    while rest.len() > 2 && rest.as_bytes()[1] == b'-' {
        let modifier = match rest.as_bytes()[0].to_ascii_uppercase() {
            b'C' => KeyModifiers::CONTROL,
            b'A' | b'M' => KeyModifiers::ALT,
            b'S' => KeyModifiers::SHIFT,
            _ => break,
        };
        modifiers |= modifier;
        rest = &rest[2..];
    }

    let mut chars = rest.chars();
    let code = match (chars.next(), chars.next()) {
        // `<x>` without modifiers is not a key in editor notation.
        (Some(_), None) if modifiers.is_empty() => return None,
        (Some(c), None) => KeyCode::Char(c),
        _ => named_key(rest)?,
    };
    Some(KeyEvent::new(code, modifiers))
}

fn named_key(name: &str) -> Option<KeyCode> {
    let code = match name.to_ascii_lowercase().as_str() {
        "esc" | "escape" => KeyCode::Esc,
        "bs" | "backspace" => KeyCode::Backspace,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        "del" | "delete" => KeyCode::Delete,
        "lt" => KeyCode::Char('<'),
        "bar" => KeyCode::Char('|'),
        "bslash" => KeyCode::Char('\\'),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        other => {
            let n = other.strip_prefix('f')?.parse::<u8>().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
    };
    Some(code)
}

fn write_key(f: &mut fmt::Formatter<'_>, key: &KeyEvent) -> fmt::Result {
    if key.modifiers.is_empty() {
        match key.code {
            KeyCode::Char('<') => return f.write_str("<lt>"),
            KeyCode::Char(c) => return write!(f, "{c}"),
            _ => {}
        }
    }

    f.write_str("<")?;
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        f.write_str("C-")?;
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        f.write_str("A-")?;
    }
    if key.modifiers.contains(KeyModifiers::SHIFT) {
        f.write_str("S-")?;
    }
    match key.code {
        KeyCode::Char(' ') => f.write_str("Space")?,
        KeyCode::Char('<') => f.write_str("lt")?,
        KeyCode::Char(c) => write!(f, "{c}")?,
        KeyCode::Esc => f.write_str("Esc")?,
        KeyCode::Backspace => f.write_str("BS")?,
        KeyCode::Enter => f.write_str("CR")?,
        KeyCode::Tab => f.write_str("Tab")?,
        KeyCode::Delete => f.write_str("Del")?,
        KeyCode::Up => f.write_str("Up")?,
        KeyCode::Down => f.write_str("Down")?,
        KeyCode::Left => f.write_str("Left")?,
        KeyCode::Right => f.write_str("Right")?,
        KeyCode::Home => f.write_str("Home")?,
        KeyCode::End => f.write_str("End")?,
        KeyCode::F(n) => write!(f, "F{n}")?,
        other => write!(f, "{other:?}")?,
    }
    f.write_str(">")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn plain_characters_are_literal() {
        let seq = KeySequence::parse("ab");
        assert_eq!(
            seq.keys(),
            &[key(KeyCode::Char('a')), key(KeyCode::Char('b'))]
        );
    }

    #[test]
    fn named_keys_are_case_insensitive() {
        let seq = KeySequence::parse("<esc><Bs><CR><TAB>");
        assert_eq!(
            seq.keys(),
            &[
                key(KeyCode::Esc),
                key(KeyCode::Backspace),
                key(KeyCode::Enter),
                key(KeyCode::Tab),
            ]
        );
    }

    #[test]
    fn terminal_escape_parses_with_modifiers() {
        let seq = KeySequence::parse("<C-\\><C-n>");
        assert_eq!(
            seq.keys(),
            &[
                KeyEvent::new(KeyCode::Char('\\'), KeyModifiers::CONTROL),
                KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL),
            ]
        );
    }

    #[test]
    fn stacked_modifiers_combine() {
        let seq = KeySequence::parse("<C-A-x>");
        assert_eq!(
            seq.keys()[0].modifiers,
            KeyModifiers::CONTROL | KeyModifiers::ALT
        );
    }

    #[test]
    fn unknown_groups_are_literal() {
        let seq = KeySequence::parse("<nope>");
        assert_eq!(seq.len(), 6);
        assert_eq!(seq.keys()[0], key(KeyCode::Char('<')));
        assert_eq!(seq.keys()[5], key(KeyCode::Char('>')));
    }

    #[test]
    fn single_char_group_without_modifier_is_literal() {
        assert_eq!(KeySequence::parse("<x>").len(), 3);
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        let seq = KeySequence::parse("a<Esc");
        assert_eq!(seq.len(), 5);
        assert_eq!(seq.to_string(), "a<lt>Esc");
    }

    #[test]
    fn empty_notation_is_empty() {
        assert!(KeySequence::parse("").is_empty());
    }

    #[test]
    fn function_keys_parse_within_range() {
        assert_eq!(KeySequence::parse("<F5>").keys(), &[key(KeyCode::F(5))]);
        assert_eq!(KeySequence::parse("<F13>").len(), 5);
    }

    #[test]
    fn built_sequence_matches_parsed() {
        let built = KeySequence::from_keys(vec![
            key(KeyCode::Backspace),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ]);
        assert_eq!(built, KeySequence::parse("<BS><C-c>"));
    }

    #[test]
    fn only_plain_characters_are_typed() {
        assert_eq!(typed_char(&key(KeyCode::Char('j'))), Some('j'));
        assert_eq!(
            typed_char(&KeyEvent::new(KeyCode::Char('J'), KeyModifiers::SHIFT)),
            Some('J')
        );
        assert_eq!(
            typed_char(&KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(typed_char(&key(KeyCode::Esc)), None);
    }

    #[test]
    fn display_uses_canonical_names() {
        let seq = KeySequence::parse("<backspace><escape><lt><space>");
        assert_eq!(seq.to_string(), "<BS><Esc><lt> ");
    }
}
