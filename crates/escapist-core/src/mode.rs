//! Host input modes and which of them take part in escape detection.

use std::fmt;
use std::str::FromStr;

/// The input mode a keystroke was typed in.
///
/// Only [`Insert`](Mode::Insert), [`Replace`](Mode::Replace),
/// [`Terminal`](Mode::Terminal) and [`CommandLine`](Mode::CommandLine) can
/// carry an escape action. Keys typed in any other mode are ignored by the
/// detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Normal (command) mode.
    Normal,
    /// Text insertion.
    Insert,
    /// Overtype / replace.
    Replace,
    /// Visual selection.
    Visual,
    /// Select mode.
    Select,
    /// An embedded terminal receiving keys.
    Terminal,
    /// The `:` command line.
    CommandLine,
}

impl Mode {
    /// Every mode that accepts an escape action, in configuration order.
    pub const SUPPORTED: [Mode; 4] = [
        Mode::Insert,
        Mode::Replace,
        Mode::Terminal,
        Mode::CommandLine,
    ];

    /// Whether this mode can be configured with an escape action.
    pub fn supports_escape(self) -> bool {
        Self::SUPPORTED.contains(&self)
    }

    /// Whether keys typed in this mode edit the document buffer.
    pub fn is_editing(self) -> bool {
        matches!(self, Mode::Insert | Mode::Replace)
    }

    /// The canonical configuration name of this mode.
    pub fn name(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Insert => "insert",
            Mode::Replace => "replace",
            Mode::Visual => "visual",
            Mode::Select => "select",
            Mode::Terminal => "terminal",
            Mode::CommandLine => "command",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configuration name that does not denote any mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    /// Accepts the long names and the editor's single-letter short names.
    /// Short names are case sensitive (`R` is replace).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" | "normal" => Ok(Mode::Normal),
            "i" | "insert" => Ok(Mode::Insert),
            "R" | "replace" => Ok(Mode::Replace),
            "v" | "visual" => Ok(Mode::Visual),
            "s" | "select" => Ok(Mode::Select),
            "t" | "terminal" => Ok(Mode::Terminal),
            "c" | "command" | "cmdline" => Ok(Mode::CommandLine),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}
