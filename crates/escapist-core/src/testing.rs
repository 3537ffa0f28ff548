//! Headless stand-ins for an editor and a timer.
//!
//! [`ScratchBuffer`] is a tiny modal text buffer that implements [`Host`],
//! [`ManualTimer`] is a [`TimerDriver`] that only fires when told to, and
//! [`TestSession`] wires both to a [`Session`] the way an editor integration
//! would. None of them needs a tokio runtime or a terminal.

use crate::command::TimerCommand;
use crate::config::{Config, ConfigError};
use crate::detector::Detector;
use crate::event::Message;
use crate::host::{Cursor, DocumentId, Host, HostError};
use crate::keys::{typed_char, KeySequence};
use crate::mode::Mode;
use crate::modified::ReconcileOutcome;
use crate::session::Session;
use crate::timer::TimerDriver;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

const DOCUMENT: DocumentId = DocumentId(1);

/// An in-memory, single-document modal buffer.
///
/// It understands just enough editing to behave like a real host under an
/// escape sequence: typing and backspacing in insert and replace mode,
/// `<Esc>` back to normal mode, `<C-c>` out of the command line and
/// `<C-\><C-n>` out of terminal mode. Any edit sets the modified flag.
///
/// In normal mode `i`/`a` enter insert mode, `R` replace mode, `:` the
/// command line and `t` the terminal prompt; `h`/`l` move and `x` deletes.
#[derive(Debug, Clone)]
pub struct ScratchBuffer {
    lines: Vec<String>,
    cursor: Cursor,
    mode: Mode,
    modified: bool,
    open: bool,
    /// Characters overwritten in replace mode, so backspace can restore them.
    replaced: Vec<Option<char>>,
    prompt: String,
    ctrl_backslash: bool,
    submitted: Vec<String>,
    fed: Vec<KeySequence>,
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::with_content("")
    }
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// An unmodified buffer in normal mode holding `text`.
    pub fn with_content(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(String::from).collect(),
            cursor: Cursor::default(),
            mode: Mode::Normal,
            modified: false,
            open: true,
            replaced: Vec::new(),
            prompt: String::new(),
            ctrl_backslash: false,
            submitted: Vec::new(),
            fed: Vec::new(),
        }
    }

    /// Switch mode directly, without any key.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.replaced.clear();
        self.prompt.clear();
        self.ctrl_backslash = false;
    }

    /// Type one plain character. Returns the new mode if it changed.
    pub fn type_char(&mut self, ch: char) -> Option<Mode> {
        self.press(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE))
    }

    /// Apply one key press. Returns the new mode if it changed.
    pub fn press(&mut self, key: KeyEvent) -> Option<Mode> {
        if !self.open {
            return None;
        }
        let before = self.mode;
        match self.mode {
            Mode::Normal => self.normal_key(key),
            Mode::Insert => self.insert_key(key),
            Mode::Replace => self.replace_key(key),
            Mode::CommandLine | Mode::Terminal => self.prompt_key(key),
            Mode::Visual | Mode::Select => {
                if key.code == KeyCode::Esc {
                    self.set_mode(Mode::Normal);
                }
            }
        }
        (self.mode != before).then_some(self.mode)
    }

    fn normal_key(&mut self, key: KeyEvent) {
        if !key.modifiers.difference(KeyModifiers::SHIFT).is_empty() {
            return;
        }
        let Some(ch) = typed_char(&key) else {
            match key.code {
                KeyCode::Left => self.cursor.column = self.cursor.column.saturating_sub(1),
                KeyCode::Right => self.move_right(),
                _ => {}
            }
            return;
        };
        match ch {
            'i' => self.set_mode(Mode::Insert),
            'a' => {
                self.cursor.column = (self.cursor.column + 1).min(self.line_len());
                self.set_mode(Mode::Insert);
            }
            'R' => self.set_mode(Mode::Replace),
            ':' => self.set_mode(Mode::CommandLine),
            't' => self.set_mode(Mode::Terminal),
            'h' => self.cursor.column = self.cursor.column.saturating_sub(1),
            'l' => self.move_right(),
            'x' if self.cursor.column < self.line_len() => {
                let idx = self.byte_index(self.cursor.column);
                self.current_line_mut().remove(idx);
                self.modified = true;
                self.clamp_normal_cursor();
            }
            _ => {}
        }
    }

    fn insert_key(&mut self, key: KeyEvent) {
        match (key.code, typed_char(&key).is_some()) {
            (KeyCode::Char(ch), true) => {
                let idx = self.byte_index(self.cursor.column);
                self.current_line_mut().insert(idx, ch);
                self.cursor.column += 1;
                self.modified = true;
            }
            (KeyCode::Char('c'), false) if key.modifiers == KeyModifiers::CONTROL => {
                self.leave_editing();
            }
            (KeyCode::Esc, _) => self.leave_editing(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Enter, _) => {
                let idx = self.byte_index(self.cursor.column);
                let rest = self.current_line_mut().split_off(idx);
                self.lines.insert(self.cursor.line + 1, rest);
                self.cursor = Cursor::new(self.cursor.line + 1, 0);
                self.modified = true;
            }
            (KeyCode::Left, _) => self.cursor.column = self.cursor.column.saturating_sub(1),
            (KeyCode::Right, _) => {
                self.cursor.column = (self.cursor.column + 1).min(self.line_len());
            }
            _ => {}
        }
    }

    fn replace_key(&mut self, key: KeyEvent) {
        match (key.code, typed_char(&key).is_some()) {
            (KeyCode::Char(ch), true) => {
                let column = self.cursor.column;
                let idx = self.byte_index(column);
                let original = if column < self.line_len() {
                    Some(self.current_line_mut().remove(idx))
                } else {
                    None
                };
                self.current_line_mut().insert(idx, ch);
                self.replaced.push(original);
                self.cursor.column += 1;
                self.modified = true;
            }
            (KeyCode::Esc, _) => self.leave_editing(),
            (KeyCode::Backspace, _) if self.cursor.column > 0 => {
                self.cursor.column -= 1;
                if let Some(original) = self.replaced.pop() {
                    let idx = self.byte_index(self.cursor.column);
                    self.current_line_mut().remove(idx);
                    if let Some(original) = original {
                        self.current_line_mut().insert(idx, original);
                    }
                }
            }
            _ => {}
        }
    }

    fn prompt_key(&mut self, key: KeyEvent) {
        let ctrl_backslash = std::mem::take(&mut self.ctrl_backslash);
        match (key.code, typed_char(&key).is_some()) {
            (KeyCode::Char(ch), true) => self.prompt.push(ch),
            (KeyCode::Char('\\'), false) if self.mode == Mode::Terminal => {
                self.ctrl_backslash = key.modifiers == KeyModifiers::CONTROL;
            }
            (KeyCode::Char('n'), false) if self.mode == Mode::Terminal => {
                if ctrl_backslash && key.modifiers == KeyModifiers::CONTROL {
                    self.set_mode(Mode::Normal);
                }
            }
            (KeyCode::Char('c'), false) if self.mode == Mode::CommandLine => {
                if key.modifiers == KeyModifiers::CONTROL {
                    self.set_mode(Mode::Normal);
                }
            }
            (KeyCode::Esc, _) if self.mode == Mode::CommandLine => self.set_mode(Mode::Normal),
            (KeyCode::Backspace, _) => {
                if self.prompt.pop().is_none() && self.mode == Mode::CommandLine {
                    self.set_mode(Mode::Normal);
                }
            }
            (KeyCode::Enter, _) => {
                self.submitted.push(std::mem::take(&mut self.prompt));
                if self.mode == Mode::CommandLine {
                    self.set_mode(Mode::Normal);
                }
            }
            _ => {}
        }
    }

    fn backspace(&mut self) {
        if self.cursor.column > 0 {
            self.cursor.column -= 1;
            let idx = self.byte_index(self.cursor.column);
            self.current_line_mut().remove(idx);
            self.modified = true;
        } else if self.cursor.line > 0 {
            let line = self.lines.remove(self.cursor.line);
            self.cursor.line -= 1;
            self.cursor.column = self.line_len();
            self.current_line_mut().push_str(&line);
            self.modified = true;
        }
    }

    fn leave_editing(&mut self) {
        self.set_mode(Mode::Normal);
        self.cursor.column = self.cursor.column.saturating_sub(1);
        self.clamp_normal_cursor();
    }

    fn move_right(&mut self) {
        self.cursor.column += 1;
        self.clamp_normal_cursor();
    }

    fn clamp_normal_cursor(&mut self) {
        self.cursor.column = self.cursor.column.min(self.line_len().saturating_sub(1));
    }

    fn line_len(&self) -> usize {
        self.lines[self.cursor.line].chars().count()
    }

    fn byte_index(&self, column: usize) -> usize {
        let line = &self.lines[self.cursor.line];
        line.char_indices().nth(column).map_or(line.len(), |(i, _)| i)
    }

    fn current_line_mut(&mut self) -> &mut String {
        &mut self.lines[self.cursor.line]
    }

    fn check(&self, doc: DocumentId) -> Result<(), HostError> {
        if self.open && doc == DOCUMENT {
            Ok(())
        } else {
            Err(HostError::InvalidDocument(doc))
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The buffer text, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Text typed so far on the command line or terminal prompt.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Lines submitted from the command line or terminal prompt with `<CR>`.
    pub fn submitted(&self) -> &[String] {
        &self.submitted
    }

    /// Every sequence passed to [`Host::feed_keys`], in order.
    pub fn fed(&self) -> &[KeySequence] {
        &self.fed
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn cursor_position(&self) -> Cursor {
        self.cursor
    }

    /// Move the cursor, clamped to the buffer.
    pub fn set_cursor_position(&mut self, cursor: Cursor) {
        let line = cursor.line.min(self.lines.len() - 1);
        let column = cursor.column.min(self.lines[line].chars().count());
        self.cursor = Cursor::new(line, column);
    }

    /// Close the document. Every later [`Host`] query fails.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Host for ScratchBuffer {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn apply_key(&mut self, key: KeyEvent) -> Option<Mode> {
        self.press(key)
    }

    fn feed_keys(&mut self, keys: &KeySequence) {
        self.fed.push(keys.clone());
        for key in keys {
            self.press(*key);
        }
    }

    fn current_document(&self) -> DocumentId {
        DOCUMENT
    }

    fn is_modified(&self, doc: DocumentId) -> Result<bool, HostError> {
        self.check(doc)?;
        Ok(self.modified)
    }

    fn content(&self, doc: DocumentId) -> Result<String, HostError> {
        self.check(doc)?;
        Ok(self.text())
    }

    fn set_modified(&mut self, doc: DocumentId, modified: bool) -> Result<(), HostError> {
        self.check(doc)?;
        self.modified = modified;
        Ok(())
    }

    fn cursor(&self, doc: DocumentId) -> Result<Cursor, HostError> {
        self.check(doc)?;
        Ok(self.cursor)
    }

    fn set_cursor(&mut self, doc: DocumentId, cursor: Cursor) -> Result<(), HostError> {
        self.check(doc)?;
        let Some(line) = self.lines.get(cursor.line) else {
            return Err(HostError::InvalidPosition {
                line: cursor.line,
                column: cursor.column,
            });
        };
        if cursor.column > line.chars().count() {
            return Err(HostError::InvalidPosition {
                line: cursor.line,
                column: cursor.column,
            });
        }
        self.cursor = cursor;
        Ok(())
    }
}

/// A [`TimerDriver`] that records what it was asked to do and only expires
/// when [`fire`](ManualTimer::fire) is called.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    armed: Option<(Duration, u64)>,
    history: Vec<TimerCommand>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The running countdown's duration and generation.
    pub fn armed(&self) -> Option<(Duration, u64)> {
        self.armed
    }

    /// Every command received, in order.
    pub fn history(&self) -> &[TimerCommand] {
        &self.history
    }

    pub fn cancellations(&self) -> usize {
        self.history
            .iter()
            .filter(|cmd| matches!(cmd, TimerCommand::Cancel))
            .count()
    }

    /// Expire the running countdown, returning the message a real timer
    /// would have delivered.
    pub fn fire(&mut self) -> Option<Message> {
        self.armed
            .take()
            .map(|(_, generation)| Message::TimerExpired(generation))
    }
}

impl TimerDriver for ManualTimer {
    fn arm(&mut self, duration: Duration, generation: u64) {
        self.armed = Some((duration, generation));
        self.history.push(TimerCommand::Arm {
            duration,
            generation,
        });
    }

    fn cancel(&mut self) {
        self.armed = None;
        self.history.push(TimerCommand::Cancel);
    }
}

/// Drives a [`Session`] over a [`ScratchBuffer`] the way an editor would.
///
/// Each key goes to the session as a [`Message::Input`], which applies it to
/// the buffer and then classifies it. Deferred work is flushed before the
/// next key, as the async runtime does.
///
/// # Example
///
/// ```
/// use escapist_core::testing::TestSession;
/// use escapist_core::{Config, Mode};
///
/// let mut session = TestSession::with_content(Config::new(), "hello");
/// session.type_str("ijk");
/// assert_eq!(session.host().mode(), Mode::Normal);
/// assert_eq!(session.host().text(), "hello");
/// assert!(!session.host().modified());
/// ```
pub struct TestSession {
    session: Session<ScratchBuffer, ManualTimer>,
    diagnostics: Vec<ConfigError>,
    outcomes: Vec<ReconcileOutcome>,
}

impl TestSession {
    /// A session over an empty buffer.
    pub fn new(config: Config) -> Self {
        Self::with_content(config, "")
    }

    /// A session over a buffer holding `text`. Configuration diagnostics are
    /// kept for [`diagnostics`](TestSession::diagnostics).
    pub fn with_content(config: Config, text: &str) -> Self {
        let (detector, diagnostics) = Detector::new(config);
        let session = Session::new(detector, ScratchBuffer::with_content(text), ManualTimer::new());
        Self {
            session,
            diagnostics,
            outcomes: Vec::new(),
        }
    }

    /// Type each character of `text` literally.
    pub fn type_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.press(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    /// Type keys written in key notation, e.g. `"ix<Esc>"`.
    pub fn type_keys(&mut self, notation: &str) {
        for key in &KeySequence::parse(notation) {
            self.press(*key);
        }
    }

    /// Apply one key to the buffer through the session. Only plain
    /// characters reach the detector.
    pub fn press(&mut self, key: KeyEvent) {
        self.settle();
        self.session.handle(Message::Input(key));
        self.settle();
    }

    /// Switch the buffer's mode directly and report the entry.
    pub fn enter_mode(&mut self, mode: Mode) {
        self.settle();
        self.session.host_mut().set_mode(mode);
        self.session.handle(Message::ModeEntered(mode));
    }

    /// Let the running timer expire. Returns `false` if none was armed.
    pub fn fire_timer(&mut self) -> bool {
        match self.session.timer_mut().fire() {
            Some(msg) => {
                self.session.handle(msg);
                true
            }
            None => false,
        }
    }

    /// Reconfigure, returning the diagnostics.
    pub fn setup(&mut self, config: Config) -> Vec<ConfigError> {
        self.session.handle(Message::Setup(Box::new(config)))
    }

    /// Run deferred reconciliations now.
    pub fn settle(&mut self) {
        let outcomes = self.session.flush_deferred();
        self.outcomes.extend(outcomes);
    }

    pub fn diagnostics(&self) -> &[ConfigError] {
        &self.diagnostics
    }

    /// Outcomes of every reconciliation run so far.
    pub fn outcomes(&self) -> &[ReconcileOutcome] {
        &self.outcomes
    }

    pub fn host(&self) -> &ScratchBuffer {
        self.session.host()
    }

    pub fn host_mut(&mut self) -> &mut ScratchBuffer {
        self.session.host_mut()
    }

    pub fn detector(&self) -> &Detector {
        self.session.detector()
    }

    pub fn timer(&self) -> &ManualTimer {
        self.session.timer()
    }
}
