//! The boundary to the editor that owns documents and the input stream.

use crate::keys::KeySequence;
use crate::mode::Mode;
use crossterm::event::KeyEvent;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Opaque handle to a host document (a buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cursor position: zero-based line and character column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

impl Cursor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Failures reported by a [`Host`]. The core treats all of them as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The document was closed or never existed.
    #[error("document {0} is no longer open")]
    InvalidDocument(DocumentId),
    /// The position lies outside the document.
    #[error("position {line}:{column} is outside the document")]
    InvalidPosition { line: usize, column: usize },
}

/// Everything the core needs from the editor.
///
/// User keystrokes reach the host through [`apply_key`](Host::apply_key),
/// called by the [`Session`](crate::Session) on the same queue that carries
/// dispatched sequences, so a sequence fed by a match always lands before
/// any key typed after it. The core otherwise only observes; it writes back
/// the dispatched keys plus the modified flag and cursor while reconciling.
pub trait Host {
    /// The mode the host is in right now.
    fn mode(&self) -> Mode;

    /// Apply one user keystroke. Returns the new mode if the key changed it.
    fn apply_key(&mut self, key: KeyEvent) -> Option<Mode>;

    /// Apply `keys` as if typed. The keys must have taken effect when this
    /// returns.
    fn feed_keys(&mut self, keys: &KeySequence);

    /// The document currently receiving input.
    fn current_document(&self) -> DocumentId;

    /// Whether `doc` has unsaved changes.
    fn is_modified(&self, doc: DocumentId) -> Result<bool, HostError>;

    /// The full text of `doc`.
    fn content(&self, doc: DocumentId) -> Result<String, HostError>;

    fn set_modified(&mut self, doc: DocumentId, modified: bool) -> Result<(), HostError>;

    fn cursor(&self, doc: DocumentId) -> Result<Cursor, HostError>;

    fn set_cursor(&mut self, doc: DocumentId, cursor: Cursor) -> Result<(), HostError>;
}

/// Lets a UI keep its own handle on a host the runtime also drives.
impl<H: Host> Host for Arc<Mutex<H>> {
    fn mode(&self) -> Mode {
        self.lock().unwrap_or_else(PoisonError::into_inner).mode()
    }

    fn apply_key(&mut self, key: KeyEvent) -> Option<Mode> {
        self.lock().unwrap_or_else(PoisonError::into_inner).apply_key(key)
    }

    fn feed_keys(&mut self, keys: &KeySequence) {
        self.lock().unwrap_or_else(PoisonError::into_inner).feed_keys(keys)
    }

    fn current_document(&self) -> DocumentId {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_document()
    }

    fn is_modified(&self, doc: DocumentId) -> Result<bool, HostError> {
        self.lock().unwrap_or_else(PoisonError::into_inner).is_modified(doc)
    }

    fn content(&self, doc: DocumentId) -> Result<String, HostError> {
        self.lock().unwrap_or_else(PoisonError::into_inner).content(doc)
    }

    fn set_modified(&mut self, doc: DocumentId, modified: bool) -> Result<(), HostError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_modified(doc, modified)
    }

    fn cursor(&self, doc: DocumentId) -> Result<Cursor, HostError> {
        self.lock().unwrap_or_else(PoisonError::into_inner).cursor(doc)
    }

    fn set_cursor(&mut self, doc: DocumentId, cursor: Cursor) -> Result<(), HostError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_cursor(doc, cursor)
    }
}
