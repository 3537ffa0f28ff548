//! Suppresses the "modified" flag when an escape left the document exactly
//! as it was when the editing mode was entered.
//!
//! Typing `jk` inserts two characters and the default escape deletes them
//! again, yet the host still marks the document as changed. The tracker
//! remembers the unmodified text at mode entry and, after the escape has been
//! applied, clears the flag if nothing else changed.

use crate::host::{DocumentId, Host};
use crate::mode::Mode;
use tracing::debug;

/// Holds the unmodified-content snapshot taken at the last mode entry.
#[derive(Debug, Default)]
pub struct ModificationTracker {
    snapshot: Option<ReconcileTicket>,
}

impl ModificationTracker {
    /// A tracker with no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current document if `mode` edits text, suppression is
    /// `enabled`, and the document is not already modified.
    ///
    /// Any earlier snapshot is discarded, whatever the outcome.
    pub fn snapshot_on_mode_entry<H: Host + ?Sized>(
        &mut self,
        mode: Mode,
        enabled: bool,
        host: &H,
    ) {
        self.snapshot = None;
        if !enabled || !mode.is_editing() {
            return;
        }
        let document = host.current_document();
        if host.is_modified(document) != Ok(false) {
            return;
        }
        if let Ok(content) = host.content(document) {
            debug!(%document, %mode, "captured unmodified snapshot");
            self.snapshot = Some(ReconcileTicket { document, content });
        }
    }

    /// Take the snapshot for a scheduled reconciliation. The tracker keeps
    /// nothing, so a later mode entry cannot affect the ticket.
    pub fn take_ticket(&mut self) -> Option<ReconcileTicket> {
        self.snapshot.take()
    }

    /// Whether a mode-entry snapshot is held.
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Forget the snapshot, e.g. on reconfiguration.
    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}

/// A pending reconciliation: the document and its mode-entry content,
/// captured by value when the escape matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTicket {
    document: DocumentId,
    content: String,
}

/// What a reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Content matched the snapshot; the modified flag was cleared.
    Restored,
    /// Content differs; the flag was left as the host set it.
    Changed,
    /// The document is gone or refused the update.
    Unavailable,
}

impl ReconcileTicket {
    /// The document the snapshot was taken from.
    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// Compare the document against the snapshot and clear its modified flag
    /// if they are identical.
    ///
    /// The cursor is put back where the escape left it. Failing to restore it
    /// (the position no longer exists) is ignored.
    pub fn reconcile<H: Host + ?Sized>(self, host: &mut H) -> ReconcileOutcome {
        let document = self.document;
        let outcome = match host.content(document) {
            Err(_) => ReconcileOutcome::Unavailable,
            Ok(current) if current != self.content => ReconcileOutcome::Changed,
            Ok(_) => {
                let cursor = host.cursor(document).ok();
                match host.set_modified(document, false) {
                    Err(_) => ReconcileOutcome::Unavailable,
                    Ok(()) => {
                        if let Some(cursor) = cursor {
                            let _ = host.set_cursor(document, cursor);
                        }
                        ReconcileOutcome::Restored
                    }
                }
            }
        };
        debug!(%document, ?outcome, "reconciled");
        outcome
    }
}
