//! Core of **escapist**: leave a modal editor's insert-like modes by typing a
//! quick two-key combination such as `jk`.
//!
//! The host editor hands every keystroke to escapist, which applies it and
//! notes the mode it was typed in. When the second key of a configured
//! combination arrives within the timeout of the first, escapist feeds an
//! escape sequence (by default `<BS><BS><Esc>`) back into the host. If the
//! escape left the document exactly as it was on mode entry, the host's
//! modified flag is cleared again.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Config`] | Mappings, timeout, per-mode actions; builder or TOML |
//! | [`Detector`] | Pure per-keystroke state machine returning a [`Command`] |
//! | [`Host`] | What the core needs from the editor |
//! | [`Session`] | Executes detector effects against a host and a timer |
//! | [`Runtime`] | Async driver with a single tokio timer task |
//! | [`TestSession`](testing::TestSession) | Headless harness over an in-memory buffer |
//!
//! # Flow
//!
//! 1. **mode entry** -- A key that switches the host into an editing mode
//!    (or a [`Message::ModeEntered`]) snapshots an unmodified document.
//! 2. **first key** -- A key that starts a combination is remembered and the
//!    timer is armed.
//! 3. **second key** -- A key that completes it cancels the timer, feeds the
//!    mode's escape keys, and schedules a modified-flag reconciliation.
//! 4. **timeout** -- The timer expiry forgets the first key; anything else
//!    typed in between does too.
//!
//! # Quick example
//!
//! ```
//! use escapist_core::testing::TestSession;
//! use escapist_core::{Config, Mode};
//!
//! let mut session = TestSession::with_content(Config::new().with_mappings(["fd"]), "text");
//! session.type_str("ifd");
//! assert_eq!(session.host().mode(), Mode::Normal);
//! assert_eq!(session.host().text(), "text");
//! ```

pub mod action;
pub mod command;
pub mod config;
pub mod detector;
pub mod event;
pub mod host;
pub mod key_sequence;
pub mod keys;
pub mod mode;
pub mod modified;
pub mod runtime;
pub mod session;
pub mod table;
pub mod testing;
pub mod timer;

pub use action::{EscapeAction, EscapeFn, Resolution};
pub use command::{Command, Effect, TimerCommand};
pub use config::{Config, ConfigError, LoadError, Settings, DEFAULT_MAPPINGS, DEFAULT_TIMEOUT};
pub use detector::Detector;
pub use event::Message;
pub use host::{Cursor, DocumentId, Host, HostError};
pub use key_sequence::KeySequenceTracker;
pub use keys::KeySequence;
pub use mode::{Mode, UnknownMode};
pub use modified::{ModificationTracker, ReconcileOutcome, ReconcileTicket};
pub use runtime::{Runtime, RuntimeHandle};
pub use session::Session;
pub use table::CombinationTable;
pub use timer::{TimerDriver, TokioTimer};

/// Run a [`Runtime`] over `host` until every handle is dropped.
///
/// `on_start` receives the handle before the loop starts, so the caller can
/// hand it to whatever feeds keys. Returns the host and the configuration
/// diagnostics.
pub async fn run<H: Host + Send + 'static>(
    host: H,
    config: Config,
    on_start: impl FnOnce(RuntimeHandle),
) -> (H, Vec<ConfigError>) {
    let (runtime, diagnostics) = Runtime::new(host, config);
    on_start(runtime.handle());
    (runtime.run().await, diagnostics)
}
