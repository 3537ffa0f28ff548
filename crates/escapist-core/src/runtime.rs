//! The async driver and its handle.

use crate::config::{Config, ConfigError};
use crate::detector::Detector;
use crate::event::Message;
use crate::host::Host;
use crate::mode::Mode;
use crate::session::Session;
use crate::timer::TokioTimer;
use crossterm::event::KeyEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, trace};

/// A cloneable handle to a running [`Runtime`].
///
/// `RuntimeHandle` is [`Clone`] and can be moved into other tasks or threads.
/// The host sends every user keystroke through
/// [`input`](RuntimeHandle::input) instead of applying it itself; the runtime
/// applies it in queue order, after whatever an earlier match fed. Every
/// method returns silently if the runtime has already exited.
#[derive(Clone)]
pub struct RuntimeHandle {
    msg_tx: mpsc::UnboundedSender<Message>,
    killed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl RuntimeHandle {
    /// Enqueue a raw message.
    pub fn send(&self, msg: Message) {
        let _ = self.msg_tx.send(msg);
    }

    /// Queue a user keystroke for the runtime to apply to the host.
    pub fn input(&self, key: KeyEvent) {
        self.send(Message::Input(key));
    }

    /// Report a character the host already applied while in `mode`.
    ///
    /// Fed keys land whenever the runtime gets to them, so a host that
    /// applies keys itself must not apply the next one before the runtime
    /// has caught up. Prefer [`input`](RuntimeHandle::input).
    pub fn key(&self, key: char, mode: Mode) {
        self.send(Message::Key { key, mode });
    }

    /// Report that the host entered `mode` other than through
    /// [`input`](RuntimeHandle::input).
    pub fn mode_entered(&self, mode: Mode) {
        self.send(Message::ModeEntered(mode));
    }

    /// Replace the configuration. Diagnostics are logged by the runtime.
    pub fn setup(&self, config: Config) {
        self.send(Message::Setup(Box::new(config)));
    }

    /// Stop the runtime at the next opportunity, dropping queued messages.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }
}

/// The async driver: owns the [`Session`], its message queue and the timer
/// task.
///
/// The loop processes one message at a time. Reconciliations scheduled by a
/// message run after the loop has yielded once and before the next message
/// is taken. The runtime exits when every [`RuntimeHandle`] is dropped or one
/// of them calls [`kill`](RuntimeHandle::kill), and gives the host back.
///
/// # Example
///
/// ```rust,ignore
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
/// use escapist_core::{Config, Runtime};
///
/// let (runtime, diagnostics) = Runtime::new(buffer.clone(), Config::new());
/// let handle = runtime.handle();
/// let task = tokio::spawn(runtime.run());
///
/// for ch in "ijk".chars() {
///     handle.input(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
/// }
/// ```
pub struct Runtime<H: Host + Send + 'static> {
    detector: Detector,
    host: H,
    msg_tx: mpsc::UnboundedSender<Message>,
    msg_rx: mpsc::UnboundedReceiver<Message>,
    killed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl<H: Host + Send + 'static> Runtime<H> {
    /// Create a runtime over `host`, returning the configuration diagnostics.
    ///
    /// Nothing is spawned until [`run`](Runtime::run).
    pub fn new(host: H, config: Config) -> (Self, Vec<ConfigError>) {
        let (detector, diagnostics) = Detector::new(config);
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let runtime = Self {
            detector,
            host,
            msg_tx,
            msg_rx,
            killed: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
        };
        (runtime, diagnostics)
    }

    /// Get a handle for sending messages and killing the runtime.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            msg_tx: self.msg_tx.clone(),
            killed: self.killed.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Run until every handle is dropped or killed. Returns the host.
    pub async fn run(self) -> H {
        let Self {
            detector,
            host,
            msg_tx,
            mut msg_rx,
            killed,
            shutdown,
        } = self;

        let timer = TokioTimer::spawn(msg_tx.downgrade());
        // Only handles keep the queue open from here on.
        drop(msg_tx);
        let mut session = Session::new(detector, host, timer);
        debug!("runtime started");

        loop {
            if killed.load(Ordering::SeqCst) {
                break;
            }

            if session.has_deferred() {
                tokio::task::yield_now().await;
                for outcome in session.flush_deferred() {
                    trace!(?outcome, "deferred reconciliation");
                }
                continue;
            }

            tokio::select! {
                biased;

                _ = shutdown.notified() => break,

                msg = msg_rx.recv() => match msg {
                    Some(msg) => {
                        session.handle(msg);
                    }
                    None => break,
                },
            }
        }

        debug!("runtime stopped");
        session.into_host()
    }
}
