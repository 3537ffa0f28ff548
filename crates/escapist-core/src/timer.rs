//! The combination timer.

use crate::command::TimerCommand;
use crate::event::Message;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::trace;

/// A single restartable countdown.
///
/// Implementations report expiry by delivering
/// [`Message::TimerExpired`] with the armed generation back into the event
/// queue. Re-arming forgets the previous countdown.
pub trait TimerDriver {
    /// Start (or restart) the countdown.
    fn arm(&mut self, duration: Duration, generation: u64);

    /// Stop the countdown. Inert if nothing is armed.
    fn cancel(&mut self);

    /// Apply a [`TimerCommand`].
    fn execute(&mut self, cmd: TimerCommand) {
        match cmd {
            TimerCommand::Arm {
                duration,
                generation,
            } => self.arm(duration, generation),
            TimerCommand::Cancel => self.cancel(),
        }
    }
}

/// A tokio-backed timer: one long-lived task with one reusable `Sleep`.
///
/// Arming resets the existing sleep instead of spawning a new task. Expiries
/// are sent on a weak sender so the timer never keeps the event queue open.
pub struct TokioTimer {
    commands: mpsc::UnboundedSender<TimerCommand>,
    task: AbortHandle,
}

impl TokioTimer {
    /// Spawn the timer task. Must be called from within a tokio runtime.
    pub fn spawn(events: mpsc::WeakUnboundedSender<Message>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(rx, events)).abort_handle();
        Self { commands, task }
    }
}

impl TimerDriver for TokioTimer {
    fn arm(&mut self, duration: Duration, generation: u64) {
        let _ = self.commands.send(TimerCommand::Arm {
            duration,
            generation,
        });
    }

    fn cancel(&mut self) {
        let _ = self.commands.send(TimerCommand::Cancel);
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive(
    mut commands: mpsc::UnboundedReceiver<TimerCommand>,
    events: mpsc::WeakUnboundedSender<Message>,
) {
    let sleep = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(sleep);
    let mut armed: Option<u64> = None;

    loop {
        tokio::select! {
            biased;

            cmd = commands.recv() => match cmd {
                Some(TimerCommand::Arm { duration, generation }) => {
                    sleep.as_mut().reset(Instant::now() + duration);
                    armed = Some(generation);
                }
                Some(TimerCommand::Cancel) => armed = None,
                None => break,
            },

            () = &mut sleep, if armed.is_some() => {
                let Some(generation) = armed.take() else { continue };
                let Some(tx) = events.upgrade() else { break };
                trace!(generation, "timer fired");
                if tx.send(Message::TimerExpired(generation)).is_err() {
                    break;
                }
            }
        }
    }
}
