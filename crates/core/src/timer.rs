//! Bridge between host-side timers and script-visible callbacks.
//!
//! A single scheduler task owns the due-time queue. Firing never invokes a
//! callback directly: the scheduler posts a [`TimerFire`] message into the
//! owner's inbox, and the owner invokes it when it pumps the inbox between
//! script steps. That keeps callbacks inside the owning execution context
//! and off the scheduler task.

use crate::scope::ScopeId;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A script-level callback. Invoked synchronously by whoever pumps the inbox
/// that received the fire.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    OneShot,
    Repeating,
}

/// Who owns a timer. Scope-owned timers are cancelled automatically at scope
/// teardown; process-owned timers outlive any scope and deliver to the
/// host-level inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOwner {
    Scope(ScopeId),
    Process,
}

/// A fired timer, sitting in an inbox until pumped.
pub struct TimerFire {
    timer: TimerId,
    callback: TimerCallback,
    cancelled: Arc<AtomicBool>,
}

impl TimerFire {
    pub fn timer(&self) -> TimerId {
        self.timer
    }

    /// Invoke the callback unless the handle was cancelled after the fire was
    /// posted. That race is benign: the cancelled fire is skipped.
    pub fn invoke(self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            tracing::debug!(timer = self.timer.0, "skipping fire of cancelled timer");
            return false;
        }
        (self.callback)();
        true
    }
}

/// Cancellation token for a scheduled timer.
///
/// Cancelling is idempotent; cancelling an already-fired one-shot is a safe
/// no-op. The shared flag is flipped synchronously, so a fire that already
/// reached an inbox is still skipped at pump time.
#[derive(Clone)]
pub struct TimerHandle {
    id: TimerId,
    kind: TimerKind,
    cancelled: Arc<AtomicBool>,
    commands: mpsc::UnboundedSender<Command>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            // Scheduler may already be gone at host shutdown.
            let _ = self.commands.send(Command::Cancel(self.id));
        }
    }
}

enum Command {
    Schedule(Box<ScheduledTimer>),
    Cancel(TimerId),
    CancelScope(ScopeId),
}

struct ScheduledTimer {
    id: TimerId,
    kind: TimerKind,
    interval: Duration,
    due: Instant,
    owner: TimerOwner,
    callback: TimerCallback,
    cancelled: Arc<AtomicBool>,
    deliver: mpsc::UnboundedSender<TimerFire>,
    /// Sequence of the live heap entry; older entries are stale and skipped.
    armed_seq: u64,
}

/// Heap key ordering fires by due time, ties broken by scheduling order.
#[derive(PartialEq, Eq)]
struct DueKey {
    due: Instant,
    seq: u64,
    id: TimerId,
}

impl Ord for DueKey {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest first.
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

impl PartialOrd for DueKey {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Handle to the scheduler task. Cheap to clone; shared by the host and all
/// scopes.
#[derive(Clone)]
pub struct TimerBridge {
    commands: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl TimerBridge {
    /// Spawn the scheduler task. Must be called within a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        tokio::spawn(scheduler_loop(rx, shutdown.clone()));
        Self {
            commands: tx,
            next_id: Arc::new(AtomicU64::new(1)),
            shutdown,
        }
    }

    /// Schedule a timer. The callback is never invoked synchronously here,
    /// even for a zero delay: delivery always goes through the owner's inbox.
    pub fn schedule(
        &self,
        kind: TimerKind,
        delay: Duration,
        owner: TimerOwner,
        deliver: mpsc::UnboundedSender<TimerFire>,
        callback: TimerCallback,
    ) -> TimerHandle {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancelled = Arc::new(AtomicBool::new(false));
        // A zero-interval repeater would monopolize the scheduler; clamp it.
        let delay = match kind {
            TimerKind::Repeating => delay.max(Duration::from_millis(1)),
            TimerKind::OneShot => delay,
        };
        let timer = ScheduledTimer {
            id,
            kind,
            interval: delay,
            due: Instant::now() + delay,
            owner,
            callback,
            cancelled: Arc::clone(&cancelled),
            deliver,
            armed_seq: 0,
        };
        // Send fails only after shutdown; the handle then cancels trivially.
        let _ = self.commands.send(Command::Schedule(Box::new(timer)));
        TimerHandle {
            id,
            kind,
            cancelled,
            commands: self.commands.clone(),
        }
    }

    /// Idempotent cancellation; safe on fired or already-cancelled handles.
    pub fn cancel(&self, handle: &TimerHandle) {
        handle.cancel();
    }

    /// Cancel every timer owned by a scope. Called from scope teardown.
    pub(crate) fn cancel_scope(&self, scope: ScopeId) {
        let _ = self.commands.send(Command::CancelScope(scope));
    }

    /// Stop the scheduler task; pending timers never fire afterwards.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn scheduler_loop(
    mut commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
) {
    let mut timers: HashMap<TimerId, ScheduledTimer> = HashMap::new();
    let mut queue: BinaryHeap<DueKey> = BinaryHeap::new();
    let mut seq: u64 = 0;

    loop {
        let next_due = queue.peek().map(|k| k.due);
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            cmd = commands.recv() => match cmd {
                None => break,
                Some(Command::Schedule(timer)) => {
                    seq += 1;
                    let mut timer = *timer;
                    timer.armed_seq = seq;
                    queue.push(DueKey { due: timer.due, seq, id: timer.id });
                    timers.insert(timer.id, timer);
                }
                Some(Command::Cancel(id)) => {
                    // Stale heap entries are skipped when popped.
                    timers.remove(&id);
                }
                Some(Command::CancelScope(scope)) => {
                    timers.retain(|_, t| {
                        let owned = t.owner == TimerOwner::Scope(scope);
                        if owned {
                            t.cancelled.store(true, Ordering::Release);
                        }
                        !owned
                    });
                }
            },
            _ = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)),
                if next_due.is_some() =>
            {
                let now = Instant::now();
                while queue.peek().is_some_and(|k| k.due <= now) {
                    let Some(key) = queue.pop() else {
                        break;
                    };
                    let Some(timer) = timers.get_mut(&key.id) else {
                        continue; // cancelled
                    };
                    if timer.armed_seq != key.seq {
                        continue; // stale entry from a previous arming
                    }
                    if timer.cancelled.load(Ordering::Acquire) {
                        timers.remove(&key.id);
                        continue;
                    }
                    let fire = TimerFire {
                        timer: timer.id,
                        callback: Arc::clone(&timer.callback),
                        cancelled: Arc::clone(&timer.cancelled),
                    };
                    if timer.deliver.send(fire).is_err() {
                        // Inbox receiver dropped; owner is gone.
                        timers.remove(&key.id);
                        continue;
                    }
                    match timer.kind {
                        TimerKind::OneShot => {
                            timers.remove(&key.id);
                        }
                        TimerKind::Repeating => {
                            seq += 1;
                            timer.armed_seq = seq;
                            // Re-arm from the nominal due time to avoid drift.
                            timer.due = key.due + timer.interval;
                            queue.push(DueKey { due: timer.due, seq, id: timer.id });
                        }
                    }
                }
            }
        }
    }
}
