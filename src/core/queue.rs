//! Deferred command execution.
//!
//! In deferred mode, executed lines are queued and drained by
//! [`Console::update`] once per host tick. Commands and variables flagged
//! `BLOCK_FRAME` stop the drain for the rest of the tick; `wait_frames` and
//! `wait_seconds` additionally hold the queue for a number of ticks or a span of
//! time.

use std::collections::VecDeque;
use std::time::Duration;

use super::Console;

/// A line waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCommand {
    /// Statement text.
    pub text: String,
    /// Suppress interactive output when it runs.
    pub silent: bool,
}

/// FIFO of deferred statements plus the wait state that gates it.
#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: VecDeque<QueuedCommand>,
    deferred: bool,
    wait_frames: u32,
    wait_until: Option<Duration>,
    block_counter: u64,
    now: Duration,
}

impl CommandQueue {
    /// Create an empty queue in immediate mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether lines are queued instead of run.
    #[inline]
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Switch deferred mode, returning the previous mode.
    pub fn set_deferred(&mut self, deferred: bool) -> bool {
        std::mem::replace(&mut self.deferred, deferred)
    }

    /// Append a statement.
    pub fn push(&mut self, text: impl Into<String>, silent: bool) {
        self.entries.push_back(QueuedCommand {
            text: text.into(),
            silent,
        });
    }

    /// Remove the oldest statement.
    pub fn pop_front(&mut self) -> Option<QueuedCommand> {
        self.entries.pop_front()
    }

    /// Pending statements, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedCommand> {
        self.entries.iter()
    }

    /// Number of pending statements.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending statement. Wait state is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remaining ticks to skip.
    #[inline]
    pub fn wait_frames(&self) -> u32 {
        self.wait_frames
    }

    /// Skip the next `frames` ticks.
    pub fn set_wait_frames(&mut self, frames: u32) {
        self.wait_frames = frames;
    }

    /// Time before which the queue stays held.
    #[inline]
    pub fn wait_until(&self) -> Option<Duration> {
        self.wait_until
    }

    /// Hold the queue for `seconds` from the last tick. Negative waits are ignored.
    pub fn set_wait_seconds(&mut self, seconds: f64) {
        self.wait_until = Duration::try_from_secs_f64(seconds)
            .ok()
            .map(|wait| self.now.saturating_add(wait));
    }

    /// Number of blocking entries dispatched so far.
    #[inline]
    pub fn block_counter(&self) -> u64 {
        self.block_counter
    }

    pub(crate) fn bump_block_counter(&mut self) {
        self.block_counter = self.block_counter.wrapping_add(1);
    }

    /// Time of the last tick.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Advance to `now` and report whether the queue may drain this tick.
    fn begin_tick(&mut self, now: Duration) -> bool {
        self.now = now;

        if self.wait_frames > 0 {
            self.wait_frames -= 1;
            return false;
        }

        if let Some(until) = self.wait_until {
            if now < until {
                return false;
            }
            self.wait_until = None;
        }
        true
    }
}

impl Console {
    /// Drain the deferred queue for one host tick, using the console clock.
    pub fn update(&mut self) {
        let now = self.started.elapsed();
        self.update_at(now);
    }

    /// Drain the deferred queue for one host tick at time `now`.
    ///
    /// Statements run in order until one of them is a blocker; the blocker
    /// completes and the queue halts until the next tick.
    pub fn update_at(&mut self, now: Duration) {
        if !self.queue.begin_tick(now) {
            return;
        }

        let counter = self.queue.block_counter();
        while let Some(command) = self.queue.pop_front() {
            self.dispatch_line(&command.text, false, command.silent);

            if self.queue.block_counter() != counter {
                // The blocking tick counts as the first waited frame
                self.queue.wait_frames = self.queue.wait_frames.saturating_sub(1);
                break;
            }
        }
    }

    /// Switch deferred mode, returning the previous mode.
    pub fn set_deferred(&mut self, deferred: bool) -> bool {
        self.queue.set_deferred(deferred)
    }

    /// Drop every pending deferred statement.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// The deferred queue.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}
