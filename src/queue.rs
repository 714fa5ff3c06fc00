/// Thread-safe FIFO buffer of pending commands
///
/// Producers append with `enqueue`; the firing path empties the buffer with
/// `drain_all`. Insertion order is processing order. The queue itself knows
/// nothing about source lifecycle; rejecting submissions after teardown is
/// the owning source's job.
use parking_lot::Mutex;

use crate::command::Command;

/// Ordered buffer shared between producer threads and the firing path.
pub struct CommandQueue {
    pending: Mutex<Vec<Command>>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Append a command to the tail.
    ///
    /// Only blocks for the duration of the critical section.
    pub fn enqueue(&self, command: Command) {
        self.pending.lock().push(command);
    }

    /// Atomically remove and return every queued command, oldest first.
    ///
    /// An empty result is a normal spurious wake, not an error. A concurrent
    /// `enqueue` lands either in this drain's result or the next one, never
    /// both and never neither.
    pub fn drain_all(&self) -> Vec<Command> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Number of commands currently queued
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Check whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
