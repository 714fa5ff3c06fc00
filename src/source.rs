/// Custom input source
///
/// An input source queues commands submitted from any thread and dispatches
/// them, in order, when fired on the execution context of the scheduler it
/// is registered with. Submission never runs the handler synchronously; the
/// scheduler decides when firing actually happens.
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::command::Command;
use crate::error::SourceError;
use crate::queue::CommandQueue;
use crate::scheduler::{RegistrationContext, Scheduler};
use crate::state::SourceState;

/// Process-unique identity for an input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

impl SourceId {
    fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        SourceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

type Handler = Box<dyn FnMut(Command) + Send>;

/// Which scheduler the source is attached to, if any.
///
/// Kept in one mutex so lifecycle checks and scheduler notifications are a
/// single atomic step with respect to concurrent submits.
enum Registration {
    Inert,
    Active {
        scheduler: Arc<dyn Scheduler>,
        context: RegistrationContext,
    },
    Invalid,
}

struct SourceShared {
    id: SourceId,
    queue: CommandQueue,
    handler: Mutex<Handler>,
    registration: Mutex<Registration>,
}

impl SourceShared {
    /// One bounded batch: drain once, then dispatch. Commands the handler
    /// submits while the batch runs wait for the next wake-up.
    fn fire(&self) -> usize {
        let batch = self.queue.drain_all();
        if batch.is_empty() {
            trace!(source = %self.id, "fired with empty queue");
            return 0;
        }

        let count = batch.len();
        let mut handler = self.handler.lock();
        for command in batch {
            trace!(source = %self.id, "dispatching {}", command.description());
            (*handler)(command);
        }
        count
    }
}

impl Drop for SourceShared {
    fn drop(&mut self) {
        // Last clone going away while still registered: tear down as if
        // invalidate had been called.
        let registration = std::mem::replace(self.registration.get_mut(), Registration::Invalid);
        if let Registration::Active { scheduler, context } = registration {
            if let Err(e) = scheduler.unregister(&context) {
                warn!(source = %self.id, "failed to unregister dropped source: {}", e);
            }
        }
    }
}

/// Handle a scheduler keeps for a registered source.
///
/// Holds no ownership over the source; firing through a handle whose source
/// is gone reports `None` so the scheduler can prune its table.
#[derive(Clone)]
pub struct SourceHandle {
    id: SourceId,
    shared: Weak<SourceShared>,
}

impl SourceHandle {
    /// Identity of the source behind this handle
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Check whether the source still exists
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Drain and dispatch the source's pending commands on the calling
    /// thread. Returns the batch size, or `None` if the source is gone.
    pub fn fire(&self) -> Option<usize> {
        self.shared.upgrade().map(|shared| shared.fire())
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A custom input source for an event loop.
///
/// Cheaply clonable; clones share the same queue, handler, and lifecycle.
pub struct InputSource {
    shared: Arc<SourceShared>,
}

impl InputSource {
    /// Create an inert source with an empty queue and the given handler.
    ///
    /// The handler runs on the scheduler's execution context, once per
    /// drained command. It may submit further commands to this source, but
    /// it must not block indefinitely and must not call `fire` re-entrantly.
    pub fn new(handler: impl FnMut(Command) + Send + 'static) -> Self {
        Self {
            shared: Arc::new(SourceShared {
                id: SourceId::next(),
                queue: CommandQueue::new(),
                handler: Mutex::new(Box::new(handler)),
                registration: Mutex::new(Registration::Inert),
            }),
        }
    }

    /// Identity of this source
    pub fn id(&self) -> SourceId {
        self.shared.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SourceState {
        match &*self.shared.registration.lock() {
            Registration::Inert => SourceState::Inert,
            Registration::Active { .. } => SourceState::Active,
            Registration::Invalid => SourceState::Invalid,
        }
    }

    /// Number of commands queued but not yet dispatched
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// A non-owning handle schedulers fire the source through
    pub fn handle(&self) -> SourceHandle {
        SourceHandle {
            id: self.shared.id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Register this source with a scheduler and become active.
    ///
    /// Valid only while inert: registering twice fails with
    /// `AlreadyRegistered`, registering after teardown with `Invalidated`.
    /// If the scheduler rejects the registration the source stays inert.
    pub fn add_to_loop(&self, scheduler: Arc<dyn Scheduler>) -> Result<(), SourceError> {
        let mut registration = self.shared.registration.lock();
        match &*registration {
            Registration::Active { .. } => Err(SourceError::AlreadyRegistered),
            Registration::Invalid => Err(SourceError::Invalidated),
            Registration::Inert => {
                let context = RegistrationContext::new(self.handle(), &scheduler);
                scheduler.register(&context)?;
                debug!(source = %self.shared.id, "registered with scheduler");
                *registration = Registration::Active { scheduler, context };
                Ok(())
            }
        }
    }

    /// Tear the source down.
    ///
    /// If active, notifies the scheduler exactly once with the same context
    /// used during registration and releases the scheduler reference. Safe
    /// to call any number of times; repeat calls are a silent no-op. Does
    /// not abort a batch already being fired, and does not discard commands
    /// still queued (a forced `fire` can still deliver them).
    pub fn invalidate(&self) -> Result<(), SourceError> {
        let mut registration = self.shared.registration.lock();
        match std::mem::replace(&mut *registration, Registration::Invalid) {
            Registration::Invalid => Ok(()),
            Registration::Inert => {
                debug!(source = %self.shared.id, "invalidated before registration");
                Ok(())
            }
            Registration::Active { scheduler, context } => {
                debug!(source = %self.shared.id, "invalidated");
                scheduler.unregister(&context)
            }
        }
    }

    /// Queue a command for deferred execution.
    ///
    /// Valid while inert (the command waits for registration) or active (the
    /// scheduler is signaled that work is pending). Fails with `Invalidated`
    /// after teardown. Never invokes the handler synchronously.
    pub fn submit(&self, command: Command) -> Result<(), SourceError> {
        let registration = self.shared.registration.lock();
        match &*registration {
            Registration::Invalid => Err(SourceError::Invalidated),
            Registration::Inert => {
                trace!(source = %self.shared.id, "queued {} while inert", command.description());
                self.shared.queue.enqueue(command);
                Ok(())
            }
            Registration::Active { scheduler, context } => {
                trace!(source = %self.shared.id, "queued {}", command.description());
                self.shared.queue.enqueue(command);
                scheduler.signal_ready(context.source())
            }
        }
    }

    /// Ask the scheduler to deliver whatever is already queued, without
    /// submitting anything new. Useful after registering a source that
    /// accumulated commands while inert.
    pub fn flush(&self) -> Result<(), SourceError> {
        let registration = self.shared.registration.lock();
        match &*registration {
            Registration::Inert => Err(SourceError::NotRegistered),
            Registration::Invalid => Err(SourceError::Invalidated),
            Registration::Active { scheduler, context } => {
                scheduler.signal_ready(context.source())
            }
        }
    }

    /// Drain and dispatch pending commands on the calling thread.
    ///
    /// Called by the scheduler through the source's handle, or directly by
    /// a test harness; `submit` never calls this. Works in every lifecycle
    /// state so commands queued before invalidation can still be forced
    /// out. Returns the number of commands dispatched.
    pub fn fire(&self) -> usize {
        self.shared.fire()
    }
}

impl Clone for InputSource {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSource")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}
