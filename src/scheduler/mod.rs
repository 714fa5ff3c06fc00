/// Scheduler abstraction for driving input sources
///
/// A scheduler is the loop a source registers with. Exactly three
/// notifications cross the seam: a source appearing, a source going away,
/// and a source having pending work. When and on what thread the source is
/// actually fired is the scheduler's business, with one obligation: fire
/// calls for a single source must never run concurrently with each other.
pub mod worker;

// Re-export commonly used types
pub use worker::{WorkerConfig, WorkerScheduler};

use std::sync::{Arc, Weak};

use crate::error::SourceError;
use crate::source::SourceHandle;

/// The loop-side capability an input source talks to.
///
/// Implementations must not call back into the source synchronously from
/// these methods; the source may hold its own lock across them.
pub trait Scheduler: Send + Sync {
    /// A source wants callbacks from this scheduler.
    fn register(&self, context: &RegistrationContext) -> Result<(), SourceError>;

    /// The source is going away; forget it. Referencing a source this
    /// scheduler does not know is reported as `NotRegistered`, not ignored.
    fn unregister(&self, context: &RegistrationContext) -> Result<(), SourceError>;

    /// The source has queued work and should eventually be fired.
    fn signal_ready(&self, source: &SourceHandle) -> Result<(), SourceError>;
}

/// Container object used during registration of an input source.
///
/// Pairs the source with the scheduler it was registered on so the
/// scheduler's add/remove notifications can look either side up. A
/// back-reference only; it owns neither the source nor the scheduler.
#[derive(Clone)]
pub struct RegistrationContext {
    source: SourceHandle,
    scheduler: Weak<dyn Scheduler>,
}

impl RegistrationContext {
    /// Bind a source handle to the scheduler it is being registered on
    pub fn new(source: SourceHandle, scheduler: &Arc<dyn Scheduler>) -> Self {
        Self {
            source,
            scheduler: Arc::downgrade(scheduler),
        }
    }

    /// The registered source
    pub fn source(&self) -> &SourceHandle {
        &self.source
    }

    /// The scheduler this context was registered on, if still alive
    pub fn scheduler(&self) -> Option<Arc<dyn Scheduler>> {
        self.scheduler.upgrade()
    }
}
