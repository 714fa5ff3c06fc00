/// Worker-thread scheduler
///
/// A portable stand-in for a host event loop: one dedicated thread blocks on
/// a wake channel and fires whichever registered source was signaled. Because
/// every source registered here is fired from the same thread, fire calls are
/// never concurrent, which is the guarantee sources rely on.
use std::collections::HashMap;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::scheduler::{RegistrationContext, Scheduler};
use crate::source::{SourceHandle, SourceId};

/// Configuration for a worker scheduler
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name given to the worker thread
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: "loop-source-worker".to_string(),
        }
    }
}

/// Wake-up messages consumed by the worker thread
enum WakeMessage {
    /// A registered source has pending commands
    Fire(SourceId),

    /// Stop the worker loop
    Shutdown,
}

/// State shared between the scheduler facade and its worker thread
struct WorkerShared {
    sources: Mutex<HashMap<SourceId, SourceHandle>>,
    wake_tx: Sender<WakeMessage>,
}

/// A scheduler backed by a dedicated worker thread.
pub struct WorkerScheduler {
    shared: Arc<WorkerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerScheduler {
    /// Spawn the worker thread and return the scheduler
    pub fn new(config: WorkerConfig) -> Result<Self, SourceError> {
        let (wake_tx, wake_rx) = unbounded();
        let shared = Arc::new(WorkerShared {
            sources: Mutex::new(HashMap::new()),
            wake_tx,
        });

        let loop_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || run_worker(loop_shared, wake_rx))
            .map_err(SourceError::SpawnFailed)?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Number of sources currently registered
    pub fn source_count(&self) -> usize {
        self.shared.sources.lock().len()
    }

    /// Stop the worker loop and wait for the thread to exit.
    ///
    /// Safe to call more than once; repeat calls are a no-op. Sources
    /// signaled after shutdown get `SchedulerStopped`.
    pub fn shutdown(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = self.shared.wake_tx.send(WakeMessage::Shutdown);
            if thread::current().id() == worker.thread().id() {
                // Shutdown requested from the worker itself; the loop will
                // exit on the message, joining here would never return.
                return;
            }
            if worker.join().is_err() {
                warn!("worker scheduler thread panicked");
            }
        }
    }
}

impl Drop for WorkerScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Scheduler for WorkerScheduler {
    fn register(&self, context: &RegistrationContext) -> Result<(), SourceError> {
        let handle = context.source().clone();
        let mut sources = self.shared.sources.lock();
        if sources.contains_key(&handle.id()) {
            return Err(SourceError::AlreadyRegistered);
        }
        debug!(source = %handle.id(), "source registered with worker");
        sources.insert(handle.id(), handle);
        Ok(())
    }

    fn unregister(&self, context: &RegistrationContext) -> Result<(), SourceError> {
        let id = context.source().id();
        match self.shared.sources.lock().remove(&id) {
            Some(_) => {
                debug!(source = %id, "source removed from worker");
                Ok(())
            }
            None => Err(SourceError::NotRegistered),
        }
    }

    fn signal_ready(&self, source: &SourceHandle) -> Result<(), SourceError> {
        if !self.shared.sources.lock().contains_key(&source.id()) {
            return Err(SourceError::NotRegistered);
        }
        self.shared
            .wake_tx
            .send(WakeMessage::Fire(source.id()))
            .map_err(|_| SourceError::SchedulerStopped)
    }
}

fn run_worker(shared: Arc<WorkerShared>, wake_rx: Receiver<WakeMessage>) {
    info!("worker scheduler thread started");

    while let Ok(message) = wake_rx.recv() {
        match message {
            WakeMessage::Fire(id) => {
                // Look the handle up and drop the table lock before firing,
                // so the handler can register or remove sources itself.
                let handle = shared.sources.lock().get(&id).cloned();
                match handle {
                    Some(handle) => match handle.fire() {
                        Some(count) if count > 0 => {
                            debug!(source = %id, count, "fired source");
                        }
                        Some(_) => {
                            // Spurious wake; an earlier fire already drained it.
                        }
                        None => {
                            debug!(source = %id, "pruning dropped source");
                            shared.sources.lock().remove(&id);
                        }
                    },
                    None => {
                        debug!(source = %id, "wake for source no longer registered");
                    }
                }
            }
            WakeMessage::Shutdown => {
                info!("worker scheduler thread stopping");
                break;
            }
        }
    }
}
