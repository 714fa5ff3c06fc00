use thiserror::Error;

/// Errors surfaced by sources and schedulers using thiserror for structured
/// error handling.
///
/// Every error is returned synchronously to the caller as a result value;
/// nothing is retried internally and nothing is fatal. Invalid usage is a
/// programming error reported, not a panic.

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source has been invalidated")]
    Invalidated,

    #[error("Source is already registered with a scheduler")]
    AlreadyRegistered,

    #[error("Source is not registered with this scheduler")]
    NotRegistered,

    #[error("Scheduler has stopped and no longer accepts wake-ups")]
    SchedulerStopped,

    #[error("Failed to spawn scheduler worker thread")]
    SpawnFailed(#[source] std::io::Error),
}

/// Type alias for Results in this crate
pub type SourceResult<T> = Result<T, SourceError>;
