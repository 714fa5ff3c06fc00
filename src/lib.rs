//! Custom input sources for event loops.
//!
//! This crate implements the run-loop "input source" pattern as a portable
//! concurrency primitive: producer threads queue tagged commands on a
//! source, the source marks itself ready with whatever loop it is
//! registered on, and the loop fires the source on its own thread, which
//! drains the queue and hands every command to the source's handler in
//! submission order.
//!
//! ```text
//! ┌──────────┐  submit   ┌─────────────┐  signal_ready  ┌───────────┐
//! │ Producer │ ────────> │ InputSource │ ─────────────> │ Scheduler │
//! │ (any     │           │  (queue +   │                │ (loop     │
//! │  thread) │           │   handler)  │ <───────────── │  thread)  │
//! └──────────┘           └─────────────┘     fire       └───────────┘
//! ```
//!
//! Anything that can deliver the three notifications of the [`Scheduler`]
//! trait can host a source; [`WorkerScheduler`] is the built-in host, a
//! dedicated thread blocking on a wake channel.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default())?);
//!
//! let source = InputSource::new(|command| {
//!     println!("{}", command.description());
//! });
//! source.add_to_loop(scheduler.clone())?;
//!
//! // From any thread:
//! source.submit(Command::with_data(1, CommandData::Text("reload".into())))?;
//!
//! // Teardown is safe to repeat.
//! source.invalidate()?;
//! ```

pub mod command;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod source;
pub mod state;

// Re-export commonly used types
pub use command::{Command, CommandData};
pub use error::{SourceError, SourceResult};
pub use queue::CommandQueue;
pub use scheduler::{RegistrationContext, Scheduler, WorkerConfig, WorkerScheduler};
pub use source::{InputSource, SourceHandle, SourceId};
pub use state::SourceState;
