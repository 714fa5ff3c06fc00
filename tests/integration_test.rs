// Integration tests for loop-source
// These tests verify sources and schedulers work together end to end

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use parking_lot::Mutex;

use loop_source::{
    Command, CommandData, InputSource, RegistrationContext, Scheduler, SourceError, SourceHandle,
    WorkerConfig, WorkerScheduler,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scheduler double for tests that drive `fire` by hand.
#[derive(Default)]
struct CountingScheduler {
    registered: Mutex<Vec<loop_source::SourceId>>,
    unregister_calls: AtomicUsize,
    signals: AtomicUsize,
}

impl Scheduler for CountingScheduler {
    fn register(&self, context: &RegistrationContext) -> Result<(), SourceError> {
        self.registered.lock().push(context.source().id());
        Ok(())
    }

    fn unregister(&self, context: &RegistrationContext) -> Result<(), SourceError> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        let mut registered = self.registered.lock();
        match registered.iter().position(|id| *id == context.source().id()) {
            Some(index) => {
                registered.remove(index);
                Ok(())
            }
            None => Err(SourceError::NotRegistered),
        }
    }

    fn signal_ready(&self, _source: &SourceHandle) -> Result<(), SourceError> {
        self.signals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn collect_kinds(rx: &Receiver<i64>, count: usize) -> Vec<i64> {
    (0..count)
        .map(|_| rx.recv_timeout(RECV_TIMEOUT).expect("command not delivered"))
        .collect()
}

#[test]
fn test_source_lifecycle_scenario() {
    init_tracing();

    let scheduler = Arc::new(CountingScheduler::default());
    let log = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&log);
    let source = InputSource::new(move |command: Command| {
        sink.lock().push(command.kind());
    });

    source.add_to_loop(scheduler.clone()).unwrap();
    assert!(source.state().is_active());

    source.submit(Command::new(1)).unwrap();
    source.submit(Command::new(2)).unwrap();
    assert_eq!(scheduler.signals.load(Ordering::SeqCst), 2);

    assert_eq!(source.fire(), 2);
    assert_eq!(*log.lock(), vec![1, 2]);

    source.submit(Command::new(3)).unwrap();
    source.invalidate().unwrap();
    assert!(source.state().is_invalid());
    assert_eq!(scheduler.unregister_calls.load(Ordering::SeqCst), 1);

    assert!(matches!(
        source.submit(Command::new(4)),
        Err(SourceError::Invalidated)
    ));

    // Command 3 was accepted before teardown; a forced fire still delivers it.
    assert_eq!(source.fire(), 1);
    assert_eq!(*log.lock(), vec![1, 2, 3]);

    // Teardown stays a no-op on repeat.
    source.invalidate().unwrap();
    assert_eq!(scheduler.unregister_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_worker_delivers_in_submission_order() {
    init_tracing();

    let scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default()).unwrap());
    let (tx, rx) = unbounded();

    let source = InputSource::new(move |command: Command| {
        tx.send(command.kind()).unwrap();
    });
    source.add_to_loop(scheduler.clone()).unwrap();

    for kind in 1..=100 {
        source.submit(Command::new(kind)).unwrap();
    }

    let delivered = collect_kinds(&rx, 100);
    let expected: Vec<i64> = (1..=100).collect();
    assert_eq!(delivered, expected);

    source.invalidate().unwrap();
    scheduler.shutdown();
}

#[test]
fn test_worker_preserves_per_producer_order() {
    init_tracing();

    const PRODUCERS: i64 = 4;
    const PER_PRODUCER: i64 = 50;

    let scheduler = Arc::new(
        WorkerScheduler::new(WorkerConfig {
            thread_name: "per-producer-order".to_string(),
        })
        .unwrap(),
    );
    let (tx, rx) = unbounded();

    let source = InputSource::new(move |command: Command| {
        tx.send(command.kind()).unwrap();
    });
    source.add_to_loop(scheduler.clone()).unwrap();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let source = source.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    source
                        .submit(Command::new(producer * PER_PRODUCER + seq))
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let delivered = collect_kinds(&rx, (PRODUCERS * PER_PRODUCER) as usize);

    // Every command arrives exactly once.
    let mut sorted = delivered.clone();
    sorted.sort_unstable();
    let expected: Vec<i64> = (0..PRODUCERS * PER_PRODUCER).collect();
    assert_eq!(sorted, expected);

    // Delivery never reorders a single producer's submissions.
    for producer in 0..PRODUCERS {
        let range = producer * PER_PRODUCER..(producer + 1) * PER_PRODUCER;
        let seen: Vec<i64> = delivered
            .iter()
            .copied()
            .filter(|kind| range.contains(kind))
            .collect();
        let expected: Vec<i64> = range.collect();
        assert_eq!(seen, expected);
    }

    source.invalidate().unwrap();
}

#[test]
fn test_flush_delivers_backlog_queued_while_inert() {
    init_tracing();

    let scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default()).unwrap());
    let (tx, rx) = unbounded();

    let source = InputSource::new(move |command: Command| {
        tx.send(command.kind()).unwrap();
    });

    // Commands queued before registration wait silently.
    source.submit(Command::new(10)).unwrap();
    source
        .submit(Command::with_data(11, CommandData::Text("pending".to_string())))
        .unwrap();
    assert_eq!(source.pending(), 2);

    // Registration alone does not signal the loop.
    source.add_to_loop(scheduler.clone()).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    source.flush().unwrap();
    assert_eq!(collect_kinds(&rx, 2), vec![10, 11]);

    source.invalidate().unwrap();
}

#[test]
fn test_invalidate_does_not_abort_inflight_batch() {
    init_tracing();

    let scheduler = Arc::new(CountingScheduler::default());
    let (delivered_tx, delivered_rx) = unbounded();
    let (gate_tx, gate_rx) = unbounded::<()>();

    let source = InputSource::new(move |command: Command| {
        delivered_tx.send(command.kind()).unwrap();
        if command.kind() == 1 {
            // Hold the batch open until the test has invalidated the source.
            gate_rx.recv_timeout(RECV_TIMEOUT).unwrap();
        }
    });
    source.add_to_loop(scheduler.clone()).unwrap();

    source.submit(Command::new(1)).unwrap();
    source.submit(Command::new(2)).unwrap();

    // Both commands are queued, so this fire owns a batch of exactly two.
    let firing = {
        let source = source.clone();
        thread::spawn(move || source.fire())
    };

    // The consumer is now mid-batch, blocked inside the handler on command 1.
    assert_eq!(delivered_rx.recv_timeout(RECV_TIMEOUT).unwrap(), 1);

    source.invalidate().unwrap();
    assert_eq!(scheduler.unregister_calls.load(Ordering::SeqCst), 1);
    gate_tx.send(()).unwrap();

    // The running batch still completes after teardown.
    assert_eq!(delivered_rx.recv_timeout(RECV_TIMEOUT).unwrap(), 2);
    assert_eq!(firing.join().unwrap(), 2);

    assert!(matches!(
        source.submit(Command::new(3)),
        Err(SourceError::Invalidated)
    ));
}

#[test]
fn test_handler_resubmission_lands_in_next_batch() {
    init_tracing();

    let scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default()).unwrap());
    let (tx, rx) = unbounded();
    let slot: Arc<Mutex<Option<InputSource>>> = Arc::new(Mutex::new(None));

    let resubmit = Arc::clone(&slot);
    let source = InputSource::new(move |command: Command| {
        tx.send(command.kind()).unwrap();
        if command.kind() == 1 {
            let source = resubmit.lock().clone().unwrap();
            source.submit(Command::new(99)).unwrap();
        }
    });
    *slot.lock() = Some(source.clone());
    source.add_to_loop(scheduler.clone()).unwrap();

    source.submit(Command::new(1)).unwrap();
    source.submit(Command::new(2)).unwrap();

    // The follow-up command arrives, and never before the batch it was
    // submitted from finished.
    assert_eq!(collect_kinds(&rx, 3), vec![1, 2, 99]);

    *slot.lock() = None;
    source.invalidate().unwrap();
}

#[test]
fn test_worker_shutdown_is_idempotent() {
    init_tracing();

    let scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default()).unwrap());
    let source = InputSource::new(|_command: Command| {});
    source.add_to_loop(scheduler.clone()).unwrap();

    scheduler.shutdown();
    scheduler.shutdown();

    assert!(matches!(
        source.submit(Command::new(1)),
        Err(SourceError::SchedulerStopped)
    ));
}
