//! Asynchronous report dispatch
//!
//! The [`Dispatcher`] owns a bounded queue and a background worker. Callers
//! enqueue built reports without waiting; the worker hands each report to
//! the transport exactly once, with bounded concurrency. `flush` blocks
//! until every report enqueued so far has been delivered or has failed.
//!
//! ## Pending accounting
//!
//! Every queued report travels with a [`PendingGuard`]. The guard is
//! created before the report enters the queue and is dropped once the
//! delivery attempt, including the failure callback, has finished. A report
//! that never makes it into the queue, or a delivery task that panics,
//! still drops its guard, so the pending count always returns to zero and
//! `flush` always terminates.
//!
//! A transport that panics inside `deliver` is treated like any other
//! failed attempt: it is counted under the `panic` reason and passed to the
//! failure callback as [`TransportError::Panicked`].

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Condvar, Mutex, PoisonError, RwLock,
    },
    thread,
    time::{Duration, Instant},
};

use crashline_core::{
    config::DeliveryConfig,
    domain::{Level, Report},
    ports::{ITransport, TransportError},
};
use futures_util::FutureExt;
use thiserror::Error;
use tokio::{
    sync::{mpsc, Notify, Semaphore},
    task::JoinSet,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::metrics::{ReporterMetrics, DROP_CLOSED, DROP_QUEUE_FULL};

/// Name of the worker thread
const WORKER_THREAD_NAME: &str = "crashline-dispatch";

/// Errors returned when a report cannot be queued
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The queue is at capacity; the report was dropped
    #[error("Report queue is full (capacity {capacity}); report dropped")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// The worker is gone; the report was dropped
    #[error("Dispatcher is closed")]
    Closed,

    /// The worker could not be started
    #[error("Failed to start delivery worker: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Observable dispatcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Nothing pending
    Idle,
    /// Reports queued or in flight, nobody waiting
    Pending,
    /// Reports pending and at least one caller blocked in a flush
    Draining,
}

/// Outcome of a flush with a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Every report enqueued before the flush has been handled
    Drained,
    /// The deadline passed with reports still pending
    TimedOut,
}

/// A failed delivery, as passed to the failure callback
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub report_id: Uuid,
    pub level: Level,
    pub title: String,
    pub error: TransportError,
}

/// Callback invoked on the worker for every failed delivery
pub type FailureCallback = Arc<dyn Fn(&DeliveryFailure) + Send + Sync>;

/// Count of reports enqueued but not yet handled
struct PendingTracker {
    count: Mutex<usize>,
    drained: Condvar,
    notify: Notify,
}

impl PendingTracker {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            drained: Condvar::new(),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> usize {
        *self.lock()
    }

    fn increment(&self) -> usize {
        let mut count = self.lock();
        *count += 1;
        *count
    }

    fn decrement(&self) -> usize {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
            self.notify.notify_waiters();
        }
        *count
    }

    fn wait(&self) {
        let count = self.lock();
        let _count = self
            .drained
            .wait_while(count, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let count = self.lock();
        let (count, _) = self
            .drained
            .wait_timeout_while(count, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }

    async fn wait_async(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a drain between the check and the
            // await is not missed.
            notified.as_mut().enable();
            if self.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// State shared between the dispatcher handle and the worker
struct Shared {
    pending: PendingTracker,
    flush_waiters: AtomicUsize,
    metrics: ReporterMetrics,
    on_failure: RwLock<Option<FailureCallback>>,
}

impl Shared {
    fn failure_callback(&self) -> Option<FailureCallback> {
        self.on_failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Keeps one report counted as pending until dropped
struct PendingGuard {
    shared: Arc<Shared>,
}

impl PendingGuard {
    fn acquire(shared: &Arc<Shared>) -> Self {
        let pending = shared.pending.increment();
        shared.metrics.set_pending(pending);
        Self {
            shared: Arc::clone(shared),
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let pending = self.shared.pending.decrement();
        self.shared.metrics.set_pending(pending);
    }
}

/// Marks a caller as blocked in a flush for the guard's lifetime
struct FlushWaiter<'a>(&'a AtomicUsize);

impl<'a> FlushWaiter<'a> {
    fn enter(waiters: &'a AtomicUsize) -> Self {
        waiters.fetch_add(1, Ordering::SeqCst);
        Self(waiters)
    }
}

impl Drop for FlushWaiter<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Queued {
    report: Report,
    pending: PendingGuard,
}

/// Bounded queue plus background delivery worker
pub struct Dispatcher {
    sender: Option<mpsc::Sender<Queued>>,
    capacity: usize,
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Dispatcher {
    /// Starts the worker thread and returns the handle used to enqueue
    ///
    /// # Arguments
    /// * `config` - Queue capacity and delivery concurrency
    /// * `transport` - Where reports are delivered
    /// * `metrics` - Registry updated with delivery outcomes
    ///
    /// # Errors
    /// [`DispatchError::Runtime`] if the worker runtime or thread cannot be
    /// created.
    pub fn spawn(
        config: &DeliveryConfig,
        transport: Arc<dyn ITransport>,
        metrics: ReporterMetrics,
    ) -> Result<Self, DispatchError> {
        let capacity = config.queue_capacity.max(1);
        let max_concurrent = config.max_concurrent.max(1);

        let shared = Arc::new(Shared {
            pending: PendingTracker::new(),
            flush_waiters: AtomicUsize::new(0),
            metrics,
            on_failure: RwLock::new(None),
        });

        let (sender, receiver) = mpsc::channel(capacity);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(run_worker(receiver, transport, max_concurrent)))?;

        info!(capacity, max_concurrent, "Report dispatcher started");

        Ok(Self {
            sender: Some(sender),
            capacity,
            shared,
            worker: Some(worker),
        })
    }

    /// Installs the callback invoked for every failed delivery
    ///
    /// The callback runs on the worker thread before the failed report
    /// stops counting as pending, so it must not flush this dispatcher:
    /// such a flush never returns.
    pub fn set_failure_callback(&self, callback: FailureCallback) {
        *self
            .shared
            .on_failure
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Queues a report for delivery without waiting
    ///
    /// # Errors
    /// - [`DispatchError::QueueFull`] if the queue is at capacity
    /// - [`DispatchError::Closed`] if the worker has stopped
    ///
    /// In both cases the report is dropped and counted.
    pub fn enqueue(&self, report: Report) -> Result<(), DispatchError> {
        let Some(sender) = self.sender.as_ref() else {
            self.shared.metrics.record_dropped(DROP_CLOSED);
            return Err(DispatchError::Closed);
        };

        let report_id = report.id();
        let level = report.level();
        let queued = Queued {
            report,
            pending: PendingGuard::acquire(&self.shared),
        };

        match sender.try_send(queued) {
            Ok(()) => {
                self.shared.metrics.record_enqueued(level);
                debug!(%report_id, %level, "Report enqueued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.shared.metrics.record_dropped(DROP_QUEUE_FULL);
                warn!(
                    %report_id,
                    %level,
                    capacity = self.capacity,
                    "Report queue full, dropping report"
                );
                Err(DispatchError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.shared.metrics.record_dropped(DROP_CLOSED);
                warn!(%report_id, %level, "Report dispatcher closed, dropping report");
                Err(DispatchError::Closed)
            }
        }
    }

    /// Number of reports enqueued and not yet handled
    pub fn pending(&self) -> usize {
        self.shared.pending.get()
    }

    /// Current state
    pub fn state(&self) -> DispatcherState {
        if self.shared.pending.get() == 0 {
            DispatcherState::Idle
        } else if self.shared.flush_waiters.load(Ordering::SeqCst) > 0 {
            DispatcherState::Draining
        } else {
            DispatcherState::Pending
        }
    }

    /// Blocks until every report enqueued so far has been handled
    ///
    /// Returns immediately when nothing is pending. Must not be called
    /// from within an async context; use [`Dispatcher::flush_async`] there.
    pub fn flush(&self) {
        let _waiter = FlushWaiter::enter(&self.shared.flush_waiters);
        self.shared.pending.wait();
    }

    /// Like [`Dispatcher::flush`], giving up after `timeout`
    pub fn flush_timeout(&self, timeout: Duration) -> FlushStatus {
        let _waiter = FlushWaiter::enter(&self.shared.flush_waiters);
        if self.shared.pending.wait_timeout(timeout) {
            FlushStatus::Drained
        } else {
            FlushStatus::TimedOut
        }
    }

    /// Waits asynchronously until every report enqueued so far has been
    /// handled
    pub async fn flush_async(&self) {
        let _waiter = FlushWaiter::enter(&self.shared.flush_waiters);
        self.shared.pending.wait_async().await;
    }

    /// Closes the queue, lets the worker deliver what is queued and joins it
    pub fn shutdown(mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Report dispatcher worker panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing the sender lets a detached worker drain and exit.
        self.sender.take();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Queued>,
    transport: Arc<dyn ITransport>,
    max_concurrent: usize,
) {
    let permits = Arc::new(Semaphore::new(max_concurrent));
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "Delivery task aborted");
                }
            }

            queued = receiver.recv() => {
                let Some(queued) = queued else { break };
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let transport = Arc::clone(&transport);
                in_flight.spawn(async move {
                    let _permit = permit;
                    deliver(transport.as_ref(), queued).await;
                });
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Delivery task aborted");
        }
    }

    info!("Report dispatcher stopped");
}

/// Makes the single delivery attempt for one report
async fn deliver(transport: &dyn ITransport, queued: Queued) {
    let Queued { report, pending } = queued;
    let shared = &pending.shared;
    let started = Instant::now();

    let outcome = AssertUnwindSafe(transport.deliver(&report))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(TransportError::Panicked(panic_message(payload.as_ref())))
        });

    match outcome {
        Ok(()) => {
            shared
                .metrics
                .record_delivered(report.level(), started.elapsed().as_secs_f64());
            debug!(report_id = %report.id(), level = %report.level(), "Report delivered");
        }
        Err(e) => {
            shared
                .metrics
                .record_failure(e.reason(), started.elapsed().as_secs_f64());
            error!(
                report_id = %report.id(),
                level = %report.level(),
                fingerprint = report.fingerprint().unwrap_or_default(),
                error = %e,
                "Report delivery failed"
            );
            if let Some(callback) = shared.failure_callback() {
                callback(&DeliveryFailure {
                    report_id: report.id(),
                    level: report.level(),
                    title: report.title().to_string(),
                    error: e,
                });
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
