//! Asynchronous event log for the metrics service
//!
//! Producers (request handlers, middleware, background jobs) enqueue leveled
//! messages into a bounded FIFO queue. A single writer thread drains the queue
//! in admission order, filters by severity, and appends one rendered line per
//! event to the sink.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --init--> Running --shutdown--> Draining --writer exit--> Closed
//! ```
//!
//! - `emit` is accepted only while `Running`.
//! - `shutdown` closes admission, waits for the writer to consume every queued
//!   event, and returns once the sink has been released.
//! - A closed logger cannot be re-initialized; build a new one instead.

pub mod error;
pub mod event;
pub mod level;
pub mod sink;
pub mod writer;

pub use error::{LogError, Result};
pub use event::LogEvent;
pub use level::{LevelFilter, LogLevel};
pub use sink::{FileSink, LogSink, MemorySink};
pub use writer::{DrainReport, EventLogStats, SinkErrorHook};

use crate::config::EventLogConfig;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, AcquireError, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info, warn};
use writer::{DrainSignal, QueuedEvent, WriterTask};

/// Default number of queue slots.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// What a producer does when the queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for a free slot (back-pressure).
    #[default]
    Block,
    /// Reject the new event and count it as dropped.
    DropNewest,
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    Uninitialized,
    Running,
    Draining,
    Closed,
}

/// Producer side of the queue. A slot is taken before the event is sent and
/// given back by the writer once the event has been written or filtered.
#[derive(Clone)]
struct Admission {
    sender: mpsc::UnboundedSender<QueuedEvent>,
    slots: Arc<Semaphore>,
}

enum Lifecycle {
    Uninitialized,
    Running {
        admission: Admission,
        done: DrainSignal,
    },
    Draining {
        done: DrainSignal,
    },
    Closed(DrainReport),
}

impl Lifecycle {
    fn state(&self) -> LoggerState {
        match self {
            Self::Uninitialized => LoggerState::Uninitialized,
            Self::Running { .. } => LoggerState::Running,
            Self::Draining { .. } => LoggerState::Draining,
            Self::Closed(_) => LoggerState::Closed,
        }
    }
}

/// Lifecycle controller and producer handle for the event log.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct EventLogger {
    config: EventLogConfig,
    lifecycle: Mutex<Lifecycle>,
    stats: Arc<EventLogStats>,
    on_error: Option<SinkErrorHook>,
}

impl EventLogger {
    pub fn new(config: EventLogConfig) -> Self {
        Self {
            config,
            lifecycle: Mutex::new(Lifecycle::Uninitialized),
            stats: Arc::new(EventLogStats::default()),
            on_error: None,
        }
    }

    /// Register a callback for sink failures inside the writer.
    pub fn with_error_hook(mut self, hook: SinkErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Open the configured log file and start the writer.
    pub fn init(&self) -> Result<()> {
        self.ensure_uninitialized()?;

        let sink = FileSink::open(&self.config.path, self.config.truncate).map_err(|source| {
            LogError::SinkUnavailable {
                path: self.config.path.clone(),
                source,
            }
        })?;

        self.init_with_sink(sink)?;

        info!(
            path = %self.config.path.display(),
            level = %self.config.level,
            "Event log initialized"
        );
        Ok(())
    }

    /// Start the writer over an already opened sink.
    pub fn init_with_sink<S: LogSink>(&self, sink: S) -> Result<()> {
        let mut lifecycle = self.lock();
        if !matches!(*lifecycle, Lifecycle::Uninitialized) {
            return Err(LogError::AlreadyInitialized);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let task = WriterTask::new(
            sink,
            LevelFilter::new(self.config.level),
            self.stats.clone(),
            self.on_error.clone(),
        );
        let done = task.spawn(receiver).map_err(LogError::WriterUnavailable)?;

        *lifecycle = Lifecycle::Running {
            admission: Admission {
                sender,
                slots: Arc::new(Semaphore::new(self.capacity())),
            },
            done,
        };
        Ok(())
    }

    /// Enqueue an event, waiting for a free slot when the queue is full.
    ///
    /// Under [`OverflowPolicy::DropNewest`] this never waits and reports
    /// [`LogError::QueueFull`] instead.
    pub async fn emit(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let admission = self.admission()?;
        let event = LogEvent::new(level, message);

        match self.config.overflow {
            OverflowPolicy::Block => {
                let slot = admission.slots.clone().acquire_owned().await;
                self.enqueue(&admission, event, slot)
            }
            OverflowPolicy::DropNewest => self.admit_now(&admission, event),
        }
    }

    /// Blocking variant of [`emit`](Self::emit) for plain threads.
    ///
    /// Must not be called from inside an async context.
    pub fn blocking_emit(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let admission = self.admission()?;
        let event = LogEvent::new(level, message);

        match self.config.overflow {
            OverflowPolicy::Block => {
                let slot = futures::executor::block_on(admission.slots.clone().acquire_owned());
                self.enqueue(&admission, event, slot)
            }
            OverflowPolicy::DropNewest => self.admit_now(&admission, event),
        }
    }

    /// Enqueue an event only if a slot is free right now.
    pub fn try_emit(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let admission = self.admission()?;
        self.admit_now(&admission, LogEvent::new(level, message))
    }

    /// Close admission, drain the queue, and release the sink.
    ///
    /// Every caller that finds the logger `Running` or `Draining` waits until
    /// the writer has exited. Only the call that started the drain receives
    /// the report; the others, and calls made before init or after close,
    /// return `None`.
    pub async fn shutdown(&self) -> Option<DrainReport> {
        let (mut done, initiator) = self.begin_drain()?;

        let report = match done.wait_for(Option::is_some).await.map(|report| *report) {
            Ok(Some(report)) => report,
            _ => {
                warn!("Event log writer exited without a drain report");
                DrainReport::default()
            }
        };

        self.finish_drain(report, initiator)
    }

    /// Blocking variant of [`shutdown`](Self::shutdown) for plain threads.
    ///
    /// Must not be called from inside an async context.
    pub fn shutdown_blocking(&self) -> Option<DrainReport> {
        futures::executor::block_on(self.shutdown())
    }

    pub fn state(&self) -> LoggerState {
        self.lock().state()
    }

    pub fn stats(&self) -> &EventLogStats {
        &self.stats
    }

    /// Report of the completed drain, once `Closed`.
    pub fn drain_report(&self) -> Option<DrainReport> {
        match &*self.lock() {
            Lifecycle::Closed(report) => Some(*report),
            _ => None,
        }
    }

    /// Admitted events the writer has not finished with, including the one
    /// it is writing.
    pub fn pending_count(&self) -> usize {
        match &*self.lock() {
            Lifecycle::Running { admission, .. } => {
                self.capacity() - admission.slots.available_permits()
            }
            _ => 0,
        }
    }

    pub fn config(&self) -> &EventLogConfig {
        &self.config
    }

    fn capacity(&self) -> usize {
        self.config.queue_capacity.max(1)
    }

    fn ensure_uninitialized(&self) -> Result<()> {
        match self.state() {
            LoggerState::Uninitialized => Ok(()),
            _ => Err(LogError::AlreadyInitialized),
        }
    }

    fn admission(&self) -> Result<Admission> {
        match &*self.lock() {
            Lifecycle::Running { admission, .. } => Ok(admission.clone()),
            _ => Err(LogError::NotInitialized),
        }
    }

    fn admit_now(&self, admission: &Admission, event: LogEvent) -> Result<()> {
        match admission.slots.clone().try_acquire_owned() {
            Ok(slot) => self.enqueue(admission, event, Ok(slot)),
            Err(TryAcquireError::NoPermits) => {
                self.stats.record_dropped();
                Err(LogError::QueueFull)
            }
            Err(TryAcquireError::Closed) => Err(LogError::NotInitialized),
        }
    }

    fn enqueue(
        &self,
        admission: &Admission,
        event: LogEvent,
        slot: std::result::Result<OwnedSemaphorePermit, AcquireError>,
    ) -> Result<()> {
        let slot = slot.map_err(|_| LogError::NotInitialized)?;
        admission
            .sender
            .send(QueuedEvent::new(event, slot))
            .map_err(|_| LogError::NotInitialized)?;
        self.stats.record_accepted();
        Ok(())
    }

    /// Move `Running` to `Draining`, dropping the owned sender so the writer
    /// exits once the remaining events are consumed.
    ///
    /// The flag is true for the call that performed the transition.
    fn begin_drain(&self) -> Option<(DrainSignal, bool)> {
        let mut lifecycle = self.lock();
        let done = match &*lifecycle {
            Lifecycle::Running { done, .. } => done.clone(),
            Lifecycle::Draining { done } => return Some((done.clone(), false)),
            Lifecycle::Uninitialized | Lifecycle::Closed(_) => return None,
        };

        *lifecycle = Lifecycle::Draining { done: done.clone() };
        debug!("Event log draining");
        Some((done, true))
    }

    fn finish_drain(&self, report: DrainReport, initiator: bool) -> Option<DrainReport> {
        {
            let mut lifecycle = self.lock();
            if matches!(*lifecycle, Lifecycle::Draining { .. }) {
                *lifecycle = Lifecycle::Closed(report);
            }
        }

        if !initiator {
            return None;
        }

        debug!(
            written = report.written,
            filtered = report.filtered,
            failed = report.failed,
            "Event log closed"
        );
        Some(report)
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
