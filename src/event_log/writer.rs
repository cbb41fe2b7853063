//! Background writer for the event log
//!
//! A single dedicated thread is the only consumer of the event queue and the
//! only owner of the sink. It drains events in admission order, applies the
//! level filter, and renders each admitted event into one sink line.
//!
//! Every queued event holds one of the queue's slots until the writer is done
//! with it, so an event being written still counts against the capacity.

use super::event::LogEvent;
use super::level::LevelFilter;
use super::sink::LogSink;
use chrono::Utc;
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit};

/// Callback invoked with every sink write/close failure.
pub type SinkErrorHook = Arc<dyn Fn(&io::Error) + Send + Sync>;

/// Health counters for the event log, shared by producers and the writer.
#[derive(Debug, Default)]
pub struct EventLogStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
    written: AtomicU64,
    filtered: AtomicU64,
    failed: AtomicU64,
    failed_writes: AtomicU64,
}

impl EventLogStats {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Events rejected because the queue was full (drop-newest policy or `try_emit`).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    /// Sink write and close failures.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Events taken off the queue by the writer, whatever their outcome.
    pub fn consumed(&self) -> u64 {
        self.written() + self.filtered() + self.failed_writes.load(Ordering::Relaxed)
    }

    pub(super) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_event_log_accepted();
    }

    pub(super) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_event_log_dropped();
    }
}

/// Outcome of one writer lifetime, delivered to `shutdown` when the writer exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub written: u64,
    pub filtered: u64,
    pub failed: u64,
    pub close_failed: bool,
}

impl DrainReport {
    pub fn consumed(&self) -> u64 {
        self.written + self.filtered + self.failed
    }
}

/// Receiver side of the drain signal: `None` until the writer has exited.
pub(super) type DrainSignal = watch::Receiver<Option<DrainReport>>;

/// An admitted event together with the queue slot it occupies.
pub(super) struct QueuedEvent {
    event: LogEvent,
    _slot: OwnedSemaphorePermit,
}

impl QueuedEvent {
    pub(super) fn new(event: LogEvent, slot: OwnedSemaphorePermit) -> Self {
        Self { event, _slot: slot }
    }
}

pub(super) struct WriterTask<S> {
    sink: S,
    filter: LevelFilter,
    stats: Arc<EventLogStats>,
    on_error: Option<SinkErrorHook>,
}

impl<S: LogSink> WriterTask<S> {
    pub(super) fn new(
        sink: S,
        filter: LevelFilter,
        stats: Arc<EventLogStats>,
        on_error: Option<SinkErrorHook>,
    ) -> Self {
        Self {
            sink,
            filter,
            stats,
            on_error,
        }
    }

    /// Start the writer thread.
    ///
    /// The returned signal carries the report once the queue is closed, fully
    /// drained, and the sink has been closed. It can be cloned by any number
    /// of waiters.
    pub(super) fn spawn(
        self,
        rx: mpsc::UnboundedReceiver<QueuedEvent>,
    ) -> io::Result<DrainSignal> {
        let (done_tx, done_rx) = watch::channel(None);

        thread::Builder::new()
            .name("event-log-writer".to_string())
            .spawn(move || {
                let report = self.run(rx);
                done_tx.send_replace(Some(report));
            })?;

        Ok(done_rx)
    }

    fn run(mut self, mut rx: mpsc::UnboundedReceiver<QueuedEvent>) -> DrainReport {
        let mut report = DrainReport::default();
        tracing::debug!(threshold = %self.filter.threshold(), "Event log writer started");

        // Returns None only once every sender is gone and the queue is empty.
        // The slot is released when `queued` drops at the end of each pass.
        while let Some(queued) = rx.blocking_recv() {
            let event = &queued.event;
            if !self.filter.should_emit(event.level()) {
                report.filtered += 1;
                self.stats.filtered.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let line = event.render(Utc::now());
            match self.sink.write_line(&line) {
                Ok(()) => {
                    report.written += 1;
                    self.stats.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    report.failed += 1;
                    self.stats.failed_writes.fetch_add(1, Ordering::Relaxed);
                    self.sink_failure("write", &e);
                }
            }
        }

        if let Err(e) = self.sink.close() {
            report.close_failed = true;
            self.sink_failure("close", &e);
        }

        tracing::debug!(
            written = report.written,
            filtered = report.filtered,
            failed = report.failed,
            "Event log writer drained"
        );

        report
    }

    fn sink_failure(&self, op: &'static str, error: &io::Error) {
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_event_log_sink_failure(op);
        tracing::warn!(error = %error, op, "Event log sink failure");

        if let Some(hook) = &self.on_error {
            hook(error);
        }
    }
}
