//! Structured runtime event log.
//!
//! Buffered, correlated, queryable logging tied to job events. Emitters
//! hand entries to a background consumer task over an unbounded channel;
//! the consumer owns the buffer and drains it to disk on a timer, when the
//! buffer fills, or on demand. Entries at `trace`/`debug`/`info` are
//! fire-and-forget; `warn` and above follow their entry with a flush
//! barrier so the write is durable before the emitting call returns. Emit
//! paths never propagate I/O errors to the caller; failures surface as
//! internal diagnostics.

mod analysis;
mod entry;
mod query;
mod writer;

pub use analysis::{normalize_signature, ErrorPatternReport, LogPerformanceReport, SlowEvent};
pub use entry::{LogContext, LogFilter, LogLevel, RuntimeLogEntry};

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::LogConfig;
use crate::error::Result;
use crate::job::TimeRange;
use crate::store::StoreLayout;

use writer::LogWriter;

/// Work items handed to the background consumer.
enum LogCommand {
    /// Queue an entry for the next drain.
    Entry(RuntimeLogEntry),
    /// Drain the buffer now and acknowledge once it is on disk.
    Flush(oneshot::Sender<()>),
}

/// Buffered structured logger over the global runtime log files.
///
/// Cloning is cheap; clones share the channel, context, and background
/// consumer task.
#[derive(Clone)]
pub struct RuntimeLogger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    writer: Arc<LogWriter>,
    config: LogConfig,
    context: RwLock<LogContext>,
    sender: RwLock<Option<mpsc::UnboundedSender<LogCommand>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl RuntimeLogger {
    /// Create a logger writing under the layout's global logs directory.
    /// No I/O happens until [`initialize`](RuntimeLogger::initialize);
    /// entries emitted before then are dropped with a diagnostic.
    #[must_use]
    pub fn new(layout: &StoreLayout, config: LogConfig) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                writer: Arc::new(LogWriter::new(layout.logs_dir(), config.clone())),
                config,
                context: RwLock::new(LogContext::default()),
                sender: RwLock::new(None),
                consumer: Mutex::new(None),
            }),
        }
    }

    /// Create the logs directory and spawn the background consumer that
    /// drains queued entries to disk. Idempotent.
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.inner.writer.logs_dir()).await?;

        let mut sender_slot = self.inner.sender.write().await;
        if sender_slot.is_some() {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<LogCommand>();
        let writer = Arc::clone(&self.inner.writer);
        let config = self.inner.config.clone();

        let consumer = tokio::spawn(async move {
            let mut buffer: Vec<RuntimeLogEntry> = Vec::new();
            let mut ticker = (config.flush_interval_ms > 0).then(|| {
                let mut ticker = tokio::time::interval(std::time::Duration::from_millis(
                    config.flush_interval_ms,
                ));
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                ticker
            });

            loop {
                let timed_tick = async {
                    match ticker.as_mut() {
                        Some(ticker) => {
                            ticker.tick().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    command = rx.recv() => match command {
                        Some(LogCommand::Entry(entry)) => {
                            buffer.push(entry);
                            if buffer.len() >= config.buffer_size {
                                drain(&writer, &mut buffer).await;
                            }
                        }
                        Some(LogCommand::Flush(ack)) => {
                            drain(&writer, &mut buffer).await;
                            let _ = ack.send(());
                        }
                        // Every sender is gone: final drain, then exit.
                        None => {
                            drain(&writer, &mut buffer).await;
                            break;
                        }
                    },
                    () = timed_tick => drain(&writer, &mut buffer).await,
                }
            }
        });

        *sender_slot = Some(tx);
        *self.inner.consumer.lock().await = Some(consumer);
        Ok(())
    }

    /// Set the per-caller context defaults stamped onto subsequent entries.
    pub async fn set_session_context(
        &self,
        session_id: impl Into<String>,
        job_id: Option<String>,
        agent_type: Option<String>,
    ) {
        let mut context = self.inner.context.write().await;
        *context = LogContext {
            session_id: Some(session_id.into()),
            job_id,
            agent_type,
        };
    }

    /// Emit an entry at the given level using the session context defaults.
    pub async fn log(&self, level: LogLevel, event: &str, data: Value) {
        self.log_with(level, event, data, None, None).await;
    }

    /// Emit an entry with an optional context override and an optional
    /// caller-supplied correlation id (for stitching begin/end pairs).
    pub async fn log_with(
        &self,
        level: LogLevel,
        event: &str,
        data: Value,
        context: Option<&LogContext>,
        correlation_id: Option<String>,
    ) {
        let entry = {
            let default_ctx = self.inner.context.read().await;
            let ctx = context.unwrap_or(&default_ctx);
            let mut entry = RuntimeLogEntry::new(level, event, data, ctx);
            if let Some(id) = correlation_id {
                entry = entry.with_correlation_id(id);
            }
            entry
        };

        let Some(sender) = self.sender().await else {
            debug!(event, "runtime log not running; dropping entry");
            return;
        };

        if sender.send(LogCommand::Entry(entry)).is_err() {
            debug!(event, "runtime log consumer gone; dropping entry");
            return;
        }

        // warn and above bypass the batching policy: a flush barrier makes
        // the entry durable before the emitting call returns.
        if !level.is_buffered() {
            await_flush(&sender).await;
        }
    }

    /// Emit a `trace` entry.
    pub async fn trace(&self, event: &str, data: Value) {
        self.log(LogLevel::Trace, event, data).await;
    }

    /// Emit a `debug` entry.
    pub async fn debug(&self, event: &str, data: Value) {
        self.log(LogLevel::Debug, event, data).await;
    }

    /// Emit an `info` entry.
    pub async fn info(&self, event: &str, data: Value) {
        self.log(LogLevel::Info, event, data).await;
    }

    /// Emit a `warn` entry.
    pub async fn warn(&self, event: &str, data: Value) {
        self.log(LogLevel::Warn, event, data).await;
    }

    /// Emit an `error` entry.
    pub async fn error(&self, event: &str, data: Value) {
        self.log(LogLevel::Error, event, data).await;
    }

    /// Emit a `critical` entry.
    pub async fn critical(&self, event: &str, data: Value) {
        self.log(LogLevel::Critical, event, data).await;
    }

    /// Entries for one job across active and rotated files, timestamp
    /// ascending.
    pub async fn get_logs_for_job(
        &self,
        job_id: &str,
        filter: Option<&LogFilter>,
    ) -> Result<Vec<RuntimeLogEntry>> {
        self.collect(|e| e.job_id.as_deref() == Some(job_id), filter)
            .await
    }

    /// Entries for one session across active and rotated files.
    pub async fn get_logs_for_session(
        &self,
        session_id: &str,
        filter: Option<&LogFilter>,
    ) -> Result<Vec<RuntimeLogEntry>> {
        self.collect(|e| e.session_id.as_deref() == Some(session_id), filter)
            .await
    }

    /// Entries for one agent across active and rotated files.
    pub async fn get_logs_for_agent(
        &self,
        agent_type: &str,
        filter: Option<&LogFilter>,
    ) -> Result<Vec<RuntimeLogEntry>> {
        self.collect(|e| e.agent_type.as_deref() == Some(agent_type), filter)
            .await
    }

    /// Most recent `limit` entries across all levels, oldest first.
    pub async fn get_recent_logs(&self, limit: usize) -> Result<Vec<RuntimeLogEntry>> {
        let mut entries = self.collect(|_| true, None).await?;
        if entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }
        Ok(entries)
    }

    /// Performance report over the job's events.
    pub async fn analyze_performance(&self, job_id: &str) -> Result<LogPerformanceReport> {
        let entries = self.get_logs_for_job(job_id, None).await?;
        Ok(analysis::performance_report(job_id, &entries))
    }

    /// Error/critical entries grouped by normalized signature, optionally
    /// restricted to one agent and/or a time range.
    pub async fn find_error_patterns(
        &self,
        agent_type: Option<&str>,
        time_range: Option<&TimeRange>,
    ) -> Result<Vec<ErrorPatternReport>> {
        let entries = self
            .collect(
                |e| {
                    agent_type.is_none_or(|a| e.agent_type.as_deref() == Some(a))
                        && time_range.is_none_or(|r| r.contains(e.timestamp))
                },
                None,
            )
            .await?;
        Ok(analysis::error_patterns(&entries))
    }

    /// Drain the queue and rotate the active log file regardless of size
    /// or age.
    pub async fn rotate_logs(&self) -> Result<()> {
        self.flush_now().await;
        self.inner.writer.rotate().await
    }

    /// Delete rotated files older than `retention_days`; returns how many
    /// were removed.
    pub async fn cleanup_logs(&self, retention_days: u32) -> Result<usize> {
        self.inner.writer.cleanup(retention_days).await
    }

    /// Drain the queue and stop the background consumer.
    pub async fn shutdown(&self) {
        // Dropping the sender ends the consumer loop after a final drain.
        let sender = { self.inner.sender.write().await.take() };
        drop(sender);

        let consumer = { self.inner.consumer.lock().await.take() };
        if let Some(consumer) = consumer {
            if let Err(e) = consumer.await {
                debug!(error = %e, "runtime log consumer ended abnormally");
            }
        }
    }

    async fn sender(&self) -> Option<mpsc::UnboundedSender<LogCommand>> {
        self.inner.sender.read().await.clone()
    }

    /// Push a flush barrier through the queue and wait for it, so entries
    /// emitted before this call are visible on disk.
    async fn flush_now(&self) {
        if let Some(sender) = self.sender().await {
            await_flush(&sender).await;
        }
    }

    async fn collect<F>(
        &self,
        keep: F,
        filter: Option<&LogFilter>,
    ) -> Result<Vec<RuntimeLogEntry>>
    where
        F: Fn(&RuntimeLogEntry) -> bool,
    {
        // Barrier first so just-emitted buffered entries are visible.
        self.flush_now().await;
        let (entries, _malformed) = query::collect_entries(self.inner.writer.logs_dir(), |e| {
            keep(e) && filter.is_none_or(|f| f.matches(e))
        })
        .await?;
        Ok(entries)
    }
}

async fn drain(writer: &LogWriter, buffer: &mut Vec<RuntimeLogEntry>) {
    let batch = std::mem::take(buffer);
    if let Err(e) = writer.append_batch(&batch).await {
        debug!(error = %e, dropped = batch.len(), "runtime log drain failed");
    }
}

async fn await_flush(sender: &mpsc::UnboundedSender<LogCommand>) {
    let (ack_tx, ack_rx) = oneshot::channel();
    if sender.send(LogCommand::Flush(ack_tx)).is_ok() {
        let _ = ack_rx.await;
    }
}
