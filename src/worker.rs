use crate::error::BuildError;
use crate::message::{local_hostname, MessageBuilder};
use crate::record::QueuedRecord;
use crate::sink::SinkStats;
use crate::transport::GelfTransport;
use std::cell::Cell;
use std::sync::{atomic::Ordering, Arc};
use std::thread::{self, JoinHandle};
use tokio::runtime;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const WORKER_THREAD_NAME: &str = "gelf-delivery";

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the calling thread is a delivery worker.
///
/// Events raised there must not go back through a sink: the worker is the
/// only consumer of its queue and would wait on itself.
pub(crate) fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

/// Background task draining a sink's queue into its transport.
///
/// Runs on a dedicated thread with its own single-threaded Tokio runtime, so
/// producers parked on a full queue never hold up the consumer that frees
/// it, whatever runtime they run on.
///
/// Alternates between waiting for a record and processing it. A send failure
/// drops the record and the loop goes back to waiting; nothing is retried or
/// reported to producers.
pub struct DeliveryWorker {
    transport: Box<dyn GelfTransport>,
    builder: MessageBuilder,
    stats: Arc<SinkStats>,
}

impl DeliveryWorker {
    pub(crate) fn new(transport: Box<dyn GelfTransport>, builder: MessageBuilder, stats: Arc<SinkStats>) -> Self {
        DeliveryWorker {
            transport,
            builder,
            stats,
        }
    }

    /// Start the worker loop on its own thread.
    pub(crate) fn spawn(self, queue: mpsc::Receiver<QueuedRecord>) -> Result<WorkerHandle, BuildError> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let runtime = runtime::Builder::new_current_thread().enable_all().build()?;

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                ON_WORKER.with(|flag| flag.set(true));
                runtime.block_on(self.run(queue, shutdown_rx));
                let _ = done_tx.send(());
            })?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            done: done_rx,
            thread,
        })
    }

    async fn run(self, mut queue: mpsc::Receiver<QueuedRecord>, shutdown: oneshot::Receiver<()>) {
        let mut shutdown = Some(shutdown);

        loop {
            let next = match shutdown.as_mut() {
                Some(signal) => tokio::select! {
                    requested = signal => Err(requested.is_ok()),
                    record = queue.recv() => Ok(record),
                },
                None => Ok(queue.recv().await),
            };

            let record = match next {
                Ok(record) => record,
                Err(requested) => {
                    shutdown = None;
                    // A dropped handle detaches the worker; only an
                    // explicit request closes the queue.
                    if requested {
                        debug!("shutdown requested, draining log queue");
                        queue.close();
                    }
                    continue;
                }
            };

            match record {
                Some(record) => self.deliver(record).await,
                // closed and drained, or every sink handle is gone
                None => break,
            }
        }

        debug!("GELF delivery worker stopped");
    }

    async fn deliver(&self, record: QueuedRecord) {
        let message = self.builder.build(&record, local_hostname());

        match self.transport.send(&message).await {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "dropping GELF message after failed send");
            }
        }
    }
}

/// Handle to a running [`DeliveryWorker`].
///
/// Dropping it leaves the worker running for as long as any
/// [`GelfSink`](crate::sink::GelfSink) clone is alive.
pub struct WorkerHandle {
    shutdown: oneshot::Sender<()>,
    done: oneshot::Receiver<()>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop accepting records, deliver everything already queued, and wait
    /// for the worker to exit.
    ///
    /// Submissions made after this call fail with
    /// [`SubmitError::Closed`](crate::error::SubmitError::Closed).
    pub async fn shutdown(self) {
        // Err means the worker already exited
        let _ = self.shutdown.send(());
        let _ = self.done.await;
    }

    /// [`shutdown`](Self::shutdown) for callers outside any async context.
    pub fn shutdown_blocking(self) {
        let _ = self.shutdown.send(());
        let _ = self.thread.join();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}
