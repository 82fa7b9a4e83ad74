use crate::caller::{first_outside, BacktraceResolver, CallerLocation, IgnoreList, ResolveCaller};
use crate::config::SinkConfig;
use crate::endpoint::Endpoint;
use crate::error::{BuildError, SubmitError};
use crate::message::MessageBuilder;
use crate::record::{Level, LogEvent, QueuedRecord};
use crate::transport::GelfTransport;
use crate::udp::UdpTransport;
use crate::worker::{DeliveryWorker, WorkerHandle};
use std::panic::Location;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Frames between a stack resolver and the application: `submit` itself.
const SUBMIT_DEPTH: usize = 1;

/// Levels this sink accepts, most severe first.
const ACCEPTED_LEVELS: &[Level] = &[
    Level::Panic,
    Level::Fatal,
    Level::Error,
    Level::Warn,
    Level::Info,
    Level::Debug,
];

/// Counters describing what happened to submitted records.
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Accepted into the queue.
    pub submitted: AtomicU64,
    /// Handed to the transport successfully.
    pub delivered: AtomicU64,
    /// Dropped because the transport failed.
    pub failed: AtomicU64,
}

impl SinkStats {
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Entry point for log events bound for a GELF collector.
///
/// `submit` resolves the caller, wraps the event into a record and pushes it
/// onto a bounded queue. A single [`DeliveryWorker`] drains that queue in the
/// background, so application threads never wait on the network. They do
/// wait when the queue is full: losing log lines silently is worse than
/// slowing the producer down.
///
/// Cloning is cheap; all clones feed the same queue.
#[derive(Clone)]
pub struct GelfSink {
    sender: mpsc::Sender<QueuedRecord>,
    resolver: Option<Arc<dyn ResolveCaller>>,
    ignored: Arc<IgnoreList>,
    stats: Arc<SinkStats>,
}

impl GelfSink {
    /// Connect to the collector at `addr` over UDP and start the delivery
    /// worker.
    ///
    /// **Parameters**
    /// - `addr`: `host:port` or `udp://host:port`.
    /// - `config`: [`SinkConfig`] with facility, static fields and queue
    ///   capacity.
    ///
    /// **Returns**
    /// - the sink and the handle of its worker, or a [`BuildError`] when
    ///   the address can't be parsed or resolved, or the worker thread
    ///   can't be started.
    pub async fn connect(addr: &str, config: SinkConfig) -> Result<(Self, WorkerHandle), BuildError> {
        let endpoint = Endpoint::parse(addr)?;
        let transport = UdpTransport::connect(&endpoint).await?;
        debug!(%endpoint, facility = %config.facility, "GELF sink connected");

        Self::with_transport(transport, config)
    }

    /// Build a sink on top of an arbitrary transport.
    ///
    /// Works with or without a surrounding Tokio runtime: the worker gets a
    /// thread and a runtime of its own, and `transport` is only ever polled
    /// there.
    pub fn with_transport<T>(transport: T, config: SinkConfig) -> Result<(Self, WorkerHandle), BuildError>
    where
        T: GelfTransport + 'static,
    {
        let (sink, queue) = Self::unstarted(&config);
        let builder = MessageBuilder::new(config.facility, config.extra);
        let worker = DeliveryWorker::new(Box::new(transport), builder, Arc::clone(&sink.stats));
        let handle = worker.spawn(queue)?;

        Ok((sink, handle))
    }

    /// Sink and queue receiver, with no consumer attached yet.
    pub(crate) fn unstarted(config: &SinkConfig) -> (Self, mpsc::Receiver<QueuedRecord>) {
        let (sender, queue) = mpsc::channel(config.effective_capacity());
        let sink = GelfSink {
            sender,
            resolver: None,
            ignored: Arc::new(config.ignored_callers.clone()),
            stats: Arc::new(SinkStats::default()),
        };

        (sink, queue)
    }

    /// Resolve every [`submit`](Self::submit) by walking the stack with
    /// `resolver` instead of using the tracked caller location.
    pub fn with_resolver(mut self, resolver: impl ResolveCaller + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Queue `event` for delivery.
    ///
    /// The call site is resolved here, before the record leaves the thread.
    /// It is the location `submit` was called from; wrappers marked
    /// `#[track_caller]` pass their own caller through. When that location
    /// is on the ignore list, the stack is walked past it instead. Blocks
    /// while the queue is full.
    ///
    /// **Returns**
    /// - `Ok(())` once the record is queued, whatever later happens to it
    ///   on the network.
    /// - `Err(SubmitError::Closed)` after the worker was shut down.
    #[track_caller]
    #[inline(never)]
    pub fn submit(&self, event: impl Into<Arc<LogEvent>>) -> Result<(), SubmitError> {
        let callsite = Location::caller();
        let location = match &self.resolver {
            Some(resolver) => resolver.resolve_caller(SUBMIT_DEPTH, &self.ignored),
            None if self.ignored.matches(callsite.file()) => {
                BacktraceResolver.resolve_caller(SUBMIT_DEPTH, &self.ignored)
            }
            None => CallerLocation::new(callsite.file(), callsite.line()),
        };
        self.enqueue(QueuedRecord {
            event: event.into(),
            location,
        })
    }

    /// Queue `event` with a call site already known to the framework.
    pub(crate) fn submit_at(&self, event: LogEvent, callsite: CallerLocation) -> Result<(), SubmitError> {
        let location = first_outside(std::iter::once(callsite), 0, &self.ignored);
        self.enqueue(QueuedRecord {
            event: Arc::new(event),
            location,
        })
    }

    fn enqueue(&self, record: QueuedRecord) -> Result<(), SubmitError> {
        let record = match self.sender.try_send(record) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(TrySendError::Closed(_)) => return Err(SubmitError::Closed),
            Err(TrySendError::Full(record)) => record,
        };

        self.wait_for_slot(record)?;
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Block the calling thread until the queue takes `record`.
    ///
    /// The worker runs on its own thread, so parking this one never stalls
    /// the consumer, current-thread runtimes included.
    fn wait_for_slot(&self, record: QueuedRecord) -> Result<(), SubmitError> {
        let sent = match Handle::try_current() {
            Err(_) => self.sender.blocking_send(record),
            Ok(handle) if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| self.sender.blocking_send(record))
            }
            // blocking_send refuses to run inside a runtime; unconstrained
            // keeps an exhausted task budget from stalling the poll loop
            Ok(_) => futures::executor::block_on(tokio::task::unconstrained(self.sender.send(record))),
        };

        sent.map_err(|_| SubmitError::Closed)
    }

    /// Levels this sink is willing to receive.
    pub fn levels(&self) -> &'static [Level] {
        ACCEPTED_LEVELS
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    /// Free slots left in the queue.
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}
