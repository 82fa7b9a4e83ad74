use crate::caller::CallerLocation;
use crate::error::SubmitError;
use crate::record::{FieldValue, Level, LogEvent};
use crate::sink::GelfSink;
use crate::worker;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{debug, warn, Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Events from this crate are never forwarded, or the sink's own
/// diagnostics would feed back into its queue.
const OWN_TARGET: &str = "tracing_gelf_sink";

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// `tracing_subscriber` layer that forwards events to a [`GelfSink`].
///
/// Only events at one of [`GelfSink::levels`] are forwarded. Fields are
/// captured on the emitting thread; formatting of `Debug` values therefore
/// happens there as well, since `tracing` lends them only for the duration
/// of the callback.
///
/// Events emitted on the delivery worker's thread, by a transport for
/// instance, are not forwarded either.
#[derive(Clone)]
pub struct GelfLayer {
    sink: GelfSink,
    closed_reported: Arc<AtomicBool>,
}

impl GelfLayer {
    pub fn new(sink: GelfSink) -> Self {
        GelfLayer {
            sink,
            closed_reported: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sink(&self) -> &GelfSink {
        &self.sink
    }
}

impl<S> Layer<S> for GelfLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_own_target(meta.target()) || worker::on_worker_thread() {
            return;
        }

        let level = Level::from(*meta.level());
        if !self.sink.levels().contains(&level) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message = String::new();
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        });

        // the macro pinned the call site at compile time
        let callsite = match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => CallerLocation::new(file.to_string(), line),
            _ => CallerLocation::UNKNOWN,
        };

        let log_event = LogEvent {
            timestamp: Utc::now(),
            level,
            message,
            fields,
        };

        // The application never sees a closed queue; say so once.
        if let Err(SubmitError::Closed) = self.sink.submit_at(log_event, callsite) {
            if self.closed_reported.swap(true, Ordering::Relaxed) {
                debug!(target: OWN_TARGET, "GELF sink closed, dropping event");
            } else {
                warn!(target: OWN_TARGET, "GELF sink closed, further events are dropped");
            }
        }
    }
}

struct FieldVisitor<'a> {
    fields: &'a mut BTreeMap<String, FieldValue>,
    message: &'a mut String,
}

impl FieldVisitor<'_> {
    fn insert(&mut self, field: &Field, value: FieldValue) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.insert(field, FieldValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, FieldValue::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, FieldValue::UInt(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, FieldValue::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, FieldValue::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, FieldValue::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = format!("{:?}", value);
        } else {
            self.insert(field, FieldValue::Str(format!("{:?}", value)));
        }
    }
}
