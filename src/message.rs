use crate::record::{FieldValue, Level, QueuedRecord};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// GELF version emitted in every message.
pub const GELF_VERSION: &str = "1.1";

/// Host name reported when the local host name can't be determined.
pub const FALLBACK_HOST: &str = "localhost";

/// Name of the synthetic extra field carrying the level name.
pub const SEVERITY_FIELD: &str = "_severity";

/// Framework levels to syslog severities.
///
/// 0 Emergency, 1 Alert, 2 Critical, 3 Error, 4 Warning, 5 Notice,
/// 6 Informational, 7 Debug.
const LEVEL_TABLE: &[(Level, u8)] = &[
    (Level::Panic, 1),
    (Level::Fatal, 2),
    (Level::Error, 3),
    (Level::Warn, 4),
    (Level::Info, 6),
    (Level::Debug, 7),
];

/// Numeric GELF level for `level`; levels missing from the table report as
/// informational.
pub fn syslog_level(level: Level) -> u8 {
    lookup(level)
        .or_else(|| lookup(Level::Info))
        .unwrap_or(6)
}

fn lookup(level: Level) -> Option<u8> {
    LEVEL_TABLE
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, code)| *code)
}

/// A GELF message, serialized as the flat JSON object the collector expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub version: String,
    pub host: String,
    pub short_message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub full_message: String,
    /// Unix time in milliseconds.
    pub timestamp: i64,
    pub level: u8,
    pub facility: String,
    pub file: String,
    pub line: u32,
    /// Additional fields, every key starting with `_`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Split an already trimmed message into its short and full parts.
///
/// A newline after the first byte makes the first line the short message
/// and the whole text the full message. Anything else, including a leading
/// newline, goes entirely into the short message.
pub fn split_message(trimmed: &str) -> (&str, &str) {
    match trimmed.find('\n') {
        Some(i) if i > 0 => (&trimmed[..i], trimmed),
        _ => (trimmed, ""),
    }
}

/// Prefix marking a field as additional for the collector.
pub fn extra_key(name: &str) -> String {
    format!("_{}", name)
}

/// Builds [`WireMessage`]s from queued records for one sink.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    facility: String,
    extra: BTreeMap<String, FieldValue>,
}

impl MessageBuilder {
    pub fn new(facility: impl Into<String>, extra: BTreeMap<String, FieldValue>) -> Self {
        MessageBuilder {
            facility: facility.into(),
            extra,
        }
    }

    /// Build the message for `record` as seen from `host`, stamped now.
    pub fn build(&self, record: &QueuedRecord, host: String) -> WireMessage {
        let event = &record.event;
        let (short, full) = split_message(event.message.trim());

        let mut extra = BTreeMap::new();
        extra.insert(
            SEVERITY_FIELD.to_string(),
            Value::String(event.level.as_str().to_string()),
        );
        // Static fields first so per-event fields win on collisions.
        for (name, value) in self.extra.iter().chain(event.fields.iter()) {
            extra.insert(extra_key(name), value.to_json());
        }

        WireMessage {
            version: GELF_VERSION.to_string(),
            host,
            short_message: short.to_string(),
            full_message: full.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            level: syslog_level(event.level),
            facility: self.facility.clone(),
            file: record.location.file.to_string(),
            line: record.location.line,
            extra,
        }
    }
}

/// Name of the local host, or [`FALLBACK_HOST`].
pub fn local_hostname() -> String {
    lookup_hostname()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

#[cfg(unix)]
fn lookup_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
fn lookup_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::CallerLocation;
    use crate::record::LogEvent;
    use std::sync::Arc;

    fn queued(event: LogEvent) -> QueuedRecord {
        QueuedRecord {
            event: Arc::new(event),
            location: CallerLocation::new("src/handlers.rs", 31),
        }
    }

    #[test]
    fn single_line_messages_are_short_only() {
        assert_eq!(split_message("just one line"), ("just one line", ""));
        assert_eq!(split_message(""), ("", ""));
    }

    #[test]
    fn first_line_becomes_short_message() {
        let text = "test message\nsecond line\nthird";
        assert_eq!(split_message(text), ("test message", text));
    }

    #[test]
    fn leading_newline_does_not_split() {
        assert_eq!(split_message("\nbody"), ("\nbody", ""));
    }

    #[test]
    fn message_is_trimmed_before_splitting() {
        let builder = MessageBuilder::new("app", BTreeMap::new());
        let msg = builder.build(&queued(LogEvent::new(Level::Info, "\n  head\ntail \n")), "h".into());

        assert_eq!(msg.short_message, "head");
        assert_eq!(msg.full_message, "head\ntail");
    }

    #[test]
    fn level_table() {
        assert_eq!(syslog_level(Level::Panic), 1);
        assert_eq!(syslog_level(Level::Fatal), 2);
        assert_eq!(syslog_level(Level::Error), 3);
        assert_eq!(syslog_level(Level::Warn), 4);
        assert_eq!(syslog_level(Level::Info), 6);
        assert_eq!(syslog_level(Level::Debug), 7);
        // not in the table
        assert_eq!(syslog_level(Level::Trace), syslog_level(Level::Info));
    }

    #[test]
    fn builds_reference_message() {
        let mut static_extra = BTreeMap::new();
        static_extra.insert("foo".to_string(), FieldValue::from("bar"));
        let builder = MessageBuilder::new("test_facility", static_extra);

        let event = LogEvent::new(Level::Info, "test message\nsecond line").with_field("withField", "1");
        let record = queued(event);
        let msg = builder.build(&record, "box-1".into());

        assert_eq!(msg.version, "1.1");
        assert_eq!(msg.host, "box-1");
        assert_eq!(msg.short_message, "test message");
        assert_eq!(msg.full_message, "test message\nsecond line");
        assert_eq!(msg.level, 6);
        assert_eq!(msg.facility, "test_facility");
        assert_eq!(msg.file, "src/handlers.rs");
        assert_eq!(msg.line, 31);

        let mut expected = BTreeMap::new();
        expected.insert("_severity".to_string(), Value::from("info"));
        expected.insert("_foo".to_string(), Value::from("bar"));
        expected.insert("_withField".to_string(), Value::from("1"));
        assert_eq!(msg.extra, expected);

        // the event's own fields are untouched
        assert_eq!(record.event.fields.len(), 1);
        assert!(record.event.fields.contains_key("withField"));
    }

    #[test]
    fn event_fields_override_static_ones() {
        let mut static_extra = BTreeMap::new();
        static_extra.insert("env".to_string(), FieldValue::from("prod"));
        let builder = MessageBuilder::new("app", static_extra);

        let event = LogEvent::new(Level::Warn, "x")
            .with_field("env", "canary")
            .with_field("severity", "custom");
        let msg = builder.build(&queued(event), "h".into());

        assert_eq!(msg.extra["_env"], Value::from("canary"));
        assert_eq!(msg.extra["_severity"], Value::from("custom"));
        assert!(msg.extra.keys().all(|k| k.starts_with('_')));
    }

    #[test]
    fn serializes_flat_gelf_json() {
        let builder = MessageBuilder::new("app", BTreeMap::new());
        let event = LogEvent::new(Level::Error, "boom").with_field("attempt", 3u32);
        let msg = builder.build(&queued(event), "h".into());

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["version"], "1.1");
        assert_eq!(json["short_message"], "boom");
        assert!(json.get("full_message").is_none());
        assert_eq!(json["level"], 3);
        assert_eq!(json["line"], 31);
        assert_eq!(json["_attempt"], 3);
        assert_eq!(json["_severity"], "error");
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn hostname_is_never_empty() {
        assert!(!local_hostname().is_empty());
    }
}
