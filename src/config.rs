use crate::caller::IgnoreList;
use crate::env;
use crate::error::ConfigError;
use crate::record::FieldValue;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// Configuration of a [`GelfSink`](crate::sink::GelfSink).
///
/// Read once at construction; the running sink keeps its own copy, so
/// changing a config afterwards has no effect on sinks already built.
///
/// **Fields**
/// - `facility`: label of the emitting application, sent in every message.
/// - `extra`: static fields merged into every message (prefixed with `_`).
/// - `queue_capacity`: records buffered before `submit` starts to block.
///   Values below 1 are raised to 1.
/// - `ignored_callers`: source suffixes skipped when resolving call sites.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub facility: String,
    pub extra: BTreeMap<String, FieldValue>,
    pub queue_capacity: usize,
    pub ignored_callers: IgnoreList,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            facility: String::new(),
            extra: BTreeMap::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ignored_callers: IgnoreList::default(),
        }
    }
}

impl SinkConfig {
    pub fn new(facility: impl Into<String>) -> Self {
        Self {
            facility: facility.into(),
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Skip frames from source files ending in `suffix` when resolving the
    /// caller of [`GelfSink::submit`](crate::sink::GelfSink::submit).
    pub fn ignore_caller(mut self, suffix: impl Into<Cow<'static, str>>) -> Self {
        self.ignored_callers.push(suffix);
        self
    }

    /// Build a config from `GELF_FACILITY` and `GELF_QUEUE_CAPACITY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let facility = env::env_or(env::GELF_FACILITY_ENV, "");
        let capacity = env::env_or(env::GELF_QUEUE_CAPACITY_ENV, "");

        let mut config = SinkConfig::new(facility);
        if !capacity.is_empty() {
            config.queue_capacity = capacity.parse().map_err(|_| ConfigError::InvalidValue {
                name: env::GELF_QUEUE_CAPACITY_ENV,
                value: capacity,
            })?;
        }

        Ok(config)
    }

    pub(crate) fn effective_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}
