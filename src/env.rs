//! Environment variable names used by this crate for convenient
//! configuration of the sink from services.
//!
//! These are purely helpers; the core sink types remain decoupled from
//! environment access.

use crate::endpoint::{Endpoint, EndpointError};

/// Collector address, e.g. `udp://graylog.internal:12201`.
pub const GELF_ADDRESS_ENV: &str = "GELF_ADDRESS";

/// Facility sent with every message.
pub const GELF_FACILITY_ENV: &str = "GELF_FACILITY";

/// Capacity of the queue between producers and the delivery worker.
pub const GELF_QUEUE_CAPACITY_ENV: &str = "GELF_QUEUE_CAPACITY";

/// Address used when `GELF_ADDRESS` is unset.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:12201";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Collector endpoint from `GELF_ADDRESS`, or [`DEFAULT_ADDRESS`].
pub fn endpoint_from_env() -> Result<Endpoint, EndpointError> {
    Endpoint::parse(&env_or(GELF_ADDRESS_ENV, DEFAULT_ADDRESS))
}
