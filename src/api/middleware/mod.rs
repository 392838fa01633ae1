//! API middleware components

pub mod access;
pub mod logging;
pub mod metrics;

pub use access::access_middleware;
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
