//! Injectable wall clock
//!
//! Every component that compares against "now" takes a [`Clock`] so tests can
//! pin time instead of sleeping across window or expiry boundaries.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Shared source of the current UTC time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Clock backed by the system time
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Clock frozen at a single instant
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}
