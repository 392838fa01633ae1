//! Counter stores and the fixed-window rate limiter

mod in_memory;
mod limiter;
mod redis_counter;

pub use in_memory::InMemoryCounterStore;
pub use limiter::FixedWindowRateLimiter;
pub use redis_counter::{RedisCounterStore, DEFAULT_RATE_PREFIX};
