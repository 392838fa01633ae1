//! Token store implementations

mod fields;
mod in_memory;
mod redis_store;

pub use fields::{decode_record, encode_record};
pub use in_memory::InMemoryTokenStore;
pub use redis_store::{RedisTokenStore, DEFAULT_TOKEN_PREFIX};
