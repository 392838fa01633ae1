//! Token record domain
//!
//! Durable per-API-key authorization records and the store capability
//! used to read and provision them.

mod entity;
mod repository;

pub use entity::TokenRecord;
pub use repository::{TokenStore, TokenStoreError};

#[cfg(test)]
pub use repository::MockTokenStore;
