//! Access-control domain
//!
//! The ordered decision chain that turns an inbound credential into either
//! a verified identity or exactly one typed rejection.

mod bearer;
mod pipeline;
mod scope;

pub use bearer::extract_bearer;
pub use pipeline::{AccessDenied, AccessPipeline, InfrastructureFailure, DEFAULT_STORE_TIMEOUT};
pub use scope::is_path_allowed;
