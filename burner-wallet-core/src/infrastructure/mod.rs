//! Infrastructure layer - storage backends and external integrations
//!
//! This module contains the storage backends and the HTTP clients for the
//! external account-abstraction and indexing services.

pub mod platform;
pub mod rpc;

// Re-export infrastructure components
pub use platform::*;
pub use rpc::*;
