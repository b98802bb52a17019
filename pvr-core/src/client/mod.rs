//! Backend client management.
//!
//! This module provides:
//! - [`ClientAdapter`]: wrapper around one backend plugin, funnelling
//!   every call through a capability/readiness check with error
//!   translation
//! - [`ClientMap`]: the set of registered adapters, keyed by client id

pub mod adapter;
pub mod map;
#[cfg(test)]
pub mod mock;

pub use adapter::ClientAdapter;
pub use map::ClientMap;
