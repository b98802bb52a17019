//! Channel registry.
//!
//! The [`ChannelRegistry`] owns the in-memory TV and radio channel lists
//! and keeps them consistent with the store and the backends: loading,
//! reconciliation, renumbering, hiding, moving, virtual channels and
//! group membership.

mod channel;
mod group;
mod registry;

pub use channel::{Channel, Grabber};
pub use group::{ChannelGroup, GROUP_NONE};
pub use registry::{ChannelRegistry, RegistryError};
