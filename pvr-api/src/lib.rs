//! Backend client ABI for the pvr-core DVR coordination core.
//!
//! This crate defines the boundary between the coordination core and
//! backend plugins ("clients"): a tuner card driver, a network DVR
//! backend, a satellite receiver, and so on. A backend implements the
//! [`PvrBackend`] trait, declares what it can do through
//! [`Capabilities`], and reports every outcome as an [`ApiError`] kind.
//!
//! All records crossing the boundary are plain structs of primitive
//! fields: ids, numbers, strings, timestamps and flags. The core never
//! hands a backend a reference into its own collections.
//!
//! # Example
//!
//! ```rust
//! use pvr_api::{ApiError, Capabilities};
//!
//! let caps = Capabilities {
//!     supports_tv: true,
//!     supports_epg: true,
//!     ..Capabilities::default()
//! };
//! assert!(caps.supports_tv);
//! assert!(ApiError::RecordingInProgress.is_recoverable());
//! ```

mod backend;
mod error;
mod types;

pub use backend::{PvrBackend, StreamSeekFrom};
pub use error::{ApiError, ApiResult};
pub use types::{
    BackendProperties, Capabilities, ChannelEntry, ConnectionState, DemuxPacket, DriveSpace,
    EpgEntry, RecordingEntry, SignalStatus, TimerEntry, WEEKDAY_ALL,
};
