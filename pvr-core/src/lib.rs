//! pvr-core: DVR coordination for live TV and radio backends.
//!
//! The crate ties together backend plugins (anything implementing
//! [`pvr_api::PvrBackend`]), a persistent channel registry, per-channel
//! program guide tables, a timer scheduler and live/recorded playback,
//! all coordinated by the [`Orchestrator`].

pub mod channels;
pub mod client;
pub mod config;
pub mod epg;
pub mod events;
pub mod logging;
pub mod orchestrator;
pub mod paths;
pub mod store;
pub mod timers;

pub use channels::{Channel, ChannelGroup, ChannelRegistry, Grabber};
pub use config::{Config, ConfigFile};
pub use epg::{EpgEngine, GuideState, Scraper};
pub use events::{EventBus, PvrEvent};
pub use orchestrator::{OpenedStream, Orchestrator, PlaybackState, PvrError, PvrStatus};
pub use store::Store;
pub use timers::{Timer, TimerMargins, TimerScheduler};
