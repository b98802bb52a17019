//! Channel model.

use pvr_api::ChannelEntry;
use serde::Serialize;

/// Guide grabber selection for one channel, resolved once from the
/// stored selector string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Grabber {
    /// Pull guide data from the owning backend client.
    Client,
    /// Pull guide data from a named scraper.
    Scraper(String),
    /// No grabber configured; the guide table stays empty.
    None,
}

impl Grabber {
    /// Parse the stored selector string.
    pub fn from_selector(s: &str) -> Self {
        match s {
            "client" => Grabber::Client,
            "" => Grabber::None,
            name => Grabber::Scraper(name.to_string()),
        }
    }

    /// Selector string for storage.
    pub fn selector(&self) -> &str {
        match self {
            Grabber::Client => "client",
            Grabber::Scraper(name) => name,
            Grabber::None => "",
        }
    }
}

/// One TV or radio channel.
///
/// The registry owns every `Channel` record; other components refer to a
/// channel by its store-assigned `id` and resolve through the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    /// Store-assigned id; -1 until persisted.
    pub id: i64,
    /// Owning backend client.
    pub client_id: i64,
    /// Provider-unique id, scoped per client.
    pub unique_id: u32,
    /// Logical display number; 0 when hidden or not yet numbered.
    pub number: u32,
    /// Channel number as the provider counts it.
    pub client_number: u32,
    pub name: String,
    pub client_name: String,
    pub icon_path: String,
    /// Group membership; 0 = ungrouped.
    pub group_id: i64,
    /// Conditional-access system id; 0 = free to air.
    pub encryption_system: u16,
    pub radio: bool,
    pub hidden: bool,
    /// Set while a timer is recording on this channel. Runtime state,
    /// never persisted.
    pub recording: bool,
    pub grab_epg: bool,
    pub grabber: Grabber,
    /// User-defined channel backed by `stream_url` instead of a tuner.
    pub is_virtual: bool,
    pub stream_url: String,
    pub input_format: String,
    pub watch_count: u32,
    pub watch_seconds: i64,
    pub last_watched: Option<i64>,
}

impl Channel {
    /// Build a channel from a backend enumeration entry.
    pub fn from_entry(client_id: i64, entry: &ChannelEntry) -> Self {
        Self {
            id: -1,
            client_id,
            unique_id: entry.unique_id,
            number: 0,
            client_number: entry.number,
            name: entry.name.clone(),
            client_name: entry.name.clone(),
            icon_path: entry.icon_path.clone(),
            group_id: 0,
            encryption_system: entry.encryption_system,
            radio: entry.radio,
            hidden: entry.hidden,
            recording: false,
            grab_epg: true,
            grabber: Grabber::Client,
            is_virtual: false,
            stream_url: entry.stream_url.clone(),
            input_format: entry.input_format.clone(),
            watch_count: 0,
            watch_seconds: 0,
            last_watched: None,
        }
    }

    /// Build a user-defined virtual channel from a stream URL.
    pub fn new_virtual(name: &str, stream_url: &str, input_format: &str, radio: bool) -> Self {
        Self {
            id: -1,
            client_id: -1,
            unique_id: 0,
            number: 0,
            client_number: 0,
            name: name.to_string(),
            client_name: name.to_string(),
            icon_path: String::new(),
            group_id: 0,
            encryption_system: 0,
            radio,
            hidden: false,
            recording: false,
            grab_epg: false,
            grabber: Grabber::None,
            is_virtual: true,
            stream_url: stream_url.to_string(),
            input_format: input_format.to_string(),
            watch_count: 0,
            watch_seconds: 0,
            last_watched: None,
        }
    }

    /// Copy the provider-mutable fields from a fresh enumeration of the
    /// same channel, leaving identity, numbering and user edits alone.
    pub fn absorb(&mut self, fresh: &Channel) {
        self.client_number = fresh.client_number;
        self.client_name = fresh.client_name.clone();
        self.encryption_system = fresh.encryption_system;
        if self.icon_path.is_empty() {
            self.icon_path = fresh.icon_path.clone();
        }
        self.stream_url = fresh.stream_url.clone();
        self.input_format = fresh.input_format.clone();
    }

    /// Whether the channel carries enough identity to be kept through a
    /// renumbering pass. Virtual channels have no provider key and are
    /// always valid.
    pub fn is_valid(&self) -> bool {
        self.is_virtual || (self.unique_id != 0 && self.client_number != 0)
    }

    /// Provider key identifying this channel across enumerations.
    pub fn provider_key(&self) -> (i64, u32) {
        (self.client_id, self.unique_id)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption_system != 0
    }
}
