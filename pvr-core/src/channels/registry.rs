//! Channel registry: the in-memory channel lists and their maintenance.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use thiserror::Error;

use crate::channels::{Channel, ChannelGroup, GROUP_NONE};
use crate::client::ClientMap;
use crate::events::{EventBus, PvrEvent};
use crate::store::{Store, StoreError};

/// Registry error types.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no channel with number {0}")]
    NoSuchNumber(u32),

    #[error("no channel with id {0}")]
    NoSuchChannel(i64),

    #[error("channel is currently playing")]
    ChannelPlaying,

    #[error("channel has active timers")]
    ChannelHasTimers,

    #[error("channel is not virtual")]
    NotVirtual,
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Owner of the TV and radio channel lists.
///
/// The registry holds the only in-memory copy of each list; every other
/// component refers to a channel by its store id and resolves through
/// here. List locks are never held across a store or backend call that
/// can block.
pub struct ChannelRegistry {
    store: Arc<Mutex<Store>>,
    clients: Arc<ClientMap>,
    events: Arc<EventBus>,
    tv: RwLock<Vec<Channel>>,
    radio: RwLock<Vec<Channel>>,
    tv_groups: RwLock<Vec<ChannelGroup>>,
    radio_groups: RwLock<Vec<ChannelGroup>>,
    /// Store id of the channel currently open for playback, if any.
    playing: Mutex<Option<i64>>,
}

impl ChannelRegistry {
    pub fn new(store: Arc<Mutex<Store>>, clients: Arc<ClientMap>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            clients,
            events,
            tv: RwLock::new(Vec::new()),
            radio: RwLock::new(Vec::new()),
            tv_groups: RwLock::new(Vec::new()),
            radio_groups: RwLock::new(Vec::new()),
            playing: Mutex::new(None),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn list(&self, radio: bool) -> &RwLock<Vec<Channel>> {
        if radio {
            &self.radio
        } else {
            &self.tv
        }
    }

    fn groups(&self, radio: bool) -> &RwLock<Vec<ChannelGroup>> {
        if radio {
            &self.radio_groups
        } else {
            &self.tv_groups
        }
    }

    // Loading -------------------------------------------------------------

    /// Load one kind of channel list (and its groups) from the store.
    pub fn load_from_store(&self, radio: bool) -> Result<usize> {
        let (channels, groups) = {
            let store = self.store();
            (store.get_channels(radio)?, store.get_groups(radio)?)
        };
        let count = channels.len();
        *self.list(radio).write().unwrap_or_else(|e| e.into_inner()) = channels;
        *self.groups(radio).write().unwrap_or_else(|e| e.into_inner()) = groups;
        log::debug!(
            "Loaded {} {} channels from store",
            count,
            kind_name(radio)
        );
        Ok(count)
    }

    /// Enumerate every ready channel-capable adapter, reconcile the
    /// result into the store and reload.
    ///
    /// Backend calls happen before any registry lock is taken. Adapter
    /// failures are logged and the remaining clients still contribute;
    /// a client whose enumeration failed keeps its stored channels.
    pub fn load_from_clients(&self, radio: bool) -> Result<usize> {
        let adapters = self.clients.ready_clients_supporting(|caps| {
            if radio {
                caps.supports_radio
            } else {
                caps.supports_tv
            }
        });

        let mut fresh: Vec<Channel> = Vec::new();
        let mut scanned: HashSet<i64> = HashSet::new();
        for adapter in &adapters {
            match adapter.get_channels(radio) {
                Ok(entries) => {
                    scanned.insert(adapter.id());
                    fresh.extend(
                        entries
                            .iter()
                            .map(|e| Channel::from_entry(adapter.id(), e)),
                    );
                }
                Err(e) if e.is_notable() => {
                    log::warn!(
                        "Client {}: {} channel enumeration failed: {}",
                        adapter.id(),
                        kind_name(radio),
                        e
                    );
                }
                Err(_) => {}
            }
        }

        if scanned.is_empty() {
            // No scan succeeded; keep whatever the store has
            return self.load_from_store(radio);
        }

        let result = self.store().reconcile_channels(radio, &fresh, &scanned)?;
        let count = self.load_from_store(radio)?;
        self.renumber(radio)?;

        if result.total_changes() > 0 {
            log::info!(
                "{} channel update: {} inserted, {} updated, {} removed",
                kind_name(radio),
                result.inserted,
                result.updated,
                result.removed
            );
            self.events.publish(PvrEvent::ChannelListChanged { radio });
        }
        Ok(count)
    }

    // Queries --------------------------------------------------------------

    /// Snapshot of one channel list, in display order.
    pub fn get_channels(&self, radio: bool) -> Vec<Channel> {
        self.list(radio)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get_channel_by_id(&self, channel_id: i64) -> Option<Channel> {
        for radio in [false, true] {
            let list = self.list(radio).read().unwrap_or_else(|e| e.into_inner());
            if let Some(ch) = list.iter().find(|c| c.id == channel_id) {
                return Some(ch.clone());
            }
        }
        None
    }

    pub fn get_channel_by_number(&self, radio: bool, number: u32) -> Option<Channel> {
        self.list(radio)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|c| !c.hidden && c.number == number)
            .cloned()
    }

    /// The visible channel `steps` positions away from `number`, wrapping
    /// around the list. `steps` may be negative.
    pub fn adjacent_channel(&self, radio: bool, number: u32, steps: i64) -> Option<Channel> {
        let list = self.list(radio).read().unwrap_or_else(|e| e.into_inner());
        let visible: Vec<&Channel> = list.iter().filter(|c| !c.hidden).collect();
        if visible.is_empty() {
            return None;
        }
        let pos = visible.iter().position(|c| c.number == number)? as i64;
        let len = visible.len() as i64;
        let target = (pos + steps).rem_euclid(len) as usize;
        Some(visible[target].clone())
    }

    pub fn channel_count(&self, radio: bool) -> usize {
        self.list(radio)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn visible_count(&self, radio: bool) -> usize {
        self.list(radio)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| !c.hidden)
            .count()
    }

    // Playback marker -------------------------------------------------------

    /// Record which channel is open for playback. The registry refuses
    /// to hide or delete that channel while the marker is set.
    pub fn set_playing_channel(&self, channel_id: Option<i64>) {
        *self.playing.lock().unwrap_or_else(|e| e.into_inner()) = channel_id;
    }

    pub fn playing_channel(&self) -> Option<i64> {
        *self.playing.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set or clear the runtime recording flag on a channel.
    pub fn set_recording(&self, channel_id: i64, recording: bool) {
        for radio in [false, true] {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            if let Some(ch) = list.iter_mut().find(|c| c.id == channel_id) {
                ch.recording = recording;
                return;
            }
        }
    }

    // Maintenance ------------------------------------------------------------

    /// Renumber one list: drop channels without a usable identity, assign
    /// 1..V over the visible channels in list order, clear the number of
    /// hidden channels. Changed numbers are persisted in one transaction.
    pub fn renumber(&self, radio: bool) -> Result<usize> {
        let mut dropped: Vec<i64> = Vec::new();
        let mut renumbered: Vec<(i64, u32)> = Vec::new();

        {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            list.retain(|c| {
                if c.is_valid() {
                    true
                } else {
                    log::warn!(
                        "Dropping invalid {} channel '{}' (id {})",
                        kind_name(radio),
                        c.name,
                        c.id
                    );
                    dropped.push(c.id);
                    false
                }
            });

            let mut next = 1u32;
            for ch in list.iter_mut() {
                let wanted = if ch.hidden {
                    0
                } else {
                    let n = next;
                    next += 1;
                    n
                };
                if ch.number != wanted {
                    ch.number = wanted;
                    renumbered.push((ch.id, wanted));
                }
            }
        }

        let changed = dropped.len() + renumbered.len();
        if changed > 0 {
            let mut store = self.store();
            for id in &dropped {
                store.remove_channel(*id)?;
            }
            store.persist_channel_numbers(&renumbered)?;
        }
        Ok(changed)
    }

    /// Move a visible channel from one display position to another.
    pub fn move_channel(&self, radio: bool, from: u32, to: u32) -> Result<()> {
        if from == to {
            return Ok(());
        }
        {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            let from_pos = list
                .iter()
                .position(|c| !c.hidden && c.number == from)
                .ok_or(RegistryError::NoSuchNumber(from))?;
            let to_pos = list
                .iter()
                .position(|c| !c.hidden && c.number == to)
                .ok_or(RegistryError::NoSuchNumber(to))?;
            let ch = list.remove(from_pos);
            list.insert(to_pos, ch);
        }
        self.renumber(radio)?;
        self.events.publish(PvrEvent::ChannelListChanged { radio });
        Ok(())
    }

    /// Hide a channel and close the numbering gap.
    ///
    /// The channel currently open for playback cannot be hidden. A
    /// channel with active timers is refused too; the caller decides
    /// whether to remove the timers and retry.
    pub fn hide_channel(&self, radio: bool, number: u32, has_active_timers: bool) -> Result<()> {
        let channel = self
            .get_channel_by_number(radio, number)
            .ok_or(RegistryError::NoSuchNumber(number))?;

        if self.playing_channel() == Some(channel.id) {
            return Err(RegistryError::ChannelPlaying);
        }
        if has_active_timers {
            return Err(RegistryError::ChannelHasTimers);
        }

        {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            if let Some(ch) = list.iter_mut().find(|c| c.id == channel.id) {
                ch.hidden = true;
            }
        }
        {
            let store = self.store();
            let mut updated = channel;
            updated.hidden = true;
            updated.number = 0;
            store.update_channel(&updated)?;
        }
        self.renumber(radio)?;
        self.events.publish(PvrEvent::ChannelListChanged { radio });
        Ok(())
    }

    /// Make a hidden channel visible again; it keeps its position in the
    /// list and re-enters the numbering there.
    pub fn restore_channel(&self, radio: bool, channel_id: i64) -> Result<()> {
        let mut found = false;
        {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            if let Some(ch) = list.iter_mut().find(|c| c.id == channel_id) {
                ch.hidden = false;
                found = true;
            }
        }
        if !found {
            return Err(RegistryError::NoSuchChannel(channel_id));
        }
        {
            let store = self.store();
            if let Some(mut stored) = store.get_channel(channel_id)? {
                stored.hidden = false;
                store.update_channel(&stored)?;
            }
        }
        self.renumber(radio)?;
        self.events.publish(PvrEvent::ChannelListChanged { radio });
        Ok(())
    }

    // Virtual channels --------------------------------------------------------

    /// Add a user-defined channel backed by a stream URL.
    pub fn add_virtual_channel(
        &self,
        name: &str,
        stream_url: &str,
        input_format: &str,
        radio: bool,
    ) -> Result<i64> {
        let mut channel = Channel::new_virtual(name, stream_url, input_format, radio);
        channel.id = self.store().add_channel(&channel)?;
        {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            list.push(channel.clone());
        }
        self.renumber(radio)?;
        self.events.publish(PvrEvent::ChannelListChanged { radio });
        log::info!("Added virtual {} channel '{}'", kind_name(radio), name);
        Ok(channel.id)
    }

    /// Delete a virtual channel. Guide data goes with it.
    pub fn delete_virtual_channel(&self, radio: bool, channel_id: i64) -> Result<()> {
        let channel = self
            .get_channel_by_id(channel_id)
            .ok_or(RegistryError::NoSuchChannel(channel_id))?;
        if !channel.is_virtual {
            return Err(RegistryError::NotVirtual);
        }
        if self.playing_channel() == Some(channel_id) {
            return Err(RegistryError::ChannelPlaying);
        }

        self.store().remove_channel(channel_id)?;
        {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            list.retain(|c| c.id != channel_id);
        }
        self.renumber(radio)?;
        self.events.publish(PvrEvent::ChannelListChanged { radio });
        Ok(())
    }

    // Watch statistics ---------------------------------------------------------

    /// Record a finished viewing session.
    pub fn record_watch(&self, channel_id: i64, seconds: i64, watched_at: i64) -> Result<()> {
        self.store()
            .update_watch_stats(channel_id, seconds, watched_at)?;
        for radio in [false, true] {
            let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
            if let Some(ch) = list.iter_mut().find(|c| c.id == channel_id) {
                ch.watch_count += 1;
                ch.watch_seconds += seconds;
                ch.last_watched = Some(watched_at);
                break;
            }
        }
        Ok(())
    }

    // Groups ---------------------------------------------------------------------

    pub fn get_groups(&self, radio: bool) -> Vec<ChannelGroup> {
        self.groups(radio)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn add_group(&self, radio: bool, name: &str) -> Result<i64> {
        let sort_order = self
            .groups(radio)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len() as i32
            + 1;
        let mut group = ChannelGroup::new(name, sort_order, radio);
        group.id = self.store().add_group(&group)?;
        self.groups(radio)
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(group.clone());
        Ok(group.id)
    }

    pub fn rename_group(&self, radio: bool, group_id: i64, name: &str) -> Result<()> {
        self.store().rename_group(radio, group_id, name)?;
        let mut groups = self.groups(radio).write().unwrap_or_else(|e| e.into_inner());
        if let Some(g) = groups.iter_mut().find(|g| g.id == group_id) {
            g.name = name.to_string();
        }
        Ok(())
    }

    /// Delete a group; members fall back to ungrouped.
    pub fn remove_group(&self, radio: bool, group_id: i64) -> Result<()> {
        self.store().remove_group(radio, group_id)?;
        self.groups(radio)
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|g| g.id != group_id);
        let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
        for ch in list.iter_mut().filter(|c| c.group_id == group_id) {
            ch.group_id = GROUP_NONE;
        }
        Ok(())
    }

    pub fn set_channel_group(&self, radio: bool, channel_id: i64, group_id: i64) -> Result<()> {
        self.store().set_channel_group(channel_id, group_id)?;
        let mut list = self.list(radio).write().unwrap_or_else(|e| e.into_inner());
        if let Some(ch) = list.iter_mut().find(|c| c.id == channel_id) {
            ch.group_id = group_id;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("tv", &self.channel_count(false))
            .field("radio", &self.channel_count(true))
            .finish_non_exhaustive()
    }
}

fn kind_name(radio: bool) -> &'static str {
    if radio {
        "radio"
    } else {
        "TV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{tv_channel, MockBackend};
    use crate::client::ClientAdapter;

    fn test_registry() -> ChannelRegistry {
        let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        ChannelRegistry::new(store, Arc::new(ClientMap::new()), Arc::new(EventBus::new()))
    }

    fn registry_with_backend(channels: Vec<pvr_api::ChannelEntry>) -> (ChannelRegistry, i64) {
        let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        let client_id = store
            .lock()
            .unwrap()
            .get_or_create_client("mock backend", "guid-1")
            .unwrap();

        let map = Arc::new(ClientMap::new());
        let backend = MockBackend::new("mock backend").with_channels(channels);
        map.insert(Arc::new(ClientAdapter::new(client_id, Box::new(backend))));

        let registry = ChannelRegistry::new(store, map, Arc::new(EventBus::new()));
        (registry, client_id)
    }

    #[test]
    fn test_load_from_clients_assigns_contiguous_numbers() {
        let (registry, _) = registry_with_backend(vec![
            tv_channel(10, 5, "Five"),
            tv_channel(11, 8, "Eight"),
            tv_channel(12, 2, "Two"),
        ]);

        registry.load_from_clients(false).unwrap();
        let channels = registry.get_channels(false);
        assert_eq!(channels.len(), 3);
        let numbers: Vec<u32> = channels.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_renumber_clears_hidden_and_stays_contiguous() {
        let (registry, _) = registry_with_backend(vec![
            tv_channel(1, 1, "One"),
            tv_channel(2, 2, "Two"),
            tv_channel(3, 3, "Three"),
            tv_channel(4, 4, "Four"),
        ]);
        registry.load_from_clients(false).unwrap();

        registry.hide_channel(false, 2, false).unwrap();

        let channels = registry.get_channels(false);
        let visible: Vec<u32> = channels
            .iter()
            .filter(|c| !c.hidden)
            .map(|c| c.number)
            .collect();
        assert_eq!(visible, vec![1, 2, 3]);

        let hidden: Vec<&Channel> = channels.iter().filter(|c| c.hidden).collect();
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].number, 0);
        assert_eq!(hidden[0].name, "Two");
    }

    #[test]
    fn test_transient_enumeration_failure_keeps_stored_channels() {
        let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        let client_id = store
            .lock()
            .unwrap()
            .get_or_create_client("mock backend", "guid-1")
            .unwrap();

        // First scan succeeds and persists two channels
        let map = Arc::new(ClientMap::new());
        let backend = MockBackend::new("mock backend")
            .with_channels(vec![tv_channel(1, 1, "One"), tv_channel(2, 2, "Two")]);
        map.insert(Arc::new(ClientAdapter::new(client_id, Box::new(backend))));
        let registry = ChannelRegistry::new(Arc::clone(&store), map, Arc::new(EventBus::new()));
        registry.load_from_clients(false).unwrap();
        assert_eq!(registry.channel_count(false), 2);

        // The same client comes back but its enumeration fails this time
        let map = Arc::new(ClientMap::new());
        let mut failing = MockBackend::new("mock backend")
            .with_channels(vec![tv_channel(1, 1, "One"), tv_channel(2, 2, "Two")]);
        failing.fail_with = Some(pvr_api::ApiError::ServerError);
        map.insert(Arc::new(ClientAdapter::new(client_id, Box::new(failing))));
        let registry = ChannelRegistry::new(Arc::clone(&store), map, Arc::new(EventBus::new()));
        registry.load_from_clients(false).unwrap();

        assert_eq!(store.lock().unwrap().get_channels(false).unwrap().len(), 2);
        assert_eq!(registry.channel_count(false), 2);
    }

    #[test]
    fn test_restore_keeps_list_position() {
        let (registry, _) = registry_with_backend(vec![
            tv_channel(1, 1, "A"),
            tv_channel(2, 2, "B"),
            tv_channel(3, 3, "C"),
        ]);
        registry.load_from_clients(false).unwrap();

        registry.hide_channel(false, 2, false).unwrap();
        let hidden_id = registry
            .get_channels(false)
            .iter()
            .find(|c| c.hidden)
            .unwrap()
            .id;
        registry.restore_channel(false, hidden_id).unwrap();

        let channels = registry.get_channels(false);
        let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        let numbers: Vec<u32> = channels.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_hide_rejects_playing_channel() {
        let (registry, _) = registry_with_backend(vec![
            tv_channel(1, 1, "One"),
            tv_channel(2, 2, "Two"),
        ]);
        registry.load_from_clients(false).unwrap();

        let playing = registry.get_channel_by_number(false, 1).unwrap();
        registry.set_playing_channel(Some(playing.id));

        assert!(matches!(
            registry.hide_channel(false, 1, false),
            Err(RegistryError::ChannelPlaying)
        ));
        // Other channels can still be hidden
        registry.hide_channel(false, 2, false).unwrap();
    }

    #[test]
    fn test_hide_rejects_channel_with_timers() {
        let (registry, _) = registry_with_backend(vec![tv_channel(1, 1, "One")]);
        registry.load_from_clients(false).unwrap();

        assert!(matches!(
            registry.hide_channel(false, 1, true),
            Err(RegistryError::ChannelHasTimers)
        ));
    }

    #[test]
    fn test_move_channel_renumbers() {
        let (registry, _) = registry_with_backend(vec![
            tv_channel(1, 1, "A"),
            tv_channel(2, 2, "B"),
            tv_channel(3, 3, "C"),
        ]);
        registry.load_from_clients(false).unwrap();

        registry.move_channel(false, 3, 1).unwrap();
        let names: Vec<String> = registry
            .get_channels(false)
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        let numbers: Vec<u32> = registry
            .get_channels(false)
            .iter()
            .map(|c| c.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_virtual_channel_lifecycle() {
        let registry = test_registry();
        let id = registry
            .add_virtual_channel("Webcam", "http://example/cam", "mpegts", false)
            .unwrap();

        let ch = registry.get_channel_by_id(id).unwrap();
        assert!(ch.is_virtual);
        assert_eq!(ch.number, 1);

        registry.delete_virtual_channel(false, id).unwrap();
        assert_eq!(registry.channel_count(false), 0);
    }

    #[test]
    fn test_delete_rejects_non_virtual() {
        let (registry, _) = registry_with_backend(vec![tv_channel(1, 1, "One")]);
        registry.load_from_clients(false).unwrap();

        let ch = registry.get_channel_by_number(false, 1).unwrap();
        assert!(matches!(
            registry.delete_virtual_channel(false, ch.id),
            Err(RegistryError::NotVirtual)
        ));
    }

    #[test]
    fn test_adjacent_channel_wraps() {
        let (registry, _) = registry_with_backend(vec![
            tv_channel(1, 1, "A"),
            tv_channel(2, 2, "B"),
            tv_channel(3, 3, "C"),
        ]);
        registry.load_from_clients(false).unwrap();

        assert_eq!(registry.adjacent_channel(false, 3, 1).unwrap().number, 1);
        assert_eq!(registry.adjacent_channel(false, 1, -1).unwrap().number, 3);
        assert_eq!(registry.adjacent_channel(false, 2, 1).unwrap().number, 3);
    }

    #[test]
    fn test_group_membership_survives_reload() {
        let (registry, _) = registry_with_backend(vec![tv_channel(1, 1, "One")]);
        registry.load_from_clients(false).unwrap();

        let group_id = registry.add_group(false, "News").unwrap();
        let ch = registry.get_channel_by_number(false, 1).unwrap();
        registry.set_channel_group(false, ch.id, group_id).unwrap();

        registry.load_from_store(false).unwrap();
        let reloaded = registry.get_channel_by_id(ch.id).unwrap();
        assert_eq!(reloaded.group_id, group_id);
        assert_eq!(registry.get_groups(false).len(), 1);
    }

    #[test]
    fn test_events_published_on_list_change() {
        let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        let events = Arc::new(EventBus::new());
        let registry =
            ChannelRegistry::new(store, Arc::new(ClientMap::new()), Arc::clone(&events));
        let rx = events.subscribe();

        registry
            .add_virtual_channel("Cam", "http://example/cam", "mpegts", false)
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            PvrEvent::ChannelListChanged { radio: false }
        );
    }
}
