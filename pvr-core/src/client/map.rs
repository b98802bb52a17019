//! Registered client adapters, keyed by client id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pvr_api::Capabilities;

use super::ClientAdapter;

/// The set of registered backend adapters.
///
/// The orchestrator exclusively owns registration; other components hold
/// an `Arc<ClientMap>` and enumerate ready adapters through it.
#[derive(Debug, Default)]
pub struct ClientMap {
    clients: RwLock<HashMap<i64, Arc<ClientAdapter>>>,
}

impl ClientMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, adapter: Arc<ClientAdapter>) {
        self.write().insert(adapter.id(), adapter);
    }

    pub fn remove(&self, client_id: i64) -> Option<Arc<ClientAdapter>> {
        self.write().remove(&client_id)
    }

    pub fn get(&self, client_id: i64) -> Option<Arc<ClientAdapter>> {
        self.read().get(&client_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All adapters that are initialized, connected and not ignored.
    pub fn ready_clients(&self) -> Vec<Arc<ClientAdapter>> {
        let mut clients: Vec<_> = self
            .read()
            .values()
            .filter(|c| c.is_ready())
            .cloned()
            .collect();
        clients.sort_by_key(|c| c.id());
        clients
    }

    /// Ready adapters whose declared capabilities pass `pred`.
    pub fn ready_clients_supporting(
        &self,
        pred: impl Fn(&Capabilities) -> bool,
    ) -> Vec<Arc<ClientAdapter>> {
        self.ready_clients()
            .into_iter()
            .filter(|c| pred(c.capabilities()))
            .collect()
    }

    /// Whether any ready adapter passes `pred`.
    pub fn any_ready(&self, pred: impl Fn(&Capabilities) -> bool) -> bool {
        self.read()
            .values()
            .any(|c| c.is_ready() && pred(c.capabilities()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<i64, Arc<ClientAdapter>>> {
        self.clients.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<i64, Arc<ClientAdapter>>> {
        self.clients.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockBackend;

    #[test]
    fn test_ready_enumeration_skips_ignored() {
        let map = ClientMap::new();
        map.insert(Arc::new(ClientAdapter::new(1, Box::new(MockBackend::new("a")))));
        map.insert(Arc::new(ClientAdapter::new(2, Box::new(MockBackend::new("b")))));

        assert_eq!(map.ready_clients().len(), 2);

        map.get(1).unwrap().mark_ignored();
        let ready = map.ready_clients();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id(), 2);
    }

    #[test]
    fn test_capability_filter() {
        let map = ClientMap::new();
        let mut no_epg = MockBackend::new("no-epg");
        no_epg.capabilities.supports_epg = false;
        map.insert(Arc::new(ClientAdapter::new(1, Box::new(no_epg))));
        map.insert(Arc::new(ClientAdapter::new(2, Box::new(MockBackend::new("full")))));

        let epg_capable = map.ready_clients_supporting(|caps| caps.supports_epg);
        assert_eq!(epg_capable.len(), 1);
        assert_eq!(epg_capable[0].id(), 2);
        assert!(map.any_ready(|caps| caps.supports_timers));
    }
}
