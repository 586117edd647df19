use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// Shared state describing which application paths accept connections and how
/// many connections are currently live.
///
/// One registry is shared (behind an `Arc`) between every session the hosting
/// application spins up, so registering or removing a path takes effect for
/// all future connect attempts immediately.
pub struct ServerRegistry {
    accepted_paths: RwLock<HashSet<String>>,
    active_connections: Mutex<HashSet<u64>>,
    next_connection_id: AtomicU64,
    max_connections: usize,
}

impl ServerRegistry {
    /// Creates a registry allowing up to `max_connections` simultaneous
    /// connections.  A value of zero means unlimited.
    pub fn new(max_connections: usize) -> ServerRegistry {
        ServerRegistry {
            accepted_paths: RwLock::new(HashSet::new()),
            active_connections: Mutex::new(HashSet::new()),
            next_connection_id: AtomicU64::new(1),
            max_connections,
        }
    }

    /// Makes an application path available for clients to connect to
    pub fn register_path(&self, path: &str) {
        if let Ok(mut paths) = self.accepted_paths.write() {
            paths.insert(normalize_path(path).to_string());
        }
    }

    /// Removes an application path.  Existing connections are unaffected.
    pub fn unregister_path(&self, path: &str) {
        if let Ok(mut paths) = self.accepted_paths.write() {
            paths.remove(normalize_path(path));
        }
    }

    /// Checks whether clients may connect to the given path.  Leading and
    /// trailing slashes are ignored on both sides of the comparison.
    pub fn is_path_accepted(&self, path: &str) -> bool {
        match self.accepted_paths.read() {
            Ok(paths) => paths.contains(normalize_path(path)),
            Err(_) => false,
        }
    }

    /// Claims a connection slot, returning an id to release it with later.
    /// Returns `None` when the registry is at capacity.
    pub fn try_add_connection(&self) -> Option<u64> {
        let mut connections = match self.active_connections.lock() {
            Ok(connections) => connections,
            Err(_) => return None,
        };

        if self.max_connections > 0 && connections.len() >= self.max_connections {
            return None;
        }

        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        connections.insert(id);
        Some(id)
    }

    /// Releases a connection slot previously handed out by `try_add_connection`
    pub fn connection_closed(&self, id: u64) {
        if let Ok(mut connections) = self.active_connections.lock() {
            connections.remove(&id);
        }
    }

    /// Returns how many connections currently hold a slot
    pub fn active_connection_count(&self) -> usize {
        match self.active_connections.lock() {
            Ok(connections) => connections.len(),
            Err(_) => 0,
        }
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_path_is_accepted_regardless_of_slashes() {
        let registry = ServerRegistry::new(0);
        registry.register_path("live");

        assert!(registry.is_path_accepted("live"));
        assert!(registry.is_path_accepted("/live"));
        assert!(registry.is_path_accepted("live/"));
        assert!(!registry.is_path_accepted("other"));
    }

    #[test]
    fn unregistered_path_is_no_longer_accepted() {
        let registry = ServerRegistry::new(0);
        registry.register_path("live");
        registry.unregister_path("/live");

        assert!(!registry.is_path_accepted("live"));
    }

    #[test]
    fn connection_slots_enforce_capacity() {
        let registry = ServerRegistry::new(2);

        let id1 = registry.try_add_connection().unwrap();
        let _id2 = registry.try_add_connection().unwrap();
        assert!(registry.try_add_connection().is_none(), "expected capacity hit");

        registry.connection_closed(id1);
        assert!(registry.try_add_connection().is_some(), "slot was not freed");
    }

    #[test]
    fn zero_capacity_means_unlimited() {
        let registry = ServerRegistry::new(0);
        for _ in 0..100 {
            assert!(registry.try_add_connection().is_some());
        }

        assert_eq!(registry.active_connection_count(), 100);
    }
}
