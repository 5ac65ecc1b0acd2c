//! Process-wide address registry for store nodes
//!
//! Maps a normalized `host:port` address to the node listening there.
//! Entries are weak, so a node disappears from the registry as soon as the
//! last strong reference to it is dropped.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::StoreServer;

/// Port assumed when an address names only a host
pub const DEFAULT_PORT: u16 = 11210;

// Never upgrade a Weak while holding this lock: dropping the temporary Arc
// could run StoreServer::drop, which takes the lock again.
static NODES: Lazy<Mutex<HashMap<String, Weak<StoreServer>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Normalize `host` or `host:port` to `host:port`
pub fn normalize_address(address: &str) -> String {
    let address = address.trim().to_ascii_lowercase();
    match address.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => address,
        _ => format!("{}:{}", address, DEFAULT_PORT),
    }
}

/// Register a node; fails if a live node already holds the address
pub(super) fn register(address: &str, node: &Arc<StoreServer>) -> bool {
    let mut nodes = NODES.lock();
    if let Some(existing) = nodes.get(address) {
        if existing.strong_count() > 0 {
            return false;
        }
    }
    nodes.insert(address.to_string(), Arc::downgrade(node));
    true
}

/// Remove the entry for `address` if its node is gone
pub(super) fn deregister(address: &str) {
    let mut nodes = NODES.lock();
    if let Some(existing) = nodes.get(address) {
        if existing.strong_count() == 0 {
            nodes.remove(address);
        }
    }
}

/// Find the live node at `address`
pub fn lookup(address: &str) -> Option<Arc<StoreServer>> {
    let weak = NODES.lock().get(&normalize_address(address)).cloned()?;
    weak.upgrade()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("LocalHost"), "localhost:11210");
        assert_eq!(normalize_address("db1:9000"), "db1:9000");
        assert_eq!(normalize_address("db1:notaport"), "db1:notaport:11210");
    }
}
