use std::collections::HashMap;

/// Key/value persistence that survives deep sleep and reboot.
///
/// In firmware this wraps the vendor flash store; tests and the
/// simulator use [`MemoryStore`]. Values are written through
/// immediately — the core never batches.
pub trait Persistence: Send {
    fn get_u32(&self, key: &str) -> Option<u32>;
    fn set_u32(&mut self, key: &str, value: u32);
    fn set_str(&mut self, key: &str, value: &str);
}

/// In-memory store for tests and simulation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    u32s: HashMap<String, u32>,
    strs: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.strs.get(key).map(String::as_str)
    }
}

impl Persistence for MemoryStore {
    fn get_u32(&self, key: &str) -> Option<u32> {
        self.u32s.get(key).copied()
    }

    fn set_u32(&mut self, key: &str, value: u32) {
        self.u32s.insert(key.to_string(), value);
    }

    fn set_str(&mut self, key: &str, value: &str) {
        self.strs.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_u32("battery_hv"), None);

        store.set_u32("battery_hv", 2100);
        assert_eq!(store.get_u32("battery_hv"), Some(2100));

        store.set_u32("battery_hv", 2200);
        assert_eq!(store.get_u32("battery_hv"), Some(2200));

        store.set_str("node_address", "aa-bb-cc-dd-ee-ff");
        assert_eq!(store.get_str("node_address"), Some("aa-bb-cc-dd-ee-ff"));
    }
}
