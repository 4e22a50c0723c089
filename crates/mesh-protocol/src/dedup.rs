/// Record of idempotency keys this node has already processed.
///
/// Scoped to the node's whole uptime, not per peer or per source: once
/// a key has been processed, any re-flood carrying it is treated as
/// already handled no matter who relayed it. There is no expiry — the
/// set resets only on reboot.
///
/// The key space is 8 bits wide, so after 256 distinct originations a
/// genuinely new event can alias a stale key and be misclassified as a
/// duplicate. A node's wake window is far shorter than that, and the
/// set clears on every wake.
pub struct DedupSet {
    seen: [bool; 256],
}

impl DedupSet {
    pub fn new() -> Self {
        Self { seen: [false; 256] }
    }

    /// Mark a key as processed. Called exactly once, immediately before
    /// dispatch, for every packet that reaches a PROCESS decision.
    pub fn mark_processed(&mut self, key: u8) {
        self.seen[key as usize] = true;
    }

    pub fn is_processed(&self, key: u8) -> bool {
        self.seen[key as usize]
    }
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let dedup = DedupSet::new();
        for key in 0..=255u8 {
            assert!(!dedup.is_processed(key));
        }
    }

    #[test]
    fn mark_is_sticky() {
        let mut dedup = DedupSet::new();
        dedup.mark_processed(77);
        assert!(dedup.is_processed(77));
        assert!(!dedup.is_processed(76));
        assert!(!dedup.is_processed(78));

        // Marking again changes nothing.
        dedup.mark_processed(77);
        assert!(dedup.is_processed(77));
    }

    #[test]
    fn covers_full_key_space() {
        let mut dedup = DedupSet::new();
        dedup.mark_processed(0);
        dedup.mark_processed(255);
        assert!(dedup.is_processed(0));
        assert!(dedup.is_processed(255));
    }
}
