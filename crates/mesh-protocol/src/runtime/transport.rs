/// Radio abstraction for the runtime.
///
/// In firmware: implemented over the vendor peer-to-peer radio API.
/// In tests and the simulator: implemented by channel-backed fakes that
/// record what was sent.
///
/// The flood protocol only ever broadcasts — there is no unicast at
/// this layer. Addressing happens inside the packet header.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send raw frame bytes to every connected peer.
    async fn broadcast(&self, data: &[u8]) -> Result<(), String>;
}

// ── MockTransport (tests) ───────────────────────────────────────────

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Fake transport that records broadcasts for verification.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail_sends: Arc<Mutex<bool>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }

        pub fn set_fail_sends(&self, fail: bool) {
            *self.fail_sends.lock().unwrap() = fail;
        }

        pub fn clear_sent(&self) {
            self.sent.lock().unwrap().clear();
        }
    }

    #[async_trait::async_trait]
    impl Transport for MockTransport {
        async fn broadcast(&self, data: &[u8]) -> Result<(), String> {
            if *self.fail_sends.lock().unwrap() {
                return Err("mock: broadcast failed".to_string());
            }
            self.sent.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }
}
