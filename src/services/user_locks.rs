use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// Per-user async mutexes; holding the guard serializes selection and
/// grading for that user while other users proceed.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, external_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock();
            if map.len() >= PRUNE_THRESHOLD {
                map.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            Arc::clone(
                map.entry(external_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        slot.lock_owned().await
    }

    pub fn tracked_users(&self) -> usize {
        self.inner.lock().len()
    }
}
