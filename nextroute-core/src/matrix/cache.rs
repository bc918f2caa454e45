use bytes::Bytes;
use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

/// Bytes computed once and served many times
///
/// The content only changes when [`store`] is called again, there is no
/// expiry. Readers get a cheap reference counted view of the buffer that
/// they cannot mutate.
///
/// [`store`]: ResponseCache::store
#[derive(Default)]
pub struct ResponseCache {
    bytes: RwLock<Bytes>,
}

impl ResponseCache {
    pub fn store(&self, bytes: Bytes) {
        *self.bytes.write().unwrap_or_else(PoisonError::into_inner) = bytes;
    }

    /// The stored bytes, empty until something was stored.
    pub fn load(&self) -> Bytes {
        self.bytes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clone for ResponseCache {
    fn clone(&self) -> Self {
        Self {
            bytes: RwLock::new(self.load()),
        }
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("len", &self.load().len())
            .finish()
    }
}
