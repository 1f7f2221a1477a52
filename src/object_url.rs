//! Object-access handles for in-memory blobs.
//!
//! An [`ObjectUrlStore`] hands out [`ObjectUrl`]s: process-local
//! `blob:lastframe/<n>` addresses that resolve to a byte blob until they are
//! revoked. Revocation happens explicitly via [`ObjectUrl::revoke`] or
//! implicitly when the handle is dropped.
//!
//! # Example
//!
//! ```
//! use lastframe::ObjectUrlStore;
//!
//! let store = ObjectUrlStore::new();
//! let url = store.create(vec![1_u8, 2, 3]);
//! assert_eq!(store.resolve(url.as_str()).as_deref(), Some(&[1_u8, 2, 3][..]));
//!
//! let address = url.as_str().to_string();
//! url.revoke();
//! assert!(store.resolve(&address).is_none());
//! ```

use std::{
    collections::HashMap,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

const URL_PREFIX: &str = "blob:lastframe/";

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    blobs: HashMap<u64, Arc<[u8]>>,
}

/// Issues and resolves [`ObjectUrl`]s.
///
/// Cloning the store is cheap; clones share the same table.
#[derive(Clone, Default)]
pub struct ObjectUrlStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl Debug for ObjectUrlStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ObjectUrlStore")
            .field("live", &self.live_count())
            .finish()
    }
}

impl ObjectUrlStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return a handle addressing them.
    pub fn create(&self, bytes: impl Into<Arc<[u8]>>) -> ObjectUrl {
        let bytes = bytes.into();
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        log::debug!("Created {URL_PREFIX}{id} ({} bytes)", bytes.len());
        inner.blobs.insert(id, bytes);

        ObjectUrl {
            id,
            url: format!("{URL_PREFIX}{id}"),
            store: Arc::clone(&self.inner),
        }
    }

    /// Look up the blob behind a live URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        let id = url.strip_prefix(URL_PREFIX)?.parse::<u64>().ok()?;
        self.lock().blobs.get(&id).cloned()
    }

    /// Number of URLs that have not been revoked yet.
    pub fn live_count(&self) -> usize {
        self.lock().blobs.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live object URL. Revoked on drop.
pub struct ObjectUrl {
    id: u64,
    url: String,
    store: Arc<Mutex<StoreInner>>,
}

impl ObjectUrl {
    /// The `blob:lastframe/<n>` address.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Revoke the URL now.
    pub fn revoke(self) {
        drop(self);
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        let mut inner = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.blobs.remove(&self.id).is_some() {
            log::debug!("Revoked {}", self.url);
        }
    }
}

impl Debug for ObjectUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("ObjectUrl").field(&self.url).finish()
    }
}

impl Display for ObjectUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.url)
    }
}
