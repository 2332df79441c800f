//! Revocable, locally addressable audio resources.
//!
//! Generated audio lives in a per-session [`BlobStore`] and is referenced by an
//! opaque [`ResourceHandle`] carrying a `blob:` URL. The store tracks how often
//! each handle was revoked so leaks and double releases are observable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace, warn};

pub const BLOB_SCHEME: &str = "blob:narration/";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: u64,
    url: String,
}

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    live: HashMap<u64, Arc<[u8]>>,
    /// One counter per handle ever revoked. Ids are never reused, so this
    /// grows with the session's generation count and is freed with the store.
    revocations: HashMap<u64, u32>,
    created: u64,
}

#[derive(Clone, Debug, Default)]
pub struct BlobStore {
    inner: Arc<Mutex<Registry>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self, bytes: Vec<u8>) -> ResourceHandle {
        let mut registry = self.lock();
        registry.next_id += 1;
        registry.created += 1;
        let id = registry.next_id;
        let len = bytes.len();
        registry.live.insert(id, Arc::from(bytes));
        let handle = ResourceHandle {
            id,
            url: format!("{BLOB_SCHEME}{id}"),
        };
        debug!(handle = %handle, bytes = len, "Created audio resource");
        handle
    }

    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Arc<[u8]>> {
        self.lock().live.get(&handle.id).cloned()
    }

    /// Revoke a handle. Returns `false` if it was not live (already revoked or
    /// never issued by this store).
    pub fn revoke(&self, handle: &ResourceHandle) -> bool {
        let mut registry = self.lock();
        *registry.revocations.entry(handle.id).or_insert(0) += 1;
        if registry.live.remove(&handle.id).is_some() {
            trace!(handle = %handle, "Revoked audio resource");
            true
        } else {
            warn!(handle = %handle, "Revoking a resource that is not live");
            false
        }
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.lock().live.contains_key(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn created_count(&self) -> u64 {
        self.lock().created
    }

    pub fn revocation_count(&self, handle: &ResourceHandle) -> u32 {
        self.lock()
            .revocations
            .get(&handle.id)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_resolve_revoke() {
        let store = BlobStore::new();
        let handle = store.create(vec![1, 2, 3]);
        assert!(handle.url().starts_with(BLOB_SCHEME));
        assert_eq!(store.resolve(&handle).as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(store.revoke(&handle));
        assert!(store.resolve(&handle).is_none());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn double_revoke_is_reported_and_counted() {
        let store = BlobStore::new();
        let handle = store.create(vec![0]);
        assert!(store.revoke(&handle));
        assert!(!store.revoke(&handle));
        assert_eq!(store.revocation_count(&handle), 2);
    }

    #[test]
    fn clones_share_the_registry() {
        let store = BlobStore::new();
        let other = store.clone();
        let a = store.create(vec![1]);
        let b = other.create(vec![2]);
        assert_ne!(a, b);
        assert_eq!(store.live_count(), 2);
        assert_eq!(other.created_count(), 2);
    }

    #[test]
    fn revocation_counters_hold_one_entry_per_handle() {
        let store = BlobStore::new();
        let handles: Vec<_> = (0..4).map(|n| store.create(vec![n])).collect();
        for handle in &handles {
            store.revoke(handle);
            store.revoke(handle);
        }
        assert_eq!(store.lock().revocations.len(), handles.len());
        assert_eq!(store.live_count(), 0);
    }
}
