// Resource registry - revocable handles to displayable images
//
// Preview references and result images are registered here and handed out as
// ResourceHandle ownership records. A handle is not Clone; releasing or dropping
// it revokes the registry entry, so every acquisition is released exactly once.

use crate::models::{FileSource, SelectedFile};
use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifier of a registered resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource:{}", self.0)
    }
}

/// Where a resource's bytes can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceContent {
    File(Utf8PathBuf),
    Bytes(Arc<[u8]>),
}

/// A displayable resource: content plus media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub media_type: String,
    pub content: ResourceContent,
}

impl Resource {
    /// Preview resource for a selected file; no bytes are read
    pub fn from_file(file: &SelectedFile) -> Self {
        let content = match file.source() {
            FileSource::Path(path) => ResourceContent::File(path.clone()),
            FileSource::Memory(bytes) => ResourceContent::Bytes(Arc::clone(bytes)),
        };

        Self {
            media_type: file.media_type().to_string(),
            content,
        }
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            content: ResourceContent::Bytes(bytes.into()),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: HashMap<ResourceId, Resource>,
    peak_live: usize,
    acquired: u64,
    released: u64,
}

/// Issues and tracks [`ResourceHandle`]s
///
/// Cloning the registry shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource and return the exclusive handle to it
    pub fn acquire(&self, resource: Resource) -> ResourceHandle {
        let mut state = self.lock();
        state.next_id += 1;
        let id = ResourceId(state.next_id);

        state.live.insert(id, resource);
        state.acquired += 1;
        state.peak_live = state.peak_live.max(state.live.len());

        tracing::trace!("Acquired {} ({} live)", id, state.live.len());

        ResourceHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Look up a live resource; revoked ids resolve to `None`
    pub fn resolve(&self, id: ResourceId) -> Option<Resource> {
        self.lock().live.get(&id).cloned()
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.lock().live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Highest number of simultaneously live resources seen so far
    pub fn peak_live(&self) -> usize {
        self.lock().peak_live
    }

    pub fn acquired_total(&self) -> u64 {
        self.lock().acquired
    }

    pub fn released_total(&self) -> u64 {
        self.lock().released
    }

    fn revoke(&self, id: ResourceId) {
        let mut state = self.lock();
        if state.live.remove(&id).is_some() {
            state.released += 1;
            tracing::trace!("Released {} ({} live)", id, state.live.len());
        } else {
            tracing::warn!("Attempted to release unknown resource {}", id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive ownership record for a registered resource
///
/// The entry is revoked when the handle is released or dropped.
#[derive(Debug)]
pub struct ResourceHandle {
    id: ResourceId,
    registry: ResourceRegistry,
}

impl ResourceHandle {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Release the resource now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_resource() -> Resource {
        Resource::from_bytes(vec![0x89, b'P', b'N', b'G'], "image/png")
    }

    #[test]
    fn test_acquire_and_resolve() {
        let registry = ResourceRegistry::new();
        let handle = registry.acquire(png_resource());

        let resolved = registry.resolve(handle.id()).unwrap();
        assert_eq!(resolved.media_type, "image/png");
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_release_revokes_exactly_once() {
        let registry = ResourceRegistry::new();
        let handle = registry.acquire(png_resource());
        let id = handle.id();

        handle.release();

        assert!(!registry.is_live(id));
        assert!(registry.resolve(id).is_none());
        assert_eq!(registry.acquired_total(), 1);
        assert_eq!(registry.released_total(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let registry = ResourceRegistry::new();
        {
            let _a = registry.acquire(png_resource());
            let _b = registry.acquire(png_resource());
            assert_eq!(registry.live_count(), 2);
        }
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_total(), 2);
        assert_eq!(registry.peak_live(), 2);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = ResourceRegistry::new();
        let a = registry.acquire(png_resource());
        let a_id = a.id();
        a.release();
        let b = registry.acquire(png_resource());

        assert_ne!(a_id, b.id());
    }

    #[test]
    fn test_resource_from_path_file_is_not_read() {
        let file = SelectedFile::from_path("/does/not/exist/face.jpg");
        let resource = Resource::from_file(&file);

        assert_eq!(resource.media_type, "image/jpeg");
        assert_eq!(
            resource.content,
            ResourceContent::File(Utf8PathBuf::from("/does/not/exist/face.jpg"))
        );
    }
}
