use crate::models::{SelectedFile, SlotKind};
use crate::session::resources::{Resource, ResourceHandle, ResourceId, ResourceRegistry};

/// Holds one user-selected file and its preview handle
///
/// At most one preview handle is live per slot: the previous handle is
/// released before a new one is acquired.
#[derive(Debug)]
pub struct UploadSlot {
    kind: SlotKind,
    file: Option<SelectedFile>,
    preview: Option<ResourceHandle>,
}

impl UploadSlot {
    pub fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            file: None,
            preview: None,
        }
    }

    /// Store a file and return the id of its new preview
    pub fn set_file(&mut self, file: SelectedFile, registry: &ResourceRegistry) -> ResourceId {
        if let Some(old) = self.preview.take() {
            tracing::debug!("Releasing previous {} preview {}", self.kind, old.id());
            old.release();
        }

        let handle = registry.acquire(Resource::from_file(&file));
        let id = handle.id();

        tracing::debug!(
            "{} slot now holds {} ({}), preview {}",
            self.kind,
            file.name(),
            file.media_type(),
            id
        );

        self.preview = Some(handle);
        self.file = Some(file);
        id
    }

    /// Drop the file and release its preview; returns whether anything was held
    pub fn clear(&mut self) -> bool {
        let had_file = self.file.take().is_some();
        if let Some(preview) = self.preview.take() {
            preview.release();
        }
        had_file
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn preview_id(&self) -> Option<ResourceId> {
        self.preview.as_ref().map(ResourceHandle::id)
    }

    pub fn is_filled(&self) -> bool {
        self.file.is_some()
    }
}
