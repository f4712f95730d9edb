use crate::session::resources::{ResourceHandle, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two required user-supplied images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Face,
    Overlay,
}

impl SlotKind {
    /// Both slots in display order
    pub const ALL: [SlotKind; 2] = [SlotKind::Face, SlotKind::Overlay];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Face => "face",
            SlotKind::Overlay => "overlay",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a failed generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required upload is missing; no remote call was made
    Validation,
    /// A selected file could not be read
    Read,
    /// The service could not be reached
    Network,
    /// The service answered without a usable image
    Service,
}

/// User-visible reason stored in [`SessionStatus::Failed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Output of a successful generation
///
/// Owns the handle to the displayable image; dropping the result releases it.
#[derive(Debug)]
pub struct GenerationResult {
    image: ResourceHandle,
    media_type: String,
}

impl GenerationResult {
    pub fn new(image: ResourceHandle, media_type: impl Into<String>) -> Self {
        Self {
            image,
            media_type: media_type.into(),
        }
    }

    pub fn image_id(&self) -> ResourceId {
        self.image.id()
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// Status of a session
///
/// Transitions are owned by [`crate::session::SessionController`].
#[derive(Debug, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Ready,
    InFlight,
    Succeeded(GenerationResult),
    Failed(FailureReason),
}

/// Payload-free mirror of [`SessionStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Idle,
    Ready,
    InFlight,
    Succeeded,
    Failed,
}

impl SessionStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            SessionStatus::Idle => StatusKind::Idle,
            SessionStatus::Ready => StatusKind::Ready,
            SessionStatus::InFlight => StatusKind::InFlight,
            SessionStatus::Succeeded(_) => StatusKind::Succeeded,
            SessionStatus::Failed(_) => StatusKind::Failed,
        }
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            SessionStatus::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            SessionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusKind::Idle => "idle",
            StatusKind::Ready => "ready",
            StatusKind::InFlight => "in-flight",
            StatusKind::Succeeded => "succeeded",
            StatusKind::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Read-only copy of the session for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: StatusKind,
    pub face_file: Option<String>,
    pub overlay_file: Option<String>,
    pub face_preview: Option<ResourceId>,
    pub overlay_preview: Option<ResourceId>,
    pub result_image: Option<ResourceId>,
    pub error: Option<FailureReason>,
}

impl SessionSnapshot {
    pub fn preview(&self, kind: SlotKind) -> Option<ResourceId> {
        match kind {
            SlotKind::Face => self.face_preview,
            SlotKind::Overlay => self.overlay_preview,
        }
    }

    pub fn both_slots_filled(&self) -> bool {
        self.face_file.is_some() && self.overlay_file.is_some()
    }

    pub fn is_generating(&self) -> bool {
        self.status == StatusKind::InFlight
    }

    /// The Generate action is offered only with both files and nothing in flight
    pub fn can_generate(&self) -> bool {
        self.both_slots_filled() && !self.is_generating()
    }

    /// Reset is offered once the user has picked anything or there is something to clear
    pub fn can_reset(&self) -> bool {
        self.face_file.is_some()
            || self.overlay_file.is_some()
            || self.result_image.is_some()
            || self.error.is_some()
    }
}
