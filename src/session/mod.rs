// Session module
//
// This module provides the SessionController, which owns the two upload slots,
// the session status and every resource handle, drives the generation flow,
// and emits change events for the GUI.

pub mod resources;
pub mod slot;

pub use resources::{Resource, ResourceContent, ResourceHandle, ResourceId, ResourceRegistry};
pub use slot::UploadSlot;

use crate::metrics::Metrics;
use crate::models::config::DEFAULT_DOWNLOAD_FILE_NAME;
use crate::models::{
    ErrorKind, FailureReason, GeneratedImage, GenerationResult, SelectedFile, SessionSnapshot,
    SessionStatus, SlotKind, StatusKind,
};
use crate::services::encoder::{self, ReadError};
use crate::services::generation::{GenerationError, ImageGenerator};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

/// Message shown when generation is triggered without both images
pub const MISSING_UPLOAD_MESSAGE: &str =
    "Please upload both a face photo and a glasses/mask image.";

/// Change events emitted when the session is modified
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A slot's file (and therefore its preview) changed
    SlotChanged {
        slot: SlotKind,
        preview: Option<ResourceId>,
    },

    /// The session moved between states
    StatusChanged { from: StatusKind, to: StatusKind },

    /// The generated image was set, replaced or cleared
    ResultChanged { image: Option<ResourceId> },

    /// The session was reset by the user
    SessionReset,
}

/// Every failure the session can surface, converted to a [`FailureReason`] at the boundary
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{}", MISSING_UPLOAD_MESSAGE)]
    MissingUpload { missing: Vec<SlotKind> },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::MissingUpload { .. } => ErrorKind::Validation,
            SessionError::Read(_) => ErrorKind::Read,
            SessionError::Generation(GenerationError::Network(_)) => ErrorKind::Network,
            SessionError::Generation(GenerationError::Service(_)) => ErrorKind::Service,
        }
    }

    pub fn to_failure(&self) -> FailureReason {
        FailureReason::new(self.kind(), self.to_string())
    }
}

/// What happened to a generation trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The service produced an image, registered under this id
    Succeeded(ResourceId),

    /// The attempt started but failed
    Failed(FailureReason),

    /// Rejected locally because a slot was empty; no remote call was made
    Rejected(FailureReason),

    /// A generation was already in flight; nothing was done
    Ignored,

    /// The session was reset while the call was outstanding; the result was dropped
    Discarded,
}

/// A generated picture ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl DownloadArtifact {
    pub fn write_to(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

#[derive(Debug)]
struct SessionInner {
    face: UploadSlot,
    overlay: UploadSlot,
    status: SessionStatus,

    /// Bumped whenever a generation starts or the session resets; a result is
    /// accepted only if the epoch it started under is still current
    epoch: u64,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            face: UploadSlot::new(SlotKind::Face),
            overlay: UploadSlot::new(SlotKind::Overlay),
            status: SessionStatus::Idle,
            epoch: 0,
        }
    }

    fn slot(&self, kind: SlotKind) -> &UploadSlot {
        match kind {
            SlotKind::Face => &self.face,
            SlotKind::Overlay => &self.overlay,
        }
    }

    fn slot_mut(&mut self, kind: SlotKind) -> &mut UploadSlot {
        match kind {
            SlotKind::Face => &mut self.face,
            SlotKind::Overlay => &mut self.overlay,
        }
    }

    fn both_filled(&self) -> bool {
        self.face.is_filled() && self.overlay.is_filled()
    }

    fn missing(&self) -> Vec<SlotKind> {
        SlotKind::ALL
            .into_iter()
            .filter(|kind| !self.slot(*kind).is_filled())
            .collect()
    }

    /// Move between Idle and Ready after a slot change
    ///
    /// A validation failure is lifted once both slots are filled. Results,
    /// remote failures and in-flight calls are left alone.
    fn refresh_readiness(&mut self) {
        let settled = match &self.status {
            SessionStatus::Idle | SessionStatus::Ready => true,
            SessionStatus::Failed(reason) => {
                reason.kind == ErrorKind::Validation && self.both_filled()
            }
            SessionStatus::InFlight | SessionStatus::Succeeded(_) => false,
        };

        if settled {
            self.status = if self.both_filled() {
                SessionStatus::Ready
            } else {
                SessionStatus::Idle
            };
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status.kind(),
            face_file: self.face.file().map(|f| f.name().to_string()),
            overlay_file: self.overlay.file().map(|f| f.name().to_string()),
            face_preview: self.face.preview_id(),
            overlay_preview: self.overlay.preview_id(),
            result_image: self.status.result().map(GenerationResult::image_id),
            error: self.status.failure().cloned(),
        }
    }
}

/// Orchestrates one user session: uploads, generation, result, download and reset
///
/// The controller is created per session and owns every preview and result
/// handle. Dropping it (or calling [`shutdown`](Self::shutdown)) releases them.
///
/// # Usage
///
/// ```ignore
/// let session = Arc::new(SessionController::new());
/// session.set_file(SlotKind::Face, SelectedFile::from_path("face.jpg"));
/// session.set_file(SlotKind::Overlay, SelectedFile::from_path("glasses.png"));
///
/// match session.generate(&client).await {
///     GenerationOutcome::Succeeded(_) => {
///         let artifact = session.download().expect("result present");
///         artifact.write_to(&artifact.file_name)?;
///     }
///     other => tracing::warn!("Generation did not succeed: {:?}", other),
/// }
/// ```
///
/// The state lock is never held across an `.await`; the remote call is the
/// only suspension point and at most one call is accepted while `InFlight`.
pub struct SessionController {
    inner: RwLock<SessionInner>,
    resources: ResourceRegistry,

    /// Broadcast channel for session change events
    events_tx: broadcast::Sender<SessionEvent>,

    metrics: Arc<Metrics>,
    download_file_name: String,
}

impl SessionController {
    /// Create an idle session with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            inner: RwLock::new(SessionInner::new()),
            resources: ResourceRegistry::new(),
            events_tx,
            metrics: Arc::new(Metrics::new()),
            download_file_name: DEFAULT_DOWNLOAD_FILE_NAME.to_string(),
        }
    }

    /// Override the suggested file name used by [`download`](Self::download)
    pub fn with_download_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.download_file_name = file_name.into();
        self
    }

    /// Share a metrics instance with the caller
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read().snapshot()
    }

    pub fn status(&self) -> StatusKind {
        self.read().status.kind()
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn download_file_name(&self) -> &str {
        &self.download_file_name
    }

    // ===== Uploads =====

    /// Store a file in a slot and return its preview id
    ///
    /// The slot's previous preview is released first.
    pub fn set_file(&self, kind: SlotKind, file: SelectedFile) -> ResourceId {
        tracing::info!("{} image selected: {}", kind, file.name());

        let (id, _) = self.update(|inner| {
            let id = inner.slot_mut(kind).set_file(file, &self.resources);
            inner.refresh_readiness();
            id
        });
        id
    }

    /// Empty a slot; returns whether it held a file
    pub fn clear_slot(&self, kind: SlotKind) -> bool {
        let (cleared, _) = self.update(|inner| {
            let cleared = inner.slot_mut(kind).clear();
            inner.refresh_readiness();
            cleared
        });

        if cleared {
            tracing::info!("{} slot cleared", kind);
        }
        cleared
    }

    // ===== Generation =====

    /// Run one generation with the current files
    ///
    /// Never returns an error: every failure ends up in
    /// [`SessionStatus::Failed`] and in the returned outcome.
    pub async fn generate<G>(&self, generator: &G) -> GenerationOutcome
    where
        G: ImageGenerator + ?Sized,
    {
        let (epoch, face, overlay) = match self.begin_generation() {
            Ok(started) => started,
            Err(outcome) => return outcome,
        };

        let started = Instant::now();
        let result = Self::run_generation(generator, &face, &overlay).await;
        self.finish_generation(epoch, started, result)
    }

    /// Validate and enter InFlight, returning the epoch and the files to send
    fn begin_generation(&self) -> Result<(u64, SelectedFile, SelectedFile), GenerationOutcome> {
        let (started, _) = self.update(|inner| {
            if matches!(inner.status, SessionStatus::InFlight) {
                return Err(GenerationOutcome::Ignored);
            }

            let (Some(face), Some(overlay)) =
                (inner.face.file().cloned(), inner.overlay.file().cloned())
            else {
                let error = SessionError::MissingUpload {
                    missing: inner.missing(),
                };
                let reason = error.to_failure();
                inner.status = SessionStatus::Failed(reason.clone());
                return Err(GenerationOutcome::Rejected(reason));
            };

            // Replacing the status drops any previous result, releasing its handle
            inner.status = SessionStatus::InFlight;
            inner.epoch += 1;
            Ok((inner.epoch, face, overlay))
        });

        match &started {
            Ok((epoch, face, overlay)) => {
                self.metrics.record_started();
                tracing::info!(
                    "Generation {} started: {} + {}",
                    epoch,
                    face.name(),
                    overlay.name()
                );
            }
            Err(GenerationOutcome::Ignored) => {
                self.metrics.record_ignored_trigger();
                tracing::debug!("Generate ignored: a generation is already in flight");
            }
            Err(outcome) => {
                self.metrics.record_validation_rejection();
                tracing::warn!("Generate rejected: {:?}", outcome);
            }
        }

        started
    }

    async fn run_generation<G>(
        generator: &G,
        face: &SelectedFile,
        overlay: &SelectedFile,
    ) -> Result<GeneratedImage, SessionError>
    where
        G: ImageGenerator + ?Sized,
    {
        let face_payload = encoder::encode_file(face).await?;
        let overlay_payload = encoder::encode_file(overlay).await?;
        Ok(generator.generate(&face_payload, &overlay_payload).await?)
    }

    /// Apply a finished call, unless the session moved on while it was outstanding
    fn finish_generation(
        &self,
        epoch: u64,
        started: Instant,
        result: Result<GeneratedImage, SessionError>,
    ) -> GenerationOutcome {
        let elapsed = started.elapsed();

        let (outcome, _) = self.update(|inner| {
            if inner.epoch != epoch || !matches!(inner.status, SessionStatus::InFlight) {
                return GenerationOutcome::Discarded;
            }

            match result {
                Ok(image) => {
                    let handle = self
                        .resources
                        .acquire(Resource::from_bytes(image.bytes, image.media_type.clone()));
                    let id = handle.id();
                    inner.status =
                        SessionStatus::Succeeded(GenerationResult::new(handle, image.media_type));
                    GenerationOutcome::Succeeded(id)
                }
                Err(error) => {
                    let reason = error.to_failure();
                    inner.status = SessionStatus::Failed(reason.clone());
                    GenerationOutcome::Failed(reason)
                }
            }
        });

        match &outcome {
            GenerationOutcome::Succeeded(id) => {
                self.metrics.record_succeeded(elapsed);
                tracing::info!(
                    "Generation {} succeeded in {:.2}s ({})",
                    epoch,
                    elapsed.as_secs_f32(),
                    id
                );
            }
            GenerationOutcome::Failed(reason) => {
                self.metrics.record_failed(elapsed);
                tracing::error!(
                    "Generation {} failed ({:?}): {}",
                    epoch,
                    reason.kind,
                    reason.message
                );
            }
            _ => {
                self.metrics.record_discarded(elapsed);
                tracing::info!("Generation {} finished after reset; result discarded", epoch);
            }
        }

        outcome
    }

    // ===== Result =====

    /// The current result as a file to save, if there is one
    pub fn download(&self) -> Option<DownloadArtifact> {
        let inner = self.read();
        let result = inner.status.result()?;
        let resource = self.resources.resolve(result.image_id())?;

        match resource.content {
            ResourceContent::Bytes(bytes) => Some(DownloadArtifact {
                file_name: self.download_file_name.clone(),
                media_type: resource.media_type,
                bytes,
            }),
            ResourceContent::File(path) => {
                tracing::warn!("Result {} unexpectedly refers to file {}", result.image_id(), path);
                None
            }
        }
    }

    // ===== Lifecycle =====

    /// Return to Idle: clear both slots, drop result and error, release every handle
    ///
    /// A generation still in flight runs to completion, but its result is discarded.
    pub fn reset(&self) {
        self.update(|inner| {
            inner.face.clear();
            inner.overlay.clear();
            inner.status = SessionStatus::Idle;
            inner.epoch += 1;
        });

        let _ = self.events_tx.send(SessionEvent::SessionReset);
        tracing::info!(
            "Session reset ({} resources still live)",
            self.resources.live_count()
        );
    }

    /// Release everything at the end of the session
    pub fn shutdown(&self) {
        self.reset();
        tracing::info!(
            "Session shut down: {} resources acquired, {} released",
            self.resources.acquired_total(),
            self.resources.released_total()
        );
    }

    // ===== Internals =====

    /// Mutate the session and emit events for whatever changed
    fn update<F, R>(&self, update_fn: F) -> (R, Vec<SessionEvent>)
    where
        F: FnOnce(&mut SessionInner) -> R,
    {
        let mut inner = self.write();
        let before = inner.snapshot();

        let output = update_fn(&mut *inner);

        let after = inner.snapshot();
        let changes = Self::detect_changes(&before, &after);

        for change in &changes {
            // Nobody listening is fine
            let _ = self.events_tx.send(change.clone());
        }

        (output, changes)
    }

    fn detect_changes(old: &SessionSnapshot, new: &SessionSnapshot) -> Vec<SessionEvent> {
        let mut changes = Vec::new();

        if old.face_preview != new.face_preview {
            changes.push(SessionEvent::SlotChanged {
                slot: SlotKind::Face,
                preview: new.face_preview,
            });
        }

        if old.overlay_preview != new.overlay_preview {
            changes.push(SessionEvent::SlotChanged {
                slot: SlotKind::Overlay,
                preview: new.overlay_preview,
            });
        }

        if old.status != new.status || old.error != new.error {
            changes.push(SessionEvent::StatusChanged {
                from: old.status,
                to: new.status,
            });
        }

        if old.result_image != new.result_image {
            changes.push(SessionEvent::ResultChanged {
                image: new.result_image,
            });
        }

        changes
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}
