//! Integration tests for SessionController
//!
//! These tests drive whole sessions through the public API:
//! - Upload, generate, download with real files on disk
//! - Local validation without any remote call
//! - Failure handling and result replacement
//! - Reset, including a reset while a call is outstanding
//! - Resource accounting (every preview and result released exactly once)

mod common;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::{GatedGenerator, RecordingGenerator, png_image};
use pfpgen::models::{ErrorKind, SelectedFile};
use pfpgen::session::MISSING_UPLOAD_MESSAGE;
use pfpgen::{GenerationError, GenerationOutcome, SessionController, SessionEvent, SlotKind, StatusKind};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::{Duration, timeout};

const FACE_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
const OVERLAY_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Write face.jpg and glasses.png into a temp dir
fn fixture_files() -> (TempDir, SelectedFile, SelectedFile) {
    let dir = TempDir::new().unwrap();
    let face_path = dir.path().join("face.jpg");
    let overlay_path = dir.path().join("glasses.png");
    std::fs::write(&face_path, FACE_BYTES).unwrap();
    std::fs::write(&overlay_path, OVERLAY_BYTES).unwrap();

    let face = SelectedFile::from_path(camino::Utf8PathBuf::try_from(face_path).unwrap());
    let overlay = SelectedFile::from_path(camino::Utf8PathBuf::try_from(overlay_path).unwrap());
    (dir, face, overlay)
}

fn ready_session(face: SelectedFile, overlay: SelectedFile) -> Arc<SessionController> {
    let session = Arc::new(SessionController::new());
    session.set_file(SlotKind::Face, face);
    session.set_file(SlotKind::Overlay, overlay);
    assert_eq!(session.status(), StatusKind::Ready);
    session
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_generate_and_download_from_disk() {
    let (dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let generator = RecordingGenerator::new();

    let outcome = session.generate(&generator).await;
    assert!(
        matches!(outcome, GenerationOutcome::Succeeded(_)),
        "Expected success, got: {:?}",
        outcome
    );

    // Both files were read fully and sent once, in slot order
    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].face.media_type(), "image/jpeg");
    assert_eq!(calls[0].face.data(), BASE64.encode(FACE_BYTES));
    assert_eq!(calls[0].overlay.media_type(), "image/png");
    assert_eq!(calls[0].overlay.data(), BASE64.encode(OVERLAY_BYTES));

    let artifact = session.download().expect("result should be downloadable");
    assert_eq!(artifact.file_name, "billions-network-pfp.png");

    let saved = dir.path().join(&artifact.file_name);
    artifact.write_to(&saved).unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), b"generated");
}

#[tokio::test]
async fn test_missing_overlay_is_rejected_locally() {
    let (_dir, face, _overlay) = fixture_files();
    let session = SessionController::new();
    session.set_file(SlotKind::Face, face);
    let generator = RecordingGenerator::new();

    let outcome = session.generate(&generator).await;

    let GenerationOutcome::Rejected(reason) = outcome else {
        panic!("Expected rejection, got: {:?}", outcome);
    };
    assert_eq!(reason.kind, ErrorKind::Validation);
    assert_eq!(
        reason.message,
        "Please upload both a face photo and a glasses/mask image."
    );
    assert_eq!(generator.call_count(), 0);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, StatusKind::Failed);
    assert_eq!(snapshot.error.unwrap().message, MISSING_UPLOAD_MESSAGE);
}

#[tokio::test]
async fn test_empty_session_is_rejected_locally() {
    let session = SessionController::new();
    let generator = RecordingGenerator::new();

    let outcome = session.generate(&generator).await;

    assert!(matches!(outcome, GenerationOutcome::Rejected(_)));
    assert_eq!(generator.call_count(), 0);
    assert_eq!(session.resources().acquired_total(), 0);
}

#[tokio::test]
async fn test_empty_file_is_read_error() {
    let (dir, face, _overlay) = fixture_files();
    let empty_path = dir.path().join("empty.png");
    std::fs::write(&empty_path, b"").unwrap();

    let session = ready_session(
        face,
        SelectedFile::from_path(camino::Utf8PathBuf::try_from(empty_path).unwrap()),
    );
    let generator = RecordingGenerator::new();

    let outcome = session.generate(&generator).await;

    let GenerationOutcome::Failed(reason) = outcome else {
        panic!("Expected failure, got: {:?}", outcome);
    };
    assert_eq!(reason.kind, ErrorKind::Read);
    assert!(reason.message.contains("empty.png"));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_failure_after_success_clears_previous_result() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let generator = RecordingGenerator::with_responses([
        Ok(png_image(b"first")),
        Err(GenerationError::service(
            "The model did not return an image. Try different photos.",
        )),
    ]);

    let GenerationOutcome::Succeeded(first) = session.generate(&generator).await else {
        panic!("first generation should succeed");
    };

    let outcome = session.generate(&generator).await;

    assert!(matches!(outcome, GenerationOutcome::Failed(_)));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, StatusKind::Failed);
    assert!(snapshot.result_image.is_none());
    assert_eq!(
        snapshot.error.unwrap().message,
        "The model did not return an image. Try different photos."
    );
    assert!(!session.resources().is_live(first));
    assert!(session.download().is_none());
}

#[tokio::test]
async fn test_network_failure_can_be_retried() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let generator = RecordingGenerator::with_responses([Err(GenerationError::network(
        "connection refused",
    ))]);

    let outcome = session.generate(&generator).await;
    let GenerationOutcome::Failed(reason) = outcome else {
        panic!("Expected failure, got: {:?}", outcome);
    };
    assert_eq!(reason.kind, ErrorKind::Network);

    let retry = session.generate(&generator).await;
    assert!(matches!(retry, GenerationOutcome::Succeeded(_)));
    assert!(session.snapshot().error.is_none());
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_reset_releases_every_resource() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face.clone(), overlay);
    let generator = RecordingGenerator::new();

    // Replace the face twice before generating
    session.set_file(SlotKind::Face, face.clone());
    session.set_file(SlotKind::Face, face);
    session.generate(&generator).await;

    session.reset();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, StatusKind::Idle);
    assert!(!snapshot.can_reset());
    assert_eq!(session.resources().live_count(), 0);
    assert_eq!(session.resources().acquired_total(), 5);
    assert_eq!(session.resources().released_total(), 5);
}

#[tokio::test]
async fn test_generation_events_in_order() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let mut rx = session.subscribe();

    let outcome = session.generate(&RecordingGenerator::new()).await;
    let GenerationOutcome::Succeeded(id) = outcome else {
        panic!("Expected success, got: {:?}", outcome);
    };

    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![
            SessionEvent::StatusChanged {
                from: StatusKind::Ready,
                to: StatusKind::InFlight,
            },
            SessionEvent::StatusChanged {
                from: StatusKind::InFlight,
                to: StatusKind::Succeeded,
            },
            SessionEvent::ResultChanged { image: Some(id) },
        ]
    );
}

#[tokio::test]
async fn test_trigger_while_in_flight_is_ignored() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let generator = Arc::new(GatedGenerator::new(Ok(png_image(b"gated"))));

    let first = {
        let session = Arc::clone(&session);
        let generator = Arc::clone(&generator);
        tokio::spawn(async move { session.generate(generator.as_ref()).await })
    };

    timeout(Duration::from_secs(1), generator.entered.notified())
        .await
        .expect("Timeout waiting for the call to start");
    assert_eq!(session.status(), StatusKind::InFlight);
    assert!(!session.snapshot().can_generate());

    let second = session.generate(generator.as_ref()).await;
    assert_eq!(second, GenerationOutcome::Ignored);
    assert_eq!(generator.call_count(), 1);

    generator.release_one();
    let first = first.await.unwrap();
    assert!(matches!(first, GenerationOutcome::Succeeded(_)));
    assert_eq!(session.status(), StatusKind::Succeeded);
}

#[tokio::test]
async fn test_reset_during_generation_discards_result() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let generator = Arc::new(GatedGenerator::new(Ok(png_image(b"stale"))));

    let pending = {
        let session = Arc::clone(&session);
        let generator = Arc::clone(&generator);
        tokio::spawn(async move { session.generate(generator.as_ref()).await })
    };

    timeout(Duration::from_secs(1), generator.entered.notified())
        .await
        .expect("Timeout waiting for the call to start");

    session.reset();
    assert_eq!(session.status(), StatusKind::Idle);

    generator.release_one();
    let outcome = pending.await.unwrap();

    assert_eq!(outcome, GenerationOutcome::Discarded);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, StatusKind::Idle);
    assert!(snapshot.result_image.is_none());
    assert_eq!(session.resources().live_count(), 0);
}

#[tokio::test]
async fn test_stale_failure_does_not_override_new_session() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face.clone(), overlay.clone());
    let stale = Arc::new(GatedGenerator::new(Err(GenerationError::network("timed out"))));

    let pending = {
        let session = Arc::clone(&session);
        let stale = Arc::clone(&stale);
        tokio::spawn(async move { session.generate(stale.as_ref()).await })
    };

    timeout(Duration::from_secs(1), stale.entered.notified())
        .await
        .expect("Timeout waiting for the call to start");

    // Start over and finish a fresh generation while the old call is still outstanding
    session.reset();
    session.set_file(SlotKind::Face, face);
    session.set_file(SlotKind::Overlay, overlay);
    let fresh = session.generate(&RecordingGenerator::new()).await;
    let GenerationOutcome::Succeeded(fresh_id) = fresh else {
        panic!("Expected success, got: {:?}", fresh);
    };

    stale.release_one();
    assert_eq!(pending.await.unwrap(), GenerationOutcome::Discarded);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, StatusKind::Succeeded);
    assert_eq!(snapshot.result_image, Some(fresh_id));
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_metrics_track_outcomes() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let generator = RecordingGenerator::with_responses([
        Ok(png_image(b"ok")),
        Err(GenerationError::service("quota exceeded")),
    ]);

    session.generate(&generator).await;
    session.generate(&generator).await;
    session.clear_slot(SlotKind::Overlay);
    session.generate(&generator).await;

    use std::sync::atomic::Ordering;
    let metrics = session.metrics();
    assert_eq!(metrics.generations_started.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.generations_succeeded.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.generations_failed.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.validation_rejections.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_dropping_session_releases_result() {
    let (_dir, face, overlay) = fixture_files();
    let session = ready_session(face, overlay);
    let registry = session.resources().clone();

    session.generate(&RecordingGenerator::new()).await;
    assert_eq!(registry.live_count(), 3);

    drop(session);

    assert_eq!(registry.live_count(), 0);
    assert_eq!(registry.acquired_total(), registry.released_total());
}
