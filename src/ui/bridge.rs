// EventLoopBridge - hands work between the tokio runtime and the Slint event loop
//
// Slint components may only be touched on the event loop thread, while the
// generation call runs on tokio. The bridge queues UI updates from any thread
// and spawns async work from Slint callbacks.

use slint::{ComponentHandle, Weak};
use std::future::Future;
use tokio::sync::mpsc;

/// A queued UI mutation, run on the event loop thread
pub type UiUpdate<T> = Box<dyn FnOnce(&T) + Send>;

/// Capacity of the UI update queue
pub const UI_UPDATE_CAPACITY: usize = 100;

/// Coordinates between the tokio runtime and the Slint event loop
///
/// Cloning is cheap; every clone feeds the same handler thread.
///
/// # Example
/// ```ignore
/// let bridge = EventLoopBridge::new(&ui, runtime.handle().clone());
///
/// let worker = bridge.clone();
/// ui.on_generate(move || {
///     let bridge = worker.clone();
///     worker.spawn_async(move || async move {
///         let outcome = session.generate(&*generator).await;
///         bridge.update_ui(move |ui| ui.set_status_text(format!("{:?}", outcome).into()));
///     });
/// });
/// ```
pub struct EventLoopBridge<T: ComponentHandle> {
    ui_weak: Weak<T>,
    tokio_handle: tokio::runtime::Handle,

    /// Bounded so a stalled UI cannot grow the queue without limit
    ui_update_tx: mpsc::Sender<UiUpdate<T>>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T: ComponentHandle> Clone for EventLoopBridge<T> {
    fn clone(&self) -> Self {
        Self {
            ui_weak: self.ui_weak.clone(),
            tokio_handle: self.tokio_handle.clone(),
            ui_update_tx: self.ui_update_tx.clone(),
        }
    }
}

impl<T: ComponentHandle + 'static> EventLoopBridge<T> {
    /// Create the bridge and start its handler thread
    ///
    /// The handler thread forwards queued updates with `upgrade_in_event_loop`
    /// and exits once the event loop stops accepting them or every sender is gone.
    pub fn new(ui: &T, tokio_handle: tokio::runtime::Handle) -> Self {
        let ui_weak = ui.as_weak();
        let (ui_update_tx, mut ui_update_rx) = mpsc::channel::<UiUpdate<T>>(UI_UPDATE_CAPACITY);

        let handler_weak = ui_weak.clone();
        let spawned = std::thread::Builder::new()
            .name("pfpgen-ui-bridge".to_string())
            .spawn(move || {
                tracing::debug!("EventLoopBridge handler thread started");

                while let Some(update_fn) = ui_update_rx.blocking_recv() {
                    let queued = handler_weak.upgrade_in_event_loop(move |ui| update_fn(&ui));

                    if let Err(e) = queued {
                        tracing::warn!("Failed to queue UI update to event loop: {:?}", e);
                        break;
                    }
                }

                tracing::debug!("EventLoopBridge handler thread terminated");
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to start UI bridge thread: {}", e);
        }

        Self {
            ui_weak,
            tokio_handle,
            ui_update_tx,
        }
    }

    /// Schedule a UI update from any thread
    ///
    /// Updates are dropped with a warning when the queue is full or closed.
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        enqueue(&self.ui_update_tx, Box::new(update));
    }

    /// Run a future on the tokio runtime, typically from a Slint callback
    pub fn spawn_async<F, Fut>(&self, future_factory: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tokio_handle.spawn(async move {
            future_factory().await;
        });
    }

    pub fn ui_weak(&self) -> &Weak<T> {
        &self.ui_weak
    }
}

/// Queue an update; returns whether it was accepted
fn enqueue<T>(tx: &mpsc::Sender<UiUpdate<T>>, update: UiUpdate<T>) -> bool {
    match tx.try_send(update) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("UI update channel full - skipping update");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::warn!("Failed to send UI update - handler thread has stopped");
            false
        }
    }
}
