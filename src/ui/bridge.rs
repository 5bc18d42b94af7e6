// EventLoopBridge - Coordinates between the tokio runtime and the Slint event loop
//
// Slint owns the main thread; previews, analysis requests and backend output
// readers run on tokio workers. The bridge carries work in both directions:
// - Slint callbacks spawn futures on tokio via spawn_async()
// - tokio tasks and the session subscription queue window renders via update_ui()

use crate::metrics::Metrics;
use slint::ComponentHandle;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of the render queue; renders beyond it are dropped
pub const UI_UPDATE_CAPACITY: usize = 100;

type UiUpdate<T> = Box<dyn FnOnce(&T) + Send>;

/// Cloneable handle shared by every Slint callback of one window
///
/// # Example
/// ```ignore
/// let bridge = EventLoopBridge::new(&ui, runtime.handle().clone(), metrics);
///
/// ui.on_analyze(move || {
///     let session = session.clone();
///     bridge.spawn_async(move || async move {
///         let _ = session.analyze().await;
///     });
/// });
/// ```
pub struct EventLoopBridge<T: ComponentHandle> {
    tokio_handle: tokio::runtime::Handle,
    ui_update_tx: mpsc::Sender<UiUpdate<T>>,
    metrics: Arc<Metrics>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T: ComponentHandle> Clone for EventLoopBridge<T> {
    fn clone(&self) -> Self {
        Self {
            tokio_handle: self.tokio_handle.clone(),
            ui_update_tx: self.ui_update_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T: ComponentHandle + 'static> EventLoopBridge<T> {
    /// Create the bridge and its forwarding thread.
    ///
    /// The thread moves queued updates onto the Slint event loop with
    /// `upgrade_in_event_loop` and stops once every handle is dropped or the
    /// event loop has gone away.
    pub fn new(ui: &T, tokio_handle: tokio::runtime::Handle, metrics: Arc<Metrics>) -> Self {
        let forward_weak = ui.as_weak();
        let (ui_update_tx, mut ui_update_rx) = mpsc::channel::<UiUpdate<T>>(UI_UPDATE_CAPACITY);

        let spawned = std::thread::Builder::new()
            .name("candlescope-ui-bridge".to_string())
            .spawn(move || {
                tracing::debug!("EventLoopBridge handler thread started");

                while let Some(update_fn) = ui_update_rx.blocking_recv() {
                    let result = forward_weak.upgrade_in_event_loop(move |ui| {
                        update_fn(&ui);
                    });

                    if let Err(e) = result {
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
            tokio_handle,
            ui_update_tx,
            metrics,
        }
    }

    /// Queue a window update from any thread.
    ///
    /// Never blocks: when the queue is full the update is dropped.
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        match self.ui_update_tx.try_send(Box::new(update)) {
            Ok(()) => self.metrics.record_ui_update(),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("UI update channel full - skipping render");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("UI update dropped - handler thread has stopped");
            }
        }
    }

    /// Run a future on the tokio runtime from a Slint callback
    pub fn spawn_async<F, Fut>(&self, future_factory: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tokio_handle.spawn(async move {
            future_factory().await;
        });
    }
}
