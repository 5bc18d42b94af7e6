// GUI Controller - Bridges the Slint window with the analysis session
//
// This module contains the GuiController which coordinates between:
// - Slint UI (AppWindow)
// - SessionManager (client state machine, read-only here)
// - AnalysisSession (selection, preview and analysis commands)
// - EventLoopBridge (async/GUI coordination)
//
// and SlintWindowHost, the supervisor's window seam for Slint.

use crate::commands::{AppCommand, Modifiers};
use crate::models::{ImageKind, Prediction, SelectedFile, SessionState, Settings};
use crate::presentation::ResultView;
use crate::services::HttpAnalysisClient;
use crate::session::AnalysisSession;
use crate::state::SessionManager;
use crate::supervisor::WindowHost;
use crate::ui::bridge::EventLoopBridge;
use crate::ui::preview_cache::PreviewCache;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use slint::{ComponentHandle, Image, ModelRc, SharedString, VecModel};
use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

// Include the generated Slint code
slint::include_modules!();

thread_local! {
    // Renders only run on the Slint thread
    static PREVIEW_CACHE: RefCell<PreviewCache<Image>> = RefCell::new(PreviewCache::default());
}

/// Session driven by the window
pub type ChartSession = AnalysisSession<HttpAnalysisClient>;

/// Controller of the single application window
///
/// It renders [`SessionState`] snapshots and turns window callbacks into
/// session commands. It never mutates the session state itself.
pub struct GuiController {
    ui: AppWindow,
    _bridge: EventLoopBridge<AppWindow>,

    /// Set on drop so the subscription thread stops rendering into a closed window
    closed: Arc<AtomicBool>,
}

impl GuiController {
    /// Create the window, wire its callbacks and render the current session.
    pub fn new(
        session: ChartSession,
        diagnostics_header: String,
        tokio_handle: tokio::runtime::Handle,
    ) -> Result<Self> {
        let ui = AppWindow::new().context("Failed to create Slint UI")?;
        let bridge = EventLoopBridge::new(&ui, tokio_handle, Arc::clone(session.metrics()));
        let closed = Arc::new(AtomicBool::new(false));

        render(&ui, &session.manager().snapshot());
        Self::setup_callbacks(&ui, &bridge, &session, diagnostics_header);
        Self::setup_state_subscription(&bridge, session.manager().clone(), Arc::clone(&closed));

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            _bridge: bridge,
            closed,
        })
    }

    /// Show the window and block until it is closed
    pub fn run(&self) -> Result<()> {
        tracing::info!("Starting GUI event loop");
        self.ui.run().context("Slint event loop failed")
    }

    fn setup_callbacks(
        ui: &AppWindow,
        bridge: &EventLoopBridge<AppWindow>,
        session: &ChartSession,
        diagnostics_header: String,
    ) {
        let select_bridge = bridge.clone();
        let select_session = session.clone();
        ui.on_select_file(move || {
            let candidates = show_image_picker();
            if candidates.is_empty() {
                tracing::debug!("File selection cancelled");
                return;
            }

            let session = select_session.clone();
            select_bridge.spawn_async(move || async move {
                session.select_files(candidates).await;
            });
        });

        let analyze_bridge = bridge.clone();
        let analyze_session = session.clone();
        ui.on_analyze(move || {
            let session = analyze_session.clone();
            analyze_bridge.spawn_async(move || async move {
                if let Err(e) = session.analyze().await {
                    tracing::debug!("Analyze command ended with: {}", e);
                }
            });
        });

        let reset_session = session.clone();
        ui.on_reset(move || {
            reset_session.reset();
        });

        let shortcut_session = session.clone();
        let ui_weak = ui.as_weak();
        ui.on_shortcut(move |text, control, meta, shift| {
            let modifiers = Modifiers {
                control,
                meta,
                shift,
            };
            let Some(command) = AppCommand::from_key(text.as_str(), modifiers) else {
                return false;
            };

            tracing::debug!("Shortcut: {:?}", command);
            let Some(ui) = ui_weak.upgrade() else {
                return false;
            };

            match command {
                AppCommand::Quit => {
                    if let Err(e) = ui.hide() {
                        tracing::warn!("Failed to hide window: {}", e);
                    }
                    if let Err(e) = slint::quit_event_loop() {
                        tracing::warn!("Failed to quit event loop: {}", e);
                    }
                }
                AppCommand::Reload => render(&ui, &shortcut_session.manager().snapshot()),
                AppCommand::ToggleDiagnostics => {
                    let visible = !ui.get_show_diagnostics();
                    ui.set_diagnostics(
                        format!(
                            "{}\n{}",
                            diagnostics_header,
                            shortcut_session.metrics().summary()
                        )
                        .into(),
                    );
                    ui.set_show_diagnostics(visible);
                }
            }

            true
        });
    }

    /// Re-render the window whenever the session changes.
    ///
    /// Events that arrive together are coalesced into one render of the latest snapshot.
    fn setup_state_subscription(
        bridge: &EventLoopBridge<AppWindow>,
        manager: SessionManager,
        closed: Arc<AtomicBool>,
    ) {
        let bridge = bridge.clone();
        let mut rx = manager.subscribe();

        let spawned = std::thread::Builder::new()
            .name("candlescope-session-watch".to_string())
            .spawn(move || {
                tracing::debug!("Session subscription thread started");

                loop {
                    match rx.blocking_recv() {
                        Ok(change) => tracing::trace!("Session change: {:?}", change),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!("Session subscription lagged by {} events", skipped)
                        }
                        Err(RecvError::Closed) => break,
                    }

                    loop {
                        match rx.try_recv() {
                            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Closed) => return,
                        }
                    }

                    if closed.load(Ordering::Acquire) {
                        break;
                    }

                    let snapshot = manager.snapshot();
                    bridge.update_ui(move |ui| render(ui, &snapshot));
                }

                tracing::debug!("Session subscription thread terminated");
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to start session subscription thread: {}", e);
        }
    }
}

impl Drop for GuiController {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Native multi-select picker limited to the accepted image types
fn show_image_picker() -> Vec<SelectedFile> {
    let picked = rfd::FileDialog::new()
        .set_title("Select a chart image")
        .add_filter("Chart images", &ImageKind::EXTENSIONS[..])
        .pick_files()
        .unwrap_or_default();

    picked
        .into_iter()
        .filter_map(|path| match Utf8PathBuf::try_from(path) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("Failed to convert path to UTF-8: {}", e);
                None
            }
        })
        .filter_map(|path| {
            let file = SelectedFile::from_path(&path);
            if file.is_none() {
                tracing::warn!("Ignoring unsupported file: {}", path);
            }
            file
        })
        .collect()
}

fn string_model(items: &[String]) -> ModelRc<SharedString> {
    let items: Vec<SharedString> = items.iter().map(|item| item.as_str().into()).collect();
    ModelRc::new(VecModel::from(items))
}

/// Render a session snapshot. Runs on the Slint thread.
fn render(ui: &AppWindow, state: &SessionState) {
    ui.set_phase(state.kind().to_string().into());
    ui.set_analyzing(state.is_analyzing());
    ui.set_error_message(state.error().unwrap_or_default().into());

    let file = state.file();
    ui.set_has_file(file.is_some());
    ui.set_file_name(file.map(|f| f.name.as_str()).unwrap_or_default().into());

    // The preview is shown only once its data URI is ready; Slint decodes the image from disk
    let preview = PREVIEW_CACHE.with_borrow_mut(|cache| {
        cache.get_or_decode(state.preview().filter(|_| file.is_some()), || {
            let file = file?;
            match Image::load_from_path(file.path.as_std_path()) {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!("Failed to decode preview of {}: {:?}", file.name, e);
                    None
                }
            }
        })
    });
    ui.set_has_preview(preview.is_some());
    ui.set_preview(preview.unwrap_or_default());

    let Some(result) = state.result() else {
        ui.set_has_result(false);
        return;
    };

    let view = ResultView::from_result(result);
    ui.set_headline(view.headline.into());
    ui.set_bullish(result.prediction == Prediction::Up);
    ui.set_strength(i32::from(view.strength));
    ui.set_confidence(view.confidence.into());
    ui.set_green_width(i32::from(view.bar.green_width));
    ui.set_red_width(i32::from(view.bar.red_width));
    ui.set_show_green_label(view.bar.show_green_label());
    ui.set_show_red_label(view.bar.show_red_label());
    ui.set_current_price(view.current_price.into());
    ui.set_timeframe(view.timeframe.into());
    ui.set_stop_loss(view.stop_loss.into());
    ui.set_take_profit(view.take_profit.into());
    ui.set_risk_reward(view.risk_reward.into());
    ui.set_patterns(string_model(&view.patterns));
    ui.set_resistance(string_model(&view.resistance));
    ui.set_support(string_model(&view.support));
    ui.set_analysis(string_model(&view.analysis));
    ui.set_trading_setup(string_model(&view.trading_setup));
    ui.set_has_result(true);
}

/// Slint implementation of the supervisor's window seam
pub struct SlintWindowHost {
    session: ChartSession,
    diagnostics_header: String,
    tokio_handle: tokio::runtime::Handle,
}

impl SlintWindowHost {
    pub fn new(
        session: ChartSession,
        settings: &Settings,
        tokio_handle: tokio::runtime::Handle,
    ) -> Self {
        let diagnostics_header = format!(
            "service {} | timeout {}ms | backend {}/{} | logs {}",
            settings.api_url,
            settings.request_timeout_ms,
            settings.backend_dir,
            settings.backend_script,
            settings.log_dir
        );

        Self {
            session,
            diagnostics_header,
            tokio_handle,
        }
    }
}

impl WindowHost for SlintWindowHost {
    type Window = GuiController;

    fn create_window(&mut self) -> Result<GuiController> {
        GuiController::new(
            self.session.clone(),
            self.diagnostics_header.clone(),
            self.tokio_handle.clone(),
        )
    }

    fn run_window(&mut self, window: &GuiController) -> Result<()> {
        window.run()
    }
}
