/// Main `eframe::App` implementation for AuditKeeper.
///
/// This is the top-level UI layout that composes all panels and widgets.
use crate::panels;
use crate::panels::history_panel::HistoryAction;
use crate::state::AppState;
use crate::theme::AuditKeeperTheme;
use crate::widgets;
use auditkeeper_core::jobs::Job;
use auditkeeper_core::paths::AppPaths;
use auditkeeper_core::HistoryService;
use std::sync::Arc;

/// Pre-built application state.
///
/// Construct this **before** calling `eframe::run_native` so the stores are
/// opened and the first file check is already running when the window
/// appears.
pub struct AuditKeeperState {
    pub(crate) inner: AppState,
}

impl AuditKeeperState {
    /// Open the persisted history and start reconciling it against disk.
    pub fn build() -> anyhow::Result<Self> {
        let paths = AppPaths::resolve()?;
        tracing::info!("Data directory: {}", paths.data_dir.display());
        let service = HistoryService::open(&paths)?;
        Ok(Self::with_service(Arc::new(service)))
    }

    /// Wrap an already opened service.
    pub fn with_service(service: Arc<HistoryService>) -> Self {
        let mut state = AppState::new(service);
        state.start_job(Job::SyncAll);
        Self { inner: state }
    }

    /// Unwrap the state, for driving it without a window.
    pub fn into_state(self) -> AppState {
        self.inner
    }
}

/// The AuditKeeper application.
pub struct AuditKeeperApp {
    state: AppState,
}

impl AuditKeeperApp {
    /// Create a new application instance from pre-built state.
    pub fn with_state(cc: &eframe::CreationContext<'_>, state: AuditKeeperState) -> Self {
        AuditKeeperTheme::for_dark_mode(state.inner.dark_mode).apply(&cc.egui_ctx);
        Self { state: state.inner }
    }
}

impl eframe::App for AuditKeeperApp {
    /// Clear to the panel colour so no mismatched frame flashes between
    /// repaints.
    fn clear_color(&self, visuals: &egui::Visuals) -> [f32; 4] {
        let [r, g, b, a] = visuals.panel_fill.to_array();
        [
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        ]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Apply theme ───────────────────────────────────────────────────
        if ctx.style().visuals.dark_mode != self.state.dark_mode {
            AuditKeeperTheme::for_dark_mode(self.state.dark_mode).apply(ctx);
        }

        // ── Process background messages ───────────────────────────────────
        self.state.process_job_messages();
        if self.state.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        // ── Top toolbar ───────────────────────────────────────────────────
        egui::TopBottomPanel::top("toolbar")
            .min_height(36.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                widgets::toolbar::toolbar(ui, &mut self.state);
                ui.add_space(4.0);
            });

        // ── Dialogs ───────────────────────────────────────────────────────
        panels::cleanup_panel::cleanup_window(ctx, &mut self.state);
        self.delete_confirmation(ctx);
        self.about_window(ctx);

        // ── Bottom status bar ─────────────────────────────────────────────
        egui::TopBottomPanel::bottom("status_bar")
            .min_height(24.0)
            .show(ctx, |ui| {
                ui.add_space(2.0);
                widgets::status_bar::status_bar(ui, &self.state);
                ui.add_space(2.0);
            });

        // ── Temp folder panel (optional bottom panel) ─────────────────────
        if self.state.show_orphan_panel {
            egui::TopBottomPanel::bottom("orphan_panel")
                .resizable(true)
                .default_height(220.0)
                .min_height(120.0)
                .max_height(500.0)
                .show(ctx, |ui| {
                    ui.add_space(4.0);
                    panels::orphan_panel::orphan_panel(ui, &mut self.state);
                    ui.add_space(4.0);
                });
        }

        // ── Right details panel ───────────────────────────────────────────
        egui::SidePanel::right("details_panel")
            .default_width(280.0)
            .min_width(220.0)
            .max_width(420.0)
            .resizable(true)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    panels::details_panel::details_panel(ui, &mut self.state);
                });
            });

        // ── Central panel (history table) ─────────────────────────────────
        egui::CentralPanel::default().show(ctx, |ui| {
            match panels::history_panel::history_panel(ui, &self.state) {
                Some(HistoryAction::Select(id)) => self.state.selected_record = Some(id),
                Some(HistoryAction::Delete(id)) => self.state.request_delete(id),
                Some(HistoryAction::Open(path)) => self.state.open_path(&path),
                None => {}
            }
        });
    }
}

impl AuditKeeperApp {
    fn delete_confirmation(&mut self, ctx: &egui::Context) {
        let Some(id) = self.state.pending_delete.clone() else {
            return;
        };
        let name = self
            .state
            .history
            .find(&id)
            .map(|r| r.input_file.name.clone())
            .unwrap_or_else(|| id.clone());

        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new("Delete record?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([340.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "Delete the results of \"{name}\" and their files from disk?"
                ));
                ui.label(
                    egui::RichText::new("Files that are open elsewhere are kept and flagged.")
                        .size(11.0)
                        .color(ui.visuals().weak_text_color()),
                );
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    confirmed = ui.button("🗑 Delete").clicked();
                    cancelled = ui.button("Cancel").clicked();
                });
            });

        if confirmed {
            self.state.confirm_delete();
        } else if cancelled {
            self.state.cancel_delete();
        }
    }

    fn about_window(&mut self, ctx: &egui::Context) {
        let mut show_about = self.state.show_about;
        egui::Window::new("About AuditKeeper")
            .open(&mut show_about)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([340.0, 0.0])
            .show(ctx, |ui| {
                let accent = ui.visuals().hyperlink_color;
                let muted = ui.visuals().weak_text_color();
                let normal = ui.visuals().text_color();

                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("📋 AuditKeeper")
                            .size(24.0)
                            .strong()
                            .color(accent),
                    );
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                            .size(13.0)
                            .color(muted),
                    );
                    ui.add_space(12.0);
                    ui.label(
                        egui::RichText::new(
                            "Keeps the audit analysis history in step with the\n\
                             result workbooks on disk, and backs up and cleans\n\
                             out old results.",
                        )
                        .size(12.0)
                        .color(normal),
                    );
                    ui.add_space(12.0);
                    ui.separator();
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new(format!(
                            "Data: {}",
                            self.state.service.temp_dir().display()
                        ))
                        .size(11.0)
                        .color(muted),
                    );
                    ui.label(
                        egui::RichText::new("Built with Rust & egui")
                            .size(11.0)
                            .color(muted),
                    );
                    ui.add_space(8.0);
                });
            });
        self.state.show_about = show_about;
    }
}
