/// Top action bar -- sync, cleanup, temp-folder panel, theme toggle, and
/// branding.
use crate::state::AppState;
use auditkeeper_core::jobs::Job;
use egui::Ui;

/// Draw the toolbar.
pub fn toolbar(ui: &mut Ui, state: &mut AppState) {
    let idle = !state.is_busy();

    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new("📋 AuditKeeper")
                .size(18.0)
                .strong()
                .color(ui.visuals().hyperlink_color),
        );

        ui.separator();

        if ui
            .add_enabled(
                idle,
                egui::Button::new("🔄 Check files").min_size(egui::vec2(90.0, 28.0)),
            )
            .on_hover_text("Compare every record against the files on disk")
            .clicked()
        {
            state.start_job(Job::SyncAll);
        }

        let has_history = !state.history.is_empty();
        if ui
            .add_enabled(idle && has_history, egui::Button::new("🧹 Clean up…"))
            .on_hover_text(if has_history {
                "Export and delete old results"
            } else {
                "No history to clean up"
            })
            .clicked()
        {
            state.open_cleanup_dialog();
        }

        // Only offered once the history has grown past the configured bound.
        if state.over_limit()
            && ui
                .add_enabled(idle, egui::Button::new("✂ Trim history"))
                .on_hover_text(format!(
                    "Keep the newest {} records and delete the rest",
                    state.max_records
                ))
                .clicked()
        {
            state.start_job(Job::EnforceLimit);
        }

        ui.separator();

        let temp_label = if state.show_orphan_panel {
            egui::RichText::new("🗂 Temp files").color(ui.visuals().hyperlink_color)
        } else {
            egui::RichText::new("🗂 Temp files")
        };
        if ui
            .button(temp_label)
            .on_hover_text(if state.show_orphan_panel {
                "Hide the temp folder panel"
            } else {
                "Show files in the temp results folder"
            })
            .clicked()
        {
            state.toggle_orphan_panel();
        }

        // Right-aligned controls.
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("ℹ").on_hover_text("About AuditKeeper").clicked() {
                state.show_about = true;
            }

            let theme_label = if state.dark_mode { "☀" } else { "🌙" };
            let theme_tip = if state.dark_mode {
                "Switch to light mode"
            } else {
                "Switch to dark mode"
            };
            if ui.button(theme_label).on_hover_text(theme_tip).clicked() {
                state.toggle_dark_mode();
            }

            ui.separator();

            let mut confirm = state.confirm_before_delete;
            if ui
                .checkbox(&mut confirm, "Confirm deletes")
                .on_hover_text("Ask before deleting a record and its files")
                .changed()
            {
                state.set_confirm_before_delete(confirm);
            }
        });
    });
}
