/// Cleanup dialog.
///
/// Selects every record older than a number of days, previews what that
/// covers, and offers three ways out: export a backup and delete only if
/// the backup is complete, export only, or delete without a backup.
use crate::state::{AppState, MAX_CLEANUP_DAYS};
use crate::theme::AuditKeeperTheme;
use auditkeeper_core::model::size::format_size;

/// Draw the cleanup window when it is open.
pub fn cleanup_window(ctx: &egui::Context, state: &mut AppState) {
    if !state.cleanup.open {
        return;
    }

    let mut open = true;
    egui::Window::new("Clean up old results")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([420.0, 0.0])
        .show(ctx, |ui| {
            let theme = AuditKeeperTheme::of(ui);
            let muted = ui.visuals().weak_text_color();

            ui.horizontal(|ui| {
                ui.label("Records older than");
                let days = ui.add(
                    egui::DragValue::new(&mut state.cleanup.cutoff_days)
                        .range(1..=MAX_CLEANUP_DAYS)
                        .suffix(" days"),
                );
                if days.changed() {
                    state.update_cleanup_preview();
                }
            });
            ui.label(
                egui::RichText::new(format!(
                    "Cutoff: {}",
                    state
                        .cleanup_cutoff()
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M")
                ))
                .size(11.0)
                .color(muted),
            );

            ui.add_space(8.0);
            let (records, files, bytes, queries) = state
                .cleanup
                .preview
                .as_ref()
                .map(|p| {
                    (
                        p.analysis.len(),
                        p.tracked_file_count(),
                        p.tracked_bytes(),
                        p.queries.len(),
                    )
                })
                .unwrap_or_default();
            ui.label(
                egui::RichText::new(format!(
                    "{records} record(s) with {files} file(s) on disk ({}), {queries} saved queries",
                    format_size(bytes)
                ))
                .strong(),
            );

            ui.add_space(8.0);
            ui.separator();

            ui.label("Back up to");
            ui.horizontal(|ui| {
                let shown = state
                    .cleanup
                    .destination
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "No folder chosen".to_owned());
                ui.label(egui::RichText::new(shown).monospace().size(11.0));
                if ui.button("📁 Choose…").clicked() {
                    let mut dialog = rfd::FileDialog::new().set_title("Choose a backup folder");
                    if let Some(dir) = &state.cleanup.destination {
                        dialog = dialog.set_directory(dir);
                    }
                    if let Some(dir) = dialog.pick_folder() {
                        state.set_export_destination(dir);
                    }
                }
            });

            ui.add_space(10.0);
            let idle = !state.is_busy();
            let has_records = records > 0;
            let has_destination = state.cleanup.destination.is_some();

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(
                        idle && has_records && has_destination,
                        egui::Button::new("💾 Export then delete"),
                    )
                    .on_hover_text("Nothing is deleted unless every file is backed up")
                    .clicked()
                    && state.start_export_then_cleanup()
                {
                    state.cleanup.open = false;
                }

                if ui
                    .add_enabled(
                        idle && has_records && has_destination,
                        egui::Button::new("Export only"),
                    )
                    .clicked()
                {
                    state.start_export_only();
                }

                let delete = egui::Button::new(
                    egui::RichText::new("🗑 Delete only").color(theme.error),
                );
                if ui
                    .add_enabled(idle && has_records, delete)
                    .on_hover_text("Delete without a backup")
                    .clicked()
                    && state.start_delete_before()
                {
                    state.cleanup.open = false;
                }
            });
        });

    if !open {
        state.cleanup.open = false;
    }
}
