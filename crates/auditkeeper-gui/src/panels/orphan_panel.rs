/// Temp-folder panel.
///
/// Lists every file in the temp-results directory, which record (if any)
/// still references it, and whether it is safe to remove. Rendered as a
/// bottom panel when `state.show_orphan_panel` is `true`.
use crate::state::AppState;
use crate::theme::AuditKeeperTheme;
use auditkeeper_core::jobs::Job;
use auditkeeper_core::model::size::format_size;
use egui::Ui;

/// Draw the temp-folder panel.
pub fn orphan_panel(ui: &mut Ui, state: &mut AppState) {
    let theme = AuditKeeperTheme::of(ui);
    let idle = !state.is_busy();

    let total_bytes: u64 = state.orphans.iter().map(|f| f.size).sum();
    let safe_bytes: u64 = state
        .orphans
        .iter()
        .filter(|f| f.can_safe_delete)
        .map(|f| f.size)
        .sum();
    let safe_count = state.orphans.iter().filter(|f| f.can_safe_delete).count();

    ui.vertical(|ui| {
        // ── Header row ────────────────────────────────────────────────────
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("🗂 Temp results")
                    .strong()
                    .color(ui.visuals().hyperlink_color),
            );
            ui.separator();
            ui.label(
                egui::RichText::new(state.service.temp_dir().display().to_string())
                    .size(11.0)
                    .color(ui.visuals().weak_text_color()),
            );
            ui.separator();
            ui.label(
                egui::RichText::new(format!(
                    "{} file(s), {} · {} safe to delete ({})",
                    state.orphans.len(),
                    format_size(total_bytes),
                    safe_count,
                    format_size(safe_bytes)
                ))
                .size(11.0),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(idle, egui::Button::new("⟲ Sync history"))
                    .on_hover_text(
                        "Drop records whose files are all gone, then remove orphan files",
                    )
                    .clicked()
                {
                    state.start_job(Job::SyncHistoryWithFiles);
                }

                let remove = egui::Button::new(
                    egui::RichText::new("🗑 Remove safe files").color(theme.error),
                );
                if ui
                    .add_enabled(idle && safe_count > 0, remove)
                    .on_hover_text("Delete files no live record references")
                    .clicked()
                {
                    state.start_job(Job::CleanupOrphans);
                }

                if ui
                    .add_enabled(idle, egui::Button::new("🔄 Rescan"))
                    .clicked()
                {
                    state.start_job(Job::ScanOrphans);
                }
            });
        });

        ui.separator();

        if state.orphans.is_empty() {
            ui.label(
                egui::RichText::new("The temp folder is empty")
                    .color(ui.visuals().weak_text_color())
                    .italics(),
            );
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("orphan_files")
                    .num_columns(4)
                    .striped(true)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        ui.strong("File");
                        ui.strong("Size");
                        ui.strong("Modified");
                        ui.strong("State");
                        ui.end_row();

                        for file in &state.orphans {
                            ui.label(file.name.as_str())
                                .on_hover_text(file.path.display().to_string());
                            ui.label(format_size(file.size));
                            let modified = file
                                .modified
                                .map(|t| {
                                    chrono::DateTime::<chrono::Local>::from(t)
                                        .format("%Y-%m-%d %H:%M")
                                        .to_string()
                                })
                                .unwrap_or_else(|| "-".to_owned());
                            ui.label(modified);

                            let (text, color) = if file.can_safe_delete && file.is_tracked {
                                ("Record deleted", theme.text_muted)
                            } else if file.can_safe_delete {
                                ("Orphan", theme.warning)
                            } else {
                                ("In use", theme.success)
                            };
                            let label = ui.label(egui::RichText::new(text).color(color));
                            if !file.referenced_by.is_empty() {
                                label.on_hover_text(format!(
                                    "Referenced by {}",
                                    file.referenced_by.join(", ")
                                ));
                            }
                            ui.end_row();
                        }
                    });
            });
    });
}
