/// Details panel: shows the selected record's files, counters, and
/// financial summary.
use crate::state::AppState;
use crate::theme::AuditKeeperTheme;
use crate::widgets::file_badge::file_badge;
use auditkeeper_core::model::size::{format_duration_ms, format_optional_size, format_size};
use auditkeeper_core::model::{FileRole, TrackedFile};
use egui::Ui;

/// Draw the details panel for the selected record.
pub fn details_panel(ui: &mut Ui, state: &mut AppState) {
    let color_muted = ui.visuals().weak_text_color();
    let color_normal = ui.visuals().text_color();
    let theme = AuditKeeperTheme::of(ui);

    let Some(record) = state.selected_record().cloned() else {
        ui.label(
            egui::RichText::new("Select a record to see details")
                .color(color_muted)
                .italics(),
        );
        return;
    };

    ui.label(
        egui::RichText::new(record.input_file.name.as_str())
            .size(14.0)
            .strong()
            .color(color_normal),
    );
    ui.label(
        egui::RichText::new(
            record
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        )
        .size(11.0)
        .color(color_muted),
    );
    ui.add_space(6.0);

    egui::Grid::new("record_details")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            detail_row(ui, "Algorithm", record.algorithm.label());
            detail_row(ui, "Status", record.status.label());
            detail_row(ui, "Input size", &format_size(record.input_file.size));
            detail_row(
                ui,
                "Rows processed",
                &record.statistics.total_records.to_string(),
            );
            detail_row(
                ui,
                "Processing time",
                &format_duration_ms(record.statistics.processing_time_ms),
            );
            detail_row(
                ui,
                "Validation",
                &format!(
                    "{} error(s), {} fixed",
                    record.statistics.validation_errors, record.statistics.validation_fixes
                ),
            );
        });

    if let Some(summary) = &record.summary {
        ui.add_space(8.0);
        ui.separator();
        ui.label(egui::RichText::new("Summary").strong());
        egui::Grid::new("record_summary")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                detail_row(ui, "Inflow", &format!("{:.2}", summary.total_inflow));
                detail_row(ui, "Outflow", &format!("{:.2}", summary.total_outflow));
                detail_row(ui, "Final balance", &format!("{:.2}", summary.final_balance));
                if let Some(amount) = summary.misappropriation_amount {
                    detail_row(ui, "Misappropriation", &format!("{amount:.2}"));
                }
                if let Some(amount) = summary.advance_amount {
                    detail_row(ui, "Advance", &format!("{amount:.2}"));
                }
            });
    }

    ui.add_space(8.0);
    ui.separator();
    for (role, file) in record.tracked_files() {
        tracked_file_section(ui, state, role, file, &theme);
        ui.add_space(6.0);
    }

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        let idle = !state.is_busy();
        if ui
            .add_enabled(idle, egui::Button::new("🔄 Re-check"))
            .on_hover_text("Check this record's files on disk")
            .clicked()
        {
            state.refresh_selected();
        }
        if ui
            .add_enabled(idle, egui::Button::new("🗑 Delete"))
            .clicked()
        {
            state.request_delete(record.id.clone());
        }
    });
}

fn detail_row(ui: &mut Ui, label: &str, value: &str) {
    ui.label(
        egui::RichText::new(label)
            .size(11.0)
            .color(ui.visuals().weak_text_color()),
    );
    ui.label(egui::RichText::new(value).size(12.0));
    ui.end_row();
}

fn tracked_file_section(
    ui: &mut Ui,
    state: &mut AppState,
    role: FileRole,
    file: &TrackedFile,
    theme: &AuditKeeperTheme,
) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(role.label()).strong());
        file_badge(ui, Some(file));
    });
    ui.label(
        egui::RichText::new(file.path.display().to_string())
            .size(11.0)
            .monospace(),
    );
    ui.label(
        egui::RichText::new(format_optional_size(file.size))
            .size(11.0)
            .color(ui.visuals().weak_text_color()),
    );
    if let Some(err) = &file.delete_error {
        ui.label(
            egui::RichText::new(format!("Delete failed: {err}"))
                .size(11.0)
                .color(theme.error),
        );
    }
    if !file.deleted && ui.small_button("Open").clicked() {
        state.open_path(&file.path);
    }
}
