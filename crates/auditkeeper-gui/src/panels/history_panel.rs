/// History table with one row per analysis record, newest first, with the
/// state of each tracked file and per-row actions.
use crate::state::AppState;
use crate::theme::AuditKeeperTheme;
use crate::widgets::file_badge::file_badge;
use auditkeeper_core::model::{AnalysisRecord, RecordStatus};
use egui::Ui;
use egui_extras::{Column, TableBuilder};
use std::path::PathBuf;

/// What the user asked for in the table this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    Select(String),
    Delete(String),
    Open(PathBuf),
}

const ROW_HEIGHT: f32 = 24.0;

/// Draw the history table. Returns the action taken, if any.
pub fn history_panel(ui: &mut Ui, state: &AppState) -> Option<HistoryAction> {
    if state.history.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new("No analysis results recorded yet")
                    .color(ui.visuals().weak_text_color())
                    .italics(),
            );
        });
        return None;
    }

    let theme = AuditKeeperTheme::of(ui);
    let busy = state.is_busy();
    let records = &state.history.records;
    let mut action = None;

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .sense(egui::Sense::click())
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::auto().at_least(120.0))
        .column(Column::auto().at_least(90.0))
        .column(Column::remainder().at_least(160.0).clip(true))
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::auto())
        .header(22.0, |mut header| {
            for title in ["Time", "Algorithm", "Input", "Result", "Offsite pool", "Status", ""] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, records.len(), |mut row| {
                let record = &records[row.index()];
                let selected = state.selected_record.as_deref() == Some(record.id.as_str());
                row.set_selected(selected);

                row.col(|ui| {
                    ui.label(local_time(record));
                });
                row.col(|ui| {
                    ui.label(record.algorithm.label());
                });
                row.col(|ui| {
                    ui.label(record.input_file.name.as_str())
                        .on_hover_text(record.input_file.path.display().to_string());
                });
                row.col(|ui| {
                    file_badge(ui, Some(&record.output_file));
                });
                row.col(|ui| {
                    file_badge(ui, record.offsite_pool_file.as_ref());
                });
                row.col(|ui| {
                    let color = match record.status {
                        RecordStatus::Success => theme.success,
                        RecordStatus::Failed => theme.error,
                        RecordStatus::Processing => theme.text_muted,
                    };
                    ui.label(egui::RichText::new(record.status.label()).color(color));
                });
                row.col(|ui| {
                    let can_open = !record.output_file.deleted;
                    if ui
                        .add_enabled(can_open, egui::Button::new("📂").small())
                        .on_hover_text("Open the result workbook")
                        .clicked()
                    {
                        action = Some(HistoryAction::Open(record.output_file.path.clone()));
                    }
                    let delete_tip = if record.has_delete_errors() {
                        "Retry deleting the files that are still on disk"
                    } else {
                        "Delete this record and its files"
                    };
                    if ui
                        .add_enabled(!busy, egui::Button::new("🗑").small())
                        .on_hover_text(delete_tip)
                        .clicked()
                    {
                        action = Some(HistoryAction::Delete(record.id.clone()));
                    }
                });

                if row.response().clicked() && action.is_none() {
                    action = Some(HistoryAction::Select(record.id.clone()));
                }
            });
        });

    action
}

fn local_time(record: &AnalysisRecord) -> String {
    record
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
