/// Bottom status bar: running job or last outcome, plus history totals.
use crate::state::AppState;
use crate::theme::AuditKeeperTheme;
use auditkeeper_core::model::size::format_size;
use egui::Ui;

/// Draw the status bar at the bottom of the window.
pub fn status_bar(ui: &mut Ui, state: &AppState) {
    let theme = AuditKeeperTheme::of(ui);
    let color_weak = ui.visuals().weak_text_color();
    let color_normal = ui.visuals().text_color();

    ui.horizontal(|ui| {
        if let Some(job) = &state.job {
            ui.spinner();
            ui.label(
                egui::RichText::new(format!("{}...", job.label))
                    .size(12.0)
                    .color(color_normal),
            );
        } else if let Some(status) = &state.status {
            let response = ui.label(
                egui::RichText::new(truncate(&status.text, 110))
                    .size(12.0)
                    .color(theme.status_color(status.level)),
            );
            if status.text.chars().count() > 110 {
                response.on_hover_text(status.text.as_str());
            }
            if let Some(duration) = state.last_job_duration {
                ui.label(
                    egui::RichText::new(format!("{:.1}s", duration.as_secs_f64()))
                        .size(11.0)
                        .color(color_weak),
                );
            }
        } else {
            ui.label(egui::RichText::new("Ready").size(12.0).color(color_weak));
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let stats = &state.statistics;
            let count_color = if state.over_limit() {
                theme.warning
            } else {
                color_normal
            };
            ui.label(
                egui::RichText::new(format!("{} / {} records", stats.total, state.max_records))
                    .size(12.0)
                    .color(count_color),
            );
            ui.separator();
            ui.label(
                egui::RichText::new(format_size(stats.tracked_bytes))
                    .size(12.0)
                    .color(theme.accent),
            );
            if stats.with_delete_errors > 0 {
                ui.separator();
                ui.label(
                    egui::RichText::new(format!("{} with delete errors", stats.with_delete_errors))
                        .size(12.0)
                        .color(theme.error),
                );
            }
        });
    });
}

/// Shorten `text` to `max` characters, ending with "...".
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        let long = "历史记录备份".repeat(5);
        let cut = truncate(&long, 8);
        assert_eq!(cut.chars().count(), 8);
        assert!(cut.ends_with("..."));
    }
}
