/// Per-file state badge -- present, deleted, removed externally, or a
/// pending delete error.
use crate::theme::AuditKeeperTheme;
use auditkeeper_core::model::record::REMOVED_EXTERNALLY;
use auditkeeper_core::model::size::format_optional_size;
use auditkeeper_core::model::TrackedFile;
use egui::{Color32, RichText, Ui};

/// Visible state of one tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Present,
    Deleted,
    RemovedExternally,
    DeleteFailed,
}

impl FileState {
    pub fn of(file: &TrackedFile) -> Self {
        if file.deleted {
            if file.note.as_deref() == Some(REMOVED_EXTERNALLY) {
                Self::RemovedExternally
            } else {
                Self::Deleted
            }
        } else if file.delete_error.is_some() {
            Self::DeleteFailed
        } else {
            Self::Present
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Present => "● Present",
            Self::Deleted => "✖ Deleted",
            Self::RemovedExternally => "⚠ Missing",
            Self::DeleteFailed => "⛔ Locked",
        }
    }

    fn color(self, theme: &AuditKeeperTheme) -> Color32 {
        match self {
            Self::Present => theme.success,
            Self::Deleted => theme.text_muted,
            Self::RemovedExternally => theme.warning,
            Self::DeleteFailed => theme.error,
        }
    }
}

/// Draw the badge for `file`, or a dash when the record has no such file.
pub fn file_badge(ui: &mut Ui, file: Option<&TrackedFile>) {
    let Some(file) = file else {
        ui.label(RichText::new("—").color(ui.visuals().weak_text_color()));
        return;
    };

    let theme = AuditKeeperTheme::of(ui);
    let state = FileState::of(file);
    let response = ui.label(
        RichText::new(state.label())
            .size(11.0)
            .color(state.color(&theme)),
    );

    let mut tip = format!(
        "{}\n{}",
        file.path.display(),
        format_optional_size(file.size)
    );
    if let Some(err) = &file.delete_error {
        tip.push_str(&format!("\nDelete failed: {err}"));
    }
    if let Some(note) = &file.note {
        tip.push_str(&format!("\n{note}"));
    }
    response.on_hover_text(tip);
}
