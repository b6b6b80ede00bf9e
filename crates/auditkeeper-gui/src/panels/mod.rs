/// Panels and dialogs composed by the main window.

pub mod cleanup_panel;
pub mod details_panel;
pub mod history_panel;
pub mod orphan_panel;
