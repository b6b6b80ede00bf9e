/// UI widgets for AuditKeeper.

pub mod file_badge;
pub mod status_bar;
pub mod toolbar;
