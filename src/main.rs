//! AuditKeeper — desktop tracker for audit analysis results.
//!
//! Thin binary entry point. All logic lives in the `auditkeeper-core`
//! and `auditkeeper-gui` crates.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialise structured logging; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("AuditKeeper v{} starting", env!("CARGO_PKG_VERSION"));

    let icon = auditkeeper_gui::icon::generate_icon(64);

    // Open the stores and start the first file check before the window
    // exists, so the first frame already has the history to show.
    let state = auditkeeper_gui::AuditKeeperState::build()?;

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("AuditKeeper")
            .with_inner_size([1200.0, 760.0])
            .with_min_inner_size([800.0, 500.0])
            .with_icon(icon),
        ..Default::default()
    };

    eframe::run_native(
        "AuditKeeper",
        options,
        Box::new(|cc| {
            Ok(Box::new(auditkeeper_gui::AuditKeeperApp::with_state(
                cc, state,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))?;

    Ok(())
}
