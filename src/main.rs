mod domain;
mod infrastructure;
mod presentation;

use crate::domain::models::PRODUCT_NAME;
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::{BluetoothWorker, PlatformHost};
use crate::infrastructure::input_simulator::InputSimulator;
use crate::infrastructure::instance::{acquire_instance_lock, InstanceLock, INSTANCE_SOCKET};
use crate::presentation::app::JellingApp;
use anyhow::Result;
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

fn main() -> Result<()> {
    let headless = std::env::args().skip(1).any(|arg| arg == "--headless");

    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = crate::infrastructure::logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting {}", PRODUCT_NAME);
    for warning in settings_service.load_warnings() {
        warn!("{}", warning);
    }

    if acquire_instance_lock(INSTANCE_SOCKET)? == InstanceLock::AlreadyRunning {
        info!("{} is already running, exiting", PRODUCT_NAME);
        return Ok(());
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let worker = BluetoothWorker::spawn(
        PlatformHost::new(),
        InputSimulator::new(),
        events_tx,
        Duration::from_millis(settings.shutdown_timeout_ms),
    )?;

    if headless {
        return presentation::headless::run(worker, events_rx);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([320.0, 200.0])
            .with_title(PRODUCT_NAME),
        ..Default::default()
    };

    eframe::run_native(
        PRODUCT_NAME,
        options,
        Box::new(move |_cc| {
            Ok(Box::new(JellingApp::new(worker, events_rx, settings.start_minimized)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Status window failed: {}", e))?;

    info!("{} stopped", PRODUCT_NAME);
    Ok(())
}
