//! Windowless shell: status changes go to the log and Ctrl-C is the exit
//! trigger.

use crate::domain::models::AppEvent;
use crate::infrastructure::bluetooth::BluetoothWorker;
use crate::presentation::status::StatusBoard;
use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub fn run(
    mut worker: BluetoothWorker,
    mut events_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime for headless mode")?;

    let mut board = StatusBoard::new();
    info!("Running headless, press Ctrl-C to exit");

    rt.block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    result.context("Failed to listen for Ctrl-C")?;
                    info!("Exit requested");
                    break;
                }
                event = events_rx.recv() => match event {
                    Some(event) => report(&mut board, event),
                    None => {
                        warn!("Bluetooth worker exited unexpectedly");
                        break;
                    }
                },
            }
        }
        Ok::<_, anyhow::Error>(())
    })?;

    if !worker.shutdown() {
        warn!("Exiting without confirmation that advertising stopped");
    }
    while let Ok(event) = events_rx.try_recv() {
        report(&mut board, event);
    }

    info!(
        "Handled {} accepted, {} rejected and {} unreadable writes",
        board.accepted(),
        board.rejected(),
        board.unavailable()
    );
    Ok(())
}

fn report(board: &mut StatusBoard, event: AppEvent) {
    if board.apply(event) {
        info!("Status: {}", board.status_line());
    }
}
