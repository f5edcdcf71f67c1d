use crate::domain::models::AppEvent;
use crate::infrastructure::bluetooth::BluetoothWorker;
use crate::presentation::components::Components;
use crate::presentation::status::StatusBoard;
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Status window. Closing it is the exit trigger.
pub struct JellingApp {
    worker: BluetoothWorker,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    board: StatusBoard,
    minimize_pending: bool,
    shutting_down: bool,
}

impl JellingApp {
    pub fn new(
        worker: BluetoothWorker,
        events_rx: mpsc::UnboundedReceiver<AppEvent>,
        start_minimized: bool,
    ) -> Self {
        Self {
            worker,
            events_rx,
            board: StatusBoard::new(),
            minimize_pending: start_minimized,
            shutting_down: false,
        }
    }

    /// Viewport command to send on the first frame, at most once
    fn startup_command(&mut self) -> Option<egui::ViewportCommand> {
        std::mem::take(&mut self.minimize_pending)
            .then_some(egui::ViewportCommand::Minimized(true))
    }

    /// Blocks until the worker has stopped advertising or the timeout hit.
    fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        info!("Exit requested");
        if !self.worker.shutdown() {
            warn!("Exiting without confirmation that advertising stopped");
        }
    }
}

impl eframe::App for JellingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(command) = self.startup_command() {
            ctx.send_viewport_cmd(command);
        }

        while let Ok(event) = self.events_rx.try_recv() {
            if self.board.apply(event) {
                info!("Status: {}", self.board.status_line());
            }
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.shutdown();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(10.0);
                Components::status_banner(ui, &self.board.status_line(), self.board.state());
                ui.add_space(10.0);

                egui::Grid::new("write_counters")
                    .num_columns(2)
                    .spacing([20.0, 4.0])
                    .show(ui, |ui| {
                        Components::counter(ui, "Accepted", self.board.accepted());
                        Components::counter(ui, "Rejected", self.board.rejected());
                        Components::counter(ui, "Unreadable", self.board.unavailable());
                    });

                if let Some(message) = self.board.last_message() {
                    ui.add_space(8.0);
                    ui.colored_label(
                        Components::severity_color(message.severity),
                        &message.message,
                    );
                }

                ui.add_space(10.0);
                if ui.button("Exit").clicked() {
                    self.shutdown();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });

        // Events arrive from another thread; poll for them.
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{CallLog, MockHost, RecordingInjector};

    fn app(start_minimized: bool) -> JellingApp {
        let log = CallLog::default();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let worker = BluetoothWorker::spawn(
            MockHost::new(&log),
            RecordingInjector::new(log),
            events_tx,
            Duration::from_secs(5),
        )
        .unwrap();
        JellingApp::new(worker, events_rx, start_minimized)
    }

    #[test]
    fn test_start_minimized_sends_minimize_once() {
        let mut app = app(true);

        assert!(matches!(
            app.startup_command(),
            Some(egui::ViewportCommand::Minimized(true))
        ));
        assert!(app.startup_command().is_none());
    }

    #[test]
    fn test_normal_start_sends_nothing() {
        let mut app = app(false);
        assert!(app.startup_command().is_none());
    }
}
