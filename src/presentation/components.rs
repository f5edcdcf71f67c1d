use crate::domain::models::{MessageSeverity, ServiceState};
use eframe::egui;

pub struct Components;

impl Components {
    pub fn status_banner(ui: &mut egui::Ui, text: &str, state: &ServiceState) {
        let (bg_color, text_color) = match state {
            ServiceState::Advertising => (egui::Color32::from_rgb(0, 200, 0), egui::Color32::BLACK),
            ServiceState::Starting => (egui::Color32::from_rgb(255, 200, 0), egui::Color32::BLACK),
            ServiceState::Stopped => (egui::Color32::from_gray(100), egui::Color32::WHITE),
            ServiceState::Unavailable(_) => {
                (egui::Color32::from_rgb(255, 50, 50), egui::Color32::WHITE)
            }
        };

        ui.add_sized(
            [ui.available_width(), 35.0],
            egui::Label::new(
                egui::RichText::new(text)
                    .color(text_color)
                    .background_color(bg_color)
                    .size(16.0)
                    .strong(),
            )
            .wrap_mode(egui::TextWrapMode::Extend),
        );
    }

    pub fn counter(ui: &mut egui::Ui, label: &str, value: u64) {
        ui.label(label);
        ui.label(egui::RichText::new(value.to_string()).monospace().strong());
        ui.end_row();
    }

    pub fn severity_color(severity: MessageSeverity) -> egui::Color32 {
        match severity {
            MessageSeverity::Info => egui::Color32::GRAY,
            MessageSeverity::Success => egui::Color32::from_rgb(0, 160, 0),
            MessageSeverity::Warning => egui::Color32::from_rgb(220, 150, 0),
            MessageSeverity::Error => egui::Color32::from_rgb(220, 40, 40),
        }
    }
}
