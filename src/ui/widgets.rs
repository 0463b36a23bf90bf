/// Custom egui Widgets
///
/// Small building blocks shared by the panel sections:
/// - resource_row: label + progress bar + value text
/// - text_row: label + value text, for metrics without a gauge
/// - terminal_viewport: monospace log viewer that follows new output
/// - status colors for the service and command status labels

use crate::models::ServiceStatus;
use crate::system::command::CommandStatus;
use eframe::egui;
use egui::{Color32, RichText};
use std::collections::VecDeque;

const LABEL_WIDTH: f32 = 110.0;
const BAR_WIDTH: f32 = 200.0;

/// Draws one resource row: name, gauge and value text.
///
/// `fraction` is `None` when the value is unknown; the gauge is then left out
/// rather than shown with a made-up value.
pub fn resource_row(ui: &mut egui::Ui, name: &str, fraction: Option<f32>, value: &str) {
    ui.horizontal(|ui| {
        ui.add_sized([LABEL_WIDTH, 18.0], egui::Label::new(name));
        match fraction {
            Some(f) => {
                ui.add(egui::ProgressBar::new(f.clamp(0.0, 1.0)).desired_width(BAR_WIDTH));
            }
            None => {
                ui.add_space(BAR_WIDTH + ui.spacing().item_spacing.x);
            }
        }
        ui.label(value);
    });
}

/// Draws a row with a name and plain value text
pub fn text_row(ui: &mut egui::Ui, name: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.add_sized([LABEL_WIDTH, 18.0], egui::Label::new(name));
        ui.label(value);
    });
}

/// Monospace log viewer that sticks to the newest line
pub fn terminal_viewport(ui: &mut egui::Ui, lines: &VecDeque<String>) {
    egui::ScrollArea::vertical()
        .auto_shrink([false; 2])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if lines.is_empty() {
                ui.monospace("Awaiting output...");
                return;
            }
            for line in lines {
                ui.monospace(line);
            }
        });
}

pub fn status_color(status: ServiceStatus) -> Color32 {
    match status {
        ServiceStatus::Running => Color32::from_rgb(80, 200, 120),
        ServiceStatus::Stopping => Color32::from_rgb(230, 180, 60),
        ServiceStatus::Error => Color32::from_rgb(230, 80, 80),
        ServiceStatus::NotRunning => Color32::GRAY,
    }
}

pub fn command_status_text(status: &CommandStatus) -> RichText {
    let color = match status {
        CommandStatus::Found(_) => Color32::from_rgb(80, 200, 120),
        CommandStatus::NotFound => Color32::from_rgb(230, 80, 80),
        CommandStatus::Unknown => Color32::GRAY,
    };
    RichText::new(status.label()).color(color)
}
