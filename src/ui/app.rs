//! eframe application: panel layout and frame loop
//!
//! Each frame runs the controller's due timers, lays out the four sections
//! (Configuration, Controls, System Resources, Terminal Log) and schedules the
//! next repaint for the earliest timer deadline.

use super::controller::AppController;
use super::widgets;
use crate::hardware::{GPU_INSTALL_HINT, NOT_AVAILABLE};
use eframe::egui;
use std::time::{Duration, Instant};

/// Window title
pub const APP_TITLE: &str = "OpenWebUI Controller";

/// Fallback repaint interval when no timer is pending
const IDLE_REPAINT_INTERVAL: Duration = Duration::from_millis(500);

/// Transient UI state that is not part of the controller
#[derive(Default)]
pub struct UIState {
    /// Editable copy of the command field
    pub command_buffer: String,
}

/// Main Application UI Structure
pub struct AppUI {
    pub controller: AppController,
    pub ui_state: UIState,
}

impl AppUI {
    pub fn new(controller: AppController) -> Self {
        let ui_state = UIState {
            command_buffer: controller.command_text().to_string(),
        };
        AppUI { controller, ui_state }
    }

    fn render_configuration(&mut self, ui: &mut egui::Ui) {
        ui.heading("Configuration");
        ui.horizontal(|ui| {
            ui.label("OpenWebUI command:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.ui_state.command_buffer)
                    .desired_width(360.0),
            );
            if response.changed() {
                self.controller
                    .set_command(self.ui_state.command_buffer.clone());
            }
            if ui.button("Browse").clicked() {
                self.browse();
            }
        });

        let status = self.controller.command_status().clone();
        ui.label(widgets::command_status_text(&status));

        if matches!(status, crate::system::command::CommandStatus::NotFound) {
            ui.horizontal(|ui| {
                let install_label = if self.controller.is_installing() {
                    "Installing..."
                } else {
                    "Install"
                };
                if ui
                    .add_enabled(self.controller.can_install(), egui::Button::new(install_label))
                    .clicked()
                {
                    self.controller.install();
                }
                let docs_url = self.controller.settings().docs_url.clone();
                ui.hyperlink_to("Documentation", docs_url);
            });
            ui.label(format!(
                "You can install OpenWebUI with: {}",
                self.controller.settings().install_command
            ));
        }
    }

    fn browse(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Select OpenWebUI executable")
            .pick_file();
        if let Some(path) = picked {
            log::info!("[UI] Selected executable {}", path.display());
            self.controller.set_command_from_path(&path);
            self.ui_state.command_buffer = self.controller.command_text().to_string();
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Controls");
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.controller.can_start(), egui::Button::new("Start OpenWebUI"))
                .clicked()
            {
                self.controller.start_service();
            }
            if ui
                .add_enabled(self.controller.can_stop(), egui::Button::new("Stop OpenWebUI"))
                .clicked()
            {
                self.controller.stop_service();
            }

            let status = self.controller.status();
            ui.label(egui::RichText::new(status.label()).color(widgets::status_color(status)));
        });
        ui.horizontal(|ui| {
            let settings = self.controller.settings();
            ui.hyperlink_to("Open WebUI", settings.service_url.clone());
            ui.label("|");
            ui.hyperlink_to("Documentation", settings.docs_url.clone());
        });
    }

    fn render_resources(&self, ui: &mut egui::Ui) {
        ui.heading("System Resources");
        let snapshot = self.controller.snapshot();

        widgets::resource_row(ui, "CPU Usage:", Some(snapshot.cpu_fraction()), &snapshot.cpu_label());
        widgets::resource_row(
            ui,
            "Memory Usage:",
            Some(snapshot.memory_fraction()),
            &snapshot.memory.label(),
        );
        widgets::text_row(ui, "OpenWebUI Memory:", &snapshot.process_memory_label());

        let gpu = &snapshot.gpu;
        widgets::resource_row(
            ui,
            "GPU Usage:",
            gpu.utilization_fraction(),
            &gpu.utilization_label(),
        );
        widgets::resource_row(ui, "GPU Memory:", gpu.memory_fraction(), &gpu.memory_label());
        if !gpu.available && gpu.reason.as_deref() == Some(NOT_AVAILABLE) {
            ui.label(egui::RichText::new(GPU_INSTALL_HINT).weak());
        }
    }

    fn render_log(&self, ui: &mut egui::Ui) {
        ui.heading("Terminal Log");
        egui::Frame::group(ui.style()).show(ui, |ui| {
            widgets::terminal_viewport(ui, self.controller.log_lines());
        });
    }
}

impl eframe::App for AppUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let next_wakeup = self.controller.tick(now);

        egui::TopBottomPanel::top("configuration").show(ctx, |ui| {
            self.render_configuration(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            self.render_controls(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::top("resources").show(ctx, |ui| {
            self.render_resources(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_log(ui);
        });

        ctx.request_repaint_after(next_wakeup.unwrap_or(IDLE_REPAINT_INTERVAL));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("[UI] Window closing");
        self.controller.shutdown();
    }
}
