use eframe::egui;

use webui_controller::hardware::{select_provider, GpuMonitor, ResourceSampler};
use webui_controller::ui::{AppController, AppUI, APP_TITLE};
use webui_controller::{LogCollector, SettingsManager};

fn main() -> webui_controller::Result<()> {
    // =========================================================================
    // LOGGING INITIALIZATION
    // =========================================================================
    // Installed before the settings are read; starts on stderr and picks up
    // the configured level and file below
    let log_collector = LogCollector::new(log::LevelFilter::Info, None)?;
    if let Err(e) = log_collector.clone().init_global_logger() {
        eprintln!("[Main] WARNING: Failed to set LogCollector as global logger: {}", e);
    }
    log::info!("[Main] WebUI Controller {} starting", webui_controller::VERSION);

    // =========================================================================
    // SETTINGS
    // =========================================================================
    // Failures inside fall back to defaults
    let settings = SettingsManager::load();
    if let Err(e) = log_collector.reconfigure(settings.level_filter(), settings.log_file.clone()) {
        log::warn!("[Main] Log file unavailable ({}), logging to stderr only", e);
    }

    // =========================================================================
    // RUNTIME
    // =========================================================================
    // Explicit runtime rather than #[tokio::main]: the window-close handler
    // blocks on the service shutdown from the UI thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("webui-controller-rt")
        .enable_all()
        .build()?;

    // =========================================================================
    // CONTROLLER
    // =========================================================================
    let provider = select_provider();
    let gpu = GpuMonitor::spawn(provider, settings.gpu_refresh_interval());
    let sampler = ResourceSampler::new(gpu);
    let controller = AppController::new(settings, runtime.handle().clone(), sampler);
    let app_ui = AppUI::new(controller);

    // =========================================================================
    // LAUNCH EGUI
    // =========================================================================
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    let result = eframe::run_native(APP_TITLE, options, Box::new(move |_cc| Box::new(app_ui)));

    // =========================================================================
    // SHUTDOWN
    // =========================================================================
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));
    log::info!("[Main] Application shutting down");

    if let Err(e) = log_collector.wait_for_empty() {
        eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
    }

    result.map_err(|e| e.to_string().into())
}
