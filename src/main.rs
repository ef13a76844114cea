#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;

use app::ScheduleChartApp;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 760.0])
            .with_min_inner_size([800.0, 480.0])
            .with_title("Schedule Chart"),
        ..Default::default()
    };

    eframe::run_native(
        "Schedule Chart",
        options,
        Box::new(|cc| Ok(Box::new(ScheduleChartApp::new(cc)))),
    )
}
