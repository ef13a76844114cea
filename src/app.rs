use chrono::{DateTime, Duration, Timelike, Utc};
use eframe::egui;

use schedule_chart::engine::ChartEngine;
use schedule_chart::model::{
    DependencyKind, GroupingMode, Order, Phase, PhaseKind, Resource, ResourceKind,
    ScheduleSnapshot, Task, TaskDependency, TaskStatus,
};
use schedule_chart::theme;
use schedule_chart::ChartEvent;

pub struct ScheduleChartApp {
    engine: ChartEngine,
    grouping: GroupingMode,
    status: String,
}

impl ScheduleChartApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let origin = day_start(Utc::now());
        let mut engine = ChartEngine::new(origin);
        engine.apply_snapshot(sample_schedule(origin));
        Self {
            engine,
            grouping: GroupingMode::None,
            status: "Ready".to_string(),
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Group by:");
            let before = self.grouping;
            egui::ComboBox::from_id_salt("grouping")
                .selected_text(match self.grouping {
                    GroupingMode::None => "None",
                    GroupingMode::ResourceKind => "Resource kind",
                    GroupingMode::Order => "Order",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.grouping, GroupingMode::None, "None");
                    ui.selectable_value(
                        &mut self.grouping,
                        GroupingMode::ResourceKind,
                        "Resource kind",
                    );
                    ui.selectable_value(&mut self.grouping, GroupingMode::Order, "Order");
                });
            if self.grouping != before {
                self.engine.store_mut().set_grouping_mode(self.grouping);
            }

            ui.separator();
            if ui.button("Undo").clicked() && !self.engine.store_mut().undo() {
                self.status = "Nothing to undo".to_string();
            }
            if ui.button("Redo").clicked() && !self.engine.store_mut().redo() {
                self.status = "Nothing to redo".to_string();
            }

            ui.separator();
            let center = self.engine.store().viewport().width / 2.0;
            if ui.button("−").clicked() {
                self.engine.store_mut().viewport_mut().zoom(0.8, center);
            }
            if ui.button("+").clicked() {
                self.engine.store_mut().viewport_mut().zoom(1.25, center);
            }
            ui.label(format!(
                "{:.1} px/h",
                self.engine.store().viewport().pixels_per_hour
            ));
        });
    }
}

impl eframe::App for ScheduleChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let selected = self.engine.store().selection().tasks.len();
                    ui.label(format!("{selected} selected"));
                });
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.engine.show(ui);
            });

        for event in self.engine.drain_events() {
            match event {
                ChartEvent::TasksMutated => {
                    self.status = "Schedule updated".to_string();
                }
                ChartEvent::SelectionChanged(ids) => {
                    self.status = match ids.len() {
                        0 => "Ready".to_string(),
                        1 => "1 task selected".to_string(),
                        n => format!("{n} tasks selected"),
                    };
                }
                ChartEvent::ViewportChanged { .. } => {}
            }
        }
    }
}

fn day_start(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// A small machine-shop schedule to play with.
fn sample_schedule(origin: DateTime<Utc>) -> ScheduleSnapshot {
    let lathe = Resource::new("Lathe 1", ResourceKind::Machine);
    let mill = Resource::new("Mill 1", ResourceKind::Machine);
    let grinder = Resource::new("Grinder", ResourceKind::Machine);
    let anna = Resource::new("Anna", ResourceKind::Operator);
    let bjorn = Resource::new("Björn", ResourceKind::Operator);

    let housings = Order::new("Housings batch", 1);
    let shafts = Order::new("Shafts batch", 2);

    let at = |h: i64| origin + Duration::hours(8 + h);
    let phased = |name: &str, start: DateTime<Utc>, resource: &Resource, setup, run, cleanup| {
        let mut t = Task::new(name, start, 0, resource.id);
        t.phases = vec![
            Phase::new(PhaseKind::Setup, setup),
            Phase::new(PhaseKind::Execution, run),
            Phase::new(PhaseKind::Cleanup, cleanup),
        ];
        t
    };

    let mut turn = phased("Turn housings", at(0), &lathe, 30, 150, 30);
    turn.order_id = Some(housings.id);
    turn.status = TaskStatus::InProgress;
    turn.progress = 40;

    let mut mill_slots = phased("Mill slots", at(4), &mill, 45, 180, 15);
    mill_slots.order_id = Some(housings.id);

    let mut grind = Task::new("Grind faces", at(9), 120, grinder.id);
    grind.order_id = Some(housings.id);

    let mut turn_shafts = phased("Turn shafts", at(5), &lathe, 20, 160, 20);
    turn_shafts.order_id = Some(shafts.id);

    let mut inspect = Task::new("Inspection", at(2), 90, anna.id);
    inspect.constraints.fixed_time = true;

    let maintenance = Task::new("Mill maintenance", at(0), 120, bjorn.id);

    let dependencies = vec![
        TaskDependency::new(turn.id, mill_slots.id, DependencyKind::FinishToStart),
        TaskDependency::new(mill_slots.id, grind.id, DependencyKind::FinishToStart)
            .with_lag(30),
        TaskDependency::new(turn.id, turn_shafts.id, DependencyKind::FinishToStart),
    ];

    let mut tasks = vec![turn, mill_slots, grind, turn_shafts, inspect, maintenance];
    for (i, task) in tasks.iter_mut().enumerate() {
        task.color = theme::task_color(i);
    }

    ScheduleSnapshot {
        tasks,
        resources: vec![lathe, mill, grinder, anna, bjorn],
        dependencies,
        orders: vec![housings, shafts],
        groups: Vec::new(),
    }
}
