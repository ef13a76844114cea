use chrono::{DateTime, Utc};
use egui::{Color32, FontId, Pos2};

use crate::index::{build_rows, RelationalIndex, SpatialIndex};
use crate::input::{InputEvent, InteractionController, KeyCommand, PointerButton};
use crate::model::{ScheduleSnapshot, Task, VirtualRow};
use crate::render::{
    self, Layer, LayerMask, LayerSurface, RenderInput, RenderScheduler, TextMeasure,
};
use crate::store::{ChartEvent, ScheduleStore, StoreChanges};

/// Default snap floor when the embedder does not configure one.
pub const DEFAULT_MIN_RESOLUTION_MINUTES: i64 = 15;

/// The chart engine: one store, the derived indexes, the render
/// scheduler with its four layers, and the pointer state machine.
///
/// The engine is frame-source agnostic. `handle_input` and the store
/// mutators record what changed; `render` rebuilds indexes and redraws
/// dirty layers. The egui adapter in `show` drives both from an
/// immediate-mode frame.
pub struct ChartEngine {
    store: ScheduleStore,
    rows: Vec<VirtualRow>,
    spatial: SpatialIndex,
    relational: RelationalIndex,
    scheduler: RenderScheduler,
    controller: InteractionController,
    surfaces: [LayerSurface; Layer::COUNT],
    min_resolution_minutes: i64,
    hook_installed: bool,
}

impl ChartEngine {
    pub fn new(time_origin: DateTime<Utc>) -> Self {
        Self::with_min_resolution(time_origin, DEFAULT_MIN_RESOLUTION_MINUTES)
    }

    pub fn with_min_resolution(time_origin: DateTime<Utc>, min_resolution_minutes: i64) -> Self {
        let mut scheduler = RenderScheduler::new();
        scheduler.register(Layer::Grid, render::grid::render);
        scheduler.register(Layer::Tasks, render::tasks::render);
        scheduler.register(Layer::Dependencies, render::dependencies::render);
        scheduler.register(Layer::Interaction, render::overlay::render);

        Self {
            store: ScheduleStore::new(time_origin),
            rows: Vec::new(),
            spatial: SpatialIndex::new(),
            relational: RelationalIndex::new(),
            scheduler,
            controller: InteractionController::new(min_resolution_minutes),
            surfaces: Default::default(),
            min_resolution_minutes,
            hook_installed: false,
        }
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ScheduleStore {
        &mut self.store
    }

    pub fn rows(&self) -> &[VirtualRow] {
        &self.rows
    }

    pub fn surface(&self, layer: Layer) -> &LayerSurface {
        &self.surfaces[layer.index()]
    }

    pub fn apply_snapshot(&mut self, snapshot: ScheduleSnapshot) {
        self.store.apply_snapshot(snapshot);
    }

    pub fn set_surface_size(&mut self, width: f32, height: f32) {
        self.store.set_surface_size(width, height);
        for surface in &mut self.surfaces {
            surface.set_size(width, height);
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        self.controller.handle(
            event,
            &mut self.store,
            &self.spatial,
            &self.relational,
            &self.rows,
        );
    }

    pub fn drain_events(&mut self) -> Vec<ChartEvent> {
        self.store.drain_events()
    }

    /// Pull the store's change flags, rebuild the derived indexes where
    /// the structure changed, and mark the affected layers dirty.
    pub fn sync(&mut self) {
        let changes = self.store.take_changes();
        if !changes.any() {
            return;
        }
        if changes.structure {
            let tasks: Vec<&Task> = self.store.tasks().values().collect();
            self.rows = build_rows(
                self.store.resources(),
                &tasks,
                self.store.orders(),
                self.store.grouping(),
                self.store.viewport().row_height,
            );
            self.relational
                .rebuild(self.store.tasks().values(), self.store.dependencies(), &self.rows);
            self.spatial.rebuild(self.store.tasks().values(), &self.rows);
        }
        self.scheduler.mark_dirty_mask(dirty_mask(changes));
    }

    /// Synchronize and redraw dirty layers. A no-op frame is cheap: when
    /// nothing is dirty the retained surfaces are reused as-is.
    pub fn render(&mut self, measure: &dyn TextMeasure, now: DateTime<Utc>) {
        self.sync();
        if !self.scheduler.frame_pending() {
            return;
        }
        let input = RenderInput {
            tasks: self.store.tasks(),
            viewport: self.store.viewport(),
            selection: self.store.selection(),
            drag: self.store.drag(),
            hover: self.store.hover(),
            rows: &self.rows,
            spatial: &self.spatial,
            relational: &self.relational,
            marquee: self.controller.marquee(),
            now,
            min_resolution_minutes: self.min_resolution_minutes,
            measure,
        };
        self.scheduler.run_frame(&mut self.surfaces, &input);
    }

    /// Redraw the given layers immediately, regardless of dirty state.
    pub fn force_render(&mut self, mask: LayerMask, measure: &dyn TextMeasure, now: DateTime<Utc>) {
        self.sync();
        let input = RenderInput {
            tasks: self.store.tasks(),
            viewport: self.store.viewport(),
            selection: self.store.selection(),
            drag: self.store.drag(),
            hover: self.store.hover(),
            rows: &self.rows,
            spatial: &self.spatial,
            relational: &self.relational,
            marquee: self.controller.marquee(),
            now,
            min_resolution_minutes: self.min_resolution_minutes,
            measure,
        };
        self.scheduler.force_render(mask, &mut self.surfaces, &input);
    }

    pub fn dispose(&mut self) {
        self.scheduler.dispose();
    }

    // ===== egui embedding =====

    /// Render the chart into the remaining space of `ui`, translating
    /// egui input into engine events.
    pub fn show(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        self.set_surface_size(rect.width(), rect.height());

        if !self.hook_installed {
            let ctx = ui.ctx().clone();
            self.scheduler
                .set_frame_hook(Box::new(move || ctx.request_repaint()));
            self.hook_installed = true;
        }

        let engaged = self.controller.is_engaged();
        for event in translate_events(ui, rect, &response, engaged) {
            self.handle_input(event);
        }

        let measure = CtxTextMeasure { ctx: ui.ctx() };
        self.render(&measure, Utc::now());

        let painter = ui.painter_at(rect);
        for layer in Layer::ORDER {
            self.surfaces[layer.index()].paint(&painter, rect.min);
        }
        response
    }
}

fn dirty_mask(changes: StoreChanges) -> LayerMask {
    if changes.structure || changes.view {
        return LayerMask::ALL;
    }
    let mut mask = LayerMask::EMPTY;
    if changes.selection {
        mask.insert(Layer::Tasks);
        mask.insert(Layer::Dependencies);
    }
    if changes.overlay {
        mask.insert(Layer::Interaction);
    }
    mask
}

/// Text measurement backed by the live egui font atlas.
struct CtxTextMeasure<'a> {
    ctx: &'a egui::Context,
}

impl TextMeasure for CtxTextMeasure<'_> {
    fn text_width(&self, text: &str, font: &FontId) -> f32 {
        self.ctx.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_string(), font.clone(), Color32::WHITE)
                .size()
                .x
        })
    }
}

/// Map the frame's raw egui events onto engine input, surface-relative.
/// `engaged` widens the keyboard gate while a pointer session is in
/// flight, so Escape can cancel a drag whose cursor left the rect.
fn translate_events(
    ui: &egui::Ui,
    rect: egui::Rect,
    response: &egui::Response,
    engaged: bool,
) -> Vec<InputEvent> {
    let mut out = Vec::new();
    let to_local = |pos: Pos2| pos - rect.min.to_vec2();

    ui.input(|input| {
        for event in &input.events {
            match event {
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    let button = match button {
                        egui::PointerButton::Primary => PointerButton::Primary,
                        egui::PointerButton::Middle => PointerButton::Middle,
                        _ => continue,
                    };
                    if *pressed {
                        if rect.contains(*pos) {
                            out.push(InputEvent::PointerDown {
                                pos: to_local(*pos),
                                button,
                                modifiers: *modifiers,
                            });
                        }
                    } else {
                        // Releases are delivered even outside the rect so
                        // a drag can always finish.
                        out.push(InputEvent::PointerUp {
                            pos: to_local(*pos),
                            modifiers: *modifiers,
                        });
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    out.push(InputEvent::PointerMove {
                        pos: to_local(*pos),
                    });
                }
                egui::Event::MouseWheel {
                    unit,
                    delta,
                    modifiers,
                } if response.hovered() => {
                    let scale = match unit {
                        egui::MouseWheelUnit::Point => 1.0,
                        egui::MouseWheelUnit::Line => 24.0,
                        egui::MouseWheelUnit::Page => rect.height(),
                    };
                    let pos = input
                        .pointer
                        .hover_pos()
                        .map(to_local)
                        .unwrap_or_else(|| to_local(rect.center()));
                    out.push(InputEvent::Wheel {
                        pos,
                        delta: *delta * scale,
                        modifiers: *modifiers,
                    });
                }
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } if response.hovered() || engaged => {
                    let cmd = match key {
                        egui::Key::Escape => Some(KeyCommand::Escape),
                        egui::Key::Delete | egui::Key::Backspace => Some(KeyCommand::Delete),
                        egui::Key::A if modifiers.command => Some(KeyCommand::SelectAll),
                        egui::Key::Z if modifiers.command && modifiers.shift => {
                            Some(KeyCommand::Redo)
                        }
                        egui::Key::Z if modifiers.command => Some(KeyCommand::Undo),
                        egui::Key::Y if modifiers.command => Some(KeyCommand::Redo),
                        _ => None,
                    };
                    if let Some(cmd) = cmd {
                        out.push(InputEvent::Key(cmd));
                    }
                }
                _ => {}
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Resource, ResourceKind};
    use crate::render::FixedTextMeasure;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    }

    fn engine_with_data() -> ChartEngine {
        let mut engine = ChartEngine::new(t0());
        let resource = Resource::new("Lathe", ResourceKind::Machine);
        let task = Task::new("a", t0() + Duration::hours(1), 120, resource.id);
        engine.apply_snapshot(ScheduleSnapshot {
            tasks: vec![task],
            resources: vec![resource],
            ..Default::default()
        });
        engine.set_surface_size(800.0, 600.0);
        engine
    }

    #[test]
    fn sync_rebuilds_indexes_after_structure_change() {
        let mut engine = engine_with_data();
        engine.sync();
        assert_eq!(engine.rows().len(), 1);
        assert_eq!(engine.spatial.len(), 1);
    }

    #[test]
    fn render_populates_layers_and_then_reuses_them() {
        let mut engine = engine_with_data();
        engine.render(&FixedTextMeasure, t0());
        let grid_cmds = engine.surface(Layer::Grid).commands().len();
        let task_cmds = engine.surface(Layer::Tasks).commands().len();
        assert!(grid_cmds > 0);
        assert!(task_cmds > 0);

        // Nothing changed: a second render leaves the surfaces untouched.
        engine.render(&FixedTextMeasure, t0());
        assert_eq!(engine.surface(Layer::Grid).commands().len(), grid_cmds);
        assert_eq!(engine.surface(Layer::Tasks).commands().len(), task_cmds);
    }

    #[test]
    fn selection_change_redraws_tasks_but_not_grid() {
        let mut engine = engine_with_data();
        engine.render(&FixedTextMeasure, t0());
        let grid_before = engine.surface(Layer::Grid).commands().len();

        let id = *engine.store().tasks().keys().next().unwrap();
        engine.store_mut().select_only(id);
        engine.sync();
        assert!(engine.scheduler.dirty().contains(Layer::Tasks));
        assert!(!engine.scheduler.dirty().contains(Layer::Grid));

        engine.render(&FixedTextMeasure, t0());
        assert_eq!(engine.surface(Layer::Grid).commands().len(), grid_before);
    }

    #[test]
    fn force_render_draws_even_when_clean() {
        let mut engine = engine_with_data();
        engine.render(&FixedTextMeasure, t0());
        engine.force_render(LayerMask::ALL, &FixedTextMeasure, t0());
        assert!(!engine.surface(Layer::Tasks).commands().is_empty());
    }
}
