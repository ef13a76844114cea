use super::{LayerSurface, RenderError, RenderInput};

/// The four compositing layers, bottom to top. Redraw cost drops in this
/// order too: the grid changes rarely, the interaction overlay every frame
/// of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Grid,
    Tasks,
    Dependencies,
    Interaction,
}

impl Layer {
    pub const ORDER: [Layer; 4] = [
        Layer::Grid,
        Layer::Tasks,
        Layer::Dependencies,
        Layer::Interaction,
    ];

    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            Layer::Grid => 0,
            Layer::Tasks => 1,
            Layer::Dependencies => 2,
            Layer::Interaction => 3,
        }
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Grid => "grid",
            Layer::Tasks => "tasks",
            Layer::Dependencies => "dependencies",
            Layer::Interaction => "interaction",
        }
    }
}

/// Set of layers, packed into one byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const EMPTY: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(0b1111);

    pub fn only(layer: Layer) -> Self {
        LayerMask(layer.bit())
    }

    pub fn insert(&mut self, layer: Layer) {
        self.0 |= layer.bit();
    }

    pub fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }

    pub fn contains(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

type DrawCallback = Box<dyn for<'a> FnMut(&mut LayerSurface, &RenderInput<'a>) -> Result<(), RenderError>>;

/// Coalesces dirty marks into at most one frame request, then redraws the
/// dirty layers in fixed compositing order when the host pumps a frame.
///
/// The scheduler never drives frames itself. `mark_dirty` fires the
/// injected frame hook once per pending frame, and the host is expected to
/// call `run_frame` from its own paint cycle.
pub struct RenderScheduler {
    callbacks: [Option<DrawCallback>; Layer::COUNT],
    dirty: LayerMask,
    frame_pending: bool,
    request_frame: Option<Box<dyn Fn()>>,
    disposed: bool,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self {
            callbacks: [None, None, None, None],
            dirty: LayerMask::EMPTY,
            frame_pending: false,
            request_frame: None,
            disposed: false,
        }
    }

    /// Install the hook used to ask the host for a frame. In the egui
    /// embedding this is `ctx.request_repaint()`.
    pub fn set_frame_hook(&mut self, hook: Box<dyn Fn()>) {
        self.request_frame = Some(hook);
    }

    pub fn register(
        &mut self,
        layer: Layer,
        callback: impl for<'a> FnMut(&mut LayerSurface, &RenderInput<'a>) -> Result<(), RenderError>
            + 'static,
    ) {
        if self.disposed {
            return;
        }
        self.callbacks[layer.index()] = Some(Box::new(callback));
    }

    pub fn mark_dirty(&mut self, layer: Layer) {
        self.mark_dirty_mask(LayerMask::only(layer));
    }

    pub fn mark_all_dirty(&mut self) {
        self.mark_dirty_mask(LayerMask::ALL);
    }

    /// Accumulate dirty layers. The first mark of a pending frame fires the
    /// frame hook; further marks before the frame runs are coalesced.
    pub fn mark_dirty_mask(&mut self, mask: LayerMask) {
        if self.disposed || mask.is_empty() {
            return;
        }
        self.dirty = self.dirty.union(mask);
        if !self.frame_pending {
            self.frame_pending = true;
            if let Some(hook) = &self.request_frame {
                hook();
            }
        }
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn dirty(&self) -> LayerMask {
        self.dirty
    }

    /// Redraw every dirty registered layer, bottom to top. A failing
    /// callback is logged and skipped so one broken layer cannot take the
    /// rest of the chart down with it. Unattached surfaces are left alone
    /// but stay dirty-cleared; they redraw fully on the next mark after
    /// attach.
    pub fn run_frame(&mut self, surfaces: &mut [LayerSurface; Layer::COUNT], input: &RenderInput) {
        if self.disposed {
            return;
        }
        self.frame_pending = false;
        let dirty = std::mem::take(&mut self.dirty);
        for layer in Layer::ORDER {
            if !dirty.contains(layer) {
                continue;
            }
            self.draw_layer(layer, surfaces, input);
        }
    }

    /// Render the given layers right now, cancelling any pending frame.
    /// Used when the host needs up-to-date surfaces outside its normal
    /// paint cycle, e.g. before an export.
    pub fn force_render(
        &mut self,
        mask: LayerMask,
        surfaces: &mut [LayerSurface; Layer::COUNT],
        input: &RenderInput,
    ) {
        if self.disposed {
            return;
        }
        self.frame_pending = false;
        self.dirty = LayerMask::EMPTY;
        for layer in Layer::ORDER {
            if !mask.contains(layer) {
                continue;
            }
            self.draw_layer(layer, surfaces, input);
        }
    }

    fn draw_layer(
        &mut self,
        layer: Layer,
        surfaces: &mut [LayerSurface; Layer::COUNT],
        input: &RenderInput,
    ) {
        let Some(callback) = self.callbacks[layer.index()].as_mut() else {
            return;
        };
        let surface = &mut surfaces[layer.index()];
        if !surface.is_attached() {
            return;
        }
        surface.clear();
        if let Err(err) = callback(surface, input) {
            log::warn!("{} layer failed to render: {err}", layer.name());
        }
    }

    /// Drop all registrations and pending work. Safe to call repeatedly;
    /// after disposal the scheduler ignores marks and frames.
    pub fn dispose(&mut self) {
        self.callbacks = [None, None, None, None];
        self.dirty = LayerMask::EMPTY;
        self.frame_pending = false;
        self.request_frame = None;
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{RelationalIndex, SpatialIndex};
    use crate::model::{SelectionState, ViewportState};
    use crate::render::FixedTextMeasure;
    use crate::store::HoverState;
    use chrono::{TimeZone, Utc};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct Fixture {
        tasks: HashMap<uuid::Uuid, crate::model::Task>,
        viewport: ViewportState,
        selection: SelectionState,
        spatial: SpatialIndex,
        relational: RelationalIndex,
        measure: FixedTextMeasure,
    }

    impl Fixture {
        fn new() -> Self {
            let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
            let mut viewport = ViewportState::new(t0);
            viewport.width = 800.0;
            viewport.height = 600.0;
            Self {
                tasks: HashMap::new(),
                viewport,
                selection: SelectionState::default(),
                spatial: SpatialIndex::new(),
                relational: RelationalIndex::new(),
                measure: FixedTextMeasure,
            }
        }

        fn input(&self) -> RenderInput<'_> {
            RenderInput {
                tasks: &self.tasks,
                viewport: &self.viewport,
                selection: &self.selection,
                drag: None,
                hover: HoverState::default(),
                rows: &[],
                spatial: &self.spatial,
                relational: &self.relational,
                marquee: None,
                now: Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
                min_resolution_minutes: 15,
                measure: &self.measure,
            }
        }
    }

    fn attached_surfaces() -> [LayerSurface; Layer::COUNT] {
        let mut surfaces: [LayerSurface; Layer::COUNT] = Default::default();
        for s in &mut surfaces {
            s.set_size(800.0, 600.0);
        }
        surfaces
    }

    #[test]
    fn marks_coalesce_into_one_frame_request() {
        let fired = Rc::new(Cell::new(0));
        let hook = fired.clone();
        let mut scheduler = RenderScheduler::new();
        scheduler.set_frame_hook(Box::new(move || hook.set(hook.get() + 1)));

        scheduler.mark_dirty(Layer::Grid);
        scheduler.mark_dirty(Layer::Tasks);
        scheduler.mark_all_dirty();
        assert_eq!(fired.get(), 1);

        let fixture = Fixture::new();
        let mut surfaces = attached_surfaces();
        scheduler.run_frame(&mut surfaces, &fixture.input());
        assert!(!scheduler.frame_pending());

        scheduler.mark_dirty(Layer::Interaction);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn layers_render_in_compositing_order() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut scheduler = RenderScheduler::new();
        for layer in [Layer::Interaction, Layer::Grid, Layer::Dependencies, Layer::Tasks] {
            let seen = order.clone();
            scheduler.register(layer, move |_, _| {
                seen.borrow_mut().push(layer);
                Ok(())
            });
        }
        scheduler.mark_all_dirty();

        let fixture = Fixture::new();
        let mut surfaces = attached_surfaces();
        scheduler.run_frame(&mut surfaces, &fixture.input());
        assert_eq!(&*order.borrow(), &Layer::ORDER);
    }

    #[test]
    fn failing_layer_does_not_block_later_layers() {
        let drew = Rc::new(Cell::new(false));
        let mut scheduler = RenderScheduler::new();
        scheduler.register(Layer::Tasks, |_, _| {
            Err(RenderError("missing row layout".into()))
        });
        let flag = drew.clone();
        scheduler.register(Layer::Interaction, move |_, _| {
            flag.set(true);
            Ok(())
        });
        scheduler.mark_all_dirty();

        let fixture = Fixture::new();
        let mut surfaces = attached_surfaces();
        scheduler.run_frame(&mut surfaces, &fixture.input());
        assert!(drew.get());
    }

    #[test]
    fn clean_layers_keep_their_commands() {
        let mut scheduler = RenderScheduler::new();
        scheduler.register(Layer::Grid, |surface, _| {
            surface.rect_filled(
                egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(10.0, 10.0)),
                egui::Rounding::ZERO,
                egui::Color32::BLACK,
            );
            Ok(())
        });
        scheduler.register(Layer::Tasks, |_, _| Ok(()));

        let fixture = Fixture::new();
        let mut surfaces = attached_surfaces();
        scheduler.mark_all_dirty();
        scheduler.run_frame(&mut surfaces, &fixture.input());
        assert_eq!(surfaces[Layer::Grid.index()].commands().len(), 1);

        // Only the tasks layer dirtied: grid keeps its retained frame.
        scheduler.mark_dirty(Layer::Tasks);
        scheduler.run_frame(&mut surfaces, &fixture.input());
        assert_eq!(surfaces[Layer::Grid.index()].commands().len(), 1);
    }

    #[test]
    fn unattached_surface_is_skipped() {
        let drew = Rc::new(Cell::new(false));
        let mut scheduler = RenderScheduler::new();
        let flag = drew.clone();
        scheduler.register(Layer::Grid, move |_, _| {
            flag.set(true);
            Ok(())
        });
        scheduler.mark_all_dirty();

        let fixture = Fixture::new();
        let mut surfaces: [LayerSurface; Layer::COUNT] = Default::default();
        scheduler.run_frame(&mut surfaces, &fixture.input());
        assert!(!drew.get());
    }

    #[test]
    fn force_render_cancels_pending_frame() {
        let mut scheduler = RenderScheduler::new();
        scheduler.register(Layer::Grid, |_, _| Ok(()));
        scheduler.mark_dirty(Layer::Grid);
        assert!(scheduler.frame_pending());

        let fixture = Fixture::new();
        let mut surfaces = attached_surfaces();
        scheduler.force_render(LayerMask::ALL, &mut surfaces, &fixture.input());
        assert!(!scheduler.frame_pending());
        assert!(scheduler.dirty().is_empty());
    }

    #[test]
    fn dispose_is_idempotent_and_final() {
        let fired = Rc::new(Cell::new(0));
        let hook = fired.clone();
        let mut scheduler = RenderScheduler::new();
        scheduler.set_frame_hook(Box::new(move || hook.set(hook.get() + 1)));
        scheduler.dispose();
        scheduler.dispose();

        scheduler.mark_all_dirty();
        assert_eq!(fired.get(), 0);
        assert!(!scheduler.frame_pending());
    }
}
