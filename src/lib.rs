//! Interactive resource-schedule chart engine: a zoomable, scrollable
//! timeline of tasks on resource rows with direct-manipulation editing,
//! dependency arrows, grouping, and bounded undo.

pub mod engine;
pub mod history;
pub mod index;
pub mod input;
pub mod model;
pub mod render;
pub mod store;
pub mod theme;

pub use engine::ChartEngine;
pub use input::{InputEvent, KeyCommand, PointerButton};
pub use model::ScheduleSnapshot;
pub use store::ChartEvent;
