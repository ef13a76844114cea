pub mod drag;
pub mod grouping;
pub mod resource;
pub mod row;
pub mod selection;
pub mod snapshot;
pub mod task;
pub mod viewport;

pub use drag::{DragKind, DragState};
pub use grouping::{GroupId, GroupingMode, GroupingState};
pub use resource::{Order, Resource, ResourceGroup, ResourceKind};
pub use row::{total_height, VirtualRow};
pub use selection::SelectionState;
pub use snapshot::ScheduleSnapshot;
pub use task::{DependencyKind, Phase, PhaseKind, Task, TaskConstraints, TaskDependency, TaskStatus};
pub use viewport::{ViewportState, ZoomLevel};
