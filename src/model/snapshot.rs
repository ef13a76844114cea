use serde::{Deserialize, Serialize};

use super::resource::{Order, Resource, ResourceGroup};
use super::task::{Task, TaskDependency};

/// A bulk-replace snapshot of the schedule data handed in by the embedder.
/// Missing collections default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub groups: Vec<ResourceGroup>,
}
