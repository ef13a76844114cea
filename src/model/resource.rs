use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Operator,
    Machine,
    Generic,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Operator => "Operators",
            ResourceKind::Machine => "Machines",
            ResourceKind::Generic => "Other",
        }
    }
}

/// A resource that tasks are assigned to. Each resource occupies one row
/// of the chart (when its group is expanded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub kind: ResourceKind,
    pub capacity: u32,
    pub group_id: Option<Uuid>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            capacity: 1,
            group_id: None,
        }
    }
}

/// Grouping metadata for resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: Uuid,
    pub name: String,
}

/// A production order. Tasks may belong to an order; when grouping by
/// order, orders sort by ascending `priority`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub name: String,
    pub priority: i32,
}

impl Order {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            priority,
        }
    }
}
