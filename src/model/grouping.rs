use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupingMode {
    None,
    ResourceKind,
    Order,
}

/// Identity of a collapsible row group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupId {
    Kind(ResourceKind),
    Order(Uuid),
    /// Synthetic group for resources with no task in any order.
    Unassigned,
}

/// Current grouping mode plus the set of expanded group ids.
/// Groups start collapsed; switching mode resets the expanded set.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingState {
    pub mode: GroupingMode,
    pub expanded: HashSet<GroupId>,
}

impl Default for GroupingState {
    fn default() -> Self {
        Self {
            mode: GroupingMode::None,
            expanded: HashSet::new(),
        }
    }
}

impl GroupingState {
    pub fn set_mode(&mut self, mode: GroupingMode) {
        if self.mode != mode {
            self.mode = mode;
            self.expanded.clear();
        }
    }

    pub fn is_expanded(&self, id: &GroupId) -> bool {
        self.expanded.contains(id)
    }

    /// Toggle a group between expanded and collapsed. Idempotent per state:
    /// toggling twice restores the prior state exactly.
    pub fn toggle(&mut self, id: GroupId) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }
}
