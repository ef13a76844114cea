use uuid::Uuid;

use super::grouping::GroupId;

/// One row of the virtual vertical layout: either a resource row or a
/// collapsible group header. `virtual_y` is the top offset in an unbounded
/// coordinate space, independent of the current scroll position.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualRow {
    pub resource_id: Option<Uuid>,
    pub group: Option<GroupId>,
    pub is_group_header: bool,
    pub is_collapsed: bool,
    pub label: String,
    pub virtual_y: f32,
    pub height: f32,
}

impl VirtualRow {
    pub fn resource(id: Uuid, label: impl Into<String>) -> Self {
        Self {
            resource_id: Some(id),
            group: None,
            is_group_header: false,
            is_collapsed: false,
            label: label.into(),
            virtual_y: 0.0,
            height: 0.0,
        }
    }

    pub fn header(group: GroupId, label: impl Into<String>, collapsed: bool) -> Self {
        Self {
            resource_id: None,
            group: Some(group),
            is_group_header: true,
            is_collapsed: collapsed,
            label: label.into(),
            virtual_y: 0.0,
            height: 0.0,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.virtual_y + self.height
    }
}

/// Total height of a row layout: the last row's bottom edge.
pub fn total_height(rows: &[VirtualRow]) -> f32 {
    rows.last().map(|r| r.bottom()).unwrap_or(0.0)
}
