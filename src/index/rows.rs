use std::collections::HashSet;

use uuid::Uuid;

use crate::model::{
    GroupId, GroupingMode, GroupingState, Order, Resource, Task, VirtualRow,
};
use crate::theme::GROUP_HEADER_HEIGHT;

/// Compute the ordered virtual row list for the current grouping mode.
///
/// Rows always carry monotonically increasing `virtual_y`. Group headers
/// use a fixed height distinct from the resource row height; collapsed
/// groups emit only their header.
pub fn build_rows(
    resources: &[Resource],
    tasks: &[&Task],
    orders: &[Order],
    grouping: &GroupingState,
    row_height: f32,
) -> Vec<VirtualRow> {
    let mut rows = match grouping.mode {
        GroupingMode::None => resources
            .iter()
            .map(|r| VirtualRow::resource(r.id, r.name.clone()))
            .collect(),
        GroupingMode::ResourceKind => by_resource_kind(resources, grouping),
        GroupingMode::Order => by_order(resources, tasks, orders, grouping),
    };

    let mut y = 0.0;
    for row in &mut rows {
        row.virtual_y = y;
        row.height = if row.is_group_header {
            GROUP_HEADER_HEIGHT
        } else {
            row_height
        };
        y += row.height;
    }
    rows
}

fn by_resource_kind(resources: &[Resource], grouping: &GroupingState) -> Vec<VirtualRow> {
    // Distinct kinds in first-appearance order.
    let mut kinds = Vec::new();
    for r in resources {
        if !kinds.contains(&r.kind) {
            kinds.push(r.kind);
        }
    }

    let mut rows = Vec::new();
    for kind in kinds {
        let group = GroupId::Kind(kind);
        let expanded = grouping.is_expanded(&group);
        rows.push(VirtualRow::header(group, kind.label(), !expanded));
        if expanded {
            for r in resources.iter().filter(|r| r.kind == kind) {
                rows.push(VirtualRow::resource(r.id, r.name.clone()));
            }
        }
    }
    rows
}

fn by_order(
    resources: &[Resource],
    tasks: &[&Task],
    orders: &[Order],
    grouping: &GroupingState,
) -> Vec<VirtualRow> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by_key(|o| o.priority);

    // Resources that carry at least one task of each order, and the set of
    // resources with a task in any order at all.
    let mut assigned: HashSet<Uuid> = HashSet::new();
    for t in tasks {
        if t.order_id.is_some() {
            assigned.insert(t.resource_id);
        }
    }

    let mut rows = Vec::new();
    for order in sorted {
        let members: Vec<&Resource> = resources
            .iter()
            .filter(|r| {
                tasks
                    .iter()
                    .any(|t| t.order_id == Some(order.id) && t.resource_id == r.id)
            })
            .collect();
        if members.is_empty() {
            continue;
        }
        let group = GroupId::Order(order.id);
        let expanded = grouping.is_expanded(&group);
        rows.push(VirtualRow::header(group, order.name.clone(), !expanded));
        if expanded {
            for r in members {
                rows.push(VirtualRow::resource(r.id, r.name.clone()));
            }
        }
    }

    // Resources with no task in any order land under a synthetic group.
    let unassigned: Vec<&Resource> = resources
        .iter()
        .filter(|r| !assigned.contains(&r.id))
        .collect();
    if !unassigned.is_empty() {
        let expanded = grouping.is_expanded(&GroupId::Unassigned);
        rows.push(VirtualRow::header(GroupId::Unassigned, "Unassigned", !expanded));
        if expanded {
            for r in unassigned {
                rows.push(VirtualRow::resource(r.id, r.name.clone()));
            }
        }
    }
    rows
}
