use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;

use uuid::Uuid;

use crate::model::{Task, TaskDependency, VirtualRow};

/// Extra rows included above and below the visible slice.
const ROW_BUFFER: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDirection {
    Predecessors,
    Successors,
    Both,
}

/// Derived lookup maps over the schedule data, rebuilt as a whole on every
/// data or layout change. The maps are caches, never sources of truth, and
/// a rebuild replaces all contents at once.
#[derive(Debug, Default)]
pub struct RelationalIndex {
    resource_tasks: HashMap<Uuid, Vec<Uuid>>,
    order_tasks: HashMap<Uuid, Vec<Uuid>>,
    successors_of: HashMap<Uuid, Vec<Uuid>>,
    predecessors_of: HashMap<Uuid, Vec<Uuid>>,
    dependencies: HashMap<Uuid, TaskDependency>,
    incident: HashMap<Uuid, Vec<Uuid>>,
    resource_row: HashMap<Uuid, usize>,
}

impl RelationalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild<'a>(
        &mut self,
        tasks: impl Iterator<Item = &'a Task>,
        dependencies: &[TaskDependency],
        rows: &[VirtualRow],
    ) {
        let mut next = RelationalIndex::default();

        for task in tasks {
            next.resource_tasks
                .entry(task.resource_id)
                .or_default()
                .push(task.id);
            if let Some(order) = task.order_id {
                next.order_tasks.entry(order).or_default().push(task.id);
            }
        }

        for dep in dependencies {
            next.successors_of
                .entry(dep.from_task)
                .or_default()
                .push(dep.to_task);
            next.predecessors_of
                .entry(dep.to_task)
                .or_default()
                .push(dep.from_task);
            next.incident.entry(dep.from_task).or_default().push(dep.id);
            next.incident.entry(dep.to_task).or_default().push(dep.id);
            next.dependencies.insert(dep.id, dep.clone());
        }

        for (i, row) in rows.iter().enumerate() {
            if let Some(resource) = row.resource_id {
                next.resource_row.insert(resource, i);
            }
        }

        *self = next;
    }

    pub fn tasks_for_resource(&self, resource: Uuid) -> &[Uuid] {
        self.resource_tasks
            .get(&resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tasks_for_order(&self, order: Uuid) -> &[Uuid] {
        self.order_tasks
            .get(&order)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn successors(&self, task: Uuid) -> &[Uuid] {
        self.successors_of.get(&task).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, task: Uuid) -> &[Uuid] {
        self.predecessors_of
            .get(&task)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dependency(&self, id: Uuid) -> Option<&TaskDependency> {
        self.dependencies.get(&id)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &TaskDependency> {
        self.dependencies.values()
    }

    /// Dependency ids touching the given task, in either direction.
    pub fn incident_dependencies(&self, task: Uuid) -> &[Uuid] {
        self.incident.get(&task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Row index of a resource in the current layout, if it has one
    /// (collapsed groups hide their member resources).
    pub fn row_of_resource(&self, resource: Uuid) -> Option<usize> {
        self.resource_row.get(&resource).copied()
    }

    /// Transitive closure over the dependency adjacency in the requested
    /// direction, excluding the origin. Terminates on cyclic data via the
    /// visited set.
    pub fn dependency_chain(&self, origin: Uuid, direction: ChainDirection) -> Vec<Uuid> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut queue: VecDeque<Uuid> = VecDeque::new();
        let mut out = Vec::new();
        visited.insert(origin);
        queue.push_back(origin);

        while let Some(current) = queue.pop_front() {
            let mut walk = |neighbors: &[Uuid], queue: &mut VecDeque<Uuid>, out: &mut Vec<Uuid>| {
                for &n in neighbors {
                    if visited.insert(n) {
                        out.push(n);
                        queue.push_back(n);
                    }
                }
            };
            match direction {
                ChainDirection::Predecessors => {
                    walk(self.predecessors(current), &mut queue, &mut out)
                }
                ChainDirection::Successors => walk(self.successors(current), &mut queue, &mut out),
                ChainDirection::Both => {
                    walk(self.predecessors(current), &mut queue, &mut out);
                    walk(self.successors(current), &mut queue, &mut out);
                }
            }
        }
        out
    }
}

/// The contiguous slice of rows intersecting `[scroll_y, scroll_y + height]`,
/// expanded by a fixed buffer on each side. Rows are contiguous and sorted
/// by `virtual_y`, so the first visible row is found by binary search.
pub fn visible_row_range(rows: &[VirtualRow], scroll_y: f32, height: f32) -> Range<usize> {
    if rows.is_empty() {
        return 0..0;
    }
    // First row whose bottom edge is below the top of the viewport.
    let first = rows.partition_point(|r| r.bottom() <= scroll_y);
    let mut last = first;
    while last < rows.len() && rows[last].virtual_y < scroll_y + height {
        last += 1;
    }
    first.saturating_sub(ROW_BUFFER)..(last + ROW_BUFFER).min(rows.len())
}
