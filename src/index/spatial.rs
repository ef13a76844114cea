use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Task, VirtualRow};

/// Maximum entries per node. Bulk loads pack nodes to capacity.
const NODE_CAPACITY: usize = 8;

/// Axis-aligned bounding box in data space: x is seconds since the Unix
/// epoch, y is virtual row pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    fn intersects(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) * 0.5
    }

    fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) * 0.5
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: Uuid,
    bbox: Aabb,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { bbox: Aabb, entries: Vec<Entry> },
    Branch { bbox: Aabb, children: Vec<Node> },
}

impl Node {
    fn bbox(&self) -> &Aabb {
        match self {
            Node::Leaf { bbox, .. } => bbox,
            Node::Branch { bbox, .. } => bbox,
        }
    }
}

/// A balanced rectangle index over task bounding boxes, rebuilt by bulk
/// load (sort-tile-recursive packing) whenever the task set or row layout
/// changes. Queries run in O(log n + k).
#[derive(Debug, Default)]
pub struct SpatialIndex {
    root: Option<Node>,
    len: usize,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Full rebuild from the current tasks and row layout. Tasks whose
    /// resource has no row are skipped, never an error.
    pub fn rebuild<'a>(&mut self, tasks: impl Iterator<Item = &'a Task>, rows: &[VirtualRow]) {
        let row_of: HashMap<Uuid, &VirtualRow> = rows
            .iter()
            .filter_map(|r| r.resource_id.map(|id| (id, r)))
            .collect();

        let entries: Vec<Entry> = tasks
            .filter_map(|task| {
                let row = row_of.get(&task.resource_id)?;
                Some(Entry {
                    id: task.id,
                    bbox: Aabb {
                        min_x: task.start_time.timestamp() as f64,
                        min_y: row.virtual_y as f64,
                        max_x: task.end_time().timestamp() as f64,
                        max_y: row.bottom() as f64,
                    },
                })
            })
            .collect();

        self.len = entries.len();
        self.root = if entries.is_empty() {
            None
        } else {
            Some(pack_entries(entries))
        };
    }

    /// All task ids whose box contains the given point (hit-testing).
    pub fn query_point(&self, t: DateTime<Utc>, virtual_y: f32) -> Vec<Uuid> {
        let (x, y) = (t.timestamp() as f64, virtual_y as f64);
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            query_point_node(root, x, y, &mut out);
        }
        out
    }

    /// All task ids intersecting a rectangle in data space (marquee).
    pub fn query_rect(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_y: f32,
        max_y: f32,
    ) -> Vec<Uuid> {
        let rect = Aabb {
            min_x: start.timestamp() as f64,
            min_y: min_y as f64,
            max_x: end.timestamp() as f64,
            max_y: max_y as f64,
        };
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            query_rect_node(root, &rect, &mut out);
        }
        out
    }

    /// All task ids intersecting a time band regardless of row
    /// (horizontal viewport culling).
    pub fn query_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Uuid> {
        let rect = Aabb {
            min_x: start.timestamp() as f64,
            min_y: f64::NEG_INFINITY,
            max_x: end.timestamp() as f64,
            max_y: f64::INFINITY,
        };
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            query_rect_node(root, &rect, &mut out);
        }
        out
    }
}

fn bbox_of<T>(items: &[T], f: impl Fn(&T) -> &Aabb) -> Aabb {
    let mut bbox = *f(&items[0]);
    for item in &items[1..] {
        bbox = bbox.union(f(item));
    }
    bbox
}

/// Sort-tile-recursive packing: sort by x center, cut into vertical
/// slices, sort each slice by y center, chunk into full leaves, then
/// pack upward until a single root remains.
fn pack_entries(mut entries: Vec<Entry>) -> Node {
    entries.sort_by(|a, b| a.bbox.center_x().total_cmp(&b.bbox.center_x()));

    let leaf_count = entries.len().div_ceil(NODE_CAPACITY);
    let slice_count = (leaf_count as f64).sqrt().ceil() as usize;
    let slice_size = slice_count * NODE_CAPACITY;

    let mut leaves = Vec::with_capacity(leaf_count);
    for slice in entries.chunks(slice_size.max(1)) {
        let mut slice: Vec<Entry> = slice.to_vec();
        slice.sort_by(|a, b| a.bbox.center_y().total_cmp(&b.bbox.center_y()));
        for chunk in slice.chunks(NODE_CAPACITY) {
            leaves.push(Node::Leaf {
                bbox: bbox_of(chunk, |e| &e.bbox),
                entries: chunk.to_vec(),
            });
        }
    }
    pack_nodes(leaves)
}

fn pack_nodes(mut nodes: Vec<Node>) -> Node {
    while nodes.len() > 1 {
        let mut parents = Vec::with_capacity(nodes.len().div_ceil(NODE_CAPACITY));
        nodes.sort_by(|a, b| a.bbox().center_x().total_cmp(&b.bbox().center_x()));
        for chunk in nodes.chunks(NODE_CAPACITY) {
            parents.push(Node::Branch {
                bbox: bbox_of(chunk, |n| n.bbox()),
                children: chunk.to_vec(),
            });
        }
        nodes = parents;
    }
    nodes.remove(0)
}

fn query_point_node(node: &Node, x: f64, y: f64, out: &mut Vec<Uuid>) {
    if !node.bbox().contains_point(x, y) {
        return;
    }
    match node {
        Node::Leaf { entries, .. } => {
            for e in entries {
                if e.bbox.contains_point(x, y) {
                    out.push(e.id);
                }
            }
        }
        Node::Branch { children, .. } => {
            for child in children {
                query_point_node(child, x, y, out);
            }
        }
    }
}

fn query_rect_node(node: &Node, rect: &Aabb, out: &mut Vec<Uuid>) {
    if !node.bbox().intersects(rect) {
        return;
    }
    match node {
        Node::Leaf { entries, .. } => {
            for e in entries {
                if e.bbox.intersects(rect) {
                    out.push(e.id);
                }
            }
        }
        Node::Branch { children, .. } => {
            for child in children {
                query_rect_node(child, rect, out);
            }
        }
    }
}
