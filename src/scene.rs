use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Position, orientation and scale of a node or tracked pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_pose(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Recomputes the box after pushing all eight corners through a matrix.
    pub fn transformed(&self, matrix: &Mat4) -> Bounds {
        let mut result: Option<Bounds> = None;
        for corner in self.corners() {
            let point = matrix.transform_point3(corner);
            match result.as_mut() {
                Some(bounds) => bounds.expand(point),
                None => result = Some(Bounds::from_point(point)),
            }
        }
        result.unwrap_or(*self)
    }

    fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }
}

/// Stable reference to a node inside a `SceneGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A named node in the loaded model hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    /// Local-space bounds of the node's own geometry, absent for pure groups.
    pub bounds: Option<Bounds>,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            bounds: None,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default)]
struct Store {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
}

/// Thread-safe container mirroring the mutable state of the loaded model tree.
///
/// Clones share the same underlying store, so the presentation layer can hold
/// one handle and render from the state the game logic mutates.
#[derive(Debug, Default)]
pub struct SceneGraph {
    store: Arc<RwLock<Store>>,
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl SceneGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every node into a fresh store, detached from this handle.
    ///
    /// Node ids stay valid across the copy; `clone` keeps sharing one store.
    pub fn duplicate(&self) -> SceneGraph {
        let copy = self.store.read().clone();
        SceneGraph {
            store: Arc::new(RwLock::new(copy)),
        }
    }

    /// Inserts a node, attaching it under `parent` or as a root.
    pub fn add_node(&self, parent: Option<NodeId>, mut node: SceneNode) -> NodeId {
        let mut store = self.store.write();
        let id = NodeId(store.nodes.len());
        let parent = parent.filter(|parent| parent.0 < store.nodes.len());
        node.parent = parent;
        node.children.clear();
        store.nodes.push(node);
        match parent {
            Some(parent) => store.nodes[parent.0].children.push(id),
            None => store.roots.push(id),
        }
        id
    }

    pub fn node_count(&self) -> usize {
        self.store.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.store.read().roots.clone()
    }

    /// Returns a clone of the requested node.
    pub fn get(&self, id: NodeId) -> Option<SceneNode> {
        self.store.read().nodes.get(id.0).cloned()
    }

    pub fn name(&self, id: NodeId) -> Option<String> {
        self.store.read().nodes.get(id.0).map(|node| node.name.clone())
    }

    pub fn bounds(&self, id: NodeId) -> Option<Bounds> {
        self.store.read().nodes.get(id.0).and_then(|node| node.bounds)
    }

    pub fn is_visible(&self, id: NodeId) -> Option<bool> {
        self.store.read().nodes.get(id.0).map(|node| node.visible)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.store
            .read()
            .nodes
            .get(id.0)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Finds the first node with the given name, in traversal order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        let store = self.store.read();
        let mut stack: Vec<NodeId> = store.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &store.nodes[id.0];
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Depth-first preorder listing of `id` and every node below it.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let store = self.store.read();
        if id.0 >= store.nodes.len() {
            return Vec::new();
        }
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(store.nodes[current.0].children.iter().rev());
        }
        result
    }

    /// Applies a mutation to the requested node.
    pub fn update<F, R>(&self, id: NodeId, mut updater: F) -> Option<R>
    where
        F: FnMut(&mut SceneNode) -> R,
    {
        let mut store = self.store.write();
        let node = store.nodes.get_mut(id.0)?;
        Some(updater(node))
    }

    pub fn set_transform(&self, id: NodeId, transform: Transform) -> bool {
        self.update(id, |node| node.transform = transform).is_some()
    }

    pub fn set_visible(&self, id: NodeId, visible: bool) -> bool {
        self.update(id, |node| node.visible = visible).is_some()
    }

    /// Hides `id` and everything below it, returning the affected nodes in
    /// traversal order.
    pub fn hide_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let affected = self.subtree(id);
        let mut store = self.store.write();
        for node in &affected {
            store.nodes[node.0].visible = false;
        }
        affected
    }

    /// Local-to-world matrix obtained by chaining transforms up to the root.
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        let store = self.store.read();
        if id.0 >= store.nodes.len() {
            return None;
        }
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = store.nodes[node.0].parent;
        }
        let mut matrix = Mat4::IDENTITY;
        for node in chain.into_iter().rev() {
            matrix *= store.nodes[node.0].transform.to_matrix();
        }
        Some(matrix)
    }

    /// World-space bounds of the node's own geometry.
    pub fn world_bounds(&self, id: NodeId) -> Option<Bounds> {
        let bounds = self.bounds(id)?;
        let matrix = self.world_transform(id)?;
        Some(bounds.transformed(&matrix))
    }

    /// World-space bounds of every piece of geometry at or below `id`.
    pub fn subtree_world_bounds(&self, id: NodeId) -> Option<Bounds> {
        let mut result: Option<Bounds> = None;
        for node in self.subtree(id) {
            let Some(bounds) = self.world_bounds(node) else {
                continue;
            };
            result = Some(match result {
                Some(total) => total.union(&bounds),
                None => bounds,
            });
        }
        result
    }
}
