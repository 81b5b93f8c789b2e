//! Scene graph abstraction
//!
//! The course never talks to an engine directly. It sees opaque [`NodeId`]
//! handles and a handful of primitives: instantiate, activate/deactivate,
//! reparent, move, destroy. [`Scene`] is a small arena implementation used by
//! the headless demo and the tests.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Opaque handle to a node in the host scene
///
/// Handles carry a generation, so a handle to a destroyed node never aliases
/// a newer node that reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Object to clone when instantiating
///
/// Instances inherit the prototype's tag when the caller passes an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prototype {
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

impl Prototype {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }
}

/// Primitives the course needs from a host scene
///
/// Positions are world space. Yaw is in degrees around the vertical axis.
/// Destroying a node destroys everything still parented under it.
pub trait SceneGraph {
    /// Clone a prototype under `parent`, inactive, tagged with `tag`
    /// (or the prototype's own tag when `tag` is empty)
    fn instantiate(&mut self, prototype: &Prototype, tag: &str, parent: Option<NodeId>) -> NodeId;

    /// Create an empty, active container node at a world position
    fn create_container(&mut self, tag: &str, parent: Option<NodeId>, position: Vec3) -> NodeId;

    fn set_active(&mut self, node: NodeId, active: bool);

    fn is_active(&self, node: NodeId) -> bool;

    /// Move `node` under `parent`, keeping its world position
    ///
    /// A parent that is `node` itself or one of its descendants is ignored.
    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn tag(&self, node: NodeId) -> Option<&str>;

    /// World position, `None` if the node does not exist
    fn position(&self, node: NodeId) -> Option<Vec3>;

    fn set_position(&mut self, node: NodeId, position: Vec3);

    /// Set the offset from the parent's origin and the local yaw
    fn set_local(&mut self, node: NodeId, offset: Vec3, yaw_degrees: f32);

    fn yaw(&self, node: NodeId) -> Option<f32>;

    fn set_yaw(&mut self, node: NodeId, yaw_degrees: f32);

    fn destroy(&mut self, node: NodeId);

    fn contains(&self, node: NodeId) -> bool;
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    active: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Offset from the parent's origin (world position for roots)
    offset: Vec3,
    yaw: f32,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-backed scene graph
///
/// Destroyed slots go on a free list and are reused, so a course that keeps
/// recycling rings stays at a constant arena size. Translations compose
/// additively and yaw is local to each node: every rotation in the course is
/// around the vertical axis through a ring center, where all ring children sit.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocated slots, live or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let parent = node.parent;
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId { index, generation: 0 }
            }
        };
        self.live += 1;
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.push(id);
        }
        id
    }

    fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Whether `ancestor` is `node` or sits above it
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.node(id).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
    }
}

impl SceneGraph for Scene {
    fn instantiate(&mut self, prototype: &Prototype, tag: &str, parent: Option<NodeId>) -> NodeId {
        let parent = parent.filter(|p| self.contains(*p));
        let tag = if tag.is_empty() { prototype.tag.as_str() } else { tag };
        self.insert(Node {
            tag: tag.to_string(),
            active: false,
            parent,
            children: Vec::new(),
            offset: Vec3::ZERO,
            yaw: 0.0,
        })
    }

    fn create_container(&mut self, tag: &str, parent: Option<NodeId>, position: Vec3) -> NodeId {
        let parent = parent.filter(|p| self.contains(*p));
        let origin = parent.and_then(|p| self.position(p)).unwrap_or(Vec3::ZERO);
        self.insert(Node {
            tag: tag.to_string(),
            active: true,
            parent,
            children: Vec::new(),
            offset: position - origin,
            yaw: 0.0,
        })
    }

    fn set_active(&mut self, node: NodeId, active: bool) {
        if let Some(n) = self.node_mut(node) {
            n.active = active;
        }
    }

    fn is_active(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.active)
    }

    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) {
        let Some(world) = self.position(node) else {
            return;
        };
        let parent = parent.filter(|p| self.contains(*p) && !self.is_ancestor(node, *p));
        self.detach(node);
        let origin = parent.and_then(|p| self.position(p)).unwrap_or(Vec3::ZERO);
        if let Some(n) = self.node_mut(node) {
            n.parent = parent;
            n.offset = world - origin;
        }
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.push(node);
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    fn position(&self, node: NodeId) -> Option<Vec3> {
        let mut current = self.node(node)?;
        let mut world = current.offset;
        while let Some(parent) = current.parent.and_then(|p| self.node(p)) {
            world += parent.offset;
            current = parent;
        }
        Some(world)
    }

    fn set_position(&mut self, node: NodeId, position: Vec3) {
        let origin = self
            .parent(node)
            .and_then(|p| self.position(p))
            .unwrap_or(Vec3::ZERO);
        if let Some(n) = self.node_mut(node) {
            n.offset = position - origin;
        }
    }

    fn set_local(&mut self, node: NodeId, offset: Vec3, yaw_degrees: f32) {
        if let Some(n) = self.node_mut(node) {
            n.offset = offset;
            n.yaw = yaw_degrees;
        }
    }

    fn yaw(&self, node: NodeId) -> Option<f32> {
        self.node(node).map(|n| n.yaw)
    }

    fn set_yaw(&mut self, node: NodeId, yaw_degrees: f32) {
        if let Some(n) = self.node_mut(node) {
            n.yaw = yaw_degrees.rem_euclid(360.0);
        }
    }

    fn destroy(&mut self, node: NodeId) {
        if !self.contains(node) {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.remove(id) {
                stack.extend(removed.children);
            }
        }
    }

    fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }
}
