//! Per-category platform pools
//!
//! Platforms are instantiated once at level load and then shuttle between a
//! category queue and a ring slot. A [`Platform`] is not `Clone`, so a value
//! lives in exactly one of the two places at any time.

use std::collections::VecDeque;

use thiserror::Error;

use super::category::{PerCategory, PlatformCategory};
use crate::scene::{NodeId, Prototype, SceneGraph};

/// Pool failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Preload depth is below steady-state consumption
    #[error("no {category} platforms left in the pool (preload depth too shallow)")]
    PoolExhausted { category: PlatformCategory },
    /// `create_queues` never saw this category
    #[error("no queue exists for {category} platforms")]
    MissingQueue { category: PlatformCategory },
}

/// A pooled platform instance
#[derive(Debug, PartialEq, Eq)]
pub struct Platform {
    node: NodeId,
    category: PlatformCategory,
}

impl Platform {
    pub(crate) fn new(node: NodeId, category: PlatformCategory) -> Self {
        Self { node, category }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn category(&self) -> PlatformCategory {
        self.category
    }
}

/// FIFO queues of inactive platforms, one per category
#[derive(Debug, Default)]
pub struct PlatformPool {
    queues: PerCategory<Option<VecDeque<Platform>>>,
    capacity: PerCategory<usize>,
}

impl PlatformPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one empty queue per distinct category (idempotent)
    pub fn create_queues(&mut self, categories: impl IntoIterator<Item = PlatformCategory>) {
        for category in categories {
            let queue = self.queues.get_mut(category);
            if queue.is_none() {
                *queue = Some(VecDeque::new());
            }
        }
    }

    /// Instantiate `count_per_ring * rings` inactive platforms and enqueue them
    ///
    /// Returns the number of platforms created.
    pub fn fill<S: SceneGraph>(
        &mut self,
        scene: &mut S,
        category: PlatformCategory,
        template: &Prototype,
        count_per_ring: usize,
        rings: usize,
        parent: Option<NodeId>,
    ) -> Result<usize, PoolError> {
        let queue = self
            .queues
            .get_mut(category)
            .as_mut()
            .ok_or(PoolError::MissingQueue { category })?;

        let amount = count_per_ring * rings;
        queue.reserve(amount);
        for _ in 0..amount {
            let node = scene.instantiate(template, category.as_str(), parent);
            scene.set_active(node, false);
            queue.push_back(Platform::new(node, category));
        }
        *self.capacity.get_mut(category) += amount;

        log::debug!("Pool {}: +{} ({} per ring x {} rings)", category, amount, count_per_ring, rings);
        Ok(amount)
    }

    /// Dequeue the oldest platform of a category
    pub fn take(&mut self, category: PlatformCategory) -> Result<Platform, PoolError> {
        self.queues
            .get_mut(category)
            .as_mut()
            .ok_or(PoolError::MissingQueue { category })?
            .pop_front()
            .ok_or(PoolError::PoolExhausted { category })
    }

    /// Deactivate a platform and enqueue it at the tail
    ///
    /// The caller must have detached it from its ring already.
    pub fn give<S: SceneGraph>(&mut self, scene: &mut S, platform: Platform) {
        scene.set_active(platform.node, false);
        match self.queues.get_mut(platform.category) {
            Some(queue) => queue.push_back(platform),
            None => {
                log::warn!(
                    "Dropping {} platform {:?}: no queue for its category",
                    platform.category,
                    platform.node
                );
                scene.destroy(platform.node);
            }
        }
    }

    /// Return a loose node by its tag
    ///
    /// Nodes whose tag does not name a pooled category are destroyed rather
    /// than enqueued. Returns whether the node went back into a queue.
    pub fn give_tagged<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId) -> bool {
        let tag = scene.tag(node).unwrap_or_default().to_string();
        let category = PlatformCategory::from_tag(&tag).filter(|c| self.has_queue(*c));
        match category {
            Some(category) => {
                self.give(scene, Platform::new(node, category));
                true
            }
            None => {
                log::warn!("Node {:?} tagged {:?} is not a pooled platform, dropping it", node, tag);
                scene.destroy(node);
                false
            }
        }
    }

    pub fn has_queue(&self, category: PlatformCategory) -> bool {
        self.queues.get(category).is_some()
    }

    /// Platforms currently waiting in the category's queue
    pub fn available(&self, category: PlatformCategory) -> usize {
        self.queues.get(category).as_ref().map_or(0, VecDeque::len)
    }

    /// Total platforms created for the category
    pub fn capacity(&self, category: PlatformCategory) -> usize {
        *self.capacity.get(category)
    }

    /// Node at the head of the queue (next to be taken)
    pub fn peek(&self, category: PlatformCategory) -> Option<NodeId> {
        self.queues
            .get(category)
            .as_ref()
            .and_then(|q| q.front())
            .map(Platform::node)
    }
}
