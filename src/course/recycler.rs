//! Layer recycling
//!
//! Rings that leave the play volume give their platforms back to the pool
//! and make room for the next ring below. Platforms are always released
//! before the next ring is requested, so the new ring can reuse them.

use super::generator::{GenerateError, LayerGenerator, SpawnOutcome};
use super::level::LAYER_TAG;
use crate::scene::{NodeId, SceneGraph};

/// Outcome of recycling one ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecycleReport {
    /// Platforms returned to the pool
    pub returned: usize,
    /// Foreign children that were not pooled platforms
    pub dropped: usize,
    /// What replaced the ring
    pub next: SpawnOutcome,
}

/// What crossed the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Ring(RecycleReport),
    Wall,
    Unknown,
}

/// Totals for one boundary sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rings: usize,
    pub walls: usize,
    pub platforms: usize,
}

/// Horizontal boundary above the play volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerRecycler {
    boundary_y: f32,
}

impl LayerRecycler {
    pub fn new(boundary_y: f32) -> Self {
        Self { boundary_y }
    }

    pub fn boundary(&self) -> f32 {
        self.boundary_y
    }

    /// Whether a world height is past the boundary
    #[inline]
    pub fn has_crossed(&self, y: f32) -> bool {
        y >= self.boundary_y
    }

    /// Handle a node reported by a host trigger volume
    pub fn on_crossed<S: SceneGraph>(
        &self,
        generator: &mut LayerGenerator,
        scene: &mut S,
        node: NodeId,
    ) -> Result<Crossing, GenerateError> {
        if let Some(report) = self.recycle_ring(generator, scene, node)? {
            return Ok(Crossing::Ring(report));
        }
        if generator.release_wall(scene, node) {
            return Ok(Crossing::Wall);
        }
        log::warn!("Node {:?} ({:?}) crossed the boundary but is not a ring or wall", node, scene.tag(node));
        Ok(Crossing::Unknown)
    }

    /// Recycle every ring and wall at or past the boundary, oldest first
    pub fn sweep<S: SceneGraph>(
        &self,
        generator: &mut LayerGenerator,
        scene: &mut S,
    ) -> Result<SweepReport, GenerateError> {
        let crossed = |node: NodeId, scene: &S| scene.position(node).is_some_and(|p| self.has_crossed(p.y));

        let walls: Vec<NodeId> = generator
            .walls()
            .iter()
            .map(|w| w.node)
            .filter(|w| crossed(*w, scene))
            .collect();
        let rings: Vec<NodeId> = generator
            .rings()
            .map(|r| r.node())
            .filter(|r| crossed(*r, scene))
            .collect();

        let mut report = SweepReport::default();
        for wall in walls {
            if generator.release_wall(scene, wall) {
                report.walls += 1;
            }
        }
        for ring in rings {
            if let Some(recycled) = self.recycle_ring(generator, scene, ring)? {
                report.rings += 1;
                report.platforms += recycled.returned;
            }
        }
        Ok(report)
    }

    /// Return a ring's platforms, destroy its container, spawn the next ring
    ///
    /// Returns `Ok(None)` when `node` is not an active ring.
    pub fn recycle_ring<S: SceneGraph>(
        &self,
        generator: &mut LayerGenerator,
        scene: &mut S,
        node: NodeId,
    ) -> Result<Option<RecycleReport>, GenerateError> {
        let Some(mut ring) = generator.take_ring(&*scene, node) else {
            return Ok(None);
        };
        let root = generator.level().root();
        let pool = generator.level_mut().pool_mut();

        let platforms = ring.drain_platforms();
        let returned = platforms.len();
        for platform in platforms {
            // Detach first: destroying the container takes its children with it
            scene.reparent(platform.node(), Some(root));
            pool.give(scene, platform);
        }

        let mut dropped = 0;
        for child in scene.children(node) {
            if scene.tag(child) == Some(LAYER_TAG) {
                continue;
            }
            scene.reparent(child, Some(root));
            if !pool.give_tagged(scene, child) {
                dropped += 1;
            }
        }

        scene.destroy(node);
        log::debug!("Recycled ring {} ({} platforms)", ring.index(), returned);

        let next = generator.spawn_next(scene)?;
        Ok(Some(RecycleReport {
            returned,
            dropped,
            next,
        }))
    }
}
