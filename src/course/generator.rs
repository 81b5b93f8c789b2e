//! Layer generation
//!
//! Each call to [`LayerGenerator::spawn_next`] builds one ring of platforms
//! below the previous one, drawing every platform from the level's pool.
//! Once the level's layer budget is spent the finish object is placed instead
//! and the generator stops for good.

use std::collections::VecDeque;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use thiserror::Error;

use super::category::{PerCategory, PlatformCategory};
use super::level::{FINISH_TAG, LAYER_TAG, Level};
use super::pool::{Platform, PoolError};
use crate::audio::{AudioCue, AudioSink};
use crate::persistence::Persistence;
use crate::scene::{NodeId, SceneGraph};
use crate::score::ScoreKeeper;
use crate::tuning::Tuning;

/// Moving walls start at a random yaw in this range (degrees)
const WALL_YAW_RANGE: std::ops::Range<f32> = 40.0..320.0;

/// Hard failure of one generation step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("ring {ring}: {source}")]
    Pool {
        ring: u32,
        #[source]
        source: PoolError,
    },
}

/// Generator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Rings left to emit
    Generating,
    /// Finish placed, nothing more to emit
    Finished,
    /// Stopped after a hard failure
    Halted,
}

/// What a `spawn_next` call produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Ring(NodeId),
    Finish(NodeId),
    Idle,
}

/// Scoring data attached to a gap platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapTrigger {
    pub node: NodeId,
    /// Base points before the multiplier
    pub points: u32,
}

impl GapTrigger {
    /// Award the gap's points and play the score cue
    ///
    /// Returns the points actually added.
    pub fn fire<A, P>(&self, score: &mut ScoreKeeper, audio: &mut A, store: &mut P, now: f32) -> u64
    where
        A: AudioSink + ?Sized,
        P: Persistence + ?Sized,
    {
        let added = score.add_score(self.points, now, store);
        audio.play(AudioCue::Score);
        added
    }
}

/// One generated layer
#[derive(Debug)]
pub struct Ring {
    node: NodeId,
    index: u32,
    slots: Vec<Option<Platform>>,
    triggers: Vec<GapTrigger>,
}

impl Ring {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Emission index within the level (0-based)
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn slots(&self) -> &[Option<Platform>] {
        &self.slots
    }

    /// Category in each slot, `None` for slots left empty
    pub fn layout(&self) -> Vec<Option<PlatformCategory>> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map(Platform::category))
            .collect()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn triggers(&self) -> &[GapTrigger] {
        &self.triggers
    }

    /// Move every platform out of the ring, leaving empty slots
    pub(crate) fn drain_platforms(&mut self) -> Vec<Platform> {
        self.triggers.clear();
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

/// A moving wall currently in play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWall {
    pub node: NodeId,
    pub clockwise: bool,
}

/// Result of choosing a category for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotPick {
    Category(PlatformCategory),
    /// Only the reserved gap is left; leave this slot empty
    Skip,
    /// Nothing left in the budget
    Exhausted,
}

/// Per-ring working copy of the category caps
///
/// `None` means the category has been removed and can no longer be picked.
#[derive(Debug, Clone)]
struct Budget {
    remaining: PerCategory<Option<u32>>,
}

impl Budget {
    fn new(level: &Level) -> Self {
        let caps = level.config().max_per_ring();
        let mut remaining = PerCategory::<Option<u32>>::default();
        for category in level.config().categories() {
            *remaining.get_mut(category) = Some(*caps.get(category));
        }
        Self { remaining }
    }

    fn contains(&self, category: PlatformCategory) -> bool {
        self.remaining.get(category).is_some()
    }

    fn left(&self, category: PlatformCategory) -> u32 {
        self.remaining.get(category).unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.remaining.iter().all(|(_, r)| r.is_none())
    }

    fn remove(&mut self, category: PlatformCategory) {
        *self.remaining.get_mut(category) = None;
    }

    /// Use one unit, removing the category once it hits zero
    fn consume(&mut self, category: PlatformCategory) {
        let left = self.left(category).saturating_sub(1);
        if left == 0 {
            self.remove(category);
        } else {
            *self.remaining.get_mut(category) = Some(left);
        }
    }
}

/// Builds rings for one level
#[derive(Debug)]
pub struct LayerGenerator {
    level: Level,
    rng: Pcg32,
    state: GeneratorState,
    /// 1-based level index, base points per gap
    level_tier: u32,
    layers_emitted: u32,
    layer_step: f32,
    wall_chance: u32,
    last_ring: Option<NodeId>,
    /// World position of the newest ring when it was last seen
    last_position: Option<Vec3>,
    rings: VecDeque<Ring>,
    walls: Vec<ActiveWall>,
    finish: Option<NodeId>,
}

impl LayerGenerator {
    pub fn new(level: Level, level_tier: u32, tuning: &Tuning, seed: u64) -> Self {
        Self {
            level,
            rng: Pcg32::seed_from_u64(seed),
            state: GeneratorState::Generating,
            level_tier,
            layers_emitted: 0,
            layer_step: tuning.layer_step,
            wall_chance: tuning.moving_wall_chance.max(1),
            last_ring: None,
            last_position: None,
            rings: VecDeque::new(),
            walls: Vec::new(),
            finish: None,
        }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn level_tier(&self) -> u32 {
        self.level_tier
    }

    pub fn layers_emitted(&self) -> u32 {
        self.layers_emitted
    }

    pub fn total_layers(&self) -> u32 {
        self.level.config().total_layers
    }

    /// Active rings, oldest first
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter()
    }

    pub fn ring(&self, node: NodeId) -> Option<&Ring> {
        self.rings.iter().find(|r| r.node == node)
    }

    pub fn walls(&self) -> &[ActiveWall] {
        &self.walls
    }

    pub fn finish(&self) -> Option<NodeId> {
        self.finish
    }

    /// Scoring data for a gap platform currently in a ring
    pub fn gap_trigger(&self, node: NodeId) -> Option<GapTrigger> {
        self.rings
            .iter()
            .flat_map(|r| r.triggers.iter())
            .find(|t| t.node == node)
            .copied()
    }

    /// Stop emitting after a hard failure
    pub fn halt(&mut self) {
        if self.state != GeneratorState::Halted {
            log::warn!("Layer generation halted after {} layers", self.layers_emitted);
        }
        self.state = GeneratorState::Halted;
    }

    /// Fill the preload window
    pub fn spawn_initial<S: SceneGraph>(&mut self, scene: &mut S) -> Result<(), GenerateError> {
        for _ in 0..self.level.config().preload_depth {
            self.spawn_next(scene)?;
        }
        Ok(())
    }

    /// Emit the next ring, or the finish once every layer is out
    pub fn spawn_next<S: SceneGraph>(&mut self, scene: &mut S) -> Result<SpawnOutcome, GenerateError> {
        if self.state != GeneratorState::Generating {
            return Ok(SpawnOutcome::Idle);
        }

        let position = self.next_position(scene);

        if self.layers_emitted >= self.total_layers() {
            let root = self.level.root();
            let finish = scene.instantiate(&self.level.config().finish, FINISH_TAG, Some(root));
            scene.set_position(finish, position);
            scene.set_active(finish, true);
            self.finish = Some(finish);
            self.state = GeneratorState::Finished;
            log::info!("All {} layers out, finish placed at y={:.2}", self.layers_emitted, position.y);
            return Ok(SpawnOutcome::Finish(finish));
        }

        let node = scene.create_container(LAYER_TAG, Some(self.level.root()), position);
        self.last_ring = Some(node);
        self.last_position = Some(position);

        if self.level.walls_enabled() && self.rng.random_range(0..self.wall_chance) == 0 {
            self.spawn_wall(scene, position);
        }

        let slot_count = self.level.config().slot_count;
        let mut ring = Ring {
            node,
            index: self.layers_emitted,
            slots: (0..slot_count).map(|_| None).collect(),
            triggers: Vec::new(),
        };
        let filled = self.fill_slots(scene, &mut ring);
        // Partial rings are still tracked so their platforms get recycled
        self.rings.push_back(ring);
        filled?;

        self.layers_emitted += 1;
        log::debug!("Ring {} at y={:.2}", self.layers_emitted, position.y);
        Ok(SpawnOutcome::Ring(node))
    }

    /// Remove a ring from the active set, handing it to the caller
    ///
    /// Taking the newest ring remembers where it was, so the next ring still
    /// lands one step below it after the container is destroyed.
    pub fn take_ring<S: SceneGraph>(&mut self, scene: &S, node: NodeId) -> Option<Ring> {
        if self.last_ring == Some(node) {
            if let Some(position) = scene.position(node) {
                self.last_position = Some(position);
            }
        }
        let index = self.rings.iter().position(|r| r.node == node)?;
        self.rings.remove(index)
    }

    /// Return an active wall to the level's wall queue
    pub fn release_wall<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId) -> bool {
        let Some(index) = self.walls.iter().position(|w| w.node == node) else {
            return false;
        };
        self.walls.swap_remove(index);
        self.level.give_wall(scene, node);
        true
    }

    fn next_position<S: SceneGraph>(&self, scene: &S) -> Vec3 {
        self.last_ring
            .and_then(|r| scene.position(r))
            .or(self.last_position)
            .map(|p| p - Vec3::Y * self.layer_step)
            .or_else(|| scene.position(self.level.root()))
            .unwrap_or(Vec3::ZERO)
    }

    fn spawn_wall<S: SceneGraph>(&mut self, scene: &mut S, position: Vec3) {
        let Some(node) = self.level.take_wall() else {
            log::warn!("No idle moving wall for ring {}", self.layers_emitted);
            return;
        };
        scene.reparent(node, Some(self.level.root()));
        scene.set_position(node, position);
        scene.set_yaw(node, self.rng.random_range(WALL_YAW_RANGE));
        scene.set_active(node, true);
        let clockwise = self.rng.random_bool(0.5);
        self.walls.push(ActiveWall { node, clockwise });
    }

    fn fill_slots<S: SceneGraph>(&mut self, scene: &mut S, ring: &mut Ring) -> Result<(), GenerateError> {
        let slot_count = ring.slots.len();
        let slot_angle = self.level.config().slot_angle();
        let mut budget = Budget::new(&self.level);

        for i in 0..slot_count {
            let category = match self.pick_category(&mut budget, i, slot_count) {
                SlotPick::Category(category) => category,
                SlotPick::Skip => {
                    log::warn!("Ring {} slot {}: only the final gap is left, slot stays empty", ring.index, i);
                    continue;
                }
                SlotPick::Exhausted => {
                    log::warn!(
                        "Ring {}: not enough platforms to close the ring, {} of {} slots filled",
                        ring.index,
                        ring.filled(),
                        slot_count
                    );
                    break;
                }
            };

            let platform = self
                .level
                .pool_mut()
                .take(category)
                .map_err(|source| GenerateError::Pool { ring: ring.index, source })?;
            let node = platform.node();
            scene.reparent(node, Some(ring.node));
            scene.set_local(node, Vec3::ZERO, slot_angle * i as f32);
            scene.set_active(node, true);

            if category == PlatformCategory::Gap {
                ring.triggers.push(GapTrigger { node, points: self.level_tier });
            }
            ring.slots[i] = Some(platform);
        }
        Ok(())
    }

    fn pick_category(&mut self, budget: &mut Budget, slot: usize, slot_count: usize) -> SlotPick {
        let last = slot + 1 == slot_count;
        loop {
            let category = if slot == 0 && budget.contains(PlatformCategory::Safe) {
                PlatformCategory::Safe
            } else if last && budget.contains(PlatformCategory::Gap) {
                PlatformCategory::Gap
            } else {
                if budget.is_empty() {
                    return SlotPick::Exhausted;
                }
                // The last unit of gap budget is held back for the final slot
                let eligible: Vec<PlatformCategory> = PlatformCategory::ALL
                    .into_iter()
                    .filter(|c| budget.contains(*c))
                    .filter(|c| last || *c != PlatformCategory::Gap || budget.left(*c) > 1)
                    .collect();
                if eligible.is_empty() {
                    return SlotPick::Skip;
                }
                eligible[self.rng.random_range(0..eligible.len())]
            };

            if budget.left(category) == 0 {
                // Configured with a zero cap: drop it and choose again
                budget.remove(category);
                continue;
            }
            budget.consume(category);
            return SlotPick::Category(category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::level::{LevelConfig, PlatformTemplate, WALL_TAG};
    use crate::scene::{Prototype, Scene};
    use proptest::prelude::*;

    fn config(caps: &[(PlatformCategory, u32)], total_layers: u32, preload: u32) -> LevelConfig {
        LevelConfig {
            name: "test".into(),
            total_layers,
            preload_depth: preload,
            slot_count: 9,
            platforms: caps
                .iter()
                .map(|(c, n)| PlatformTemplate::new(*c, Prototype::new(c.as_str(), c.as_str()), *n))
                .collect(),
            finish: Prototype::new("finish", FINISH_TAG),
            moving_wall: None,
        }
    }

    fn generator(scene: &mut Scene, config: LevelConfig, seed: u64) -> LayerGenerator {
        let level = Level::load(config, scene, None).unwrap();
        LayerGenerator::new(level, 2, &Tuning::default(), seed)
    }

    fn count(layout: &[Option<PlatformCategory>], category: PlatformCategory) -> usize {
        layout.iter().filter(|c| **c == Some(category)).count()
    }

    const EXAMPLE: [(PlatformCategory, u32); 3] = [
        (PlatformCategory::Safe, 3),
        (PlatformCategory::Hazard, 4),
        (PlatformCategory::Gap, 1),
    ];

    #[test]
    fn test_example_ring_composition() {
        for seed in 0..50 {
            let mut scene = Scene::new();
            let mut generator = generator(&mut scene, config(&EXAMPLE, 10, 2), seed);
            let outcome = generator.spawn_next(&mut scene).unwrap();
            let ring = generator.rings().next().unwrap();
            assert_eq!(outcome, SpawnOutcome::Ring(ring.node()));

            let layout = ring.layout();
            assert_eq!(layout[0], Some(PlatformCategory::Safe));
            assert_eq!(layout[8], Some(PlatformCategory::Gap));
            let middle = &layout[1..8];
            assert_eq!(count(middle, PlatformCategory::Safe), 2);
            assert_eq!(count(middle, PlatformCategory::Hazard), 4);
            assert_eq!(count(middle, PlatformCategory::Gap), 0);
            assert_eq!(ring.filled(), 8);

            let pool = generator.level().pool();
            assert_eq!(pool.available(PlatformCategory::Safe), 6 - 3);
            assert_eq!(pool.available(PlatformCategory::Hazard), 8 - 4);
            assert_eq!(pool.available(PlatformCategory::Gap), 2 - 1);
        }
    }

    #[test]
    fn test_platforms_are_placed_around_the_ring() {
        let mut scene = Scene::new();
        let caps = [(PlatformCategory::Safe, 8), (PlatformCategory::Gap, 1)];
        let mut generator = generator(&mut scene, config(&caps, 3, 1), 7);
        generator.spawn_next(&mut scene).unwrap();

        let ring = generator.rings().next().unwrap();
        assert_eq!(scene.children(ring.node()).len(), 9);
        for (i, slot) in ring.slots().iter().enumerate() {
            let node = slot.as_ref().unwrap().node();
            assert!(scene.is_active(node));
            assert_eq!(scene.parent(node), Some(ring.node()));
            assert_eq!(scene.yaw(node), Some(40.0 * i as f32));
            assert_eq!(scene.position(node), scene.position(ring.node()));
        }

        let gap = ring.slots()[8].as_ref().unwrap().node();
        assert_eq!(generator.gap_trigger(gap), Some(GapTrigger { node: gap, points: 2 }));
        let safe = ring.slots()[0].as_ref().unwrap().node();
        assert_eq!(generator.gap_trigger(safe), None);
    }

    #[test]
    fn test_rings_stack_downward() {
        let mut scene = Scene::new();
        let mut generator = generator(&mut scene, config(&EXAMPLE, 10, 3), 1);
        generator.spawn_initial(&mut scene).unwrap();

        let heights: Vec<f32> = generator
            .rings()
            .map(|r| scene.position(r.node()).unwrap().y)
            .collect();
        assert_eq!(heights, vec![0.0, -1.5, -3.0]);
    }

    #[test]
    fn test_finish_after_total_layers() {
        let mut scene = Scene::new();
        let mut generator = generator(&mut scene, config(&EXAMPLE, 4, 5), 3);
        for _ in 0..4 {
            assert!(matches!(generator.spawn_next(&mut scene).unwrap(), SpawnOutcome::Ring(_)));
        }
        assert_eq!(generator.state(), GeneratorState::Generating);

        let SpawnOutcome::Finish(finish) = generator.spawn_next(&mut scene).unwrap() else {
            panic!("expected the finish");
        };
        assert_eq!(generator.state(), GeneratorState::Finished);
        assert_eq!(scene.tag(finish), Some(FINISH_TAG));
        assert_eq!(scene.position(finish).unwrap().y, -6.0);
        assert!(scene.is_active(finish));

        assert_eq!(generator.spawn_next(&mut scene).unwrap(), SpawnOutcome::Idle);
        assert_eq!(generator.layers_emitted(), 4);
        assert_eq!(generator.rings().count(), 4);
    }

    #[test]
    fn test_zero_cap_category_is_never_drawn() {
        let caps = [
            (PlatformCategory::Safe, 0),
            (PlatformCategory::Hazard, 9),
            (PlatformCategory::Gap, 1),
        ];
        let mut scene = Scene::new();
        let mut generator = generator(&mut scene, config(&caps, 5, 2), 11);
        generator.spawn_initial(&mut scene).unwrap();

        for ring in generator.rings() {
            let layout = ring.layout();
            assert_eq!(layout[0], Some(PlatformCategory::Hazard));
            assert_eq!(layout[8], Some(PlatformCategory::Gap));
            assert_eq!(count(&layout, PlatformCategory::Safe), 0);
            assert_eq!(ring.filled(), 9);
        }
    }

    #[test]
    fn test_empty_budget_leaves_ring_open() {
        let caps = [(PlatformCategory::Safe, 2), (PlatformCategory::Hazard, 1)];
        let mut scene = Scene::new();
        let mut generator = generator(&mut scene, config(&caps, 5, 1), 5);
        generator.spawn_next(&mut scene).unwrap();

        let ring = generator.rings().next().unwrap();
        assert_eq!(ring.filled(), 3);
        assert_eq!(ring.layout()[0], Some(PlatformCategory::Safe));
        assert!(ring.layout()[3..].iter().all(Option::is_none));
    }

    #[test]
    fn test_reserved_gap_still_lands_last() {
        let caps = [(PlatformCategory::Safe, 1), (PlatformCategory::Gap, 1)];
        let mut scene = Scene::new();
        let mut generator = generator(&mut scene, config(&caps, 5, 1), 5);
        generator.spawn_next(&mut scene).unwrap();

        let layout = generator.rings().next().unwrap().layout();
        assert_eq!(layout[0], Some(PlatformCategory::Safe));
        assert!(layout[1..8].iter().all(Option::is_none));
        assert_eq!(layout[8], Some(PlatformCategory::Gap));
    }

    #[test]
    fn test_pool_exhaustion_is_a_hard_error() {
        let caps = [(PlatformCategory::Safe, 8), (PlatformCategory::Gap, 1)];
        let mut scene = Scene::new();
        let mut generator = generator(&mut scene, config(&caps, 5, 1), 9);
        generator.spawn_next(&mut scene).unwrap();

        let err = generator.spawn_next(&mut scene).unwrap_err();
        assert_eq!(
            err,
            GenerateError::Pool {
                ring: 1,
                source: PoolError::PoolExhausted { category: PlatformCategory::Safe },
            }
        );
        assert_eq!(generator.layers_emitted(), 1);
        // The partial ring stays tracked so it can still be recycled
        assert_eq!(generator.rings().count(), 2);
    }

    #[test]
    fn test_walls_spawn_beside_rings() {
        let mut config = config(&EXAMPLE, 10, 3);
        config.moving_wall = Some(Prototype::new("wall", WALL_TAG));
        let mut scene = Scene::new();
        let level = Level::load(config, &mut scene, None).unwrap();
        let tuning = Tuning {
            moving_wall_chance: 1,
            ..Default::default()
        };
        let mut generator = LayerGenerator::new(level, 1, &tuning, 4);
        generator.spawn_initial(&mut scene).unwrap();

        assert_eq!(generator.walls().len(), 3);
        assert_eq!(generator.level().idle_walls(), 0);
        let root = generator.level().root();
        for (wall, ring) in generator.walls().iter().zip(generator.rings()) {
            assert_eq!(scene.parent(wall.node), Some(root));
            assert!(scene.is_active(wall.node));
            assert_eq!(scene.position(wall.node), scene.position(ring.node()));
            let yaw = scene.yaw(wall.node).unwrap();
            assert!((40.0..320.0).contains(&yaw));
        }
        assert!(generator.level_mut().take_wall().is_none());
    }

    #[test]
    fn test_same_seed_same_course() {
        let layouts = |seed| {
            let mut scene = Scene::new();
            let mut generator = generator(&mut scene, config(&EXAMPLE, 10, 4), seed);
            generator.spawn_initial(&mut scene).unwrap();
            generator.rings().map(Ring::layout).collect::<Vec<_>>()
        };
        assert_eq!(layouts(42), layouts(42));
    }

    proptest! {
        #[test]
        fn prop_first_safe_last_gap(
            seed in any::<u64>(),
            safe in 1u32..6,
            hazard in 0u32..6,
            gap in 1u32..4,
        ) {
            let caps = [
                (PlatformCategory::Safe, safe),
                (PlatformCategory::Hazard, hazard),
                (PlatformCategory::Gap, gap),
            ];
            let mut scene = Scene::new();
            let mut generator = generator(&mut scene, config(&caps, 3, 3), seed);
            generator.spawn_initial(&mut scene).unwrap();

            for ring in generator.rings() {
                let layout = ring.layout();
                prop_assert_eq!(layout[0], Some(PlatformCategory::Safe));
                prop_assert_eq!(layout[8], Some(PlatformCategory::Gap));
                prop_assert!(count(&layout, PlatformCategory::Safe) as u32 <= safe);
                prop_assert!(count(&layout, PlatformCategory::Hazard) as u32 <= hazard);
                prop_assert!(count(&layout, PlatformCategory::Gap) as u32 <= gap);
                prop_assert_eq!(scene.children(ring.node()).len(), ring.filled());
            }
        }
    }
}
