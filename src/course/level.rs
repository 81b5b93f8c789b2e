//! Level descriptors
//!
//! [`LevelConfig`] is author-time data (JSON). [`Level`] is the loaded form:
//! the config plus the pools it owns and the root node its geometry lives under.

use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::category::{PerCategory, PlatformCategory};
use super::pool::{PlatformPool, PoolError};
use crate::scene::{NodeId, Prototype, SceneGraph};

/// Default platforms per ring (40° apart)
pub const DEFAULT_SLOT_COUNT: usize = 9;

/// Tag of ring containers
pub const LAYER_TAG: &str = "Layer";
/// Tag of moving wall instances
pub const WALL_TAG: &str = "MovingWall";
/// Tag of the terminal finish object
pub const FINISH_TAG: &str = "Finish";
/// Tag of the per-level root node
pub const ROOT_TAG: &str = "Layers";

/// Problems in level data that stop generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no levels to load")]
    NoLevels,
    #[error("level {level:?} has no usable platforms")]
    NoPlatforms { level: String },
    #[error("level {level:?} has zero slots per ring")]
    ZeroSlots { level: String },
    #[error("level {level:?} preloads zero rings")]
    ZeroPreload { level: String },
    #[error("level {level:?} has zero total layers")]
    ZeroLayers { level: String },
    #[error("moving walls are enabled but the spawn chance is zero")]
    ZeroWallChance,
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// A platform kind usable in a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformTemplate {
    pub category: PlatformCategory,
    pub prototype: Prototype,
    /// Maximum occurrences in one ring
    pub max_per_ring: u32,
}

impl PlatformTemplate {
    pub fn new(category: PlatformCategory, prototype: Prototype, max_per_ring: u32) -> Self {
        Self {
            category,
            prototype,
            max_per_ring,
        }
    }
}

fn default_slot_count() -> usize {
    DEFAULT_SLOT_COUNT
}

/// Static configuration for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    /// Rings in the whole level before the finish
    pub total_layers: u32,
    /// Rings kept built ahead of the player
    pub preload_depth: u32,
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,
    pub platforms: Vec<PlatformTemplate>,
    pub finish: Prototype,
    /// Enables moving walls when present
    #[serde(default)]
    pub moving_wall: Option<Prototype>,
}

impl LevelConfig {
    /// Check hard errors, log soft ones
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.name.clone();
        if self.platforms.is_empty() {
            return Err(ConfigError::NoPlatforms { level });
        }
        if self.slot_count == 0 {
            return Err(ConfigError::ZeroSlots { level });
        }
        if self.preload_depth == 0 {
            return Err(ConfigError::ZeroPreload { level });
        }
        if self.total_layers == 0 {
            return Err(ConfigError::ZeroLayers { level });
        }

        for template in self.platforms.iter().filter(|t| t.max_per_ring == 0) {
            log::warn!(
                "Level {:?}: {} platforms have max_per_ring 0 and will never spawn",
                self.name,
                template.category
            );
        }

        let caps = self.max_per_ring();
        let non_gap: u32 = caps.iter().filter(|(c, _)| *c != PlatformCategory::Gap).map(|(_, n)| *n).sum();
        if (non_gap as usize) < self.slot_count.saturating_sub(1) {
            log::warn!(
                "Level {:?}: non-gap caps sum to {} for {} slots, rings will have empty slots",
                self.name,
                non_gap,
                self.slot_count
            );
        }
        Ok(())
    }

    /// Per-ring cap per category (first template of a category wins)
    pub fn max_per_ring(&self) -> PerCategory<u32> {
        let mut caps = PerCategory::<u32>::default();
        let mut seen = PerCategory::<bool>::default();
        for template in &self.platforms {
            if !*seen.get(template.category) {
                *seen.get_mut(template.category) = true;
                *caps.get_mut(template.category) = template.max_per_ring;
            }
        }
        caps
    }

    /// Categories present among the templates, in template order
    pub fn categories(&self) -> Vec<PlatformCategory> {
        let mut out: Vec<PlatformCategory> = Vec::new();
        for template in &self.platforms {
            if !out.contains(&template.category) {
                out.push(template.category);
            }
        }
        out
    }

    /// Degrees between neighbouring slots
    pub fn slot_angle(&self) -> f32 {
        360.0 / self.slot_count.max(1) as f32
    }
}

/// Ordered list of levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCatalog {
    pub levels: Vec<LevelConfig>,
}

impl LevelCatalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Built-in three level catalog
    pub fn builtin() -> Self {
        let template = |category: PlatformCategory, max: u32| {
            PlatformTemplate::new(
                category,
                Prototype::new(format!("{category}Platform"), category.as_str()),
                max,
            )
        };
        let finish = Prototype::new("FinishPlatform", FINISH_TAG);

        Self {
            levels: vec![
                LevelConfig {
                    name: "Level 1".into(),
                    total_layers: 20,
                    preload_depth: 6,
                    slot_count: DEFAULT_SLOT_COUNT,
                    platforms: vec![
                        template(PlatformCategory::Safe, 6),
                        template(PlatformCategory::Hazard, 2),
                        template(PlatformCategory::Gap, 1),
                    ],
                    finish: finish.clone(),
                    moving_wall: None,
                },
                LevelConfig {
                    name: "Level 2".into(),
                    total_layers: 35,
                    preload_depth: 6,
                    slot_count: DEFAULT_SLOT_COUNT,
                    platforms: vec![
                        template(PlatformCategory::Safe, 4),
                        template(PlatformCategory::Hazard, 4),
                        template(PlatformCategory::Gap, 2),
                    ],
                    finish: finish.clone(),
                    moving_wall: None,
                },
                LevelConfig {
                    name: "Level 3".into(),
                    total_layers: 50,
                    preload_depth: 7,
                    slot_count: DEFAULT_SLOT_COUNT,
                    platforms: vec![
                        template(PlatformCategory::Safe, 3),
                        template(PlatformCategory::Hazard, 5),
                        template(PlatformCategory::Gap, 2),
                    ],
                    finish,
                    moving_wall: Some(Prototype::new("SpinningWall", WALL_TAG)),
                },
            ],
        }
    }
}

/// A loaded level: config plus the runtime queues it owns
#[derive(Debug)]
pub struct Level {
    config: LevelConfig,
    pool: PlatformPool,
    walls: VecDeque<NodeId>,
    root: NodeId,
}

impl Level {
    /// Build the level root under `parent` and preload every queue
    pub fn load<S: SceneGraph>(
        config: LevelConfig,
        scene: &mut S,
        parent: Option<NodeId>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let origin = parent.and_then(|p| scene.position(p)).unwrap_or(Vec3::ZERO);
        let root = scene.create_container(ROOT_TAG, parent, origin);

        let mut pool = PlatformPool::new();
        pool.create_queues(config.categories());
        let rings = config.preload_depth as usize;
        let caps = config.max_per_ring();
        for category in config.categories() {
            let Some(template) = config.platforms.iter().find(|t| t.category == category) else {
                continue;
            };
            pool.fill(scene, category, &template.prototype, *caps.get(category) as usize, rings, Some(root))?;
        }

        let mut walls = VecDeque::new();
        if let Some(prototype) = &config.moving_wall {
            for _ in 0..rings {
                let wall = scene.instantiate(prototype, WALL_TAG, Some(root));
                scene.set_active(wall, false);
                walls.push_back(wall);
            }
        }

        log::info!(
            "Loaded {:?}: {} layers, {} preloaded, {} slots, walls {}",
            config.name,
            config.total_layers,
            config.preload_depth,
            config.slot_count,
            if walls.is_empty() { "off" } else { "on" }
        );

        Ok(Self {
            config,
            pool,
            walls,
            root,
        })
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn pool(&self) -> &PlatformPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut PlatformPool {
        &mut self.pool
    }

    pub fn walls_enabled(&self) -> bool {
        self.config.moving_wall.is_some()
    }

    /// Next idle moving wall, if any
    pub fn take_wall(&mut self) -> Option<NodeId> {
        self.walls.pop_front()
    }

    /// Deactivate a wall and queue it for reuse
    pub fn give_wall<S: SceneGraph>(&mut self, scene: &mut S, wall: NodeId) {
        scene.set_active(wall, false);
        self.walls.push_back(wall);
    }

    pub fn idle_walls(&self) -> usize {
        self.walls.len()
    }
}
