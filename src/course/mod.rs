//! Course generation module
//!
//! Everything that builds and recycles the descending ring course:
//! - Platform categories and per-category pools
//! - Level descriptors (config + loaded runtime state)
//! - Ring generation and the finish transition
//! - Recycling rings that leave the play volume
//! - Course movement while the player falls
//!
//! All randomness comes from the generator's seeded RNG, so a seed and a
//! level config fully determine the course.

pub mod category;
pub mod generator;
pub mod level;
pub mod motion;
pub mod pool;
pub mod recycler;

pub use category::{PerCategory, PlatformCategory};
pub use generator::{
    ActiveWall, GapTrigger, GenerateError, GeneratorState, LayerGenerator, Ring, SpawnOutcome,
};
pub use level::{
    ConfigError, DEFAULT_SLOT_COUNT, FINISH_TAG, LAYER_TAG, Level, LevelCatalog, LevelConfig,
    PlatformTemplate, ROOT_TAG, WALL_TAG,
};
pub use motion::{FallingMover, spin_walls};
pub use pool::{Platform, PlatformPool, PoolError};
pub use recycler::{Crossing, LayerRecycler, RecycleReport, SweepReport};
