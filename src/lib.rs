//! Ring Fall - an endless descent through rotating ring layers
//!
//! Core modules:
//! - `course`: Pooled platforms, ring generation and recycling
//! - `scene`: Scene graph abstraction plus an arena implementation
//! - `score`: Score, best score and combo multiplier
//! - `audio`: Cue playback
//! - `persistence`: Key/value save slots (memory, JSON file, LocalStorage)
//! - `run`: One play session wiring the above together
//! - `autopilot`: Scripted player for headless runs
//! - `tuning`: Data-driven gameplay constants

pub mod audio;
pub mod autopilot;
pub mod course;
pub mod persistence;
pub mod run;
pub mod scene;
pub mod score;
pub mod tuning;

pub use autopilot::{Autopilot, DemoOutcome};
pub use course::{LayerGenerator, LayerRecycler, Level, LevelCatalog, LevelConfig, PlatformCategory, PlatformPool};
pub use run::{Run, RunPhase};
pub use scene::{NodeId, Prototype, Scene, SceneGraph};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Seed used when none is given
    pub const DEFAULT_SEED: u64 = 0x5EED_F411;
    /// Native save file
    pub const SAVE_FILE: &str = "ring_fall_save.json";
    /// LocalStorage key prefix on the web
    pub const STORAGE_PREFIX: &str = "ring_fall_";
}
