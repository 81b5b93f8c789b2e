//! A single play session on one level
//!
//! Wires the course to its collaborators: picks the level from persistence,
//! keeps the preload window filled, and turns player events (gap exits,
//! bounces, hazard hits, reaching the finish) into scoring, audio, movement
//! and level progression.

use crate::audio::{AudioCue, AudioSink};
use crate::course::{
    FallingMover, GeneratorState, LayerGenerator, LayerRecycler, Level, LevelCatalog,
    SweepReport, spin_walls,
};
use crate::persistence::{CURRENT_LEVEL_KEY, Persistence};
use crate::scene::{NodeId, SceneGraph};
use crate::score::{LevelProgress, ScoreKeeper};
use crate::tuning::Tuning;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Course active
    Playing,
    /// Player hit a hazard
    GameOver,
    /// Player reached the finish
    Finished,
    /// No level could be loaded
    Idle,
}

/// One session on the level selected by persistence
pub struct Run<S: SceneGraph, P: Persistence, A: AudioSink> {
    scene: S,
    store: P,
    audio: A,
    tuning: Tuning,
    generator: Option<LayerGenerator>,
    recycler: LayerRecycler,
    mover: FallingMover,
    score: ScoreKeeper,
    phase: RunPhase,
    level_index: usize,
    level_count: usize,
    /// Seconds since the run started
    time: f32,
}

impl<S: SceneGraph, P: Persistence, A: AudioSink> Run<S, P, A> {
    /// Load the persisted level and fill the preload window
    ///
    /// Configuration errors are logged and leave the run idle.
    pub fn start(catalog: &LevelCatalog, tuning: Tuning, mut scene: S, mut store: P, audio: A, seed: u64) -> Self {
        let score = ScoreKeeper::load(&store, tuning.multiplier_timeout);
        let level_count = catalog.levels.len();
        let level_index = select_level(&mut store, level_count);

        let mut generator = None;
        match catalog.levels.get(level_index) {
            None => log::error!("No levels to load, generation disabled"),
            Some(config) => match Level::load(config.clone(), &mut scene, None) {
                Ok(level) => {
                    let mut g = LayerGenerator::new(level, level_index as u32 + 1, &tuning, seed);
                    if let Err(e) = g.spawn_initial(&mut scene) {
                        log::error!("Preloading {:?} failed: {}", config.name, e);
                        g.halt();
                    }
                    generator = Some(g);
                }
                Err(e) => log::error!("Level {:?} not loaded: {}", config.name, e),
            },
        }

        let phase = if generator.is_some() {
            RunPhase::Playing
        } else {
            RunPhase::Idle
        };

        Self {
            scene,
            store,
            audio,
            recycler: LayerRecycler::new(tuning.recycle_height),
            mover: FallingMover::new(tuning.falling_speed),
            tuning,
            generator,
            score,
            phase,
            level_index,
            level_count,
            time: 0.0,
        }
    }

    /// Advance one step: move the course, spin walls, recycle crossed rings
    pub fn tick(&mut self, dt: f32) -> SweepReport {
        if self.phase != RunPhase::Playing {
            return SweepReport::default();
        }
        self.time += dt;
        self.score.tick(self.time);

        let Some(generator) = self.generator.as_mut() else {
            return SweepReport::default();
        };
        self.mover.step(&mut self.scene, generator.level().root(), dt);
        spin_walls(&mut self.scene, generator.walls(), self.tuning.wall_rotation_speed, dt);

        match self.recycler.sweep(generator, &mut self.scene) {
            Ok(report) => report,
            Err(e) => {
                log::error!("Generation failed: {}", e);
                generator.halt();
                SweepReport::default()
            }
        }
    }

    /// Player left a gap's volume; scores only when they left through the bottom
    pub fn on_gap_exit(&mut self, gap: NodeId, player_y: f32) -> Option<u64> {
        if self.phase != RunPhase::Playing {
            return None;
        }
        let trigger = self.generator.as_ref()?.gap_trigger(gap)?;
        let gap_y = self.scene.position(gap)?.y;
        if player_y >= gap_y {
            return None;
        }
        let added = trigger.fire(&mut self.score, &mut self.audio, &mut self.store, self.time);
        log::debug!("Gap passed: +{} (x{})", added, self.score.multiplier());
        Some(added)
    }

    /// Player reached the lowest point; the course starts moving up
    pub fn on_floor_reached(&mut self) {
        if self.phase == RunPhase::Playing {
            self.mover.start_falling();
        }
    }

    /// Player landed on a safe platform
    pub fn on_bounce(&mut self) {
        if self.phase != RunPhase::Playing {
            return;
        }
        self.mover.stop_falling();
        self.audio.play(AudioCue::Bounce);
    }

    /// Player hit a hazard; returns the percentage of the level completed
    pub fn on_hazard(&mut self) -> u32 {
        let percent = self.percent_completed();
        if self.phase != RunPhase::Playing {
            return percent;
        }
        self.phase = RunPhase::GameOver;
        self.mover.set_can_move(false);
        self.audio.play(AudioCue::GameOver);
        log::info!("Game over at {}% (score {})", percent, self.score.score());
        percent
    }

    /// Player reached the finish; stores and returns the next level index
    pub fn on_finish(&mut self) -> usize {
        let next = next_level(self.level_index, self.level_count);
        if self.phase != RunPhase::Playing {
            return next;
        }
        self.phase = RunPhase::Finished;
        self.mover.set_can_move(false);
        self.audio.play(AudioCue::Finish);
        self.store.set(CURRENT_LEVEL_KEY, next as i32);
        log::info!("Level {} passed! (score {})", self.level_index + 1, self.score.score());
        next
    }

    pub fn percent_completed(&self) -> u32 {
        let total = self.generator.as_ref().map_or(0, LayerGenerator::total_layers);
        self.score.percent_completed(total)
    }

    pub fn progress(&self) -> LevelProgress {
        LevelProgress {
            layers_emitted: self.generator.as_ref().map_or(0, LayerGenerator::layers_emitted),
            layers_passed: self.score.layers_passed(),
            score: self.score.score(),
            multiplier: self.score.multiplier(),
            best_score: self.score.best(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Whether the generator still has rings to emit
    pub fn generating(&self) -> bool {
        self.generator
            .as_ref()
            .is_some_and(|g| g.state() == GeneratorState::Generating)
    }

    pub fn is_falling(&self) -> bool {
        self.mover.is_falling()
    }

    /// 0-based index of the loaded level
    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn generator(&self) -> Option<&LayerGenerator> {
        self.generator.as_ref()
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn score(&self) -> &ScoreKeeper {
        &self.score
    }

    /// Hand the collaborators back, e.g. to start the next run
    pub fn into_parts(self) -> (S, P, A) {
        (self.scene, self.store, self.audio)
    }
}

/// Read the persisted level index, resetting it when out of range
fn select_level<P: Persistence + ?Sized>(store: &mut P, level_count: usize) -> usize {
    let stored = store.get(CURRENT_LEVEL_KEY);
    match usize::try_from(stored) {
        Ok(index) if index < level_count => index,
        _ => {
            if stored != 0 {
                log::info!("Level index {} out of range, starting from the first level", stored);
            }
            store.set(CURRENT_LEVEL_KEY, 0);
            0
        }
    }
}

fn next_level(index: usize, level_count: usize) -> usize {
    if index + 1 >= level_count { 0 } else { index + 1 }
}
