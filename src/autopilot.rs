//! Scripted player for headless runs
//!
//! Stands in for the bouncing ball: the player hangs at a fixed height while
//! the course moves up past it. Every ring that rises above the player counts
//! as dropped through its gap, and the player bounces every few rings.

use std::collections::BTreeSet;

use crate::audio::AudioSink;
use crate::persistence::Persistence;
use crate::run::{Run, RunPhase};
use crate::scene::{NodeId, SceneGraph};
use crate::score::LevelProgress;

/// How a scripted run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoOutcome {
    pub phase: RunPhase,
    pub progress: LevelProgress,
    pub percent: u32,
    pub steps: usize,
}

#[derive(Debug, Clone)]
pub struct Autopilot {
    /// World height the player hangs at
    pub player_y: f32,
    /// Fixed step passed to `Run::tick`
    pub dt: f32,
    /// Bounce after this many rings
    pub bounce_every: u32,
    /// Steps spent in the air after a bounce before falling again
    pub bounce_steps: usize,
    /// Hit a hazard after this many rings instead of finishing
    pub hazard_at: Option<u32>,
    pub max_steps: usize,
    passed: BTreeSet<u32>,
    since_bounce: u32,
    airborne: usize,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            player_y: -0.75,
            dt: 1.0 / 30.0,
            bounce_every: 3,
            bounce_steps: 36,
            hazard_at: None,
            max_steps: 100_000,
            passed: BTreeSet::new(),
            since_bounce: 0,
            airborne: 0,
        }
    }
}

impl Autopilot {
    pub fn with_hazard_at(mut self, rings: u32) -> Self {
        self.hazard_at = Some(rings);
        self
    }

    /// Play until the run leaves `Playing` or the step limit is hit
    pub fn play<S, P, A>(&mut self, run: &mut Run<S, P, A>) -> DemoOutcome
    where
        S: SceneGraph,
        P: Persistence,
        A: AudioSink,
    {
        let mut steps = 0;
        while run.phase() == RunPhase::Playing && steps < self.max_steps {
            if self.airborne > 0 {
                self.airborne -= 1;
            } else if !run.is_falling() {
                run.on_floor_reached();
            }
            run.tick(self.dt);
            steps += 1;

            for (index, gap) in self.rings_above(run) {
                if let Some(gap) = gap {
                    run.on_gap_exit(gap, self.player_y);
                }
                self.passed.insert(index);

                if self.hazard_at == Some(self.passed.len() as u32) {
                    run.on_hazard();
                    break;
                }
                self.since_bounce += 1;
                if self.since_bounce >= self.bounce_every {
                    self.since_bounce = 0;
                    self.airborne = self.bounce_steps;
                    run.on_bounce();
                }
            }
            if run.phase() != RunPhase::Playing {
                break;
            }

            let finish_y = run
                .generator()
                .and_then(|g| g.finish())
                .and_then(|node| run.scene().position(node));
            if finish_y.is_some_and(|p| p.y > self.player_y) {
                run.on_finish();
            }
            if !run.generating() && run.generator().is_some_and(|g| g.finish().is_none()) {
                log::warn!("Generation stopped before the finish, ending run");
                break;
            }
        }

        if steps >= self.max_steps {
            log::warn!("Autopilot gave up after {} steps", steps);
        }
        DemoOutcome {
            phase: run.phase(),
            progress: run.progress(),
            percent: run.percent_completed(),
            steps,
        }
    }

    /// Rings not yet passed that have risen above the player, oldest first,
    /// with the gap the player drops through
    fn rings_above<S, P, A>(&self, run: &Run<S, P, A>) -> Vec<(u32, Option<NodeId>)>
    where
        S: SceneGraph,
        P: Persistence,
        A: AudioSink,
    {
        let Some(generator) = run.generator() else {
            return Vec::new();
        };
        generator
            .rings()
            .filter(|ring| !self.passed.contains(&ring.index()))
            .filter(|ring| run.scene().position(ring.node()).is_some_and(|p| p.y > self.player_y))
            .map(|ring| (ring.index(), ring.triggers().first().map(|t| t.node)))
            .collect()
    }
}
