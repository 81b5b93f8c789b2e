//! Course movement
//!
//! The player never really falls: while the falling flag is set the whole
//! course slides up past them. Moving walls spin in place on their own.

use glam::Vec3;

use super::generator::ActiveWall;
use super::level::{FINISH_TAG, LAYER_TAG, WALL_TAG};
use crate::scene::{NodeId, SceneGraph};

/// Lifts tagged children of the level root while falling
#[derive(Debug, Clone)]
pub struct FallingMover {
    speed: f32,
    tags: Vec<String>,
    falling: bool,
    can_move: bool,
}

impl FallingMover {
    /// Mover for rings, walls and the finish
    pub fn new(speed: f32) -> Self {
        Self::with_tags(speed, [LAYER_TAG, WALL_TAG, FINISH_TAG])
    }

    pub fn with_tags<I, T>(speed: f32, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            speed,
            tags: tags.into_iter().map(Into::into).collect(),
            falling: false,
            can_move: true,
        }
    }

    pub fn start_falling(&mut self) {
        self.falling = true;
    }

    pub fn stop_falling(&mut self) {
        self.falling = false;
    }

    /// Disallowing movement also stops any fall in progress
    pub fn set_can_move(&mut self, can_move: bool) {
        self.can_move = can_move;
        if !can_move {
            self.stop_falling();
        }
    }

    pub fn is_falling(&self) -> bool {
        self.falling && self.can_move
    }

    /// Advance one step, returns how far the course moved
    pub fn step<S: SceneGraph>(&self, scene: &mut S, root: NodeId, dt: f32) -> f32 {
        if !self.is_falling() {
            return 0.0;
        }
        let lift = self.speed * dt;
        for child in scene.children(root) {
            let moves = scene.tag(child).is_some_and(|t| self.tags.iter().any(|m| m == t));
            if !moves {
                continue;
            }
            if let Some(position) = scene.position(child) {
                scene.set_position(child, position + Vec3::Y * lift);
            }
        }
        lift
    }
}

/// Rotate every active wall by `speed * 10` degrees per second
pub fn spin_walls<S: SceneGraph>(scene: &mut S, walls: &[ActiveWall], speed: f32, dt: f32) {
    let delta = dt * speed * 10.0;
    for wall in walls {
        let Some(yaw) = scene.yaw(wall.node) else {
            continue;
        };
        let step = if wall.clockwise { -delta } else { delta };
        scene.set_yaw(wall.node, yaw + step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Prototype, Scene};

    #[test]
    fn test_only_tagged_children_rise() {
        let mut scene = Scene::new();
        let root = scene.create_container("Layers", None, Vec3::ZERO);
        let ring = scene.create_container(LAYER_TAG, Some(root), Vec3::new(0.0, -1.5, 0.0));
        let pooled = scene.instantiate(&Prototype::new("plate", ""), "Safe", Some(root));

        let mut mover = FallingMover::new(3.5);
        assert_eq!(mover.step(&mut scene, root, 1.0), 0.0);

        mover.start_falling();
        let lifted = mover.step(&mut scene, root, 0.5);
        assert_eq!(lifted, 1.75);
        assert_eq!(scene.position(ring).unwrap().y, 0.25);
        assert_eq!(scene.position(pooled).unwrap().y, 0.0);
    }

    #[test]
    fn test_cannot_move_stops_falling() {
        let mut mover = FallingMover::new(1.0);
        mover.start_falling();
        mover.set_can_move(false);
        assert!(!mover.is_falling());
        mover.start_falling();
        assert!(!mover.is_falling());
        mover.set_can_move(true);
        mover.start_falling();
        assert!(mover.is_falling());
    }

    #[test]
    fn test_walls_spin_in_their_direction() {
        let mut scene = Scene::new();
        let proto = Prototype::new("wall", WALL_TAG);
        let left = scene.instantiate(&proto, WALL_TAG, None);
        let right = scene.instantiate(&proto, WALL_TAG, None);
        scene.set_yaw(left, 100.0);
        scene.set_yaw(right, 100.0);

        let walls = [
            ActiveWall { node: left, clockwise: true },
            ActiveWall { node: right, clockwise: false },
        ];
        spin_walls(&mut scene, &walls, 5.0, 0.5);
        assert_eq!(scene.yaw(left), Some(75.0));
        assert_eq!(scene.yaw(right), Some(125.0));
    }
}
