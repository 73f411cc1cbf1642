// Tracking policy - follows the ball's height with a dead zone

use super::{ObservationLayout, Policy};
use crate::network::{Direction, PaddleSide};

/// Moves the controlled paddle toward the ball's vertical position
///
/// - Tracks the ball while it is heading toward our side
/// - Drifts back to the field center while it moves away (needs velocity,
///   so only with the full layout; the reduced layout always tracks)
/// - Holds still inside the dead zone to avoid jitter
pub struct TrackingPolicy {
    side: PaddleSide,
    layout: ObservationLayout,
    field_height: f32,
    dead_zone: f32,
}

impl TrackingPolicy {
    pub fn new(side: PaddleSide, layout: ObservationLayout, field_height: f32, dead_zone: f32) -> Self {
        Self {
            side,
            layout,
            field_height,
            dead_zone,
        }
    }

    fn ball_approaching(&self, observation: &[f32]) -> bool {
        let Some((vx_index, _)) = self.layout.velocity_indices() else {
            return true;
        };
        let vx = observation[vx_index];
        match self.side {
            PaddleSide::Right => vx >= 0.0,
            PaddleSide::Left => vx <= 0.0,
        }
    }
}

impl Policy for TrackingPolicy {
    fn decide(&mut self, observation: &[f32]) -> Direction {
        if observation.len() != self.layout.size() {
            return Direction::Stop;
        }

        let paddle_center = observation[self.layout.paddle_index(self.side)];
        let target_y = if self.ball_approaching(observation) {
            observation[self.layout.ball_y_index()]
        } else {
            self.field_height / 2.0
        };

        steer_toward(paddle_center, target_y, self.dead_zone)
    }

    fn layout(&self) -> ObservationLayout {
        self.layout
    }

    fn name(&self) -> &str {
        "tracking"
    }
}

/// Direction that moves a paddle centered at `current` toward `target`.
/// Screen coordinates: y grows downward.
pub(crate) fn steer_toward(current: f32, target: f32, dead_zone: f32) -> Direction {
    let diff = target - current;
    if diff.abs() < dead_zone {
        Direction::Stop
    } else if diff > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    }
}
