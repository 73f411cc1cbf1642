// Intercept policy - steers toward where the ball will cross our paddle

use super::tracking_policy::steer_toward;
use super::{ObservationLayout, Policy};
use crate::network::{Direction, PaddleSide};

// Distance from a side wall to the paddle's hitting face (20 margin + 10 width)
const PADDLE_FACE_OFFSET: f32 = 30.0;

/// Predict the ball's height when it reaches `paddle_x`.
///
/// Returns `None` when the ball is not moving toward the paddle. Wall
/// bounces are folded in: the straight-line height is reflected into
/// `[0, field_height]` with period `2 * field_height`.
pub fn predict_intercept(
    ball_x: f32,
    ball_y: f32,
    ball_vx: f32,
    ball_vy: f32,
    paddle_x: f32,
    field_height: f32,
) -> Option<f32> {
    if ball_vx.abs() < f32::EPSILON || field_height <= 0.0 {
        return None;
    }

    let ticks = (paddle_x - ball_x) / ball_vx;
    if ticks < 0.0 {
        return None;
    }

    let unfolded = ball_y + ball_vy * ticks;
    let period = 2.0 * field_height;
    let phase = unfolded.rem_euclid(period);
    Some(if phase > field_height { period - phase } else { phase })
}

/// Predicts the intercept point from the velocity terms and moves there;
/// recenters while the ball travels away. Requires the full layout.
pub struct InterceptPolicy {
    side: PaddleSide,
    field_width: f32,
    field_height: f32,
    dead_zone: f32,
}

impl InterceptPolicy {
    pub fn new(side: PaddleSide, field_width: f32, field_height: f32, dead_zone: f32) -> Self {
        Self {
            side,
            field_width,
            field_height,
            dead_zone,
        }
    }

    fn paddle_x(&self) -> f32 {
        match self.side {
            PaddleSide::Left => PADDLE_FACE_OFFSET,
            PaddleSide::Right => self.field_width - PADDLE_FACE_OFFSET,
        }
    }
}

impl Policy for InterceptPolicy {
    fn decide(&mut self, observation: &[f32]) -> Direction {
        let layout = ObservationLayout::Full;
        if observation.len() != layout.size() {
            return Direction::Stop;
        }

        let [ball_x, ball_y, vx, vy, ..] = observation else {
            return Direction::Stop;
        };
        let paddle_center = observation[layout.paddle_index(self.side)];

        let target_y = predict_intercept(*ball_x, *ball_y, *vx, *vy, self.paddle_x(), self.field_height)
            .unwrap_or(self.field_height / 2.0);

        steer_toward(paddle_center, target_y, self.dead_zone)
    }

    fn layout(&self) -> ObservationLayout {
        ObservationLayout::Full
    }

    fn name(&self) -> &str {
        "intercept"
    }
}
