// Observation vectors fed to decision policies

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::network::{PaddleSide, Snapshot};

/// Field order of the observation vector.
///
/// This is a contract with the policy: a policy produced against one layout
/// cannot be driven with the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationLayout {
    /// `[ball_x, ball_y, ball_vx, ball_vy, left_center, right_center]`
    #[default]
    Full,
    /// `[ball_x, ball_y, left_center, right_center]`
    Reduced,
}

impl ObservationLayout {
    pub fn size(&self) -> usize {
        match self {
            ObservationLayout::Full => 6,
            ObservationLayout::Reduced => 4,
        }
    }

    /// Index of the ball's vertical position
    pub fn ball_y_index(&self) -> usize {
        1
    }

    /// Index of a paddle's center, counted from the end of the vector
    pub fn paddle_index(&self, side: PaddleSide) -> usize {
        match side {
            PaddleSide::Left => self.size() - 2,
            PaddleSide::Right => self.size() - 1,
        }
    }

    /// Horizontal and vertical ball velocity indices, if the layout has them
    pub fn velocity_indices(&self) -> Option<(usize, usize)> {
        match self {
            ObservationLayout::Full => Some((2, 3)),
            ObservationLayout::Reduced => None,
        }
    }

    /// Midfield ball, centered paddles (800x600 field)
    pub fn default_vector(&self) -> Vec<f32> {
        match self {
            ObservationLayout::Full => vec![400.0, 300.0, 0.0, 0.0, 300.0, 300.0],
            ObservationLayout::Reduced => vec![400.0, 300.0, 300.0, 300.0],
        }
    }
}

/// Result of extracting an observation from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub vector: Vec<f32>,
    /// True when the snapshot was unusable and the default vector was returned
    pub fell_back: bool,
}

#[derive(Deserialize)]
struct SnapshotFields {
    ball: BallFields,
    paddles: PaddleFields,
}

#[derive(Deserialize)]
struct BallFields {
    x: f32,
    y: f32,
    #[serde(default)]
    vx: Option<f32>,
    #[serde(default)]
    vy: Option<f32>,
}

#[derive(Deserialize)]
struct PaddleFields {
    left: PaddleGeometry,
    right: PaddleGeometry,
}

#[derive(Deserialize)]
struct PaddleGeometry {
    y: f32,
    height: f32,
}

impl PaddleGeometry {
    fn center(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// Build the observation vector for `layout` from a game snapshot.
///
/// Never fails: a missing or ill-typed required field yields the layout's
/// default vector with `fell_back` set. Missing velocities count as zero.
pub fn extract_observation(snapshot: &Snapshot, layout: ObservationLayout) -> Extraction {
    let fields = match SnapshotFields::deserialize(snapshot.data()) {
        Ok(fields) => fields,
        Err(e) => {
            warn!(error = %e, snapshot = %snapshot.data(), "Unusable snapshot, using default observation");
            return Extraction {
                vector: layout.default_vector(),
                fell_back: true,
            };
        }
    };

    let ball = &fields.ball;
    let left = fields.paddles.left.center();
    let right = fields.paddles.right.center();

    let vector = match layout {
        ObservationLayout::Full => vec![
            ball.x,
            ball.y,
            ball.vx.unwrap_or(0.0),
            ball.vy.unwrap_or(0.0),
            left,
            right,
        ],
        ObservationLayout::Reduced => vec![ball.x, ball.y, left, right],
    };

    Extraction {
        vector,
        fell_back: false,
    }
}
