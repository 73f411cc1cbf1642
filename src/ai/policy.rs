// Policy trait for paddle decision functions

use super::ObservationLayout;
use crate::network::Direction;

/// Trait for decision functions driving one paddle
///
/// A policy maps one observation vector to a paddle direction. It is called
/// once per `playing` snapshot and may keep internal state between calls.
pub trait Policy: Send {
    /// Decide the paddle direction for this observation
    ///
    /// # Arguments
    /// * `observation` - Vector laid out according to [`Policy::layout`]
    fn decide(&mut self, observation: &[f32]) -> Direction;

    /// Observation layout this policy was produced against
    fn layout(&self) -> ObservationLayout;

    /// Policy name for logging
    fn name(&self) -> &str;
}
