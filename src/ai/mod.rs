// AI module - decision policies driving the controlled paddle

mod intercept_policy;
mod linear_policy;
mod observation;
mod policy;
mod tracking_policy;

pub use intercept_policy::{predict_intercept, InterceptPolicy};
pub use linear_policy::{LinearModel, LinearPolicy};
pub use observation::{extract_observation, Extraction, ObservationLayout};
pub use policy::Policy;
pub use tracking_policy::TrackingPolicy;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::{ClientConfig, PolicyConfig};
use crate::error::PolicyError;

/// Policy kind selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Exported model weights read from `model_path`
    #[default]
    Linear,
    /// Follows the ball's height
    Tracking,
    /// Predicts the crossing point from the ball's velocity
    Intercept,
}

impl PolicyKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            PolicyKind::Linear => "linear",
            PolicyKind::Tracking => "tracking",
            PolicyKind::Intercept => "intercept",
        }
    }
}

/// Loads the configured policy once and hands out fresh instances per game
///
/// A model that fails to load leaves the service "not ready" with the
/// failure recorded; the control service reports it on `/health`.
pub struct PolicyService {
    config: PolicyConfig,
    model: Option<Arc<LinearModel>>,
    load_error: Option<String>,
}

impl PolicyService {
    pub fn load(config: &PolicyConfig) -> Self {
        let mut service = Self {
            config: config.clone(),
            model: None,
            load_error: None,
        };

        if config.kind != PolicyKind::Linear {
            info!(kind = config.kind.display_name(), "Using built-in policy");
            return service;
        }

        match LinearModel::load(&config.model_path) {
            Ok(model) => {
                info!(path = %config.model_path.display(), layout = ?model.layout, "✅ Model loaded");
                service.model = Some(Arc::new(model));
            }
            Err(e) => {
                error!("❌ {}", e);
                service.load_error = Some(e.to_string());
            }
        }
        service
    }

    /// Service with an already-loaded model; rejects a model whose shape
    /// does not match its layout
    pub fn from_model(config: &PolicyConfig, model: LinearModel) -> Result<Self, PolicyError> {
        model.validate()?;
        Ok(Self {
            config: PolicyConfig {
                kind: PolicyKind::Linear,
                ..config.clone()
            },
            model: Some(Arc::new(model)),
            load_error: None,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.config.kind != PolicyKind::Linear || self.model.is_some()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Build a policy instance for one client
    pub fn create_policy(&self, client: &ClientConfig) -> Result<Box<dyn Policy>, PolicyError> {
        let policy: Box<dyn Policy> = match self.config.kind {
            PolicyKind::Linear => {
                let model = self.model.clone().ok_or_else(|| {
                    PolicyError::NotReady(
                        self.load_error
                            .clone()
                            .unwrap_or_else(|| "AI model not loaded".to_string()),
                    )
                })?;
                Box::new(LinearPolicy::new(model, self.config.deterministic))
            }
            PolicyKind::Tracking => Box::new(TrackingPolicy::new(
                client.paddle,
                client.observation,
                self.config.field_height,
                self.config.dead_zone,
            )),
            PolicyKind::Intercept => {
                if client.observation != ObservationLayout::Full {
                    return Err(PolicyError::UnsupportedLayout {
                        kind: "intercept",
                        required: ObservationLayout::Full,
                    });
                }
                Box::new(InterceptPolicy::new(
                    client.paddle,
                    self.config.field_width,
                    self.config.field_height,
                    self.config.dead_zone,
                ))
            }
        };
        Ok(policy)
    }
}
