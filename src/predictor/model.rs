//! Pre-trained binary outcome model and the artifact it ships in.
//!
//! The artifact is a single JSON document bundling the classifier with the
//! stats table it was fit against:
//!
//! ```json
//! { "model": { "kind": "logistic_regression", ... }, "team_stats": [ ... ] }
//! ```
//!
//! Class label 1 means "team1 is the stronger side" when the feature vector is
//! built as team1 minus team2. That binding is carried in the artifact as
//! `positive_class` and checked on load, so an artifact fit with the opposite
//! convention is refused rather than silently inverting every recommendation.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::features::{FeatureVector, FEATURE_NAMES};
use super::stats::TeamStats;

/// The only label semantics this service knows how to serve.
pub const TEAM1_STRONGER: &str = "team1_stronger";

/// A classifier mapping a feature vector to a two-class distribution.
pub trait OutcomeModel: Send + Sync {
    /// Return `(p(label=0), p(label=1))`; both non-negative, summing to 1.
    fn predict_proba(&self, features: &FeatureVector) -> (f64, f64);

    /// Short model identifier for logging and health output.
    fn kind(&self) -> &str;
}

/// Artifact provenance, informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub n_samples: Option<usize>,
    #[serde(default)]
    pub test_accuracy: Option<f64>,
}

/// Logistic regression over [`FEATURE_NAMES`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub kind: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub positive_class: String,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl LogisticModel {
    pub fn new(coefficients: [f64; 4], intercept: f64) -> Self {
        LogisticModel {
            kind: "logistic_regression".into(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            coefficients: coefficients.to_vec(),
            intercept,
            positive_class: TEAM1_STRONGER.into(),
            metadata: ModelMetadata::default(),
        }
    }

    /// Check the artifact against the feature contract and label semantics.
    pub fn validate(&self) -> Result<()> {
        if self.kind != "logistic_regression" {
            bail!("unsupported model kind '{}'", self.kind);
        }
        if self.feature_names != FEATURE_NAMES {
            bail!(
                "model expects features {:?} but this service builds {:?}",
                self.feature_names,
                FEATURE_NAMES
            );
        }
        if self.coefficients.len() != FEATURE_NAMES.len() {
            bail!(
                "model has {} coefficients for {} features",
                self.coefficients.len(),
                FEATURE_NAMES.len()
            );
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("model parameters must be finite");
        }
        if self.positive_class != TEAM1_STRONGER {
            bail!(
                "model positive class is '{}', expected '{}'",
                self.positive_class,
                TEAM1_STRONGER
            );
        }
        Ok(())
    }

    fn logit(&self, features: &FeatureVector) -> f64 {
        self.coefficients
            .iter()
            .zip(features.as_array())
            .fold(self.intercept, |acc, (w, x)| acc + w * x)
    }
}

impl OutcomeModel for LogisticModel {
    fn predict_proba(&self, features: &FeatureVector) -> (f64, f64) {
        let p1 = sigmoid(self.logit(features));
        (1.0 - p1, p1)
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// The `{model, team_stats}` pair as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: LogisticModel,
    pub team_stats: Vec<TeamStats>,
}

impl ModelArtifact {
    /// Read and validate an artifact. Any failure here is fatal for startup.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model artifact: {}", path.display()))?;
        artifact
            .model
            .validate()
            .with_context(|| format!("Rejected model artifact: {}", path.display()))?;
        Ok(artifact)
    }
}
