//! "Who is better" predictions for a pair of teams.
//!
//! Pipeline: stat lookup → feature vector → model inference → percentage
//! normalisation. Everything here is read-only over snapshots loaded at
//! startup, so a single [`Predictor`] is shared across all requests without
//! locking.

pub mod features;
pub mod model;
pub mod stats;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::error::PredictError;
pub use features::FeatureVector;
pub use model::{LogisticModel, ModelArtifact, OutcomeModel};
pub use stats::StatsRepository;

/// Outcome of one prediction, probabilities in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub team1: String,
    pub team2: String,
    /// Chance that team1 is the stronger side, 0–100, two decimals
    pub probability1: f64,
    /// Chance that team2 is the stronger side, 0–100, two decimals
    pub probability2: f64,
    pub recommendation: String,
}

pub struct Predictor {
    stats: StatsRepository,
    model: Box<dyn OutcomeModel>,
}

impl Predictor {
    pub fn new(stats: StatsRepository, model: Box<dyn OutcomeModel>) -> Self {
        Predictor { stats, model }
    }

    /// Load the bundled artifact, optionally replacing its stats table with a
    /// CSV export.
    pub fn load(model_path: &Path, stats_override: Option<&Path>) -> Result<Self> {
        let artifact = ModelArtifact::from_file(model_path)?;
        let stats = match stats_override {
            Some(csv_path) => StatsRepository::from_csv_path(csv_path)?,
            None => StatsRepository::from_rows(artifact.team_stats).with_context(|| {
                format!("Invalid stats table in artifact: {}", model_path.display())
            })?,
        };
        Ok(Self::new(stats, Box::new(artifact.model)))
    }

    pub fn stats(&self) -> &StatsRepository {
        &self.stats
    }

    pub fn model_kind(&self) -> &str {
        self.model.kind()
    }

    pub fn predict(&self, team1: &str, team2: &str) -> Result<PredictionResult, PredictError> {
        let mut unknown: Vec<String> = [team1, team2]
            .into_iter()
            .filter(|t| !self.stats.contains(t))
            .map(str::to_string)
            .collect();
        unknown.dedup();
        if !unknown.is_empty() {
            return Err(PredictError::UnknownTeam(unknown));
        }

        let a = self.stats.lookup(team1)?;
        let b = self.stats.lookup(team2)?;
        let features = FeatureVector::build(a, b);

        let (p0, p1) = self.model.predict_proba(&features);
        if !is_distribution(p0, p1) {
            return Err(PredictError::InvalidModelOutput(p0, p1));
        }

        let probability1 = round2(p1 * 100.0);
        let probability2 = round2(p0 * 100.0);
        // Ties go to team2.
        let recommendation = if probability1 > probability2 { team1 } else { team2 };

        debug!(
            "{} vs {}: {:?} → {:.2}% / {:.2}%",
            team1, team2, features, probability1, probability2
        );

        Ok(PredictionResult {
            team1: team1.to_string(),
            team2: team2.to_string(),
            probability1,
            probability2,
            recommendation: recommendation.to_string(),
        })
    }
}

fn is_distribution(p0: f64, p1: f64) -> bool {
    p0.is_finite() && p1.is_finite() && p0 >= 0.0 && p1 >= 0.0 && (p0 + p1 - 1.0).abs() < 1e-6
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::stats::sample_rows;
    use approx::assert_relative_eq;

    /// Returns a fixed label-1 probability regardless of input.
    struct FixedModel(f64);

    impl OutcomeModel for FixedModel {
        fn predict_proba(&self, _features: &FeatureVector) -> (f64, f64) {
            (1.0 - self.0, self.0)
        }

        fn kind(&self) -> &str {
            "fixed"
        }
    }

    fn predictor_with(model: Box<dyn OutcomeModel>) -> Predictor {
        Predictor::new(StatsRepository::from_rows(sample_rows()).unwrap(), model)
    }

    fn logistic_predictor() -> Predictor {
        predictor_with(Box::new(LogisticModel::new([0.02, 0.45, -0.4, 1.2], -0.05)))
    }

    #[test]
    fn pumas_over_leones_at_seventy_percent() {
        let p = predictor_with(Box::new(FixedModel(0.7)));
        let res = p.predict("Pumas", "Leones").unwrap();
        assert_relative_eq!(res.probability1, 70.0);
        assert_relative_eq!(res.probability2, 30.0);
        assert_eq!(res.recommendation, "Pumas");
    }

    #[test]
    fn percentages_sum_to_one_hundred_for_every_pair() {
        let p = logistic_predictor();
        let names = p.stats().team_names();
        for a in &names {
            for b in &names {
                if a == b {
                    continue;
                }
                let res = p.predict(a, b).unwrap();
                assert!((res.probability1 + res.probability2 - 100.0).abs() <= 0.01 + 1e-9);
            }
        }
    }

    #[test]
    fn predictions_are_deterministic() {
        let p = logistic_predictor();
        let first = p.predict("Tigres", "Leones").unwrap();
        let second = p.predict("Tigres", "Leones").unwrap();
        assert_eq!(first.probability1.to_bits(), second.probability1.to_bits());
        assert_eq!(first.probability2.to_bits(), second.probability2.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_team_is_named() {
        let p = logistic_predictor();
        assert_eq!(
            p.predict("Pumas", "Unknown").unwrap_err(),
            PredictError::UnknownTeam(vec!["Unknown".into()])
        );
    }

    #[test]
    fn both_unknown_teams_are_named() {
        let p = logistic_predictor();
        assert_eq!(
            p.predict("Unknown1", "Unknown2").unwrap_err(),
            PredictError::UnknownTeam(vec!["Unknown1".into(), "Unknown2".into()])
        );
    }

    #[test]
    fn same_unknown_team_is_named_once() {
        let p = logistic_predictor();
        let err = p.predict("Unknown", "Unknown").unwrap_err();
        assert_eq!(err, PredictError::UnknownTeam(vec!["Unknown".into()]));
        assert_eq!(err.to_string(), "Unknown team: Unknown");
    }

    #[test]
    fn tie_recommends_team2() {
        let p = predictor_with(Box::new(FixedModel(0.5)));
        let res = p.predict("Pumas", "Leones").unwrap();
        assert_eq!(res.probability1, res.probability2);
        assert_eq!(res.recommendation, "Leones");
    }

    #[test]
    fn rounds_to_two_decimals() {
        let p = predictor_with(Box::new(FixedModel(0.123456)));
        let res = p.predict("Pumas", "Leones").unwrap();
        assert_relative_eq!(res.probability1, 12.35);
        assert_relative_eq!(res.probability2, 87.65);
        assert_eq!(res.recommendation, "Leones");
    }

    #[test]
    fn shipped_artifact_loads_and_predicts() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        let p = Predictor::load(&root.join("data/aggregate_model.json"), None).unwrap();
        assert_eq!(p.stats().len(), 12);
        let res = p.predict("América", "Querétaro").unwrap();
        assert_eq!(res.recommendation, "América");

        let from_csv = Predictor::load(
            &root.join("data/aggregate_model.json"),
            Some(&root.join("data/team_stats.csv")),
        )
        .unwrap();
        assert_eq!(from_csv.predict("América", "Querétaro").unwrap(), res);
    }

    #[test]
    fn broken_model_output_is_rejected() {
        let p = predictor_with(Box::new(FixedModel(1.5)));
        assert!(matches!(
            p.predict("Pumas", "Leones"),
            Err(PredictError::InvalidModelOutput(_, _))
        ));
    }
}
