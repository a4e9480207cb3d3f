//! Feature-difference vector fed to the outcome model.
//!
//! The model was fit against exactly these four columns in exactly this
//! order. Reordering, renaming, adding or removing a feature invalidates
//! every existing model artifact.

use serde::Serialize;

use super::stats::TeamStats;

/// Column names in model order.
pub const FEATURE_NAMES: [&str; 4] = ["diff_played", "diff_won", "diff_lost", "diff_goals"];

/// Signed team-A-minus-team-B differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub diff_played: f64,
    pub diff_won: f64,
    pub diff_lost: f64,
    pub diff_goals: f64,
}

impl FeatureVector {
    /// Build the vector for `a` versus `b`.
    pub fn build(a: &TeamStats, b: &TeamStats) -> Self {
        FeatureVector {
            diff_played: a.played as f64 - b.played as f64,
            diff_won: a.won as f64 - b.won as f64,
            diff_lost: a.lost as f64 - b.lost as f64,
            diff_goals: a.goals_per_match - b.goals_per_match,
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.diff_played, self.diff_won, self.diff_lost, self.diff_goals]
    }
}
