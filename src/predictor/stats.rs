//! Per-team aggregate season statistics.
//!
//! The table is loaded once at startup, either from the model artifact or from
//! a CSV export, and is read-only for the rest of the process lifetime.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::PredictError;

/// Aggregate statistics for one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    /// Exact, case-sensitive team name
    pub team: String,
    /// Matches played
    pub played: i64,
    /// Matches won
    pub won: i64,
    /// Matches lost
    pub lost: i64,
    /// Average goals scored per match
    pub goals_per_match: f64,
}

/// Immutable team-name → stats lookup table.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    teams: HashMap<String, TeamStats>,
}

impl StatsRepository {
    /// Build the repository from table rows. Empty tables, blank names and
    /// duplicate names are rejected.
    pub fn from_rows(rows: Vec<TeamStats>) -> Result<Self> {
        if rows.is_empty() {
            bail!("stats table has no teams");
        }
        let mut teams = HashMap::with_capacity(rows.len());
        for row in rows {
            if row.team.trim().is_empty() {
                bail!("stats table contains a row with an empty team name");
            }
            if !row.goals_per_match.is_finite() {
                bail!(
                    "team '{}' has a non-finite goals per match value ({})",
                    row.team,
                    row.goals_per_match
                );
            }
            if teams.contains_key(&row.team) {
                bail!("stats table lists team '{}' more than once", row.team);
            }
            teams.insert(row.team.clone(), row);
        }
        Ok(StatsRepository { teams })
    }

    /// Load a CSV table with a header row and the columns
    /// team, played, won, lost, goals-per-match (matched by position).
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open stats table: {}", path.display()))?;

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            // Header is line 1.
            let line = idx + 2;
            let record = record.with_context(|| format!("stats table line {}", line))?;
            if record.len() < 5 {
                bail!(
                    "stats table line {}: expected 5 columns, found {}",
                    line,
                    record.len()
                );
            }
            rows.push(TeamStats {
                team: record[0].to_string(),
                played: parse_field(&record[1], "played", line)?,
                won: parse_field(&record[2], "won", line)?,
                lost: parse_field(&record[3], "lost", line)?,
                goals_per_match: parse_field(&record[4], "goals per match", line)?,
            });
        }

        Self::from_rows(rows).with_context(|| format!("Invalid stats table: {}", path.display()))
    }

    pub fn lookup(&self, team: &str) -> Result<&TeamStats, PredictError> {
        self.teams
            .get(team)
            .ok_or_else(|| PredictError::UnknownTeam(vec![team.to_string()]))
    }

    pub fn contains(&self, team: &str) -> bool {
        self.teams.contains_key(team)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// All team names, sorted.
    pub fn team_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.teams.keys().cloned().collect();
        names.sort();
        names
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, column: &str, line: usize) -> Result<T> {
    raw.parse::<T>()
        .ok()
        .with_context(|| format!("stats table line {}: invalid {} value '{}'", line, column, raw))
}

#[cfg(test)]
pub(crate) fn sample_rows() -> Vec<TeamStats> {
    vec![
        TeamStats {
            team: "Pumas".into(),
            played: 10,
            won: 6,
            lost: 2,
            goals_per_match: 1.8,
        },
        TeamStats {
            team: "Leones".into(),
            played: 10,
            won: 4,
            lost: 4,
            goals_per_match: 1.2,
        },
        TeamStats {
            team: "Tigres".into(),
            played: 12,
            won: 7,
            lost: 3,
            goals_per_match: 1.6,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("team_stats.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let repo = StatsRepository::from_rows(sample_rows()).unwrap();
        assert_eq!(repo.lookup("Pumas").unwrap().won, 6);
        assert!(repo.contains("Leones"));
        assert!(!repo.contains("pumas"));
        assert_eq!(
            repo.lookup("pumas").unwrap_err(),
            PredictError::UnknownTeam(vec!["pumas".into()])
        );
    }

    #[test]
    fn rejects_duplicate_and_empty_tables() {
        let mut rows = sample_rows();
        rows.push(rows[0].clone());
        assert!(StatsRepository::from_rows(rows).is_err());
        assert!(StatsRepository::from_rows(vec![]).is_err());
    }

    #[test]
    fn team_names_are_sorted() {
        let repo = StatsRepository::from_rows(sample_rows()).unwrap();
        assert_eq!(repo.team_names(), vec!["Leones", "Pumas", "Tigres"]);
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn loads_csv_with_original_headers() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "Nombre_Equipo,Partidos jugados,Partidos ganados,Partidos perdidos,Goles por partido\n\
             Pumas,10,6,2,1.8\n\
             Leones, 10 ,4,4,1.2\n",
        );
        let repo = StatsRepository::from_csv_path(&path).unwrap();
        assert_eq!(repo.len(), 2);
        let leones = repo.lookup("Leones").unwrap();
        assert_eq!(leones.played, 10);
        assert_eq!(leones.goals_per_match, 1.2);
    }

    #[test]
    fn malformed_csv_is_a_startup_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "team,played,won,lost,goals\nPumas,ten,6,2,1.8\n");
        let err = StatsRepository::from_csv_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn non_finite_goals_are_a_startup_failure() {
        let dir = TempDir::new().unwrap();
        for goals in ["NaN", "inf", "-inf"] {
            let path = write_csv(
                &dir,
                &format!("team,played,won,lost,goals\nPumas,10,6,2,{}\nLeones,10,4,4,1.2\n", goals),
            );
            let err = StatsRepository::from_csv_path(&path).unwrap_err();
            assert!(format!("{:#}", err).contains("Pumas"), "goals = {}", goals);
        }
    }

    #[test]
    fn missing_csv_is_a_startup_failure() {
        let dir = TempDir::new().unwrap();
        assert!(StatsRepository::from_csv_path(&dir.path().join("nope.csv")).is_err());
    }
}
