use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::counter::CounterBackend;

/// Team matchup outcome predictor
#[derive(Parser, Debug, Clone)]
#[command(name = "matchup-predictor", version, about)]
pub struct Config {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the trained model and stats table come from.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Model artifact bundling the classifier and the team stats table
    #[arg(long, env = "MODEL_PATH", default_value = "data/aggregate_model.json", global = true)]
    pub model_path: PathBuf,

    /// CSV stats table that replaces the one embedded in the artifact
    #[arg(long, env = "STATS_PATH", global = true)]
    pub stats_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve predictions over HTTP
    Serve(ServeArgs),

    /// Predict a single matchup and print the result
    Predict {
        team1: String,
        team2: String,
    },

    /// List the teams known to the stats table
    Teams,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Where matchup query counts are kept
    #[arg(long, env = "COUNTER_BACKEND", value_enum, default_value = "json")]
    pub counter_backend: CounterBackend,

    /// Counter storage location (defaults to match_counts.{json,csv,db})
    #[arg(long, env = "COUNTER_PATH")]
    pub counter_path: Option<PathBuf>,
}

impl ServeArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Command::Serve(serve) = &self.command {
            if serve.port == 0 {
                anyhow::bail!("port must be non-zero");
            }
            if serve.counter_path.is_some() && !serve.counter_backend.is_persistent() {
                anyhow::bail!(
                    "--counter-path has no effect with the {:?} counter backend",
                    serve.counter_backend
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("matchup-predictor").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn serve_defaults() {
        let cfg = parse(&["serve"]);
        let Command::Serve(serve) = &cfg.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.counter_backend, CounterBackend::Json);
        assert_eq!(cfg.model.model_path, PathBuf::from("data/aggregate_model.json"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn predict_takes_two_teams() {
        let cfg = parse(&["predict", "Pumas", "Leones", "--model-path", "m.json"]);
        match cfg.command {
            Command::Predict { team1, team2 } => {
                assert_eq!(team1, "Pumas");
                assert_eq!(team2, "Leones");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cfg.model.model_path, PathBuf::from("m.json"));
    }

    #[test]
    fn counter_path_needs_persistent_backend() {
        let cfg = parse(&["serve", "--counter-backend", "memory", "--counter-path", "x.json"]);
        assert!(cfg.validate().is_err());

        let cfg = parse(&["serve", "--counter-backend", "sqlite", "--counter-path", "x.db"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let cfg = parse(&["serve", "--port", "0"]);
        assert!(cfg.validate().is_err());
    }
}
