use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod api;
mod config;
mod counter;
mod error;
mod predictor;

use api::AppState;
use config::{Command, Config, ModelArgs, ServeArgs};
use error::PredictError;
use predictor::Predictor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // A missing or corrupt artifact stops the process here.
    let predictor = load_predictor(&config.model)?;

    match config.command {
        Command::Serve(args) => serve(args, predictor).await,
        Command::Predict { team1, team2 } => predict_once(&predictor, &team1, &team2),
        Command::Teams => {
            for name in predictor.stats().team_names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn load_predictor(args: &ModelArgs) -> Result<Predictor> {
    let predictor = Predictor::load(&args.model_path, args.stats_path.as_deref())?;
    info!(
        "Model loaded: {} ({}, {} teams{})",
        args.model_path.display(),
        predictor.model_kind(),
        predictor.stats().len(),
        args.stats_path
            .as_ref()
            .map(|p| format!(", stats from {}", p.display()))
            .unwrap_or_default()
    );
    Ok(predictor)
}

async fn serve(args: ServeArgs, predictor: Predictor) -> Result<()> {
    let counter = args
        .counter_backend
        .open(args.counter_path.clone())
        .context("Failed to open counter store")?;
    match &counter {
        Some(store) => info!(
            "Match tracking enabled: {} ({})",
            store.name(),
            args.counter_path
                .clone()
                .or_else(|| args.counter_backend.default_path())
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "in memory".into())
        ),
        None => info!("Match tracking disabled"),
    }

    let app = api::router(AppState {
        predictor: Arc::new(predictor),
        counter,
    });
    let addr: SocketAddr = args
        .addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", args.addr()))?;
    info!("Prediction API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

fn predict_once(predictor: &Predictor, team1: &str, team2: &str) -> Result<()> {
    match predictor.predict(team1, team2) {
        Ok(res) => {
            println!(
                "{}: {}% vs {}: {}%",
                res.team1, res.probability1, res.team2, res.probability2
            );
            println!("Recommendation: {}", res.recommendation);
            Ok(())
        }
        Err(e @ PredictError::UnknownTeam(_)) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
