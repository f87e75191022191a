//! wayplan - CLI entry point

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use wayplan::cli::{Cli, Command};
use wayplan::config::Config;
use wayplan::domain::TripProfile;
use wayplan::llm::build_chain;
use wayplan::planner::Planner;
use wayplan::progress::{ProgressEvent, ProgressSink};
use wayplan::proposer::LlmProposer;
use wayplan::schedule::trip_free_hours;
use wayplan::search::SonarClient;
use wayplan::session::SessionManager;

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

fn load_trip(path: &Path) -> Result<TripProfile> {
    let content = fs::read_to_string(path).context(format!("Failed to read trip profile {}", path.display()))?;
    serde_yaml::from_str(&content).context("Failed to parse trip profile")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        "wayplan loaded config"
    );

    match cli.command {
        Command::Plan { trip, session, output } => cmd_plan(&config, &trip, session, output.as_deref()).await,
        Command::FreeHours { trip } => cmd_free_hours(&trip),
    }
}

/// Run a full schedule generation and print or write the result.
async fn cmd_plan(config: &Config, trip_path: &Path, session: Option<String>, output: Option<&Path>) -> Result<()> {
    config.validate()?;

    let trip = load_trip(trip_path)?;

    let llm = build_chain(&config.llm, config.llm_fallback.as_ref()).context("Failed to create LLM client")?;
    let proposer = Arc::new(LlmProposer::new(llm));
    let search = Arc::new(SonarClient::from_config(&config.search).context("Failed to create search client")?);

    let planner = Planner::new(proposer, search, config.planner.clone()).context("Failed to build planner")?;
    let sessions = SessionManager::new(Arc::new(planner));

    let session_id = session.unwrap_or_else(SessionManager::generate_session_id);
    println!("Planning session: {}", session_id);

    // Drain progress into the terminal while the run is in flight
    let (progress, mut rx) = ProgressSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Status { short, long } => {
                    if let Some(short) = short {
                        println!(">> {}", short);
                    }
                    if let Some(long) = long {
                        println!("   {}: {}", long.title, long.description.replace('\n', "\n   "));
                    }
                }
                ProgressEvent::Delta { items } => {
                    for item in items {
                        println!("   + [{}] {} ({})", item.id, item.title, item.time.render());
                    }
                }
            }
        }
    });

    let result = sessions.plan(&session_id, &trip, &progress).await;
    drop(progress);
    let _ = printer.await;

    let schedule = result.context("Planning run failed")?;

    let json = serde_json::to_string_pretty(&schedule).context("Failed to serialize schedule")?;
    match output {
        Some(path) => {
            fs::write(path, &json).context(format!("Failed to write {}", path.display()))?;
            println!("Wrote {} schedule items to {}", schedule.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Print the free-hours calculation for a trip profile.
fn cmd_free_hours(trip_path: &Path) -> Result<()> {
    let trip = load_trip(trip_path)?;
    let hours = trip_free_hours(&trip);
    println!(
        "{} free hours between {} and {}",
        hours,
        trip.arrival.format("%Y-%m-%d %H:%M"),
        trip.departure.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}
