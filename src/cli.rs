//! Command-line interface definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Iterative travel-itinerary planning engine
#[derive(Debug, Parser)]
#[command(name = "wayplan", version, about)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file (default: .wayplan.yml, then user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a full schedule for a trip profile
    Plan {
        /// Trip profile YAML file
        #[arg(long)]
        trip: PathBuf,

        /// Session id (generated when omitted)
        #[arg(long)]
        session: Option<String>,

        /// Write the schedule JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the free-hours calculation used to size the research budget
    FreeHours {
        /// Trip profile YAML file
        #[arg(long)]
        trip: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_command_parses() {
        let cli = Cli::parse_from(["wayplan", "plan", "--trip", "trip.yml", "--session", "s1"]);
        match cli.command {
            Command::Plan { trip, session, output } => {
                assert_eq!(trip, PathBuf::from("trip.yml"));
                assert_eq!(session.as_deref(), Some("s1"));
                assert!(output.is_none());
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn test_free_hours_command_parses() {
        let cli = Cli::parse_from(["wayplan", "--verbose", "free-hours", "--trip", "trip.yml"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::FreeHours { .. }));
    }
}
