use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "merqa")]
#[command(
    author,
    version,
    about = "Quality-control scoring for recorded medical verification calls"
)]
#[command(
    long_about = "Transcribe verification calls, audit them against the filled MER form, and produce a 1600-point QC score and an escalation decision per record"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List records found in the records directory
    Records,

    /// Transcribe, analyze, score and decide a record
    Process {
        /// Record ID (the `<id>` of `<id>_MER.pdf`)
        id: String,
        /// Regenerate every artifact instead of reusing existing ones
        #[arg(long)]
        force: bool,
        /// Use stored transcripts instead of transcribing again
        #[arg(long)]
        skip_transcription: bool,
    },

    /// Print the QC score of a processed record as JSON
    Score {
        /// Record ID
        id: String,
    },

    /// Recompute and save the escalation decision
    Decide {
        /// Record ID
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,
        /// Decide every processed record
        #[arg(long)]
        all: bool,
    },

    /// Show the metrics dashboard of a processed record
    Show {
        /// Record ID (interactive selection if omitted)
        id: Option<String>,
    },

    /// List recent processing runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print config file path
    Path,
    /// Initialize default configuration and directories
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::parse_from(["merqa", "process", "R1", "--force", "-v"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Process {
                id,
                force,
                skip_transcription,
            } => {
                assert_eq!(id, "R1");
                assert!(force);
                assert!(!skip_transcription);
            }
            _ => panic!("expected process"),
        }
    }

    #[test]
    fn test_decide_needs_id_or_all() {
        assert!(Cli::try_parse_from(["merqa", "decide"]).is_err());
        assert!(Cli::try_parse_from(["merqa", "decide", "R1", "--all"]).is_err());
        assert!(Cli::try_parse_from(["merqa", "decide", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["merqa", "decide", "R1"]).is_ok());
    }

    #[test]
    fn test_runs_default_limit() {
        match Cli::parse_from(["merqa", "runs"]).command {
            Commands::Runs { limit } => assert_eq!(limit, 10),
            _ => panic!("expected runs"),
        }
    }
}
