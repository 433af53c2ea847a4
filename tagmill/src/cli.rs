//! CLI argument parsing for tagmill

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tm")]
#[command(author, version, about = "Round-robin multi-endpoint batch tagger", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Normalize raw records (title, year and genre cleanup)
    Clean {
        /// Input JSONL record file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSONL record file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Tag records by fanning calls out across the configured endpoints
    Tag {
        /// Input JSONL record file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSONL record file with a tags field
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tag_subcommand_args() {
        let cli = Cli::parse_from(["tm", "tag", "-i", "in.jsonl", "-o", "out.jsonl"]);

        match cli.command {
            Command::Tag { input, output } => {
                assert_eq!(input, PathBuf::from("in.jsonl"));
                assert_eq!(output, PathBuf::from("out.jsonl"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
