//! CLI module for selfquery
//!
//! Provides command-line interface parsing for the selfquery binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// selfquery - retrieval-augmented generation over documents and video metadata
#[derive(Parser, Debug)]
#[command(
    name = "selfquery",
    version,
    about = "Document QA and LLM-driven self-query retrieval",
    long_about = "Two retrieval-augmented generation workflows:\n\n\
                  - ask: answer a question from a markdown file\n\
                  - videos: fetch video metadata and answer natural-language queries\n    \
                  by translating them into metadata filters",
    after_help = "EXAMPLES:\n    \
                  selfquery init                                   # Write selfquery.toml\n    \
                  selfquery ask --file easy-rl.md \"What is RL?\"    # Document QA\n    \
                  selfquery videos \"videos longer than 600 seconds\" # Self-query search\n    \
                  selfquery config --validate                      # Check configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "selfquery.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from a markdown or text file
    Ask {
        /// Document to load
        #[arg(short, long)]
        file: PathBuf,

        /// Number of chunks to retrieve (overrides rag.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Fetch video metadata and run self-query retrieval
    Videos {
        /// Video URL to load (repeatable; defaults to source.videos)
        #[arg(short, long = "url")]
        urls: Vec<String>,

        /// Maximum results when the query gives no limit
        #[arg(short, long)]
        limit: Option<usize>,

        /// Queries to run (defaults to retriever.queries)
        queries: Vec<String>,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Write a starter selfquery.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
