//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// linkmap - a private URL shortener behind an access proxy
#[derive(Parser, Debug)]
#[command(name = "linkmap")]
#[command(version)]
#[command(about = "A private URL shortener behind an identity-aware proxy", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// List all short links
    List,

    /// Add a short link
    Add {
        key: String,
        url: String,

        /// Recorded as createdBy
        #[arg(long, default_value = "cli")]
        author: String,
    },

    /// Point an existing short link at a new URL
    Update {
        key: String,
        url: String,

        /// Recorded as createdBy
        #[arg(long, default_value = "cli")]
        author: String,
    },

    /// Remove a short link
    Remove { key: String },

    /// Remove orphaned metadata and fix metadata that disagrees with the stored URL
    Repair,

    /// Generate a sample configuration file
    ConfigGen {
        /// Write to this path instead of stdout
        output: Option<String>,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

impl Commands {
    /// Commands that read or write the configured store directly.
    ///
    /// These must not run against a config that failed to load: the
    /// default backend is in-memory and every write would be lost.
    pub fn touches_store(&self) -> bool {
        !matches!(self, Commands::Serve | Commands::ConfigGen { .. })
    }
}
