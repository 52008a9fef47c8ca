//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Plays the number comparison game on an Android device over adb
#[derive(Parser, Debug)]
#[command(name = "adb-compare-bot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (defaults to config/config.json next to the executable)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Device address, overriding adb_address from the config
    #[arg(short, long, global = true)]
    pub adb_address: Option<String>,

    /// Print debug lines to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot until interrupted or OCR keeps failing
    Run,

    /// Capture once and print what OCR reads
    TestOcr,

    /// Draw a single symbol on the input region
    Draw {
        /// One of >, < or =
        symbol: String,
    },

    /// Write the default config file
    InitConfig {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// The subcommand to execute, `run` when none was given.
    pub fn subcommand(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
