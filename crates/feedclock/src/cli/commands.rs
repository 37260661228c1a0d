//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::segment::FeedingSide;

/// Start command arguments.
#[derive(Debug, Args)]
pub struct StartCommand {
    /// The side to start timing
    #[arg(value_enum)]
    pub side: SideArg,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// End command arguments.
#[derive(Debug, Args)]
pub struct EndCommand {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Bottle quick-log arguments.
#[derive(Debug, Args)]
pub struct BottleCommand {
    /// Amount in ounces
    #[arg(long)]
    pub oz: f64,

    /// Free-form notes
    #[arg(short, long)]
    pub notes: Option<String>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Feeding side argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    /// Left breast
    Left,
    /// Right breast
    Right,
    /// Both breasts, timed as one block
    Both,
    /// Bottle
    Bottle,
}

impl From<SideArg> for FeedingSide {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Left => Self::BreastLeft,
            SideArg::Right => Self::BreastRight,
            SideArg::Both => Self::BreastBoth,
            SideArg::Bottle => Self::Bottle,
        }
    }
}
