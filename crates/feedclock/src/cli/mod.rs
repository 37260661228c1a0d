//! Command-line interface for feedclock.
//!
//! This module provides the CLI structure for the `fdclk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{BottleCommand, ConfigCommand, EndCommand, SideArg, StartCommand, StatusCommand};

/// fdclk - Resumable breastfeeding timer
///
/// Times a feed across any number of side switches, survives restarts, and
/// reconciles the accumulated per-side durations into the household feeding
/// log when the feed ends.
#[derive(Debug, Parser)]
#[command(name = "fdclk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start timing a feed
    Start(StartCommand),

    /// Switch the running timer to the other breast
    Switch,

    /// Show the running timer
    Status(StatusCommand),

    /// End the feed and log it
    End(EndCommand),

    /// Watch the running timer with a live display
    Watch,

    /// Quick-log a bottle feeding without timing
    Bottle(BottleCommand),

    /// Show the most recent feeding per breast
    Last,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
