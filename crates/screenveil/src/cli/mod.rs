//! Command-line interface for screenveil.
//!
//! This module provides the CLI structure and command handlers for the
//! `sveil` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, MaskCommand, OutputFormat, ScanCommand, ServeCommand, StatusCommand,
};

/// sveil - Blur sensitive data before anyone else sees it
///
/// Detects sensitive text (emails, card numbers, API keys, revenue
/// figures) and blurs it on observed pages, coordinated by a background
/// service that reacts to screen-share events.
#[derive(Debug, Parser)]
#[command(name = "sveil")]
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
    /// Scan text and list sensitive spans
    Scan(ScanCommand),

    /// Mask sensitive spans in text
    Mask(MaskCommand),

    /// Run the blur service until interrupted
    Serve(ServeCommand),

    /// Show persisted settings and recent share sessions
    Status(StatusCommand),

    /// View or modify configuration
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
