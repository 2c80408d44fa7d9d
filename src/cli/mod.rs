//! CLI module for gifify
//!
//! This module handles command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::LogFormat;

pub mod args;

pub use args::{ConvertArgs, GifArgs, PlanArgs};

/// Gifify
///
/// Convert videos to optimized animated GIFs using ffmpeg, ImageMagick
/// convert and gifsicle.
#[derive(Parser, Debug)]
#[command(name = "gifify")]
#[command(about = "Gifify - Convert videos to optimized animated GIFs")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./gifify.toml when present)
    #[arg(short, long, global = true, env = "GIFIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level, overrides the configuration file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Logging format, overrides the configuration file
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a video to a GIF
    Convert(ConvertArgs),
    /// Print the stage command lines without running them
    Plan(PlanArgs),
}
