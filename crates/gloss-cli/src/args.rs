//! Command-line argument definitions for the gloss CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Positional arguments select the module, file and type to
//! document; options control the output destination, format, title,
//! configuration file and logging verbosity.

use clap::Parser;

/// Command-line arguments for the gloss documentation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Root directory of the Go module (the directory holding go.mod)
    #[arg(help = "Root directory of the Go module")]
    pub module: String,

    /// Go file declaring the type, relative to the module root
    #[arg(help = "Go file declaring the type")]
    pub file: String,

    /// Name of the type to document
    #[arg(help = "Name of the type to document")]
    pub name: String,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format (markdown, json); overrides the configuration file
    #[arg(short, long)]
    pub format: Option<String>,

    /// Document title; defaults to the type name
    #[arg(short, long)]
    pub title: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
