//! CLI module - Command-line interface for certrack
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// certrack - employee certificate tracking
#[derive(Parser)]
#[command(name = "certrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web API and the expiry scheduler (default)
    #[command(alias = "web")]
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Create an administrator account with superuser rights
    CreateAdmin {
        /// Login email
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Mark every overdue active certificate as expired
    #[command(alias = "expire")]
    ExpireCertificates,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
