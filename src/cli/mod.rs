//! CLI module for the access gateway
//!
//! - `serve`: run the gateway
//! - `issue`: provision a token record and print a signed bearer token

pub mod issue;
pub mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Access gateway - bearer token verification and rate limiting in front of an upstream API
#[derive(Parser)]
#[command(name = "access-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway
    Serve(ServeArgs),

    /// Create a token record and print its bearer token
    Issue(issue::IssueArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Configuration file layered over config/default and config/local
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}
