use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::application::seed::ConflictPolicy;

/// Command-line arguments for the portfolio binary.
#[derive(Debug, Parser)]
#[command(name = "portfolio", version, about = "Personal portfolio site")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PORTFOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the site over HTTP.
    Serve(Box<ServeArgs>),
    /// Insert the bootstrap user accounts.
    Seed(SeedArgs),
    /// Print the route table.
    Routes(RoutesArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the resume file served for download.
    #[arg(long = "site-resume-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub resume_path: Option<PathBuf>,
}

/// How `seed` treats accounts whose email already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OnConflict {
    /// Abort on the first existing account.
    #[default]
    Fail,
    /// Leave existing accounts alone and continue.
    Skip,
}

impl From<OnConflict> for ConflictPolicy {
    fn from(value: OnConflict) -> Self {
        match value {
            OnConflict::Fail => ConflictPolicy::Fail,
            OnConflict::Skip => ConflictPolicy::SkipExisting,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Behavior when an account's email is already taken.
    #[arg(long = "on-conflict", value_enum, default_value_t = OnConflict::Fail)]
    pub on_conflict: OnConflict,

    /// TOML file of `[[users]]` to seed instead of the built-in accounts.
    #[arg(long = "file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RoutesArgs {
    /// Print the table as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}
