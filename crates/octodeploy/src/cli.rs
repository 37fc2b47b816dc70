//! Clap derive structures for the `octodeploy` CLI.
//!
//! Defines the command tree, global flags, and shared types. Kept free of
//! crate-internal imports so `build.rs` can compile it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// octodeploy -- drive Octopus Deploy resources from JSON configuration
#[derive(Debug, Parser)]
#[command(
    name = "octodeploy",
    version,
    about = "Manage Octopus Deploy resources declaratively",
    long_about = "Validate, create, read, update and delete Octopus Deploy resources\n\
        (environments, deployment targets, machine policies, deployment processes,\n\
        variables and triggers) from JSON configuration and state files.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "OCTODEPLOY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Octopus server URL (overrides profile)
    #[arg(long, short = 'a', env = "OCTOPUS_URL", global = true)]
    pub address: Option<String>,

    /// Octopus API key
    #[arg(long, env = "OCTOPUS_APIKEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Default space for resources that don't set space_id
    #[arg(long, env = "OCTOPUS_SPACE", global = true)]
    pub space: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "OCTODEPLOY_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "OCTODEPLOY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "OCTODEPLOY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Attribute table
    Table,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered resource and data source types
    #[command(alias = "ls")]
    Resources,

    /// Print the provider schema, or one type's schema
    Schema(SchemaArgs),

    /// Check a configuration file without contacting the server
    Validate(ConfigFileArgs),

    /// Create a resource from a configuration file
    Create(ConfigFileArgs),

    /// Refresh a resource from its state file
    Read(StateFileArgs),

    /// Apply a configuration file to an existing resource
    Update(UpdateArgs),

    /// Delete the resource described by a state file
    Delete(StateFileArgs),

    /// Adopt an existing server object and print its state
    Import(ImportArgs),

    /// Run a data source lookup
    Data(ConfigFileArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Resource or data source type name
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigFileArgs {
    /// Resource or data source type name (e.g. octopusdeploy_environment)
    pub name: String,

    /// JSON configuration file (`-` for stdin)
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct StateFileArgs {
    /// Resource type name
    pub name: String,

    /// JSON state file (`-` for stdin)
    #[arg(long, short = 's')]
    pub state: PathBuf,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Resource type name
    pub name: String,

    /// Server id of the object (variables take `OwnerID:VariableID`)
    pub id: String,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Resource type name
    pub name: String,

    /// JSON state file from a previous create/read
    #[arg(long, short = 's')]
    pub state: PathBuf,

    /// JSON configuration file with the desired values
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the effective configuration (API keys masked)
    Show,

    /// Store an API key for the active profile in the system keyring
    SetKey,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
