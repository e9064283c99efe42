//! Clap derive structures for the `tessel` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tessel -- query a console API through the normalized entity cache
#[derive(Debug, Parser)]
#[command(
    name = "tessel",
    version,
    about = "Fetch and page console API entities from the command line",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "TESSEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides the config file)
    #[arg(long, short = 'u', env = "TESSEL_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TESSEL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one entity by id
    Get(GetArgs),

    /// Fetch pages of a collection
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show the configured entity schemas
    Schemas,

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Entity type, as declared under `[entities]`
    pub entity: String,

    /// Entity id
    pub id: String,

    /// Endpoint the entity lives on
    #[arg(long, short = 'e', default_value = "default")]
    pub endpoint: String,

    /// Relation to expand inline (repeatable), e.g. `application-route`
    #[arg(long, short = 'i')]
    pub include: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Entity type, as declared under `[entities]`
    pub entity: String,

    /// Pagination operation to run
    #[arg(long, default_value = "getMultiple")]
    pub op: String,

    /// Parent entity id for child listings (fills `{id}` in the URL)
    #[arg(long)]
    pub parent: Option<String>,

    /// Endpoint the collection lives on
    #[arg(long, short = 'e', default_value = "default")]
    pub endpoint: String,

    /// First page to fetch
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Number of pages to fetch
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: u32,

    /// Show every fetched page as one list
    #[arg(long)]
    pub flatten: bool,

    /// Query parameter (repeatable), e.g. `--param order=asc`
    #[arg(long, short = 'p', value_parser = parse_key_val)]
    pub param: Vec<(String, String)>,

    /// Relation to expand inline (repeatable)
    #[arg(long, short = 'i')]
    pub include: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}
