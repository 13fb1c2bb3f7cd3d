//! CLI argument definitions for pargolo.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Pargolo - keep hierarchical configuration parameters in sync with a
/// parameter store.
///
/// Start with `pargolo validate` to see what an upload would change.
#[derive(Parser, Debug)]
#[command(name = "pargolo")]
#[command(
    author,
    version,
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("PARGOLO_GIT_COMMIT"),
        ", built ",
        env!("PARGOLO_BUILD_TIMESTAMP"),
        ")"
    ),
    about = "Validate and synchronise configuration parameters against a parameter store",
    long_about = None
)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Increase diagnostic logging on stderr (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Abort the command after this many seconds
    #[arg(long, global = true)]
    pub deadline_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags selecting and configuring the parameter store.
#[derive(Args, Debug, Default, Clone)]
pub struct StoreArgs {
    /// Store backend: ssm, file or memory [env: PARGOLO_BACKEND]
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// JSON document used by the file backend [env: PARGOLO_STORE_FILE]
    #[arg(long, global = true)]
    pub store_file: Option<PathBuf>,

    /// Remote store region [env: PARGOLO_REGION, AWS_REGION]
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Remote store endpoint URL [env: PARGOLO_ENDPOINT]
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Parameters requested per listing page (1-10)
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Path to config.kdl
    #[arg(long, global = true, env = "PARGOLO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List parameters under a path prefix
    #[command(name = "search-by-path", alias = "searchbypath")]
    SearchByPath {
        /// Path prefix to list (e.g. /dev/billing/api)
        #[arg(long)]
        path: String,

        /// Replace /common/ references with the shared value they point to
        #[arg(long)]
        recursive: bool,

        /// Write the results to this CSV file instead of printing them
        #[arg(long)]
        output: Option<String>,
    },

    /// Find every parameter holding an exact value
    #[command(name = "search-by-value", alias = "searchbyvalue")]
    SearchByValue {
        /// Value to search for
        #[arg(long)]
        value: String,

        /// Only keep names starting with this prefix
        #[arg(long)]
        filter: Option<String>,

        /// Write the results to this CSV file instead of printing them
        #[arg(long)]
        output: Option<String>,
    },

    /// Export a project and the shared parameters it references to CSV
    Export {
        #[command(flatten)]
        project: ProjectArgs,

        /// Directory for the export file
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Compare a desired-state CSV with the store without writing anything
    Validate {
        /// Input CSV file (name,type,value rows; .csv may be omitted)
        #[arg(long)]
        input: String,

        /// Target environment
        #[arg(long)]
        env: String,

        /// Exit non-zero if any shared parameter would be changed
        #[arg(long)]
        strict: bool,
    },

    /// Write a desired-state CSV to the store
    Upload {
        /// Input CSV file (name,type,value rows; .csv may be omitted)
        #[arg(long)]
        input: String,

        /// Overwrite the value if the key already exists
        #[arg(long)]
        overwrite: bool,

        /// Validate against this environment first and refuse destructive changes
        #[arg(long)]
        env: Option<String>,

        /// Upload even if shared parameters would be changed (requires --env)
        #[arg(long, requires = "env")]
        force: bool,
    },

    /// Create a desired-state CSV from the blank keys of a JSON config file
    #[command(alias = "init")]
    Initialize {
        /// Input JSON config file (.json may be omitted)
        #[arg(long)]
        input: String,

        #[command(flatten)]
        project: ProjectArgs,

        /// Output CSV file
        #[arg(long, default_value = "data.csv")]
        output: PathBuf,

        /// Also emit keys that already have a value
        #[arg(long)]
        include_values: bool,
    },

    /// Delete a single parameter
    Delete {
        /// Full parameter name
        #[arg(long)]
        name: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Environment, domain and project identifying a project prefix.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Environment (first path segment)
    #[arg(long)]
    pub env: String,

    /// Project domain
    #[arg(long)]
    pub domain: String,

    /// Project name
    #[arg(long)]
    pub project: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved settings and where each came from
    Show,
}
