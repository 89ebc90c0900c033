use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cloudstack")]
#[command(author = "cloudstack contributors")]
#[command(version)]
#[command(about = "Declare cloud stacks and emit manifests for the reconciler", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stack to operate on
    #[arg(
        short,
        long,
        global = true,
        default_value = "dev",
        env = "CLOUDSTACK_STACK",
        value_parser = parse_stack
    )]
    pub stack: String,

    /// Config directory (defaults to $CLOUDSTACK_CONFIG_DIR or ~/.config/cloudstack)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the stack and show the deployment plan
    Preview(PreviewArgs),

    /// Write the manifest for the reconciler
    Emit(EmitArgs),

    /// Run policy checks against the stack
    Check,

    /// Compare the stack with the last emitted manifest
    Diff(DiffArgs),

    /// Print the dependency graph
    Graph(GraphArgs),

    /// Show stack outputs
    Outputs,

    /// Manage stack config files
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct PreviewArgs {
    /// Limit to a family or resource (e.g. "storage", "k8s", "container.dev-cluster")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(clap::Args)]
pub struct EmitArgs {
    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Do not record this manifest as the stack's snapshot
    #[arg(long)]
    pub no_snapshot: bool,
}

#[derive(clap::Args)]
pub struct DiffArgs {
    /// Show changed property lines
    #[arg(short, long)]
    pub details: bool,
}

#[derive(clap::Args)]
pub struct GraphArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = GraphFormat::Text)]
    pub format: GraphFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Graphviz DOT
    Dot,
    /// Indented text
    Text,
}

fn parse_stack(s: &str) -> Result<String, String> {
    crate::paths::check_stack_name(s)
        .map(|()| s.to_string())
        .map_err(|e| e.to_string())
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the stack's config
    Show,

    /// Print the path of the stack's config file
    Path,

    /// Write a starter config for the stack
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
