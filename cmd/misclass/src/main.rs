//! misclass - flag likely mislabeled samples.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{AnalyzeCommand, ConfigCommand, TreeCommand};

/// misclass - flag likely mislabeled samples.
///
/// Clusters observations with Ward hierarchical clustering, aligns the
/// clusters to the prior labels with an optimal assignment, and lists the
/// samples whose label disagrees with their cluster.
///
/// Analysis profiles are stored in ~/.misclass/config.yaml.
#[derive(Parser)]
#[command(name = "misclass")]
#[command(about = "Mislabel detection by hierarchical clustering")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.misclass/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Profile name to use
    #[arg(short = 'p', long, global = true)]
    pub profile: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Input dataset file (YAML or JSON, `-` for stdin)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage analysis profiles
    Config(ConfigCommand),
    /// Cluster a dataset and report samples that disagree with their label
    Analyze(AnalyzeCommand),
    /// Build the merge tree and optionally cut it
    Tree(TreeCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli),
        Commands::Analyze(cmd) => cmd.run(&cli),
        Commands::Tree(cmd) => cmd.run(&cli),
    }
}
