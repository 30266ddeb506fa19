//! Utility functions for CLI commands.

use misclass_cli::{load_config, load_dataset, Config, Output, OutputFormat, Profile};
use misclass_cluster::AnalysisInput;
use tracing::debug;

use crate::Cli;

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(cli.config.as_deref())
}

/// Gets the profile selected with `-p`, or the current one.
pub fn get_profile(cli: &Cli) -> anyhow::Result<Profile> {
    let profile = get_config(cli)?.resolve_profile(cli.profile.as_deref())?;
    if !profile.name.is_empty() {
        debug!(profile = %profile.name, "using profile");
    }
    Ok(profile)
}

/// Requires input file to be provided.
pub fn require_input_file(cli: &Cli) -> anyhow::Result<&str> {
    cli.input
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("input file is required, use -f flag"))
}

/// Loads the dataset named by `-f`.
pub fn load_input(cli: &Cli) -> anyhow::Result<AnalysisInput> {
    let path = require_input_file(cli)?;
    let input = load_dataset(path)?.into_input()?;
    debug!(path, "loaded dataset");
    Ok(input)
}

/// Output writer configured by `-o` and `--json`.
pub fn output(cli: &Cli) -> Output {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, cli.output.clone())
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Analysis settings given on the command line. Each one overrides the
/// selected profile.
#[derive(clap::Args, Debug, Default)]
pub struct AnalysisFlags {
    /// Distance metric (euclidean, manhattan, maximum, canberra, binary, minkowski)
    #[arg(long)]
    pub metric: Option<String>,
    /// Minkowski exponent
    #[arg(long)]
    pub minkowski_p: Option<f64>,
    /// Linkage method (ward.D2, ward.D, single, complete, average, mcquitty, centroid, median)
    #[arg(long)]
    pub linkage: Option<String>,
    /// Number of clusters (default: number of distinct labels)
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,
    /// Cap for the derived cluster count
    #[arg(long)]
    pub max_clusters: Option<usize>,
    /// Merge the smallest clusters until at most this many remain
    #[arg(long)]
    pub reduce_to: Option<usize>,
    /// Maximum number of distinct labels
    #[arg(long)]
    pub max_labels: Option<usize>,
    /// Assignment solver (hungarian, brute-force)
    #[arg(long)]
    pub solver: Option<String>,
}

impl AnalysisFlags {
    /// The flags as a profile, unset flags left empty.
    pub fn as_profile(&self) -> Profile {
        Profile {
            name: String::new(),
            metric: self.metric.clone().unwrap_or_default(),
            minkowski_p: self.minkowski_p,
            linkage: self.linkage.clone().unwrap_or_default(),
            clusters: self.clusters.unwrap_or(0),
            max_clusters: self.max_clusters.unwrap_or(0),
            reduce_to: self.reduce_to.unwrap_or(0),
            max_labels: self.max_labels.unwrap_or(0),
            solver: self.solver.clone().unwrap_or_default(),
        }
    }

    /// Selected profile with these flags applied.
    pub fn resolve(&self, cli: &Cli) -> anyhow::Result<Profile> {
        if self.clusters == Some(0) {
            anyhow::bail!("--clusters must be at least 1");
        }
        Ok(get_profile(cli)?.merged(&self.as_profile()))
    }
}
