//! Profile management commands.

use clap::{Args, Subcommand};

use misclass_cli::Profile;

use super::{get_config, print_success, AnalysisFlags};
use crate::Cli;

/// Manage analysis profiles.
///
/// A profile stores analysis settings under a name, similar to kubectl's
/// contexts. The current profile is used unless -p selects another one.
///
/// Configuration is stored in ~/.misclass/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add or replace a profile
    #[command(name = "add-profile")]
    AddProfile {
        /// Profile name
        name: String,
        #[command(flatten)]
        flags: AnalysisFlags,
    },
    /// Delete a profile
    #[command(name = "delete-profile")]
    DeleteProfile {
        /// Profile name
        name: String,
    },
    /// Set the current profile
    #[command(name = "use-profile")]
    UseProfile {
        /// Profile name
        name: String,
    },
    /// Display the current profile
    #[command(name = "get-profile")]
    GetProfile,
    /// List all profiles
    #[command(name = "list-profiles", alias = "get-profiles")]
    ListProfiles,
    /// View the current configuration
    View,
}

fn or_default(value: &str) -> &str {
    if value.is_empty() { "(default)" } else { value }
}

fn count_or_default(value: usize) -> String {
    if value == 0 {
        "(default)".to_string()
    } else {
        value.to_string()
    }
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddProfile { name, flags } => {
                if flags.clusters == Some(0) {
                    anyhow::bail!("--clusters must be at least 1");
                }
                let mut cfg = get_config(cli)?;
                cfg.add_profile(name, flags.as_profile())?;
                print_success(&format!("Profile \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteProfile { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_profile(name)?;
                print_success(&format!("Profile \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseProfile { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_profile(name)?;
                print_success(&format!("Switched to profile \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetProfile => {
                let cfg = get_config(cli)?;
                if cfg.current_profile.is_empty() {
                    println!("No current profile set");
                } else {
                    println!("{}", cfg.current_profile);
                }
                Ok(())
            }

            ConfigSubcommand::ListProfiles => {
                let cfg = get_config(cli)?;

                if cfg.profiles.is_empty() {
                    println!("No profiles configured");
                    return Ok(());
                }

                println!(
                    "{:<8} {:<20} {:<16} {:<12} {}",
                    "CURRENT", "NAME", "METRIC", "LINKAGE", "CLUSTERS"
                );
                for (name, profile) in sorted(&cfg.profiles) {
                    let current = if name == cfg.current_profile { "*" } else { "" };
                    println!(
                        "{:<8} {:<20} {:<16} {:<12} {}",
                        current,
                        name,
                        or_default(&profile.metric),
                        or_default(&profile.linkage),
                        count_or_default(profile.clusters)
                    );
                }
                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;

                println!("Config file: {}", cfg.path().display());
                println!("Current profile: {}", cfg.current_profile);
                println!("Profiles: {}", cfg.profiles.len());

                if !cfg.profiles.is_empty() {
                    println!("\nProfile details:");
                    for (name, p) in sorted(&cfg.profiles) {
                        println!("\n  {}:", name);
                        println!("    Metric: {}", or_default(&p.metric));
                        if let Some(exp) = p.minkowski_p {
                            println!("    Minkowski p: {}", exp);
                        }
                        println!("    Linkage: {}", or_default(&p.linkage));
                        println!("    Clusters: {}", count_or_default(p.clusters));
                        println!("    Max clusters: {}", count_or_default(p.max_clusters));
                        println!("    Reduce to: {}", count_or_default(p.reduce_to));
                        println!("    Max labels: {}", count_or_default(p.max_labels));
                        println!("    Solver: {}", or_default(&p.solver));
                    }
                }
                Ok(())
            }
        }
    }
}

fn sorted(profiles: &std::collections::HashMap<String, Profile>) -> Vec<(&str, &Profile)> {
    let mut entries: Vec<(&str, &Profile)> =
        profiles.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}
