//! Analysis profiles.
//!
//! A profile is a named set of analysis options (metric, linkage, cluster
//! ceilings, solver). Profiles live in ~/.misclass/config.yaml together with
//! the name of the profile used when none is given on the command line.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use misclass_cluster::{AnalysisOptions, Metric, MisclassError};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".misclass";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Name of the currently active profile.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_profile: String,

    /// Map of profile name to profile.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, Profile>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// Analysis settings stored under a name.
///
/// Empty strings and zero counts mean "use the engine default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Distance metric (euclidean, manhattan, maximum, canberra, binary, minkowski).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric: String,

    /// Minkowski exponent; only valid with `metric: minkowski`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minkowski_p: Option<f64>,

    /// Linkage method (ward.D2, ward.D, single, complete, average, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub linkage: String,

    /// Fixed number of clusters to cut the tree into.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub clusters: usize,

    /// Cap for the cluster count derived from the labels.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_clusters: usize,

    /// Cluster count above which the smallest clusters are merged before
    /// alignment.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub reduce_to: usize,

    /// Maximum number of distinct prior labels.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_labels: usize,

    /// Assignment solver (hungarian, brute-force).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub solver: String,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Adds or replaces a profile. The first profile added becomes current.
    pub fn add_profile(&mut self, name: &str, mut profile: Profile) -> anyhow::Result<()> {
        profile.options()?;
        profile.name = name.to_string();
        self.profiles.insert(name.to_string(), profile);
        if self.current_profile.is_empty() {
            self.current_profile = name.to_string();
        }
        self.save()
    }

    /// Deletes a profile.
    pub fn delete_profile(&mut self, name: &str) -> anyhow::Result<()> {
        if self.profiles.remove(name).is_none() {
            anyhow::bail!("profile '{}' not found", name);
        }
        if self.current_profile == name {
            self.current_profile.clear();
        }
        self.save()
    }

    /// Sets the current profile.
    pub fn use_profile(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.profiles.contains_key(name) {
            anyhow::bail!("profile '{}' not found", name);
        }
        self.current_profile = name.to_string();
        self.save()
    }

    /// Gets the current profile.
    pub fn current(&self) -> Option<&Profile> {
        if self.current_profile.is_empty() {
            return None;
        }
        self.profiles.get(&self.current_profile)
    }

    /// Resolves the profile by name, or the current profile if no name is
    /// given. Falls back to the engine defaults when nothing is configured.
    pub fn resolve_profile(&self, name: Option<&str>) -> anyhow::Result<Profile> {
        match name {
            Some(n) if !n.is_empty() => self
                .profiles
                .get(n)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("profile '{}' not found", n)),
            _ => Ok(self.current().cloned().unwrap_or_default()),
        }
    }

    /// Lists all profile names, sorted.
    pub fn list_profiles(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Profile {
    /// Returns a copy of `self` with every field set in `overrides` replaced.
    pub fn merged(&self, overrides: &Profile) -> Profile {
        fn pick(base: &str, over: &str) -> String {
            let chosen = if over.is_empty() { base } else { over };
            chosen.to_string()
        }
        fn pick_n(base: usize, over: usize) -> usize {
            if over == 0 { base } else { over }
        }

        // A stored exponent only carries over while the metric stays minkowski.
        let keeps_minkowski = overrides.metric.is_empty()
            || overrides.metric.trim().eq_ignore_ascii_case("minkowski");
        let minkowski_p = if keeps_minkowski {
            overrides.minkowski_p.or(self.minkowski_p)
        } else {
            overrides.minkowski_p
        };

        Profile {
            name: self.name.clone(),
            metric: pick(&self.metric, &overrides.metric),
            minkowski_p,
            linkage: pick(&self.linkage, &overrides.linkage),
            clusters: pick_n(self.clusters, overrides.clusters),
            max_clusters: pick_n(self.max_clusters, overrides.max_clusters),
            reduce_to: pick_n(self.reduce_to, overrides.reduce_to),
            max_labels: pick_n(self.max_labels, overrides.max_labels),
            solver: pick(&self.solver, &overrides.solver),
        }
    }

    /// Converts the profile into engine options. Unset fields keep the
    /// engine defaults.
    pub fn options(&self) -> Result<AnalysisOptions, MisclassError> {
        let mut opts = AnalysisOptions::default();

        if !self.metric.is_empty() {
            opts.metric = self.metric.parse()?;
        }
        if let Some(p) = self.minkowski_p {
            if !matches!(opts.metric, Metric::Minkowski(_)) {
                return Err(MisclassError::InvalidInput(format!(
                    "minkowski exponent given for metric {}",
                    opts.metric
                )));
            }
            if !p.is_finite() || p <= 0.0 {
                return Err(MisclassError::InvalidInput(format!(
                    "minkowski exponent must be a positive number, got {p}"
                )));
            }
            opts.metric = Metric::minkowski(p);
        }
        if !self.linkage.is_empty() {
            opts.linkage = self.linkage.parse()?;
        }
        if self.clusters > 0 {
            opts.n_clusters = Some(self.clusters);
        }
        if self.max_clusters > 0 {
            opts.max_clusters = self.max_clusters;
        }
        if self.reduce_to > 0 {
            opts.aligner.reduce_to = self.reduce_to;
        }
        if self.max_labels > 0 {
            opts.aligner.max_labels = self.max_labels;
        }
        if !self.solver.is_empty() {
            opts.aligner.solver = self.solver.parse()?;
        }

        Ok(opts)
    }
}

/// Loads the configuration from `custom_path`, or from the default location.
///
/// A missing file is created empty.
pub fn load_config(custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        let cfg = Config::default();
        std::fs::write(&config_path, serde_yaml::to_string(&cfg)?)?;
        cfg
    };

    cfg.config_path = config_path;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use misclass_cluster::{Linkage, Solver};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let path = dir.path().join("nested").join("config.yaml");
        load_config(path.to_str()).unwrap()
    }

    #[test]
    fn test_load_creates_file() {
        let dir = TempDir::new().unwrap();
        let cfg = config_in(&dir);
        assert!(cfg.path().exists());
        assert!(cfg.profiles.is_empty());
        assert!(cfg.current().is_none());
    }

    #[test]
    fn test_profile_lifecycle() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config_in(&dir);

        let profile = Profile {
            linkage: "average".into(),
            ..Default::default()
        };
        cfg.add_profile("avg", profile).unwrap();
        cfg.add_profile("default", Profile::default()).unwrap();
        assert_eq!(cfg.current_profile, "avg");
        assert_eq!(cfg.list_profiles(), vec!["avg", "default"]);

        cfg.use_profile("default").unwrap();
        assert!(cfg.use_profile("missing").is_err());

        let reloaded = load_config(cfg.path().to_str()).unwrap();
        assert_eq!(reloaded.current_profile, "default");
        assert_eq!(reloaded.profiles["avg"].linkage, "average");
        assert_eq!(reloaded.profiles["avg"].name, "avg");

        cfg.delete_profile("default").unwrap();
        assert!(cfg.current_profile.is_empty());
        assert!(cfg.delete_profile("default").is_err());
    }

    #[test]
    fn test_add_rejects_bad_profile() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config_in(&dir);
        let bad = Profile {
            metric: "cosine".into(),
            ..Default::default()
        };
        assert!(cfg.add_profile("bad", bad).is_err());
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn test_resolve_profile() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config_in(&dir);
        assert_eq!(cfg.resolve_profile(None).unwrap(), Profile::default());

        let profile = Profile {
            solver: "brute-force".into(),
            ..Default::default()
        };
        cfg.add_profile("bf", profile).unwrap();
        assert_eq!(cfg.resolve_profile(None).unwrap().solver, "brute-force");
        assert_eq!(cfg.resolve_profile(Some("bf")).unwrap().name, "bf");
        assert!(cfg.resolve_profile(Some("nope")).is_err());
    }

    #[test]
    fn test_options_defaults() {
        assert_eq!(Profile::default().options().unwrap(), AnalysisOptions::default());
    }

    #[test]
    fn test_options_from_profile() {
        let profile = Profile {
            metric: "minkowski".into(),
            minkowski_p: Some(3.0),
            linkage: "complete".into(),
            clusters: 4,
            max_clusters: 6,
            reduce_to: 8,
            max_labels: 5,
            solver: "brute-force".into(),
            ..Default::default()
        };
        let opts = profile.options().unwrap();
        assert_eq!(opts.metric, Metric::Minkowski(3.0));
        assert_eq!(opts.linkage, Linkage::Complete);
        assert_eq!(opts.n_clusters, Some(4));
        assert_eq!(opts.max_clusters, 6);
        assert_eq!(opts.aligner.reduce_to, 8);
        assert_eq!(opts.aligner.max_labels, 5);
        assert_eq!(opts.aligner.solver, Solver::BruteForce);
    }

    #[test]
    fn test_exponent_needs_minkowski() {
        let profile = Profile {
            metric: "manhattan".into(),
            minkowski_p: Some(1.5),
            ..Default::default()
        };
        assert!(profile.options().is_err());
    }

    #[test]
    fn test_merged() {
        let base = Profile {
            name: "base".into(),
            metric: "manhattan".into(),
            clusters: 3,
            ..Default::default()
        };
        let flags = Profile {
            linkage: "single".into(),
            clusters: 5,
            ..Default::default()
        };
        let merged = base.merged(&flags);
        assert_eq!(merged.name, "base");
        assert_eq!(merged.metric, "manhattan");
        assert_eq!(merged.linkage, "single");
        assert_eq!(merged.clusters, 5);
    }

    #[test]
    fn test_merged_metric_drops_stored_exponent() {
        let base = Profile {
            metric: "minkowski".into(),
            minkowski_p: Some(3.0),
            ..Default::default()
        };

        let manhattan = Profile {
            metric: "manhattan".into(),
            ..Default::default()
        };
        let merged = base.merged(&manhattan);
        assert_eq!(merged.minkowski_p, None);
        assert_eq!(merged.options().unwrap().metric, Metric::Manhattan);

        // Still minkowski: the stored exponent applies.
        let same = Profile {
            metric: "Minkowski".into(),
            ..Default::default()
        };
        assert_eq!(base.merged(&same).options().unwrap().metric, Metric::Minkowski(3.0));
        assert_eq!(
            base.merged(&Profile::default()).options().unwrap().metric,
            Metric::Minkowski(3.0)
        );

        // An exponent passed alongside another metric is still an error.
        let bad = Profile {
            metric: "manhattan".into(),
            minkowski_p: Some(2.0),
            ..Default::default()
        };
        assert!(base.merged(&bad).options().is_err());
    }
}
