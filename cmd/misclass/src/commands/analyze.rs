//! Mislabel analysis command.

use std::fmt::{self, Write as _};

use clap::Args;
use serde::Serialize;
use tracing::info;

use misclass_cluster::align::ClusterMapping;
use misclass_cluster::{Analysis, AnalysisResult, ContingencyTable, Mismatch};

use super::{load_input, output, AnalysisFlags};
use crate::Cli;

/// Cluster a dataset and report samples that disagree with their label.
///
/// The dataset is read from the file given with -f. Settings come from the
/// selected profile and can be overridden with the flags below.
#[derive(Args)]
pub struct AnalyzeCommand {
    #[command(flatten)]
    flags: AnalysisFlags,

    /// Emit every intermediate result (distances, tree, assignments)
    #[arg(long, conflicts_with = "table")]
    full: bool,

    /// Print a plain-text table instead of YAML/JSON
    #[arg(long)]
    table: bool,
}

/// The parts of an analysis most callers want.
#[derive(Serialize)]
struct Summary<'a> {
    observations: usize,
    clusters: usize,
    metric: String,
    linkage: String,
    reduced: bool,
    mismatched: usize,
    rate: f64,
    rate_percent: f64,
    adjusted_rand_index: f64,
    mapping: &'a [ClusterMapping<String>],
    contingency: &'a ContingencyTable<String>,
    mismatches: &'a [Mismatch<String>],
}

impl AnalyzeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let profile = self.flags.resolve(cli)?;
        let options = profile.options()?;
        let input = load_input(cli)?;

        let analysis = Analysis::new(options);
        let result = analysis.run(input)?;
        info!(
            observations = result.report.n,
            clusters = result.n_clusters,
            mismatched = result.report.mismatched,
            rate_percent = result.report.rate_percent,
            "analysis finished"
        );

        let out = output(cli);
        if self.full {
            return out.write(&result);
        }
        if self.table {
            let mut text = String::new();
            render_table(&result, &mut text)?;
            return out.write_text(&text);
        }

        let opts = analysis.options();
        out.write(&Summary {
            observations: result.report.n,
            clusters: result.n_clusters,
            metric: opts.metric.to_string(),
            linkage: opts.linkage.to_string(),
            reduced: result.alignment.reduced,
            mismatched: result.report.mismatched,
            rate: result.report.rate,
            rate_percent: result.report.rate_percent,
            adjusted_rand_index: result.report.adjusted_rand_index,
            mapping: &result.alignment.mapping,
            contingency: result.contingency(),
            mismatches: &result.report.mismatches,
        })
    }
}

fn render_table(result: &AnalysisResult, s: &mut String) -> fmt::Result {
    let report = &result.report;

    writeln!(
        s,
        "{} of {} samples disagree with their cluster ({}%), ARI {:.3}",
        report.mismatched, report.n, report.rate_percent, report.adjusted_rand_index
    )?;

    writeln!(s, "\n{:<10} {:<16} {:>8} {:>8}", "CLUSTER", "LABEL", "MATCHED", "SIZE")?;
    for m in &result.alignment.mapping {
        writeln!(
            s,
            "{:<10} {:<16} {:>8} {:>8}",
            m.cluster,
            m.value.to_string(),
            m.matched,
            m.size
        )?;
    }

    if !report.mismatches.is_empty() {
        writeln!(s, "\n{:<20} {:<16} {}", "SAMPLE", "LABEL", "ASSIGNED")?;
        for m in &report.mismatches {
            writeln!(s, "{:<20} {:<16} {}", m.id, m.expected, m.assigned)?;
        }
    }
    Ok(())
}
