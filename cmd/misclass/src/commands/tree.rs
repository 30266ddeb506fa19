//! Merge tree command.

use clap::Args;
use serde::Serialize;

use misclass_cluster::{build, cut_height, cut_tree, pairwise, Merge};

use super::{load_input, output, AnalysisFlags};
use crate::Cli;

/// Build the merge tree of a dataset and optionally cut it.
///
/// Labels in the dataset are ignored. With --cut or --height the flat
/// assignment is included in the output.
#[derive(Args)]
pub struct TreeCommand {
    #[command(flatten)]
    flags: AnalysisFlags,

    /// Cut the tree into this many clusters
    #[arg(long, conflicts_with = "height")]
    cut: Option<usize>,

    /// Cut the tree at this height (monotone trees only)
    #[arg(long)]
    height: Option<f64>,
}

#[derive(Serialize)]
struct TreeView<'a> {
    n_leaves: usize,
    linkage: String,
    monotone: bool,
    merges: &'a [Merge],
    leaf_order: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clusters: Option<Vec<usize>>,
}

impl TreeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let profile = self.flags.resolve(cli)?;
        let options = profile.options()?;
        let input = load_input(cli)?;
        input.check()?;

        let distances = pairwise(input.matrix(), options.metric)?;
        let tree = build(&distances, options.linkage)?;

        let clusters = match (self.cut.or(options.n_clusters), self.height) {
            (_, Some(h)) => Some(cut_height(&tree, h)?),
            (Some(k), None) => Some(cut_tree(&tree, k)?),
            (None, None) => None,
        };

        output(cli).write(&TreeView {
            n_leaves: tree.n_leaves(),
            linkage: tree.linkage().to_string(),
            monotone: tree.is_monotone(),
            merges: tree.merges(),
            leaf_order: tree.leaf_order(),
            clusters,
        })
    }
}
