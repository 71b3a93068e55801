use super::{print_cluster_summary, sampling_rng};
use crate::cli::ClusterArgs;
use crate::config::{CliOverrides, build_config};
use crate::data::DataManager;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use afcluster::engine::progress::ProgressReporter;
use afcluster::workflows;
use std::path::Path;
use tracing::info;

const FALLBACK_KEYWORD: &str = "cluster";

pub async fn run(args: ClusterArgs) -> Result<()> {
    let data_manager = DataManager::new()?;
    let overrides = CliOverrides {
        config: args.config.clone(),
        outdir: args.outdir.as_deref(),
        cluster: args.cluster.clone(),
        ..Default::default()
    };
    let config = build_config(&overrides, &data_manager)?;
    let keyword = args
        .keyword
        .clone()
        .unwrap_or_else(|| keyword_for(&args.input));

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut rng = sampling_rng(config.random_seed);

    println!("Clustering {} ...", args.input.display());
    info!(
        "Invoking the clustering workflow with keyword '{}' into {:?}",
        keyword, config.outdir
    );
    let summary = tokio::task::block_in_place(|| {
        workflows::cluster::run(
            &args.input,
            &config.outdir,
            &keyword,
            &config.clustering,
            &mut rng,
            &reporter,
        )
    })?;

    print_cluster_summary(&summary);
    Ok(())
}

/// The input file stem, which names the cluster files when no keyword is given.
fn keyword_for(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_KEYWORD.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_defaults_to_input_stem() {
        assert_eq!(keyword_for(Path::new("msas/P00698.a3m")), "P00698");
        assert_eq!(keyword_for(Path::new("/")), FALLBACK_KEYWORD);
    }
}
