use afcluster::engine::config::{ClusteringConfig, FetchConfig, LocalSearchConfig};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    pub enabled: bool,
    pub command: String,
    pub num_seeds: u32,
    pub num_recycle: u32,
    pub use_dropout: bool,
    pub amber: bool,
    pub num_relax: u32,
    pub use_gpu_relax: bool,
    pub templates: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub outdir: PathBuf,
    pub tmp_dir: PathBuf,
    /// Seeds the radius search; entropy is used when absent.
    pub random_seed: Option<u64>,
    pub clustering: ClusteringConfig,
    pub fetch: FetchConfig,
    pub local: LocalSearchConfig,
    pub prediction: PredictionConfig,
}
