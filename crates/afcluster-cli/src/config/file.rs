use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub outdir: Option<PathBuf>,
    pub tmp_dir: Option<PathBuf>,
    pub random_seed: Option<u64>,
    pub clustering: Option<FileClusteringConfig>,
    pub fetch: Option<FileFetchConfig>,
    pub prediction: Option<FilePredictionConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileClusteringConfig {
    pub gap_cutoff: Option<f64>,
    pub min_samples: Option<usize>,
    pub eps: Option<f64>,
    pub min_eps: Option<f64>,
    pub max_eps: Option<f64>,
    pub eps_step: Option<f64>,
    pub sample_fraction: Option<f64>,
    pub refinement_budget: Option<usize>,
    pub alphabet: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileFetchConfig {
    pub host_url: Option<String>,
    pub use_env: Option<bool>,
    pub use_filter: Option<bool>,
    pub user_agent: Option<String>,
    pub mmseqs_threads: Option<usize>,
    pub mmseqs_sensitivity: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePredictionConfig {
    pub enabled: Option<bool>,
    pub command: Option<String>,
    pub num_seeds: Option<u32>,
    pub num_recycle: Option<u32>,
    pub use_dropout: Option<bool>,
    pub amber: Option<bool>,
    pub num_relax: Option<u32>,
    pub use_gpu_relax: Option<bool>,
    pub templates: Option<bool>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration file {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
