use crate::error::{CliError, Result};
use afcluster::workflows::cluster::cluster_dir;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const MSA_CACHE_DIR: &str = "msa";
const PREDICTIONS_DIR: &str = "preds";

/// Locates the per-user cache holding fetched alignments.
#[derive(Debug)]
pub struct DataManager {
    base_path: PathBuf,
}

impl DataManager {
    pub fn new() -> Result<Self> {
        let path = Self::default_cache_path()?;
        debug!("DataManager initialized with path: {:?}", &path);
        Ok(Self { base_path: path })
    }

    #[cfg(test)]
    pub fn with_base(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Default location of the fetch cache, keyed by sequence hash underneath.
    pub fn msa_cache_dir(&self) -> PathBuf {
        self.base_path.join(MSA_CACHE_DIR)
    }

    fn default_cache_path() -> Result<PathBuf> {
        ProjectDirs::from("org", "afcluster", "afcluster")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .ok_or_else(|| {
                CliError::Data("Could not determine default cache directory path.".to_string())
            })
    }
}

/// Directory layout of one query's job under the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct JobLayout {
    id: String,
    root: PathBuf,
}

impl JobLayout {
    pub fn new(outdir: &Path, id: &str) -> Self {
        Self {
            id: id.to_string(),
            root: outdir.join(id),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<outdir>/<id>/<id>.a3m`
    pub fn msa_path(&self) -> PathBuf {
        self.root.join(format!("{}.a3m", self.id))
    }

    pub fn cluster_dir(&self) -> PathBuf {
        cluster_dir(&self.root)
    }

    pub fn predictions_dir(&self) -> PathBuf {
        self.root.join(PREDICTIONS_DIR)
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
