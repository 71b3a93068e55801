use super::blocks::{QueryBlocks, assemble, read_blocks};
use super::error::LocalSearchError;
use super::queries::{UniqueQueries, sequence_hash};
use crate::engine::config::LocalSearchConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

pub const QUERY_FASTA: &str = "queries.fasta";

/// Directory holding the query FASTA and per-database results: `<prefix>_local`.
pub fn local_dir(prefix: &Path) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push("_local");
    PathBuf::from(name)
}

/// Result of searching `db`, named after the database path so that a changed database
/// list never picks up another database's hits.
pub fn result_path(dir: &Path, db: &Path) -> PathBuf {
    let digest = sequence_hash(&db.to_string_lossy());
    dir.join(format!("out_{}.a3m", &digest[..12]))
}

/// The MMseqs2 `createdb` → `search` → `result2msa` pipeline over local databases.
pub struct LocalSearch<'a> {
    config: &'a LocalSearchConfig,
    scratch_root: Option<PathBuf>,
}

impl<'a> LocalSearch<'a> {
    pub fn new(config: &'a LocalSearchConfig) -> Self {
        Self {
            config,
            scratch_root: None,
        }
    }

    /// Creates scratch directories under `root` instead of the system temp directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Searches every configured database and merges the results per input position,
    /// primary database first.
    pub fn run(
        &self,
        queries: &UniqueQueries,
        prefix: &Path,
        use_env: bool,
    ) -> Result<Vec<String>, LocalSearchError> {
        let binary = self
            .config
            .binary
            .as_deref()
            .ok_or(LocalSearchError::ToolNotConfigured)?;
        let databases = self.config.databases(use_env);
        if databases.is_empty() {
            return Err(LocalSearchError::NoDatabases);
        }

        let work = local_dir(prefix);
        fs::create_dir_all(&work)?;
        let query_fasta = work.join(QUERY_FASTA);
        fs::write(&query_fasta, queries.to_fasta())?;

        let mut sources: Vec<QueryBlocks> = Vec::with_capacity(databases.len());
        for db in &databases {
            let out = result_path(&work, db);
            if out.is_file() {
                info!("Reusing local search result '{}'", out.display());
            } else {
                info!("Searching local database '{}'", db.display());
                self.search_database(binary, &query_fasta, db, &out)?;
            }
            sources.push(read_blocks(&out)?);
        }

        Ok(assemble(&sources, queries.input_numbers()))
    }

    fn scratch_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("mmseqs_tmp_");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    /// Runs the three stages against one database inside a scratch directory that is removed
    /// afterwards. `out` is only written once every stage succeeded.
    fn search_database(
        &self,
        binary: &Path,
        query_fasta: &Path,
        db: &Path,
        out: &Path,
    ) -> Result<(), LocalSearchError> {
        let scratch = self.scratch_dir()?;
        let qdb = scratch.path().join("qdb");
        let res = scratch.path().join("res");
        let msa = scratch.path().join("out.a3m");
        let threads = self.config.threads.to_string();

        let mut createdb = Command::new(binary);
        createdb.arg("createdb").arg(query_fasta).arg(&qdb);
        run_stage("createdb", binary, createdb)?;

        let mut search = Command::new(binary);
        search
            .arg("search")
            .arg(&qdb)
            .arg(db)
            .arg(&res)
            .arg(scratch.path())
            .args(["--threads", threads.as_str()])
            .arg("-s")
            .arg(self.config.sensitivity.to_string());
        run_stage("search", binary, search)?;

        let mut convert = Command::new(binary);
        convert
            .arg("result2msa")
            .arg(db)
            .arg(&qdb)
            .arg(&res)
            .arg(&msa)
            .args(["--msa-format-mode", "6"])
            .args(["--threads", threads.as_str()]);
        run_stage("result2msa", binary, convert)?;

        fs::copy(&msa, out)?;
        Ok(())
    }
}

fn run_stage(
    stage: &'static str,
    binary: &Path,
    mut command: Command,
) -> Result<(), LocalSearchError> {
    debug!("Running mmseqs {}", stage);
    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|source| LocalSearchError::Launch {
            tool: binary.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(LocalSearchError::StageFailed {
            stage,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
