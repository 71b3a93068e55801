use crate::core::io::a3m::A3mFile;
use crate::core::io::partition::{WrittenPartition, write_partitions};
use crate::core::io::traits::SequenceFile;
use crate::core::models::alignment::Alignment;
use crate::engine::clustering::cluster_alignment;
use crate::engine::config::ClusteringConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::radius::RadiusStrategy;
use rand::Rng;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const CLUSTER_DIR_NAME: &str = "clusters";

/// Where a job's cluster files are written: `<job_dir>/clusters`.
pub fn cluster_dir(job_dir: &Path) -> PathBuf {
    job_dir.join(CLUSTER_DIR_NAME)
}

/// Where a run keeps its log while in progress: `<job_dir>/<keyword>.log`.
pub fn run_log_path(job_dir: &Path, keyword: &str) -> PathBuf {
    job_dir.join(format!("{}.log", keyword))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRunSummary {
    /// Non-query records in the input alignment.
    pub num_members: usize,
    /// Members left after gap filtering.
    pub num_filtered_members: usize,
    pub num_noise: usize,
    pub radius: f64,
    pub strategy: RadiusStrategy,
    pub partitions: Vec<WrittenPartition>,
}

/// Plain-text record of a run, removed once the run succeeds.
struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    fn create(path: PathBuf) -> Result<Self, EngineError> {
        match File::create(&path) {
            Ok(file) => Ok(Self { path, file }),
            Err(source) => Err(EngineError::RunLog { path, source }),
        }
    }

    fn line(&mut self, text: impl Display) -> Result<(), EngineError> {
        writeln!(self.file, "{}", text).map_err(|source| EngineError::RunLog {
            path: self.path.clone(),
            source,
        })
    }

    fn remove(self) -> Result<(), EngineError> {
        let RunLog { path, file } = self;
        drop(file);
        fs::remove_file(&path).map_err(|source| EngineError::RunLog { path, source })
    }
}

/// Clusters the alignment at `input` and writes the partitions below `job_dir`.
///
/// Members whose gap fraction reaches `config.gap_cutoff` are dropped first. Each cluster is
/// written to `<job_dir>/clusters/<keyword>_<id:03>.a3m`, the query leading every file. If
/// the run fails, `<job_dir>/<keyword>.log` is left behind with the steps completed so far.
#[instrument(skip_all, name = "cluster_workflow", fields(keyword = keyword))]
pub fn run(
    input: &Path,
    job_dir: &Path,
    keyword: &str,
    config: &ClusteringConfig,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<ClusterRunSummary, EngineError> {
    fs::create_dir_all(job_dir).map_err(|source| EngineError::RunLog {
        path: job_dir.to_path_buf(),
        source,
    })?;
    let mut log = RunLog::create(run_log_path(job_dir, keyword))?;

    // === Phase 1: Load and filter ===
    reporter.report(Progress::PhaseStart {
        name: "Loading Alignment",
    });
    let records = A3mFile::read_from_path(input).map_err(|source| EngineError::AlignmentRead {
        path: input.to_path_buf(),
        source,
    })?;
    let alignment = Alignment::new(records)?;
    if let Err(e) = alignment.validate_width() {
        warn!("{}; shorter members are padded during encoding", e);
    }

    let filtered = alignment.filter_by_gap_fraction(config.gap_cutoff);
    log.line(format_args!(
        "Filtered sequences by gap_cutoff={}",
        config.gap_cutoff
    ))?;
    info!(
        "Kept {} of {} sequences with gap fraction below {}",
        filtered.num_members(),
        alignment.num_members(),
        config.gap_cutoff
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Cluster ===
    let outcome = cluster_alignment(&filtered, config, rng, reporter)?;
    let assignment = &outcome.assignment;
    log.line(format_args!(
        "Found {} clusters using dbscan",
        assignment.num_clusters()
    ))?;

    // === Phase 3: Write partitions ===
    reporter.report(Progress::PhaseStart {
        name: "Writing Clusters",
    });
    let partitions = write_partitions(&filtered, assignment, keyword, &cluster_dir(job_dir))
        .map_err(EngineError::PartitionWrite)?;
    for written in &partitions {
        log.line(format_args!(
            "Wrote {} (n={})",
            written.path.display(),
            written.num_records
        ))?;
    }
    reporter.report(Progress::PhaseFinish);

    log.remove()?;
    info!(
        "Clustering complete: {} cluster file(s), {} noise member(s).",
        partitions.len(),
        assignment.num_noise()
    );

    Ok(ClusterRunSummary {
        num_members: alignment.num_members(),
        num_filtered_members: filtered.num_members(),
        num_noise: assignment.num_noise(),
        radius: assignment.radius(),
        strategy: outcome.selection.strategy,
        partitions,
    })
}
