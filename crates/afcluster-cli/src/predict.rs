//! Drives the external structure-prediction tool over every cluster file.
//!
//! Runs are laid out as `<preds>/<name>/s<seed>/`, where `name` is the cluster file stem. A
//! run is considered finished once the tool has written `<name>_0.done.txt` into that
//! directory, so re-running the pipeline only launches what is missing.

use crate::config::PredictionConfig;
use crate::error::{CliError, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, instrument, warn};

const CLUSTER_EXTENSION: &str = "a3m";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionJob {
    pub seed: u32,
    pub name: String,
    pub input: PathBuf,
    pub out_dir: PathBuf,
}

impl PredictionJob {
    pub fn done_marker(&self) -> PathBuf {
        self.out_dir.join(format!("{}_0.done.txt", self.name))
    }

    pub fn is_done(&self) -> bool {
        self.done_marker().exists()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PredictionSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Flags shared by every run, in the order the tool receives them.
pub fn base_arguments(config: &PredictionConfig) -> Vec<String> {
    let mut args = Vec::new();
    if config.amber {
        args.push("--amber".to_string());
        if config.use_gpu_relax {
            args.push("--use-gpu-relax".to_string());
        }
        args.push("--num-relax".to_string());
        args.push(config.num_relax.to_string());
    }
    if config.use_dropout {
        args.push("--use-dropout".to_string());
    }
    args.push("--num-recycle".to_string());
    args.push(config.num_recycle.to_string());
    if config.templates {
        args.push("--templates".to_string());
    }
    args
}

pub fn job_arguments(config: &PredictionConfig, job: &PredictionJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = base_arguments(config).into_iter().map(Into::into).collect();
    args.push("--random-seed".into());
    args.push(job.seed.to_string().into());
    args.push("--jobname-prefix".into());
    args.push(job.name.clone().into());
    args.push(job.input.clone().into());
    args.push(job.out_dir.clone().into());
    args
}

/// Cluster files in `dir`, sorted by path.
pub fn cluster_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == CLUSTER_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// One job per seed and cluster file, seed-major.
pub fn plan_jobs(files: &[PathBuf], preds_dir: &Path, num_seeds: u32) -> Vec<PredictionJob> {
    let mut jobs = Vec::with_capacity(files.len() * num_seeds as usize);
    for seed in 0..num_seeds {
        for file in files {
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            jobs.push(PredictionJob {
                seed,
                out_dir: preds_dir.join(&name).join(format!("s{}", seed)),
                name,
                input: file.clone(),
            });
        }
    }
    jobs
}

/// Predicts every cluster in `cluster_dir` that has no finished run yet.
///
/// A run exiting unsuccessfully is logged and counted; only a tool that cannot be launched
/// at all aborts the loop.
#[instrument(skip_all, name = "predictions", fields(command = %config.command))]
pub async fn run_predictions(
    cluster_dir: &Path,
    preds_dir: &Path,
    config: &PredictionConfig,
) -> Result<PredictionSummary> {
    let files = cluster_files(cluster_dir)?;
    let jobs = plan_jobs(&files, preds_dir, config.num_seeds);
    info!(
        "Planned {} prediction run(s) over {} cluster file(s).",
        jobs.len(),
        files.len()
    );

    let mut summary = PredictionSummary::default();
    for job in &jobs {
        fs::create_dir_all(&job.out_dir)?;
        if job.is_done() {
            info!("Skipping {} seed {}: already predicted.", job.name, job.seed);
            summary.skipped += 1;
            continue;
        }

        info!("Predicting {} with seed {}", job.name, job.seed);
        let status = Command::new(&config.command)
            .args(job_arguments(config, job))
            .status()
            .await
            .map_err(|source| CliError::Prediction {
                command: config.command.clone(),
                source,
            })?;

        if status.success() {
            summary.completed += 1;
        } else {
            warn!(
                "Prediction of {} with seed {} exited with {}.",
                job.name, job.seed, status
            );
            summary.failed += 1;
        }
    }
    Ok(summary)
}
