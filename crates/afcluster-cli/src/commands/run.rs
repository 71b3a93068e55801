use super::fetch::{fetch_alignment, normalize_sequence, write_alignment};
use super::{print_cluster_summary, sampling_rng};
use crate::cli::RunArgs;
use crate::config::{AppConfig, CliOverrides, build_config};
use crate::data::{DataManager, JobLayout};
use crate::error::{CliError, Result};
use crate::predict;
use crate::utils::progress::CliProgressHandler;
use afcluster::core::io::a3m::A3mFile;
use afcluster::core::io::traits::SequenceFile;
use afcluster::engine::progress::ProgressReporter;
use afcluster::workflows;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Where a job's alignment comes from.
#[derive(Debug, Clone, PartialEq)]
enum AlignmentSource {
    /// Fetched for this sequence unless `<outdir>/<id>/<id>.a3m` already exists.
    Fetch(String),
    /// An alignment supplied on the command line, clustered as is.
    Provided(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
struct Job {
    id: String,
    source: AlignmentSource,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let data_manager = DataManager::new()?;
    let overrides = CliOverrides {
        config: args.config.clone(),
        outdir: args.outdir.as_deref(),
        fetch: args.fetch.clone(),
        cluster: args.cluster.clone(),
        predict: args.predict.clone(),
    };
    let config = build_config(&overrides, &data_manager)?;
    let jobs = plan_jobs(&args)?;
    info!("Planned {} job(s) under {:?}", jobs.len(), config.outdir);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut rng = sampling_rng(config.random_seed);

    for job in &jobs {
        run_job(job, &config, &mut rng, &reporter).await?;
    }
    Ok(())
}

#[instrument(skip_all, name = "job", fields(id = %job.id))]
async fn run_job(
    job: &Job,
    config: &AppConfig,
    rng: &mut StdRng,
    reporter: &ProgressReporter<'_>,
) -> Result<()> {
    let layout = JobLayout::new(&config.outdir, &job.id);
    layout.create()?;
    println!("=== {} ===", job.id);

    // === Phase 1: Alignment ===
    let msa_path = match &job.source {
        AlignmentSource::Provided(path) => path.clone(),
        AlignmentSource::Fetch(sequence) => {
            let path = layout.msa_path();
            if path.exists() {
                info!("Reusing existing alignment {:?}", path);
            } else {
                println!("Fetching MSA ({}) ...", config.fetch.mode);
                let block = tokio::task::block_in_place(|| {
                    fetch_alignment(config, sequence, reporter)
                })?;
                write_alignment(&path, &block)?;
                println!("✓ Alignment written to: {}", path.display());
            }
            path
        }
    };

    // === Phase 2: Clustering ===
    let summary = tokio::task::block_in_place(|| {
        workflows::cluster::run(
            &msa_path,
            layout.root(),
            layout.id(),
            &config.clustering,
            rng,
            reporter,
        )
    })?;
    print_cluster_summary(&summary);

    // === Phase 3: Structure prediction ===
    if !config.prediction.enabled {
        info!("Structure prediction disabled; stopping after clustering.");
        return Ok(());
    }
    let outcome = predict::run_predictions(
        &layout.cluster_dir(),
        &layout.predictions_dir(),
        &config.prediction,
    )
    .await?;
    println!(
        "Predictions: {} completed, {} already done, {} failed.",
        outcome.completed, outcome.skipped, outcome.failed
    );
    Ok(())
}

/// One job per query; `--msa` stands in for the first query's fetch.
fn plan_jobs(args: &RunArgs) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    if let Some(input) = &args.input {
        let records = A3mFile::read_from_path(input).map_err(|e| CliError::FileParsing {
            path: input.clone(),
            source: e.into(),
        })?;
        if records.is_empty() {
            return Err(CliError::Argument(format!(
                "No query sequences found in {}",
                input.display()
            )));
        }
        for record in records {
            jobs.push(Job {
                source: AlignmentSource::Fetch(normalize_sequence(&record.aligned)?),
                id: record.id,
            });
        }
    } else if let Some(seq) = &args.seq {
        jobs.push(Job {
            id: args.jobid.clone(),
            source: AlignmentSource::Fetch(normalize_sequence(seq)?),
        });
    }

    if let Some(msa) = &args.msa {
        let source = AlignmentSource::Provided(msa.clone());
        match jobs.first_mut() {
            Some(first) => first.source = source,
            None => jobs.push(Job {
                id: args.jobid.clone(),
                source,
            }),
        }
    }
    Ok(jobs)
}
