use crate::cli::FetchArgs;
use crate::config::{AppConfig, CliOverrides, build_config};
use crate::data::DataManager;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use afcluster::engine::progress::ProgressReporter;
use afcluster::msa::api::HttpTicketApi;
use afcluster::msa::fetcher::MsaFetcher;
use std::fs;
use std::path::Path;
use tracing::info;

pub async fn run(args: FetchArgs) -> Result<()> {
    let data_manager = DataManager::new()?;
    let overrides = CliOverrides {
        config: args.config.clone(),
        fetch: args.fetch.clone(),
        ..Default::default()
    };
    let config = build_config(&overrides, &data_manager)?;
    let sequence = normalize_sequence(&args.seq)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Fetching MSA ({}) ...", config.fetch.mode);
    let block =
        tokio::task::block_in_place(|| fetch_alignment(&config, &sequence, &reporter))?;

    write_alignment(&args.output, &block)?;
    println!("✓ Alignment written to: {}", args.output.display());
    Ok(())
}

/// Fetches one query's alignment block through the local tool or the MSA server.
///
/// Must run on a thread that may block; the HTTP client is created and dropped here.
pub(crate) fn fetch_alignment(
    config: &AppConfig,
    sequence: &str,
    reporter: &ProgressReporter,
) -> Result<String> {
    let api = HttpTicketApi::new(&config.fetch)
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to create HTTP client: {}", e)))?;
    let mut fetcher = MsaFetcher::new(api, config.fetch.clone(), config.local.clone());
    info!("Fetching alignment under cache {:?}", config.tmp_dir);
    Ok(fetcher.fetch_one(sequence, &config.tmp_dir, reporter)?)
}

/// Writes a fetched block, refusing to store an empty alignment.
pub(crate) fn write_alignment(path: &Path, block: &str) -> Result<()> {
    if block.trim().is_empty() {
        return Err(CliError::Data(format!(
            "The MSA search returned no alignment for {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, block)?;
    Ok(())
}

pub(crate) fn normalize_sequence(raw: &str) -> Result<String> {
    let sequence: String = raw.split_whitespace().collect();
    if sequence.is_empty() {
        return Err(CliError::Argument("Query sequence is empty.".to_string()));
    }
    Ok(sequence)
}
