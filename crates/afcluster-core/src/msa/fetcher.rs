use super::api::TicketApi;
use super::error::FetchError;
use super::local::LocalSearch;
use super::queries::{UniqueQueries, job_prefix};
use super::remote::RemoteSearch;
use crate::engine::config::{FetchConfig, LocalSearchConfig};
use crate::engine::progress::{Progress, ProgressReporter};
use rand::rngs::StdRng;
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Obtains raw alignment blocks for query sequences.
///
/// A configured local MMseqs2 installation is tried first. Any failure there is logged and
/// the remote service is used instead; without a local tool the remote service is used
/// directly.
pub struct MsaFetcher<A: TicketApi> {
    remote: RemoteSearch<A>,
    local: LocalSearchConfig,
}

impl<A: TicketApi> MsaFetcher<A> {
    pub fn new(api: A, config: FetchConfig, local: LocalSearchConfig) -> Self {
        Self {
            remote: RemoteSearch::new(api, config),
            local,
        }
    }

    /// Seeds the jitter applied to remote back-off delays.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.remote = self.remote.with_rng(rng);
        self
    }

    pub fn remote(&self) -> &RemoteSearch<A> {
        &self.remote
    }

    /// Returns one block per entry of `sequences`, in input order.
    ///
    /// Repeated sequences are searched once and receive identical blocks. Every artifact is
    /// stored under paths derived from `prefix`, and a later call with the same prefix reuses
    /// them.
    #[instrument(skip_all, name = "msa_fetch", fields(queries = sequences.len()))]
    pub fn fetch<S: AsRef<str>>(
        &mut self,
        sequences: &[S],
        prefix: &Path,
        reporter: &ProgressReporter,
    ) -> Result<Vec<String>, FetchError> {
        let queries = UniqueQueries::new(sequences);
        let use_env = self.remote.config().use_env();
        reporter.report(Progress::PhaseStart {
            name: "MSA Search",
        });

        let local_failure = if self.local.has_tool() {
            match LocalSearch::new(&self.local).run(&queries, prefix, use_env) {
                Ok(blocks) => {
                    info!("Local MMseqs2 search finished");
                    reporter.report(Progress::PhaseFinish);
                    return Ok(blocks);
                }
                Err(e) => {
                    warn!("Local mmseqs2 failed ({}); falling back to the remote MSA server.", e);
                    Some(e)
                }
            }
        } else {
            None
        };

        let result = self.remote.run(&queries, prefix, reporter);
        reporter.report(Progress::PhaseFinish);
        result.map_err(|remote| match local_failure {
            Some(local) => FetchError::BothFailed {
                local,
                remote: Box::new(remote),
            },
            None => remote,
        })
    }

    /// Fetches the block of a single sequence under `<tmp_dir>/<sha1 of sequence>`.
    pub fn fetch_one(
        &mut self,
        sequence: &str,
        tmp_dir: &Path,
        reporter: &ProgressReporter,
    ) -> Result<String, FetchError> {
        fs::create_dir_all(tmp_dir).map_err(|e| FetchError::io(tmp_dir, e))?;
        let prefix = job_prefix(tmp_dir, sequence);
        let mut blocks = self.fetch(&[sequence], &prefix, reporter)?;
        Ok(blocks.pop().unwrap_or_default())
    }
}
