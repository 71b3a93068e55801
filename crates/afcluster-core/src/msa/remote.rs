use super::api::{TicketApi, TicketResponse, TicketStatus};
use super::blocks::{QueryBlocks, assemble, read_blocks};
use super::error::{FetchError, TransportError};
use super::queries::UniqueQueries;
use crate::engine::config::{FetchConfig, MsaMode};
use crate::engine::progress::{Progress, ProgressReporter};
use flate2::read::GzDecoder;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

pub const ARCHIVE_NAME: &str = "out.tar.gz";
pub const UNIREF_A3M: &str = "uniref.a3m";
pub const ENV_A3M: &str = "bfd.mgnify30.metaeuk30.smag30.a3m";

/// Rough server time per unique query, used as the length of the progress task.
pub const SECONDS_PER_QUERY: u64 = 150;

/// Directory holding the cached archive and extracted results: `<prefix>_<mode>`.
pub fn remote_dir(prefix: &Path, mode: MsaMode) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("_{}", mode));
    PathBuf::from(name)
}

/// Extracted result files in merge order: primary database first, environmental second.
pub fn result_files(dir: &Path, use_env: bool) -> Vec<PathBuf> {
    let mut files = vec![dir.join(UNIREF_A3M)];
    if use_env {
        files.push(dir.join(ENV_A3M));
    }
    files
}

pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), FetchError> {
    let to_err = |source| FetchError::Archive {
        path: archive.to_path_buf(),
        source,
    };
    let file = File::open(archive).map_err(to_err)?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.unpack(dest).map_err(to_err)
}

enum State {
    Submitting,
    Polling {
        ticket: String,
        status: TicketStatus,
    },
    Downloading {
        ticket: String,
    },
    Done,
}

/// Client side of the ticket-based MSA service.
///
/// Results are cached on disk: once the archive for a prefix and mode exists, later fetches
/// read it without contacting the server.
pub struct RemoteSearch<A: TicketApi> {
    api: A,
    config: FetchConfig,
    rng: StdRng,
}

impl<A: TicketApi> RemoteSearch<A> {
    pub fn new(api: A, config: FetchConfig) -> Self {
        Self {
            api,
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the source of back-off jitter.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// Fetches one block per input position of `queries`, downloading only on a cache miss.
    pub fn run(
        &mut self,
        queries: &UniqueQueries,
        prefix: &Path,
        reporter: &ProgressReporter,
    ) -> Result<Vec<String>, FetchError> {
        let mode = self.config.mode;
        let dir = remote_dir(prefix, mode);
        fs::create_dir_all(&dir).map_err(|e| FetchError::io(&dir, e))?;

        let archive = dir.join(ARCHIVE_NAME);
        if archive.is_file() {
            info!("Reusing cached result archive '{}'", archive.display());
        } else {
            self.retrieve_archive(queries, mode, &archive, reporter)?;
        }

        let files = result_files(&dir, mode.uses_env_db());
        if files.iter().any(|f| !f.is_file()) {
            debug!("Extracting '{}'", archive.display());
            extract_archive(&archive, &dir)?;
        }

        let sources = files
            .iter()
            .map(|f| read_blocks(f).map_err(|e| FetchError::io(f, e)))
            .collect::<Result<Vec<QueryBlocks>, _>>()?;
        Ok(assemble(&sources, queries.input_numbers()))
    }

    fn retrieve_archive(
        &mut self,
        queries: &UniqueQueries,
        mode: MsaMode,
        archive: &Path,
        reporter: &ProgressReporter,
    ) -> Result<(), FetchError> {
        let fasta = queries.to_fasta();
        let estimate = SECONDS_PER_QUERY * queries.unique().len() as u64;
        let mut elapsed = 0;
        reporter.report(Progress::TaskStart { total: estimate });

        let mut state = State::Submitting;
        loop {
            state = match state {
                State::Submitting => {
                    reporter.status("SUBMIT");
                    let response = self.submit(&fasta, mode)?;
                    match response.status {
                        TicketStatus::Error => return Err(FetchError::RemoteJob),
                        TicketStatus::Maintenance => return Err(FetchError::Maintenance),
                        _ => {}
                    }
                    let ticket = response.id.ok_or(FetchError::MissingTicketId {
                        status: response.status.to_string(),
                    })?;
                    info!(ticket = %ticket, status = %response.status, "Job submitted");
                    reporter.status(response.status.as_str());
                    State::Polling {
                        ticket,
                        status: response.status,
                    }
                }
                State::Polling { ticket, status } if status.is_in_progress() => {
                    let delay = self.config.retry.poll_delay.sample(&mut self.rng);
                    info!("Sleeping for {}s. Reason: {}", delay.as_secs(), status);
                    thread::sleep(delay);

                    let next = TicketResponse::parse(&self.with_retry("polling status", |api| {
                        api.status(&ticket)
                    })?);
                    reporter.status(next.status.as_str());
                    if next.status == TicketStatus::Running {
                        elapsed += delay.as_secs();
                        reporter.report(Progress::TaskIncrement {
                            amount: delay.as_secs(),
                        });
                    }
                    State::Polling {
                        ticket,
                        status: next.status,
                    }
                }
                State::Polling {
                    ticket,
                    status: TicketStatus::Complete,
                } => {
                    if elapsed < estimate {
                        reporter.report(Progress::TaskIncrement {
                            amount: estimate - elapsed,
                        });
                    }
                    State::Downloading { ticket }
                }
                State::Polling {
                    status: TicketStatus::Error,
                    ..
                } => return Err(FetchError::RemoteJob),
                State::Polling { ticket, status } => {
                    warn!("Ticket {} ended with status {}; resubmitting", ticket, status);
                    State::Submitting
                }
                State::Downloading { ticket } => {
                    reporter.status("DOWNLOAD");
                    let bytes = self.with_retry("downloading results", |api| api.download(&ticket))?;
                    persist(archive, &bytes)?;
                    info!("Downloaded {} bytes to '{}'", bytes.len(), archive.display());
                    State::Done
                }
                State::Done => break,
            };
        }

        reporter.report(Progress::TaskFinish);
        Ok(())
    }

    /// Submits until the server accepts the batch, backing off while it is busy.
    fn submit(&mut self, fasta: &str, mode: MsaMode) -> Result<TicketResponse, FetchError> {
        loop {
            let body = self.with_retry("submitting", |api| api.submit(fasta, mode))?;
            let response = TicketResponse::parse(&body);
            match response.status {
                TicketStatus::Unknown | TicketStatus::Ratelimit => {
                    let delay = self.config.retry.busy_delay.sample(&mut self.rng);
                    warn!("Sleeping for {}s. Reason: {}", delay.as_secs(), response.status);
                    thread::sleep(delay);
                }
                _ => return Ok(response),
            }
        }
    }

    /// Repeats one API call across transport failures.
    ///
    /// Timeouts are retried immediately and without limit. Other failures pause for the
    /// configured delay and give up after `max_transport_errors` in a row.
    fn with_retry<T>(
        &mut self,
        operation: &'static str,
        mut call: impl FnMut(&mut A) -> Result<T, TransportError>,
    ) -> Result<T, FetchError> {
        let max = self.config.retry.max_transport_errors;
        let mut errors = 0;
        loop {
            match call(&mut self.api) {
                Ok(value) => return Ok(value),
                Err(TransportError::Timeout) => {
                    warn!("Timeout while {} on the MSA server. Retrying...", operation);
                }
                Err(TransportError::Other(message)) => {
                    errors += 1;
                    warn!(
                        "Error while {} on the MSA server. Retrying... ({}/{}): {}",
                        operation, errors, max, message
                    );
                    if errors >= max {
                        return Err(FetchError::TransportExhausted {
                            operation,
                            attempts: errors,
                            last: message,
                        });
                    }
                    thread::sleep(self.config.retry.error_delay);
                }
            }
        }
    }
}

/// Writes `bytes` through a `.part` sibling; `path` only ever holds a complete download.
fn persist(path: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    let partial = path.with_extension("part");
    fs::write(&partial, bytes).map_err(|e| FetchError::io(&partial, e))?;
    fs::rename(&partial, path).map_err(|e| FetchError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{FetchConfigBuilder, RetryPolicy};
    use crate::msa::api::scripted::{ScriptedApi, archive, ticket};
    use tempfile::tempdir;

    const UNIREF: &str = ">101\nMKV\n>hit\nMKI\n\0>102\nACD\n";
    const ENV: &str = ">101\nMKL\n";

    fn config(use_env: bool) -> FetchConfig {
        FetchConfigBuilder::new()
            .use_env(use_env)
            .retry(RetryPolicy::immediate())
            .build()
            .unwrap()
    }

    fn search(api: ScriptedApi, use_env: bool) -> RemoteSearch<ScriptedApi> {
        RemoteSearch::new(api, config(use_env)).with_rng(StdRng::seed_from_u64(0))
    }

    fn served() -> ScriptedApi {
        ScriptedApi::serving(archive(&[(UNIREF_A3M, UNIREF), (ENV_A3M, ENV)]))
    }

    #[test]
    fn remote_dir_appends_mode_to_prefix() {
        assert_eq!(
            remote_dir(Path::new("/tmp/abc"), MsaMode::EnvNoFilter),
            PathBuf::from("/tmp/abc_env-nofilter")
        );
    }

    #[test]
    fn submits_polls_downloads_and_merges_results() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("job");
        let mut api = served();
        api.submissions.push_back(ticket("PENDING", "t-9"));
        api.statuses.push_back(ticket("RUNNING", "t-9"));
        api.statuses.push_back(ticket("COMPLETE", "t-9"));

        let mut remote = search(api, true);
        let queries = UniqueQueries::new(&["MKV", "ACD", "MKV"]);
        let blocks = remote.run(&queries, &prefix, &ProgressReporter::new()).unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], ">101\nMKV\n>hit\nMKI\n>101\nMKL\n");
        assert_eq!(blocks[1], ">102\nACD\n");
        assert_eq!(blocks[0], blocks[2]);

        let api = remote.api();
        assert_eq!(
            api.calls,
            vec!["submit:env", "status:t-9", "status:t-9", "download:t-9"]
        );
        assert_eq!(api.submitted[0].0, ">101\nMKV\n>102\nACD\n");
        assert!(dir.path().join("job_env").join(ARCHIVE_NAME).is_file());
        assert!(dir.path().join("job_env").join(ENV_A3M).is_file());
    }

    #[test]
    fn cached_archive_skips_the_server() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("job");
        let queries = UniqueQueries::new(&["MKV"]);

        let mut first = search(served(), true);
        let a = first.run(&queries, &prefix, &ProgressReporter::new()).unwrap();
        assert_eq!(first.api().count("download"), 1);

        let mut second = search(ScriptedApi::default(), true);
        let b = second.run(&queries, &prefix, &ProgressReporter::new()).unwrap();
        assert!(second.api().calls.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn missing_extracted_file_triggers_re_extraction_only() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("job");
        let queries = UniqueQueries::new(&["MKV"]);
        search(served(), false)
            .run(&queries, &prefix, &ProgressReporter::new())
            .unwrap();

        let extracted = dir.path().join("job_all").join(UNIREF_A3M);
        fs::remove_file(&extracted).unwrap();

        let mut again = search(ScriptedApi::default(), false);
        let blocks = again.run(&queries, &prefix, &ProgressReporter::new()).unwrap();
        assert!(extracted.is_file());
        assert!(again.api().calls.is_empty());
        assert_eq!(blocks, vec![">101\nMKV\n>hit\nMKI\n".to_string()]);
    }

    #[test]
    fn busy_server_is_resubmitted_until_accepted() {
        let dir = tempdir().unwrap();
        let mut api = served();
        api.submissions.push_back(ticket("RATELIMIT", "t-1"));
        api.submissions.push_back(ticket("UNKNOWN", "t-1"));
        api.submissions.push_back(ticket("COMPLETE", "t-1"));

        let mut remote = search(api, true);
        remote
            .run(
                &UniqueQueries::new(&["MKV"]),
                &dir.path().join("job"),
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(remote.api().count("submit"), 3);
        assert_eq!(remote.api().count("status"), 0);
    }

    #[test]
    fn error_or_maintenance_at_submission_is_fatal() {
        for (status, expected_maintenance) in [("ERROR", false), ("MAINTENANCE", true)] {
            let dir = tempdir().unwrap();
            let mut api = served();
            api.submissions.push_back(ticket(status, "t-1"));
            let result = search(api, true).run(
                &UniqueQueries::new(&["MKV"]),
                &dir.path().join("job"),
                &ProgressReporter::new(),
            );
            match result {
                Err(FetchError::Maintenance) => assert!(expected_maintenance),
                Err(FetchError::RemoteJob) => assert!(!expected_maintenance),
                other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
            }
        }
    }

    #[test]
    fn non_json_submission_reply_is_fatal() {
        let dir = tempdir().unwrap();
        let mut api = served();
        api.submissions.push_back(Ok("<html>oops</html>".to_string()));
        let result = search(api, true).run(
            &UniqueQueries::new(&["MKV"]),
            &dir.path().join("job"),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(FetchError::RemoteJob)));
    }

    #[test]
    fn error_while_polling_is_fatal() {
        let dir = tempdir().unwrap();
        let mut api = served();
        api.submissions.push_back(ticket("PENDING", "t-2"));
        api.statuses.push_back(ticket("ERROR", "t-2"));
        let mut remote = search(api, true);
        let result = remote.run(
            &UniqueQueries::new(&["MKV"]),
            &dir.path().join("job"),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(FetchError::RemoteJob)));
        assert_eq!(remote.api().count("download"), 0);
        assert!(!dir.path().join("job_env").join(ARCHIVE_NAME).exists());
    }

    #[test]
    fn unexpected_polling_status_resubmits_the_job() {
        let dir = tempdir().unwrap();
        let mut api = served();
        api.submissions.push_back(ticket("PENDING", "t-1"));
        api.statuses.push_back(ticket("MAINTENANCE", "t-1"));
        api.submissions.push_back(ticket("PENDING", "t-2"));
        api.statuses.push_back(ticket("COMPLETE", "t-2"));

        let mut remote = search(api, true);
        remote
            .run(
                &UniqueQueries::new(&["MKV"]),
                &dir.path().join("job"),
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(
            remote.api().calls,
            vec![
                "submit:env",
                "status:t-1",
                "submit:env",
                "status:t-2",
                "download:t-2"
            ]
        );
    }

    #[test]
    fn timeouts_retry_without_limit() {
        let dir = tempdir().unwrap();
        let mut api = served();
        for _ in 0..8 {
            api.submissions.push_back(Err(TransportError::Timeout));
        }
        let mut remote = search(api, true);
        remote
            .run(
                &UniqueQueries::new(&["MKV"]),
                &dir.path().join("job"),
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(remote.api().count("submit"), 9);
    }

    #[test]
    fn repeated_transport_errors_exhaust_the_retry_budget() {
        let dir = tempdir().unwrap();
        let mut api = served();
        for _ in 0..5 {
            api.submissions
                .push_back(Err(TransportError::Other("connection refused".into())));
        }
        let mut remote = search(api, true);
        let result = remote.run(
            &UniqueQueries::new(&["MKV"]),
            &dir.path().join("job"),
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(FetchError::TransportExhausted { attempts: 5, .. })
        ));
        assert_eq!(remote.api().count("submit"), 5);
    }

    #[test]
    fn transport_errors_below_the_limit_are_recovered() {
        let dir = tempdir().unwrap();
        let mut api = served();
        for _ in 0..4 {
            api.downloads
                .push_back(Err(TransportError::Other("reset by peer".into())));
        }
        let mut remote = search(api, false);
        let blocks = remote
            .run(
                &UniqueQueries::new(&["ACD"]),
                &dir.path().join("job"),
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(remote.api().count("download"), 5);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn missing_ticket_id_is_reported() {
        let dir = tempdir().unwrap();
        let mut api = served();
        api.submissions
            .push_back(Ok(r#"{"status":"PENDING"}"#.to_string()));
        let result = search(api, true).run(
            &UniqueQueries::new(&["MKV"]),
            &dir.path().join("job"),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(FetchError::MissingTicketId { .. })));
    }
}
