use crate::core::encoding::{Alphabet, EncodingError};
use rand::Rng;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST_URL: &str = "https://api.colabfold.com";

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

impl From<EncodingError> for ConfigError {
    fn from(e: EncodingError) -> Self {
        ConfigError::InvalidValue {
            parameter: "alphabet",
            reason: e.to_string(),
        }
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

/// Inclusive range of candidate radii for the automatic radius search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusSearchRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl RadiusSearchRange {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(invalid("radius-search-range", "bounds must be finite"));
        }
        if min < 0.0 {
            return Err(invalid("radius-search-range", "minimum must be non-negative"));
        }
        if step <= 0.0 {
            return Err(invalid("radius-search-range", "step must be positive"));
        }
        if max < min {
            return Err(invalid(
                "radius-search-range",
                format!("maximum {} is below minimum {}", max, min),
            ));
        }
        Ok(Self { min, max, step })
    }

    /// `min, min + step, ...` up to and including `max`.
    ///
    /// A small tolerance keeps `max` in the list when it is reached up to rounding error.
    pub fn candidates(&self) -> Vec<f64> {
        let count = ((self.max - self.min) / self.step + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|k| self.min + k as f64 * self.step)
            .collect()
    }
}

impl Default for RadiusSearchRange {
    fn default() -> Self {
        Self {
            min: 3.0,
            max: 20.0,
            step: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringConfig {
    /// Members with a gap fraction at or above this value are dropped before clustering.
    pub gap_cutoff: f64,
    /// Minimum neighbourhood size (the point itself included) for a core point.
    pub min_points: usize,
    /// Fixed neighbourhood radius. `None` enables the automatic search.
    pub radius: Option<f64>,
    pub search: RadiusSearchRange,
    /// Fraction of members clustered per candidate during the coarse sweep.
    pub sample_fraction: f64,
    /// Consecutive non-improving refinement steps tolerated before the search stops.
    pub refinement_budget: usize,
    pub alphabet: Alphabet,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            gap_cutoff: 0.25,
            min_points: 3,
            radius: None,
            search: RadiusSearchRange::default(),
            sample_fraction: 0.25,
            refinement_budget: 50,
            alphabet: Alphabet::default(),
        }
    }
}

#[derive(Default)]
pub struct ClusteringConfigBuilder {
    gap_cutoff: Option<f64>,
    min_points: Option<usize>,
    radius: Option<f64>,
    search: Option<(f64, f64, f64)>,
    sample_fraction: Option<f64>,
    refinement_budget: Option<usize>,
    alphabet: Option<String>,
}

impl ClusteringConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gap_cutoff(mut self, cutoff: f64) -> Self {
        self.gap_cutoff = Some(cutoff);
        self
    }
    pub fn min_points(mut self, n: usize) -> Self {
        self.min_points = Some(n);
        self
    }
    pub fn radius(mut self, radius: Option<f64>) -> Self {
        self.radius = radius;
        self
    }
    pub fn search_range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.search = Some((min, max, step));
        self
    }
    pub fn sample_fraction(mut self, fraction: f64) -> Self {
        self.sample_fraction = Some(fraction);
        self
    }
    pub fn refinement_budget(mut self, steps: usize) -> Self {
        self.refinement_budget = Some(steps);
        self
    }
    pub fn alphabet(mut self, symbols: impl Into<String>) -> Self {
        self.alphabet = Some(symbols.into());
        self
    }

    pub fn build(self) -> Result<ClusteringConfig, ConfigError> {
        let defaults = ClusteringConfig::default();

        let min_points = self
            .min_points
            .ok_or(ConfigError::MissingParameter("min_points"))?;
        if min_points == 0 {
            return Err(invalid("min_points", "must be at least 1"));
        }

        let gap_cutoff = self.gap_cutoff.unwrap_or(defaults.gap_cutoff);
        if !(gap_cutoff > 0.0 && gap_cutoff <= 1.0) {
            return Err(invalid("gap_cutoff", "must lie in (0, 1]"));
        }

        if let Some(r) = self.radius {
            if !(r.is_finite() && r > 0.0) {
                return Err(invalid("radius", "must be a positive number"));
            }
        }

        let search = match self.search {
            Some((min, max, step)) => RadiusSearchRange::new(min, max, step)?,
            None => defaults.search,
        };

        let sample_fraction = self.sample_fraction.unwrap_or(defaults.sample_fraction);
        if !(sample_fraction > 0.0 && sample_fraction <= 1.0) {
            return Err(invalid("sample_fraction", "must lie in (0, 1]"));
        }

        let refinement_budget = self
            .refinement_budget
            .unwrap_or(defaults.refinement_budget);
        if refinement_budget == 0 {
            return Err(invalid("refinement_budget", "must be at least 1"));
        }

        let alphabet = match self.alphabet {
            Some(symbols) => Alphabet::new(&symbols)?,
            None => defaults.alphabet,
        };

        Ok(ClusteringConfig {
            gap_cutoff,
            min_points,
            radius: self.radius,
            search,
            sample_fraction,
            refinement_budget,
            alphabet,
        })
    }
}

/// Database/filter selection understood by the remote MSA service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsaMode {
    Env,
    All,
    EnvNoFilter,
    NoFilter,
}

impl MsaMode {
    pub fn from_flags(use_env: bool, use_filter: bool) -> Self {
        match (use_filter, use_env) {
            (true, true) => MsaMode::Env,
            (true, false) => MsaMode::All,
            (false, true) => MsaMode::EnvNoFilter,
            (false, false) => MsaMode::NoFilter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MsaMode::Env => "env",
            MsaMode::All => "all",
            MsaMode::EnvNoFilter => "env-nofilter",
            MsaMode::NoFilter => "nofilter",
        }
    }

    /// Whether results include the environmental database.
    pub fn uses_env_db(&self) -> bool {
        matches!(self, MsaMode::Env | MsaMode::EnvNoFilter)
    }
}

impl fmt::Display for MsaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MsaMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "env" => Ok(MsaMode::Env),
            "all" => Ok(MsaMode::All),
            "env-nofilter" => Ok(MsaMode::EnvNoFilter),
            "nofilter" => Ok(MsaMode::NoFilter),
            other => Err(invalid(
                "mode",
                format!(
                    "unknown mode '{}', expected one of env, all, env-nofilter, nofilter",
                    other
                ),
            )),
        }
    }
}

/// A delay of `base` plus a uniformly drawn whole number of seconds in `0..=spread`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    pub base: Duration,
    pub spread: Duration,
}

impl Jitter {
    pub const fn new(base: Duration, spread: Duration) -> Self {
        Self { base, spread }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        let extra = rng.gen_range(0..=self.spread.as_secs());
        self.base + Duration::from_secs(extra)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub request_timeout: Duration,
    /// Pause after a non-timeout transport failure.
    pub error_delay: Duration,
    /// Consecutive non-timeout failures after which a request is abandoned.
    pub max_transport_errors: usize,
    /// Pause before resubmitting on `UNKNOWN`/`RATELIMIT`.
    pub busy_delay: Jitter,
    /// Pause between status polls.
    pub poll_delay: Jitter,
}

impl RetryPolicy {
    /// A policy without any waiting, for offline use against in-memory services.
    pub fn immediate() -> Self {
        Self {
            request_timeout: Duration::from_secs(1),
            error_delay: Duration::ZERO,
            max_transport_errors: 5,
            busy_delay: Jitter::new(Duration::ZERO, Duration::ZERO),
            poll_delay: Jitter::new(Duration::ZERO, Duration::ZERO),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(6020),
            error_delay: Duration::from_secs(5),
            max_transport_errors: 5,
            busy_delay: Jitter::new(Duration::from_secs(5), Duration::from_secs(5)),
            poll_delay: Jitter::new(Duration::from_secs(5), Duration::from_secs(2)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub mode: MsaMode,
    pub host_url: String,
    pub user_agent: Option<String>,
    pub retry: RetryPolicy,
}

impl FetchConfig {
    pub fn use_env(&self) -> bool {
        self.mode.uses_env_db()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: MsaMode::Env,
            host_url: DEFAULT_HOST_URL.to_string(),
            user_agent: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Default)]
pub struct FetchConfigBuilder {
    use_env: Option<bool>,
    use_filter: Option<bool>,
    host_url: Option<String>,
    user_agent: Option<String>,
    retry: Option<RetryPolicy>,
}

impl FetchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_env(mut self, enabled: bool) -> Self {
        self.use_env = Some(enabled);
        self
    }
    pub fn use_filter(mut self, enabled: bool) -> Self {
        self.use_filter = Some(enabled);
        self
    }
    pub fn host_url(mut self, url: impl Into<String>) -> Self {
        self.host_url = Some(url.into());
        self
    }
    pub fn user_agent(mut self, agent: Option<String>) -> Self {
        self.user_agent = agent.filter(|a| !a.is_empty());
        self
    }
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn build(self) -> Result<FetchConfig, ConfigError> {
        let host_url = self
            .host_url
            .unwrap_or_else(|| DEFAULT_HOST_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if host_url.is_empty() {
            return Err(invalid("host_url", "must not be empty"));
        }
        let retry = self.retry.unwrap_or_default();
        if retry.max_transport_errors == 0 {
            return Err(invalid("max_transport_errors", "must be at least 1"));
        }
        Ok(FetchConfig {
            mode: MsaMode::from_flags(
                self.use_env.unwrap_or(true),
                self.use_filter.unwrap_or(true),
            ),
            host_url,
            user_agent: self.user_agent,
            retry,
        })
    }
}

/// Location of a local MMseqs2 installation and its databases.
///
/// Resolved by the caller (for example from the process environment); nothing in the library
/// inspects the environment on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSearchConfig {
    pub binary: Option<PathBuf>,
    pub uniref_db: Option<PathBuf>,
    pub env_db: Option<PathBuf>,
    pub threads: usize,
    pub sensitivity: f64,
}

impl LocalSearchConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn has_tool(&self) -> bool {
        self.binary.is_some()
    }

    /// Target databases in search order: primary first, environmental second when requested.
    pub fn databases(&self, use_env: bool) -> Vec<PathBuf> {
        let mut dbs = Vec::with_capacity(2);
        if let Some(uniref) = &self.uniref_db {
            dbs.push(uniref.clone());
        }
        if use_env {
            if let Some(env) = &self.env_db {
                dbs.push(env.clone());
            }
        }
        dbs
    }
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            binary: None,
            uniref_db: None,
            env_db: None,
            threads: 4,
            sensitivity: 7.5,
        }
    }
}
