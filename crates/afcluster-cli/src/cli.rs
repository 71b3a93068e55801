use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "AF-Cluster contributors",
    version,
    about = "AF-Cluster CLI - Fetch an MSA, split it into sequence clusters with DBSCAN, and predict a structure for each cluster.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, cluster and predict every query in one go.
    Run(RunArgs),
    /// Fetch the MSA of a single sequence and write it to a file.
    Fetch(FetchArgs),
    /// Cluster an existing MSA file.
    Cluster(ClusterArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .multiple(true)
        .args(["input", "seq", "msa"])
))]
pub struct RunArgs {
    // --- Queries ---
    /// FASTA file with one record per query.
    #[arg(short, long, value_name = "PATH", conflicts_with = "seq")]
    pub input: Option<PathBuf>,

    /// A single query sequence.
    #[arg(long, value_name = "SEQUENCE")]
    pub seq: Option<String>,

    /// Job identifier used with --seq or --msa.
    #[arg(long, value_name = "ID", default_value = "default")]
    pub jobid: String,

    /// Cluster this alignment for the first query instead of fetching one.
    #[arg(long, value_name = "PATH")]
    pub msa: Option<PathBuf>,

    /// Directory receiving one sub-directory per query.
    #[arg(short, long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub fetch: FetchOptions,

    #[command(flatten)]
    pub cluster: ClusterOptions,

    #[command(flatten)]
    pub predict: PredictOptions,
}

/// Arguments for the `fetch` subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// The query sequence.
    #[arg(long, value_name = "SEQUENCE")]
    pub seq: String,

    /// Where to write the alignment.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub fetch: FetchOptions,
}

/// Arguments for the `cluster` subcommand.
#[derive(Args, Debug)]
pub struct ClusterArgs {
    /// Alignment to cluster; its first record is the query.
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory receiving `clusters/` and the run log.
    #[arg(short, long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Prefix of the cluster file names.
    #[arg(short, long, value_name = "NAME")]
    pub keyword: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub cluster: ClusterOptions,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S clustering.min-samples=5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct FetchOptions {
    /// Directory caching fetched alignments.
    #[arg(long, value_name = "DIR")]
    pub tmp_dir: Option<PathBuf>,

    /// Base URL of the MSA server.
    #[arg(long, value_name = "URL")]
    pub host_url: Option<String>,

    /// Skip the environmental database.
    #[arg(long)]
    pub no_env: bool,

    /// Disable the server-side diversity filter.
    #[arg(long)]
    pub no_filter: bool,

    /// User-Agent header sent to the MSA server.
    #[arg(long, value_name = "STRING")]
    pub user_agent: Option<String>,

    #[command(flatten)]
    pub mmseqs: MmseqsArgs,
}

/// Local MMseqs2 installation. Read from the environment when not given.
#[derive(Args, Debug, Default, Clone)]
pub struct MmseqsArgs {
    /// MMseqs2 executable; `mmseqs` on PATH is used when unset.
    #[arg(long, env = "MMSEQS_BIN", value_name = "PATH")]
    pub mmseqs_bin: Option<PathBuf>,

    /// Primary (UniRef) MMseqs2 database.
    #[arg(long, env = "MMSEQS_DB_UNIREF", value_name = "PATH")]
    pub mmseqs_db_uniref: Option<PathBuf>,

    /// Environmental MMseqs2 database.
    #[arg(long, env = "MMSEQS_DB_ENV", value_name = "PATH")]
    pub mmseqs_db_env: Option<PathBuf>,

    /// Threads given to each MMseqs2 stage.
    #[arg(long, env = "MMSEQS_THREADS", value_name = "NUM")]
    pub mmseqs_threads: Option<usize>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ClusterOptions {
    /// Members with at least this fraction of gaps are dropped.
    #[arg(long, value_name = "FLOAT")]
    pub gap_cutoff: Option<f64>,

    /// Minimum neighbourhood size of a core point.
    #[arg(long, value_name = "INT")]
    pub min_samples: Option<usize>,

    /// Fixed neighbourhood radius; searched automatically when unset.
    #[arg(long, value_name = "FLOAT")]
    pub eps: Option<f64>,

    /// Smallest radius tried by the automatic search.
    #[arg(long, value_name = "FLOAT")]
    pub min_eps: Option<f64>,

    /// Largest radius tried by the automatic search.
    #[arg(long, value_name = "FLOAT")]
    pub max_eps: Option<f64>,

    /// Step between radii tried by the automatic search.
    #[arg(long, value_name = "FLOAT")]
    pub eps_step: Option<f64>,

    /// Seed for the random sub-sampling of the radius search.
    #[arg(long, value_name = "INT")]
    pub random_seed: Option<u64>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct PredictOptions {
    /// Stop after clustering.
    #[arg(long)]
    pub no_predict: bool,

    /// Structure-prediction executable.
    #[arg(long, value_name = "PATH")]
    pub colabfold_bin: Option<String>,

    /// Number of seeds predicted per cluster.
    #[arg(long, value_name = "INT")]
    pub num_seeds: Option<u32>,

    #[arg(long, value_name = "INT")]
    pub num_recycle: Option<u32>,

    #[arg(long)]
    pub use_dropout: bool,

    /// Relax predicted structures with Amber.
    #[arg(long)]
    pub amber: bool,

    #[arg(long, value_name = "INT")]
    pub num_relax: Option<u32>,

    #[arg(long)]
    pub use_gpu_relax: bool,

    /// Use template structures.
    #[arg(long)]
    pub templates: bool,
}
