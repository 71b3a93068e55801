use super::defaults::DefaultsConfig;
use super::environment;
use super::file::{FileClusteringConfig, FileConfig, FileFetchConfig, FilePredictionConfig};
use super::models::{AppConfig, PredictionConfig};
use crate::cli::{ClusterOptions, ConfigArgs, FetchOptions, PredictOptions};
use crate::data::DataManager;
use crate::error::{CliError, Result};
use afcluster::engine::config::{
    ClusteringConfig, ClusteringConfigBuilder, FetchConfig, FetchConfigBuilder,
    LocalSearchConfig, RadiusSearchRange,
};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Everything the command line contributes to the configuration.
///
/// Commands that lack an option group pass its `Default`, which overrides nothing.
#[derive(Default)]
pub struct CliOverrides<'a> {
    pub config: ConfigArgs,
    pub outdir: Option<&'a Path>,
    pub fetch: FetchOptions,
    pub cluster: ClusterOptions,
    pub predict: PredictOptions,
}

/// Layers built-in defaults, the config file, CLI flags and `--set` values, later layers
/// winning.
pub fn build_config(cli: &CliOverrides, data_manager: &DataManager) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file = match &cli.config.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let set = apply_set_values(FileConfig::default(), &cli.config.set_values)?;

    let outdir = set
        .outdir
        .clone()
        .or_else(|| cli.outdir.map(Path::to_path_buf))
        .or_else(|| file.outdir.clone())
        .unwrap_or_else(|| defaults.outdir.into());
    let tmp_dir = set
        .tmp_dir
        .clone()
        .or_else(|| cli.fetch.tmp_dir.clone())
        .or_else(|| file.tmp_dir.clone())
        .unwrap_or_else(|| data_manager.msa_cache_dir());
    let random_seed = set
        .random_seed
        .or(cli.cluster.random_seed)
        .or(file.random_seed);

    let clustering = merge_clustering(
        &cli.cluster,
        file.clustering.clone().unwrap_or_default(),
        set.clustering.clone().unwrap_or_default(),
    )?;

    let file_fetch = file.fetch.clone().unwrap_or_default();
    let set_fetch = set.fetch.clone().unwrap_or_default();
    let fetch = merge_fetch(&cli.fetch, &file_fetch, &set_fetch)?;
    let local = merge_local(&cli.fetch, &file_fetch, &set_fetch, &defaults);

    let prediction = merge_prediction(
        &cli.predict,
        file.prediction.clone().unwrap_or_default(),
        set.prediction.clone().unwrap_or_default(),
        &defaults,
    );

    debug!(
        "Resolved configuration: outdir={:?}, tmp_dir={:?}, seed={:?}, mode={}",
        outdir, tmp_dir, random_seed, fetch.mode
    );

    Ok(AppConfig {
        outdir,
        tmp_dir,
        random_seed,
        clustering,
        fetch,
        local,
        prediction,
    })
}

fn merge_clustering(
    cli: &ClusterOptions,
    file: FileClusteringConfig,
    set: FileClusteringConfig,
) -> Result<ClusteringConfig> {
    let defaults = ClusteringConfig::default();
    let range = RadiusSearchRange::default();

    let mut builder = ClusteringConfigBuilder::new()
        .min_points(
            set.min_samples
                .or(cli.min_samples)
                .or(file.min_samples)
                .unwrap_or(defaults.min_points),
        )
        .gap_cutoff(
            set.gap_cutoff
                .or(cli.gap_cutoff)
                .or(file.gap_cutoff)
                .unwrap_or(defaults.gap_cutoff),
        )
        .radius(set.eps.or(cli.eps).or(file.eps))
        .search_range(
            set.min_eps.or(cli.min_eps).or(file.min_eps).unwrap_or(range.min),
            set.max_eps.or(cli.max_eps).or(file.max_eps).unwrap_or(range.max),
            set.eps_step
                .or(cli.eps_step)
                .or(file.eps_step)
                .unwrap_or(range.step),
        );

    if let Some(fraction) = set.sample_fraction.or(file.sample_fraction) {
        builder = builder.sample_fraction(fraction);
    }
    if let Some(budget) = set.refinement_budget.or(file.refinement_budget) {
        builder = builder.refinement_budget(budget);
    }
    if let Some(symbols) = set.alphabet.or(file.alphabet) {
        builder = builder.alphabet(symbols);
    }

    Ok(builder.build()?)
}

fn merge_fetch(
    cli: &FetchOptions,
    file: &FileFetchConfig,
    set: &FileFetchConfig,
) -> Result<FetchConfig> {
    let use_env = set
        .use_env
        .or(cli.no_env.then_some(false))
        .or(file.use_env)
        .unwrap_or(true);
    let use_filter = set
        .use_filter
        .or(cli.no_filter.then_some(false))
        .or(file.use_filter)
        .unwrap_or(true);

    let mut builder = FetchConfigBuilder::new()
        .use_env(use_env)
        .use_filter(use_filter)
        .user_agent(
            set.user_agent
                .clone()
                .or_else(|| cli.user_agent.clone())
                .or_else(|| file.user_agent.clone()),
        );
    if let Some(url) = set
        .host_url
        .clone()
        .or_else(|| cli.host_url.clone())
        .or_else(|| file.host_url.clone())
    {
        builder = builder.host_url(url);
    }

    Ok(builder.build()?)
}

fn merge_local(
    cli: &FetchOptions,
    file: &FileFetchConfig,
    set: &FileFetchConfig,
    defaults: &DefaultsConfig,
) -> LocalSearchConfig {
    let base = LocalSearchConfig::default();
    let binary = cli
        .mmseqs
        .mmseqs_bin
        .clone()
        .or_else(|| environment::find_on_path(defaults.mmseqs_program));
    if binary.is_none() {
        debug!("No MMseqs2 executable found; alignments will come from the MSA server.");
    }

    LocalSearchConfig {
        binary,
        uniref_db: cli.mmseqs.mmseqs_db_uniref.clone(),
        env_db: cli.mmseqs.mmseqs_db_env.clone(),
        threads: set
            .mmseqs_threads
            .or(cli.mmseqs.mmseqs_threads)
            .or(file.mmseqs_threads)
            .unwrap_or(base.threads),
        sensitivity: set
            .mmseqs_sensitivity
            .or(file.mmseqs_sensitivity)
            .unwrap_or(base.sensitivity),
    }
}

fn merge_prediction(
    cli: &PredictOptions,
    file: FilePredictionConfig,
    set: FilePredictionConfig,
    defaults: &DefaultsConfig,
) -> PredictionConfig {
    let flag = |cli_flag: bool, set_val: Option<bool>, file_val: Option<bool>| {
        set_val
            .or(cli_flag.then_some(true))
            .or(file_val)
            .unwrap_or(false)
    };

    PredictionConfig {
        enabled: set
            .enabled
            .or(cli.no_predict.then_some(false))
            .or(file.enabled)
            .unwrap_or(true),
        command: set
            .command
            .or_else(|| cli.colabfold_bin.clone())
            .or(file.command)
            .unwrap_or_else(|| defaults.prediction_command.to_string()),
        num_seeds: set
            .num_seeds
            .or(cli.num_seeds)
            .or(file.num_seeds)
            .unwrap_or(defaults.num_seeds),
        num_recycle: set
            .num_recycle
            .or(cli.num_recycle)
            .or(file.num_recycle)
            .unwrap_or(defaults.num_recycle),
        use_dropout: flag(cli.use_dropout, set.use_dropout, file.use_dropout),
        amber: flag(cli.amber, set.amber, file.amber),
        num_relax: set
            .num_relax
            .or(cli.num_relax)
            .or(file.num_relax)
            .unwrap_or(defaults.num_relax),
        use_gpu_relax: flag(cli.use_gpu_relax, set.use_gpu_relax, file.use_gpu_relax),
        templates: flag(cli.templates, set.templates, file.templates),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let parts: Vec<_> = kv_pair.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        }
        let key = parts[0].trim();
        let value = parts[1].trim();

        match key {
            "outdir" => config.outdir = Some(value.into()),
            "tmp-dir" => config.tmp_dir = Some(value.into()),
            "random-seed" => config.random_seed = Some(parse_value(key, value, "integer")?),

            "clustering.gap-cutoff" => {
                config.clustering.get_or_insert_with(Default::default).gap_cutoff =
                    Some(parse_value(key, value, "float")?)
            }
            "clustering.min-samples" => {
                config.clustering.get_or_insert_with(Default::default).min_samples =
                    Some(parse_value(key, value, "integer")?)
            }
            "clustering.eps" => {
                config.clustering.get_or_insert_with(Default::default).eps =
                    Some(parse_value(key, value, "float")?)
            }
            "clustering.min-eps" => {
                config.clustering.get_or_insert_with(Default::default).min_eps =
                    Some(parse_value(key, value, "float")?)
            }
            "clustering.max-eps" => {
                config.clustering.get_or_insert_with(Default::default).max_eps =
                    Some(parse_value(key, value, "float")?)
            }
            "clustering.eps-step" => {
                config.clustering.get_or_insert_with(Default::default).eps_step =
                    Some(parse_value(key, value, "float")?)
            }
            "clustering.sample-fraction" => {
                config.clustering.get_or_insert_with(Default::default).sample_fraction =
                    Some(parse_value(key, value, "float")?)
            }
            "clustering.refinement-budget" => {
                config.clustering.get_or_insert_with(Default::default).refinement_budget =
                    Some(parse_value(key, value, "integer")?)
            }
            "clustering.alphabet" => {
                config.clustering.get_or_insert_with(Default::default).alphabet =
                    Some(value.to_string())
            }

            "fetch.host-url" => {
                config.fetch.get_or_insert_with(Default::default).host_url = Some(value.to_string())
            }
            "fetch.use-env" => {
                config.fetch.get_or_insert_with(Default::default).use_env =
                    Some(parse_value(key, value, "boolean")?)
            }
            "fetch.use-filter" => {
                config.fetch.get_or_insert_with(Default::default).use_filter =
                    Some(parse_value(key, value, "boolean")?)
            }
            "fetch.user-agent" => {
                config.fetch.get_or_insert_with(Default::default).user_agent = Some(value.to_string())
            }
            "fetch.mmseqs-threads" => {
                config.fetch.get_or_insert_with(Default::default).mmseqs_threads =
                    Some(parse_value(key, value, "integer")?)
            }
            "fetch.mmseqs-sensitivity" => {
                config.fetch.get_or_insert_with(Default::default).mmseqs_sensitivity =
                    Some(parse_value(key, value, "float")?)
            }

            "prediction.enabled" => {
                config.prediction.get_or_insert_with(Default::default).enabled =
                    Some(parse_value(key, value, "boolean")?)
            }
            "prediction.command" => {
                config.prediction.get_or_insert_with(Default::default).command =
                    Some(value.to_string())
            }
            "prediction.num-seeds" => {
                config.prediction.get_or_insert_with(Default::default).num_seeds =
                    Some(parse_value(key, value, "integer")?)
            }
            "prediction.num-recycle" => {
                config.prediction.get_or_insert_with(Default::default).num_recycle =
                    Some(parse_value(key, value, "integer")?)
            }
            "prediction.use-dropout" => {
                config.prediction.get_or_insert_with(Default::default).use_dropout =
                    Some(parse_value(key, value, "boolean")?)
            }
            "prediction.amber" => {
                config.prediction.get_or_insert_with(Default::default).amber =
                    Some(parse_value(key, value, "boolean")?)
            }
            "prediction.num-relax" => {
                config.prediction.get_or_insert_with(Default::default).num_relax =
                    Some(parse_value(key, value, "integer")?)
            }
            "prediction.use-gpu-relax" => {
                config.prediction.get_or_insert_with(Default::default).use_gpu_relax =
                    Some(parse_value(key, value, "boolean")?)
            }
            "prediction.templates" => {
                config.prediction.get_or_insert_with(Default::default).templates =
                    Some(parse_value(key, value, "boolean")?)
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use afcluster::engine::config::MsaMode;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn manager() -> (DataManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        (DataManager::with_base(dir.path().to_path_buf()), dir)
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("afcluster.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let (manager, base) = manager();
        let app = build_config(&CliOverrides::default(), &manager).unwrap();

        assert_eq!(app.outdir, PathBuf::from("output"));
        assert_eq!(app.tmp_dir, base.path().join("msa"));
        assert_eq!(app.random_seed, None);
        assert_eq!(app.clustering, ClusteringConfig::default());
        assert_eq!(app.fetch.mode, MsaMode::Env);
        assert_eq!(app.local.threads, 4);
        assert_eq!(app.local.uniref_db, None);

        let prediction = app.prediction;
        assert!(prediction.enabled);
        assert_eq!(prediction.command, "colabfold_batch");
        assert_eq!(prediction.num_seeds, 1);
        assert_eq!(prediction.num_recycle, 3);
        assert!(!prediction.amber && !prediction.templates && !prediction.use_dropout);
    }

    #[test]
    fn file_values_override_defaults() {
        let (manager, base) = manager();
        let path = write_config(
            base.path(),
            r#"
            outdir = "runs"
            random-seed = 11

            [clustering]
            min-samples = 7
            gap-cutoff = 0.5
            min-eps = 2.0
            max-eps = 6.0
            eps-step = 1.0
            refinement-budget = 10

            [fetch]
            use-filter = false
            host-url = "http://localhost:8080/"

            [prediction]
            num-seeds = 5
            amber = true
            num-relax = 1
            "#,
        );
        let cli = CliOverrides {
            config: ConfigArgs {
                config: Some(path),
                set_values: vec![],
            },
            ..Default::default()
        };

        let app = build_config(&cli, &manager).unwrap();
        assert_eq!(app.outdir, PathBuf::from("runs"));
        assert_eq!(app.random_seed, Some(11));
        assert_eq!(app.clustering.min_points, 7);
        assert_eq!(app.clustering.gap_cutoff, 0.5);
        assert_eq!(app.clustering.search.candidates(), vec![2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(app.clustering.refinement_budget, 10);
        assert_eq!(app.fetch.mode, MsaMode::EnvNoFilter);
        assert_eq!(app.fetch.host_url, "http://localhost:8080");
        assert_eq!(app.prediction.num_seeds, 5);
        assert!(app.prediction.amber);
        assert_eq!(app.prediction.num_relax, 1);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let (manager, base) = manager();
        let path = write_config(
            base.path(),
            "outdir = \"runs\"\n[clustering]\nmin-samples = 7\neps = 4.0\n[prediction]\nnum-seeds = 5\n",
        );
        let outdir = base.path().join("cli-out");
        let cli = CliOverrides {
            config: ConfigArgs {
                config: Some(path),
                set_values: vec![],
            },
            outdir: Some(&outdir),
            cluster: ClusterOptions {
                min_samples: Some(2),
                eps: Some(9.5),
                random_seed: Some(3),
                ..Default::default()
            },
            fetch: FetchOptions {
                no_env: true,
                tmp_dir: Some(base.path().join("cache")),
                ..Default::default()
            },
            predict: PredictOptions {
                no_predict: true,
                num_seeds: Some(2),
                templates: true,
                ..Default::default()
            },
        };

        let app = build_config(&cli, &manager).unwrap();
        assert_eq!(app.outdir, outdir);
        assert_eq!(app.tmp_dir, base.path().join("cache"));
        assert_eq!(app.random_seed, Some(3));
        assert_eq!(app.clustering.min_points, 2);
        assert_eq!(app.clustering.radius, Some(9.5));
        assert_eq!(app.fetch.mode, MsaMode::All);
        assert!(!app.prediction.enabled);
        assert_eq!(app.prediction.num_seeds, 2);
        assert!(app.prediction.templates);
    }

    #[test]
    fn set_values_override_flags_and_file() {
        let (manager, base) = manager();
        let path = write_config(base.path(), "[clustering]\nmin-samples = 7\n");
        let cli = CliOverrides {
            config: ConfigArgs {
                config: Some(path),
                set_values: vec![
                    "clustering.min-samples=4".to_string(),
                    "clustering.eps=1.5".to_string(),
                    "fetch.use-env=false".to_string(),
                    "fetch.mmseqs-threads=16".to_string(),
                    "prediction.command=/opt/cf/bin/colabfold_batch".to_string(),
                    "prediction.use-gpu-relax=true".to_string(),
                    "random-seed=99".to_string(),
                ],
            },
            cluster: ClusterOptions {
                min_samples: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };

        let app = build_config(&cli, &manager).unwrap();
        assert_eq!(app.clustering.min_points, 4);
        assert_eq!(app.clustering.radius, Some(1.5));
        assert_eq!(app.fetch.mode, MsaMode::All);
        assert_eq!(app.local.threads, 16);
        assert_eq!(app.prediction.command, "/opt/cf/bin/colabfold_batch");
        assert!(app.prediction.use_gpu_relax);
        assert_eq!(app.random_seed, Some(99));
    }

    #[test]
    fn malformed_and_unknown_set_values_are_config_errors() {
        let (manager, _base) = manager();
        for bad in ["clustering.min-samples", "clustering.min-samples=many", "nope=1"] {
            let cli = CliOverrides {
                config: ConfigArgs {
                    config: None,
                    set_values: vec![bad.to_string()],
                },
                ..Default::default()
            };
            assert!(
                matches!(build_config(&cli, &manager), Err(CliError::Config(_))),
                "expected a config error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let (manager, _base) = manager();
        let cli = CliOverrides {
            cluster: ClusterOptions {
                min_eps: Some(10.0),
                max_eps: Some(5.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            build_config(&cli, &manager),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn explicit_mmseqs_settings_are_carried_into_local_config() {
        let (manager, base) = manager();
        let mut fetch = FetchOptions::default();
        fetch.mmseqs.mmseqs_bin = Some(base.path().join("mmseqs"));
        fetch.mmseqs.mmseqs_db_uniref = Some(base.path().join("uniref30"));
        fetch.mmseqs.mmseqs_threads = Some(8);
        let cli = CliOverrides {
            fetch,
            ..Default::default()
        };

        let app = build_config(&cli, &manager).unwrap();
        assert_eq!(app.local.binary, Some(base.path().join("mmseqs")));
        assert_eq!(app.local.databases(true), vec![base.path().join("uniref30")]);
        assert_eq!(app.local.threads, 8);
    }
}
