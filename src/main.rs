use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use knn_biopsy::pipeline::{self, load_config, PipelineConfig, DEFAULT_SWEEP};
use knn_biopsy::plot::plot_sweep;
use knn_biopsy::{FitOn, ScalingMethod, SplitStrategy, TestSize};

const DEFAULT_SEED: u64 = 42;

fn cli() -> Command {
    Command::new("knn-biopsy")
        .version(clap::crate_version!())
        .about("Classify biopsy samples with a k-nearest-neighbors vote")
        .arg(
            Arg::new("data")
                .help("CSV table: id, diagnosis (B/M), numeric features")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON configuration file. Command line options override it.")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("k")
                .short('k')
                .help("Number of neighbors")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("scaling")
                .long("scaling")
                .value_parser(["minmax", "zscore"]),
        )
        .arg(
            Arg::new("fit_on")
                .long("fit-on")
                .help("Rows the scaling statistics are computed from")
                .value_parser(["entire_dataset", "training_only"]),
        )
        .arg(
            Arg::new("split")
                .long("split")
                .value_parser(["contiguous", "random", "stratified"]),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for random and stratified splits [default: 42]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("test_size")
                .long("test-size")
                .help("Test rows as a count (100) or a fraction (0.2)"),
        )
        .arg(
            Arg::new("sweep")
                .long("sweep")
                .help("Evaluate several k values, e.g. 1,5,11,15,21,27")
                .value_parser(clap::value_parser!(usize))
                .value_delimiter(',')
                .num_args(0..),
        )
        .arg(
            Arg::new("plot")
                .long("plot")
                .help("Write an SVG chart of accuracy by k")
                .requires("sweep")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print results as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .help("Classify test rows in parallel")
                .action(ArgAction::SetTrue),
        )
}

fn parse_test_size(value: &str) -> Result<TestSize> {
    if value.contains('.') {
        Ok(TestSize::Fraction(value.parse().with_context(|| {
            format!("invalid test fraction {value:?}")
        })?))
    } else {
        Ok(TestSize::Count(value.parse().with_context(|| {
            format!("invalid test count {value:?}")
        })?))
    }
}

fn build_config(matches: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(data) = matches.get_one::<PathBuf>("data") {
        config.data.clone_from(data);
    }
    if let Some(&k) = matches.get_one::<usize>("k") {
        config.k = k;
    }
    if let Some(scaling) = matches.get_one::<String>("scaling") {
        config.scaling = match scaling.as_str() {
            "zscore" => ScalingMethod::ZScore,
            _ => ScalingMethod::MinMax,
        };
    }
    if let Some(fit_on) = matches.get_one::<String>("fit_on") {
        config.fit_on = match fit_on.as_str() {
            "training_only" => FitOn::TrainingOnly,
            _ => FitOn::EntireDataset,
        };
    }
    let seed = matches.get_one::<u64>("seed").copied();
    if let Some(split) = matches.get_one::<String>("split") {
        let seed = seed.or(config.split.seed()).unwrap_or(DEFAULT_SEED);
        config.split = match split.as_str() {
            "random" => SplitStrategy::Random { seed },
            "stratified" => SplitStrategy::Stratified { seed },
            _ => SplitStrategy::Contiguous,
        };
    } else if let Some(seed) = seed {
        if config.split == SplitStrategy::Contiguous {
            tracing::warn!(seed, "--seed has no effect on a contiguous split");
        }
        config.split = config.split.with_seed(seed);
    }
    if let Some(test_size) = matches.get_one::<String>("test_size") {
        config.test_size = parse_test_size(test_size)?;
    }
    if matches.get_flag("parallel") {
        config.parallel = true;
    }

    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = build_config(&matches)?;
    let json = matches.get_flag("json");

    if let Some(ks) = matches.get_many::<usize>("sweep") {
        let mut ks: Vec<usize> = ks.copied().collect();
        if ks.is_empty() {
            ks = DEFAULT_SWEEP.to_vec();
        }

        let results = pipeline::run_sweep(&config, &ks)
            .with_context(|| format!("sweep over {} failed", config.data.display()))?;

        if json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            println!("   k   accuracy  false negatives  false positives");
            for evaluation in &results {
                println!(
                    "{:>4}  {:>8.3}%  {:>15}  {:>15}",
                    evaluation.k,
                    evaluation.accuracy * 100.0,
                    evaluation.summary.false_negatives,
                    evaluation.summary.false_positives
                );
            }
        }

        if let Some(path) = matches.get_one::<PathBuf>("plot") {
            let points: Vec<(usize, f64)> = results.iter().map(|e| (e.k, e.accuracy)).collect();
            plot_sweep(&points, path)?;
        }

        return Ok(());
    }

    let evaluation = pipeline::run(&config)
        .with_context(|| format!("classification of {} failed", config.data.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        println!(
            "k = {}, {} training rows, {} test rows",
            evaluation.k, evaluation.train_size, evaluation.test_size
        );
        print!("{}", evaluation.confusion);
        println!("accuracy: {:.3}%", evaluation.accuracy * 100.0);
    }

    Ok(())
}
