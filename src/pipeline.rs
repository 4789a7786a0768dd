//! load -> scale -> split -> classify -> report

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{KnnError, PipelineError};
use crate::knn::KnnClassifier;
use crate::parse::{parse, Diagnosis, ParseOptions};
use crate::report::{BinarySummary, ConfusionMatrix};
use crate::sample::{labels_of, Sample};
use crate::scaling::{FitOn, ScalingMethod};
use crate::split::{split, Split, SplitStrategy, TestSize};

pub const DEFAULT_K: usize = 21;
pub const DEFAULT_SWEEP: [usize; 6] = [1, 5, 11, 15, 21, 27];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: PathBuf,
    pub parse: ParseOptions,
    pub k: usize,
    pub scaling: ScalingMethod,
    pub fit_on: FitOn,
    pub split: SplitStrategy,
    pub test_size: TestSize,
    pub parallel: bool,
    /// Label counted as positive in the binary summary.
    pub positive: Diagnosis,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/breast-cancer.csv"),
            parse: ParseOptions::default(),
            k: DEFAULT_K,
            scaling: ScalingMethod::MinMax,
            fit_on: FitOn::EntireDataset,
            split: SplitStrategy::Contiguous,
            test_size: TestSize::default(),
            parallel: false,
            positive: Diagnosis::Malignant,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, PipelineError> {
    let display = path.as_ref().display().to_string();

    let content = std::fs::read_to_string(&path).map_err(|source| PipelineError::ConfigIo {
        path: display.clone(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| PipelineError::Config {
        path: display,
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation<L> {
    pub k: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub predictions: Vec<L>,
    pub confusion: ConfusionMatrix<L>,
    pub summary: BinarySummary,
    pub accuracy: f64,
}

/// Scales and partitions `samples`. With `FitOn::EntireDataset` the
/// statistics are computed before splitting, so they include test rows.
pub fn prepare<L: Ord + Clone>(
    samples: &[Sample<L>],
    scaling: ScalingMethod,
    fit_on: FitOn,
    strategy: SplitStrategy,
    test_size: TestSize,
) -> Result<Split<L>, KnnError> {
    match fit_on {
        FitOn::EntireDataset => {
            tracing::warn!(
                "scaling statistics are fitted on the entire dataset, test rows included"
            );

            let params = scaling.fit(samples)?;
            split(&params.apply_samples(samples)?, strategy, test_size)
        }
        FitOn::TrainingOnly => {
            let Split { train, test } = split(samples, strategy, test_size)?;

            let params = scaling.fit(&train)?;
            Ok(Split {
                train: params.apply_samples(&train)?,
                test: params.apply_samples(&test)?,
            })
        }
    }
}

pub fn evaluate<L>(
    data: &Split<L>,
    classifier: KnnClassifier,
    positive: &L,
) -> Result<Evaluation<L>, KnnError>
where
    L: Ord + Clone + Send + Sync,
{
    let predictions = classifier.classify(&data.train, &data.test)?;
    let confusion = ConfusionMatrix::from_predictions(&labels_of(&data.test), &predictions)?;
    let summary = confusion.binary(positive);
    let accuracy = confusion.accuracy();

    tracing::info!(
        k = classifier.k(),
        accuracy,
        false_negatives = summary.false_negatives,
        false_positives = summary.false_positives,
        "evaluated"
    );

    Ok(Evaluation {
        k: classifier.k(),
        train_size: data.train.len(),
        test_size: data.test.len(),
        predictions,
        confusion,
        summary,
        accuracy,
    })
}

/// Evaluates each k over the same partition.
pub fn sweep<L>(
    data: &Split<L>,
    ks: &[usize],
    parallel: bool,
    positive: &L,
) -> Result<Vec<Evaluation<L>>, KnnError>
where
    L: Ord + Clone + Send + Sync,
{
    ks.iter()
        .map(|&k| {
            let classifier = KnnClassifier::new(k)?.with_parallel(parallel);
            evaluate(data, classifier, positive)
        })
        .collect()
}

fn load_and_prepare(config: &PipelineConfig) -> Result<Split<Diagnosis>, PipelineError> {
    let samples = parse(&config.data, &config.parse)?;

    tracing::info!(
        path = %config.data.display(),
        rows = samples.len(),
        scaling = ?config.scaling,
        fit_on = ?config.fit_on,
        "loaded dataset"
    );

    Ok(prepare(
        &samples,
        config.scaling,
        config.fit_on,
        config.split,
        config.test_size,
    )?)
}

pub fn run(config: &PipelineConfig) -> Result<Evaluation<Diagnosis>, PipelineError> {
    let data = load_and_prepare(config)?;
    let classifier = KnnClassifier::new(config.k)?.with_parallel(config.parallel);

    Ok(evaluate(&data, classifier, &config.positive)?)
}

pub fn run_sweep(
    config: &PipelineConfig,
    ks: &[usize],
) -> Result<Vec<Evaluation<Diagnosis>>, PipelineError> {
    let data = load_and_prepare(config)?;

    Ok(sweep(&data, ks, config.parallel, &config.positive)?)
}
