use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::KnnError;
use crate::sample::{common_dimension, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMethod {
    /// (x - min) / (max - min) -> [0, 1]
    #[default]
    MinMax,
    /// (x - mean) / std -> zero mean, unit variance
    ZScore,
}

impl ScalingMethod {
    pub fn fit<V: AsRef<[f64]>>(self, vectors: &[V]) -> Result<ScalingParameters, KnnError> {
        match self {
            ScalingMethod::MinMax => fit_minmax(vectors).map(ScalingParameters::MinMax),
            ScalingMethod::ZScore => fit_zscore(vectors).map(ScalingParameters::ZScore),
        }
    }
}

/// Which rows the scaling statistics are computed from.
///
/// `EntireDataset` fits before the train/test split, so test rows leak into
/// the statistics the training rows are scaled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitOn {
    #[default]
    EntireDataset,
    TrainingOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxParameters {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreParameters {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalingParameters {
    MinMax(MinMaxParameters),
    ZScore(ZScoreParameters),
}

impl ScalingParameters {
    pub fn apply(&self, vector: &[f64]) -> Result<Vec<f64>, KnnError> {
        match self {
            ScalingParameters::MinMax(params) => apply_minmax(vector, params),
            ScalingParameters::ZScore(params) => apply_zscore(vector, params),
        }
    }

    pub fn apply_all<V: AsRef<[f64]>>(&self, vectors: &[V]) -> Result<Vec<Vec<f64>>, KnnError> {
        vectors.iter().map(|v| self.apply(v.as_ref())).collect()
    }

    /// Scales the features of every sample, keeping labels and row order.
    pub fn apply_samples<L: Clone>(
        &self,
        samples: &[Sample<L>],
    ) -> Result<Vec<Sample<L>>, KnnError> {
        samples
            .iter()
            .map(|sample| Ok(Sample::new(self.apply(&sample.features)?, sample.label.clone())))
            .collect()
    }
}

fn to_matrix<V: AsRef<[f64]>>(vectors: &[V]) -> Result<Array2<f64>, KnnError> {
    let dimension = common_dimension(vectors.iter().map(|v| v.as_ref()))?.ok_or_else(|| {
        KnnError::InvalidParameter("cannot fit scaling parameters on an empty dataset".into())
    })?;

    let data: Vec<f64> = vectors.iter().flat_map(|v| v.as_ref().to_vec()).collect();
    check_finite(&data)?;

    Array2::from_shape_vec((vectors.len(), dimension), data)
        .map_err(|err| KnnError::InvalidParameter(err.to_string()))
}

pub fn fit_minmax<V: AsRef<[f64]>>(vectors: &[V]) -> Result<MinMaxParameters, KnnError> {
    let features = to_matrix(vectors)?;

    let min: Vec<f64> = features
        .columns()
        .into_iter()
        .map(|col| col.fold(f64::INFINITY, |acc, &x| acc.min(x)))
        .collect();
    let max: Vec<f64> = features
        .columns()
        .into_iter()
        .map(|col| col.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x)))
        .collect();

    for (column, (lo, hi)) in min.iter().zip(&max).enumerate() {
        check_range(column, *lo, *hi)?;
    }

    Ok(MinMaxParameters { min, max })
}

pub fn fit_zscore<V: AsRef<[f64]>>(vectors: &[V]) -> Result<ZScoreParameters, KnnError> {
    let features = to_matrix(vectors)?;

    if features.nrows() < 2 {
        return Err(KnnError::InvalidParameter(
            "z-score scaling needs at least two rows for a sample standard deviation".into(),
        ));
    }

    // columns are divided by their largest magnitude so sums of squares stay finite
    let magnitude = features
        .fold_axis(Axis(0), 0.0_f64, |&acc, &x| acc.max(x.abs()))
        .mapv(|m| if m > 0.0 { m } else { 1.0 });
    let normalized = &features / &magnitude;

    let mean = normalized
        .mean_axis(Axis(0))
        .ok_or_else(|| KnnError::InvalidParameter("failed to compute column means".into()))?
        * &magnitude;
    // sample standard deviation (n - 1)
    let std = normalized.std_axis(Axis(0), 1.0) * &magnitude;

    for (column, &value) in std.iter().enumerate() {
        check_std(column, value)?;
    }

    Ok(ZScoreParameters {
        mean: mean.to_vec(),
        std: std.to_vec(),
    })
}

pub fn apply_minmax(vector: &[f64], params: &MinMaxParameters) -> Result<Vec<f64>, KnnError> {
    check_dimension(params.min.len(), vector.len())?;
    check_finite(vector)?;

    vector
        .iter()
        .zip(params.min.iter().zip(&params.max))
        .enumerate()
        .map(|(column, (&x, (&min, &max)))| {
            check_range(column, min, max)?;
            // halved so max - min cannot overflow
            Ok((x / 2.0 - min / 2.0) / (max / 2.0 - min / 2.0))
        })
        .collect()
}

pub fn apply_zscore(vector: &[f64], params: &ZScoreParameters) -> Result<Vec<f64>, KnnError> {
    check_dimension(params.mean.len(), vector.len())?;
    check_finite(vector)?;

    vector
        .iter()
        .zip(params.mean.iter().zip(&params.std))
        .enumerate()
        .map(|(column, (&x, (&mean, &std)))| {
            check_std(column, std)?;
            if !mean.is_finite() {
                return Err(KnnError::InvalidParameter(format!(
                    "column {column} has a non-finite mean"
                )));
            }
            Ok((x / 2.0 - mean / 2.0) / (std / 2.0))
        })
        .collect()
}

fn check_dimension(expected: usize, actual: usize) -> Result<(), KnnError> {
    if expected == actual {
        Ok(())
    } else {
        Err(KnnError::DimensionMismatch { expected, actual })
    }
}

fn check_finite(values: &[f64]) -> Result<(), KnnError> {
    match values.iter().position(|x| !x.is_finite()) {
        Some(position) => Err(KnnError::InvalidParameter(format!(
            "non-finite feature value {} at position {position}",
            values[position]
        ))),
        None => Ok(()),
    }
}

fn check_range(column: usize, min: f64, max: f64) -> Result<(), KnnError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(KnnError::InvalidParameter(format!(
            "column {column} has a non-finite range [{min}, {max}]"
        )));
    }
    if max > min {
        Ok(())
    } else {
        Err(KnnError::DegenerateFeature {
            column,
            reason: "zero range (max == min)",
        })
    }
}

fn check_std(column: usize, std: f64) -> Result<(), KnnError> {
    if !std.is_finite() {
        return Err(KnnError::InvalidParameter(format!(
            "column {column} has a non-finite standard deviation"
        )));
    }
    if std > 0.0 {
        Ok(())
    } else {
        Err(KnnError::DegenerateFeature {
            column,
            reason: "zero standard deviation",
        })
    }
}
