use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::KnnError;
use crate::sample::Sample;

/// How rows are assigned to the training and test partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SplitStrategy {
    /// Leading rows train, trailing rows test.
    #[default]
    Contiguous,
    Random {
        seed: u64,
    },
    /// Random within each label, keeping label proportions in both partitions.
    Stratified {
        seed: u64,
    },
}

impl SplitStrategy {
    pub fn seed(self) -> Option<u64> {
        match self {
            SplitStrategy::Contiguous => None,
            SplitStrategy::Random { seed } | SplitStrategy::Stratified { seed } => Some(seed),
        }
    }

    /// Replaces the seed of a seeded strategy; `Contiguous` is returned as is.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        match self {
            SplitStrategy::Contiguous => SplitStrategy::Contiguous,
            SplitStrategy::Random { .. } => SplitStrategy::Random { seed },
            SplitStrategy::Stratified { .. } => SplitStrategy::Stratified { seed },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSize {
    Count(usize),
    Fraction(f64),
}

impl Default for TestSize {
    fn default() -> Self {
        TestSize::Count(100)
    }
}

impl TestSize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn resolve(self, total: usize) -> Result<usize, KnnError> {
        let count = match self {
            TestSize::Count(count) => count,
            TestSize::Fraction(fraction) => {
                if fraction.is_nan() || fraction <= 0.0 || fraction >= 1.0 {
                    return Err(KnnError::InvalidParameter(format!(
                        "test fraction {fraction} is outside (0, 1)"
                    )));
                }

                (total as f64 * fraction).round() as usize
            }
        };

        if count == 0 || count >= total {
            return Err(KnnError::InvalidParameter(format!(
                "test size {count} must leave both partitions non-empty ({total} rows)"
            )));
        }

        Ok(count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split<L> {
    pub train: Vec<Sample<L>>,
    pub test: Vec<Sample<L>>,
}

/// Partitions `samples` into training and test rows. Both partitions keep
/// the source row order.
pub fn split<L: Ord + Clone>(
    samples: &[Sample<L>],
    strategy: SplitStrategy,
    test_size: TestSize,
) -> Result<Split<L>, KnnError> {
    let test_count = test_size.resolve(samples.len())?;

    let test_indices = match strategy {
        SplitStrategy::Contiguous => (samples.len() - test_count..samples.len()).collect(),
        SplitStrategy::Random { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut indices: Vec<usize> = (0..samples.len()).collect();
            indices.shuffle(&mut rng);
            indices.truncate(test_count);
            indices
        }
        SplitStrategy::Stratified { seed } => stratified_test_indices(samples, test_count, seed),
    };

    let mut is_test = vec![false; samples.len()];
    for index in test_indices {
        is_test[index] = true;
    }

    let (test, train): (Vec<_>, Vec<_>) = samples
        .iter()
        .zip(is_test)
        .partition(|(_, is_test)| *is_test);

    let split = Split {
        train: train.into_iter().map(|(s, _)| s.clone()).collect(),
        test: test.into_iter().map(|(s, _)| s.clone()).collect(),
    };

    tracing::debug!(
        ?strategy,
        train = split.train.len(),
        test = split.test.len(),
        "split dataset"
    );

    Ok(split)
}

fn stratified_test_indices<L: Ord>(
    samples: &[Sample<L>],
    test_count: usize,
    seed: u64,
) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut groups: BTreeMap<&L, Vec<usize>> = BTreeMap::new();
    for (index, sample) in samples.iter().enumerate() {
        groups.entry(&sample.label).or_default().push(index);
    }

    // largest remainder apportionment so the quotas sum to test_count
    let total = samples.len();
    let mut quotas: Vec<(usize, usize)> = groups
        .values()
        .map(|group| {
            let exact = group.len() * test_count;
            (exact / total, exact % total)
        })
        .collect();

    let assigned: usize = quotas.iter().map(|(quota, _)| quota).sum();
    let mut by_remainder: Vec<usize> = (0..quotas.len()).collect();
    by_remainder.sort_by(|&a, &b| quotas[b].1.cmp(&quotas[a].1).then(a.cmp(&b)));
    for &group in by_remainder.iter().take(test_count - assigned) {
        quotas[group].0 += 1;
    }

    let mut test_indices = Vec::with_capacity(test_count);
    for (mut group, (quota, _)) in groups.into_values().zip(quotas) {
        group.shuffle(&mut rng);
        test_indices.extend(group.into_iter().take(quota));
    }

    test_indices
}
