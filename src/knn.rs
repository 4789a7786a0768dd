//! Brute-force k-nearest-neighbors classification.
//!
//! Every query is compared against every training row under Euclidean
//! distance. Neighbor selection and voting are deterministic:
//!
//! * equal distances prefer the lower training index;
//! * a vote tie goes to the label whose closest neighbor is nearer, and if
//!   those distances are equal too, to the label that sorts first.

use nalgebra::{DMatrix, RowDVector};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::error::KnnError;
use crate::sample::{common_dimension, Sample};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row of the training set.
    pub index: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnnClassifier {
    k: usize,
    parallel: bool,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Result<Self, KnnError> {
        if k == 0 {
            return Err(KnnError::InvalidParameter("k must be positive".into()));
        }

        Ok(Self { k, parallel: false })
    }

    /// Classify test vectors on the rayon pool. Output is identical to the
    /// sequential path.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn classify<L, V>(&self, train: &[Sample<L>], test: &[V]) -> Result<Vec<L>, KnnError>
    where
        L: Ord + Clone + Send + Sync,
        V: AsRef<[f64]> + Sync,
    {
        let training_set = TrainingSet::new(train, self.k)?;
        for query in test {
            training_set.check_query(query.as_ref())?;
        }

        tracing::debug!(
            k = self.k,
            train = train.len(),
            test = test.len(),
            parallel = self.parallel,
            "classifying"
        );

        if self.parallel {
            test.par_iter()
                .map(|query| training_set.predict(query.as_ref(), self.k))
                .collect()
        } else {
            test.iter()
                .map(|query| training_set.predict(query.as_ref(), self.k))
                .collect()
        }
    }

    pub fn neighbors<L>(
        &self,
        train: &[Sample<L>],
        query: &[f64],
    ) -> Result<Vec<Neighbor>, KnnError> {
        let training_set = TrainingSet::new(train, self.k)?;
        training_set.check_query(query)?;

        Ok(training_set.nearest(query, self.k))
    }
}

/// Predicts one label per test vector by majority vote among the `k`
/// nearest training samples.
pub fn classify<L, V>(train: &[Sample<L>], test: &[V], k: usize) -> Result<Vec<L>, KnnError>
where
    L: Ord + Clone + Send + Sync,
    V: AsRef<[f64]> + Sync,
{
    KnnClassifier::new(k)?.classify(train, test)
}

/// The `k` nearest training samples of `query`, closest first.
pub fn neighbors<L>(
    train: &[Sample<L>],
    query: &[f64],
    k: usize,
) -> Result<Vec<Neighbor>, KnnError> {
    KnnClassifier::new(k)?.neighbors(train, query)
}

struct TrainingSet<'a, L> {
    samples: &'a [Sample<L>],
    features: DMatrix<f64>,
}

impl<'a, L> TrainingSet<'a, L> {
    fn new(samples: &'a [Sample<L>], k: usize) -> Result<Self, KnnError> {
        if samples.is_empty() {
            return Err(KnnError::InvalidParameter("training set is empty".into()));
        }
        if k > samples.len() {
            return Err(KnnError::InvalidParameter(format!(
                "k = {k} exceeds training set size {}",
                samples.len()
            )));
        }

        let dimension = common_dimension(samples.iter().map(|s| s.features.as_slice()))?
            .unwrap_or_default();

        let features = DMatrix::from_row_iterator(
            samples.len(),
            dimension,
            samples.iter().flat_map(|s| s.features.iter().copied()),
        );

        Ok(Self { samples, features })
    }

    fn check_query(&self, query: &[f64]) -> Result<(), KnnError> {
        if query.len() == self.features.ncols() {
            Ok(())
        } else {
            Err(KnnError::DimensionMismatch {
                expected: self.features.ncols(),
                actual: query.len(),
            })
        }
    }

    fn nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        let query = RowDVector::from_row_slice(query);

        let mut neighbors: Vec<Neighbor> = self
            .features
            .row_iter()
            .enumerate()
            .map(|(index, row)| Neighbor {
                index,
                distance: row.metric_distance(&query),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.index.cmp(&b.index))
        });
        neighbors.truncate(k);

        neighbors
    }

    fn predict(&self, query: &[f64], k: usize) -> Result<L, KnnError>
    where
        L: Ord + Clone,
    {
        let neighbors = self.nearest(query, k);

        vote(&neighbors, self.samples)
            .ok_or_else(|| KnnError::InvalidParameter("no neighbors to vote".into()))
    }
}

fn vote<L: Ord + Clone>(neighbors: &[Neighbor], samples: &[Sample<L>]) -> Option<L> {
    // label -> (votes, distance of its closest neighbor)
    let mut tally: BTreeMap<&L, (usize, f64)> = BTreeMap::new();

    // neighbors arrive closest first, so the first distance seen is the minimum
    for neighbor in neighbors {
        let entry = tally
            .entry(&samples[neighbor.index].label)
            .or_insert((0, neighbor.distance));
        entry.0 += 1;
    }

    tally
        .into_iter()
        .max_by(|(label_a, (votes_a, nearest_a)), (label_b, (votes_b, nearest_b))| {
            votes_a
                .cmp(votes_b)
                .then(nearest_b.total_cmp(nearest_a))
                .then(label_b.cmp(label_a))
        })
        .map(|(label, _)| label.clone())
}
