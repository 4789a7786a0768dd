use serde::{Deserialize, Serialize};

use crate::error::KnnError;

/// One row of a dataset: a feature vector with its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample<L> {
    pub features: Vec<f64>,
    pub label: L,
}

impl<L> Sample<L> {
    pub fn new(features: Vec<f64>, label: L) -> Self {
        Self { features, label }
    }

    pub fn dimension(&self) -> usize {
        self.features.len()
    }
}

impl<L> AsRef<[f64]> for Sample<L> {
    fn as_ref(&self) -> &[f64] {
        &self.features
    }
}

/// Returns the shared feature width of `vectors`, or `None` when empty.
pub fn common_dimension<'a, I>(vectors: I) -> Result<Option<usize>, KnnError>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut expected = None;

    for vector in vectors {
        match expected {
            None => expected = Some(vector.len()),
            Some(dimension) if dimension != vector.len() => {
                return Err(KnnError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(expected)
}

pub fn labels_of<L: Clone>(samples: &[Sample<L>]) -> Vec<L> {
    samples.iter().map(|s| s.label.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_dimension_of_uniform_vectors() {
        let vectors = [vec![1.0, 2.0], vec![3.0, 4.0]];
        let dimension = common_dimension(vectors.iter().map(Vec::as_slice)).unwrap();

        assert_eq!(dimension, Some(2));
    }

    #[test]
    fn common_dimension_of_nothing_is_none() {
        let vectors: [Vec<f64>; 0] = [];
        let dimension = common_dimension(vectors.iter().map(Vec::as_slice)).unwrap();

        assert_eq!(dimension, None);
    }

    #[test]
    fn common_dimension_rejects_ragged_vectors() {
        let vectors = [vec![1.0, 2.0], vec![3.0]];
        let result = common_dimension(vectors.iter().map(Vec::as_slice));

        assert_eq!(
            result,
            Err(KnnError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }
}
