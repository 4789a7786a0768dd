use serde::Serialize;
use std::fmt;

use crate::error::KnnError;

/// Cross-tabulation of actual (rows) against predicted (columns) labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix<L> {
    labels: Vec<L>,
    counts: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BinarySummary {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl BinarySummary {
    /// TP / (TP + FN)
    pub fn sensitivity(&self) -> Option<f64> {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// TN / (TN + FP)
    pub fn specificity(&self) -> Option<f64> {
        ratio(
            self.true_negatives,
            self.true_negatives + self.false_positives,
        )
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

impl<L: Ord + Clone> ConfusionMatrix<L> {
    pub fn from_predictions(actual: &[L], predicted: &[L]) -> Result<Self, KnnError> {
        if actual.len() != predicted.len() {
            return Err(KnnError::LengthMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }

        let mut labels: Vec<L> = actual.iter().chain(predicted).cloned().collect();
        labels.sort();
        labels.dedup();

        let mut counts = vec![vec![0; labels.len()]; labels.len()];
        for (a, p) in actual.iter().zip(predicted) {
            if let (Ok(row), Ok(col)) = (labels.binary_search(a), labels.binary_search(p)) {
                counts[row][col] += 1;
            }
        }

        Ok(Self { labels, counts })
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn count(&self, actual: &L, predicted: &L) -> usize {
        match (
            self.labels.binary_search(actual),
            self.labels.binary_search(predicted),
        ) {
            (Ok(row), Ok(col)) => self.counts[row][col],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.total_count()
    }

    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    /// Fraction of predictions matching the actual label; 0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total()).unwrap_or(0.0)
    }

    pub fn binary(&self, positive: &L) -> BinarySummary {
        let true_positives = self.count(positive, positive);
        let false_negatives = self.row_total(positive) - true_positives;
        let false_positives = self.column_total(positive) - true_positives;

        BinarySummary {
            true_positives,
            true_negatives: self.total() - true_positives - false_negatives - false_positives,
            false_positives,
            false_negatives,
        }
    }

    fn row_total(&self, actual: &L) -> usize {
        self.labels
            .binary_search(actual)
            .map_or(0, |row| self.counts[row].iter().sum())
    }

    fn column_total(&self, predicted: &L) -> usize {
        self.labels
            .binary_search(predicted)
            .map_or(0, |col| self.counts.iter().map(|row| row[col]).sum())
    }
}

impl<L: fmt::Display> fmt::Display for ConfusionMatrix<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const CORNER: &str = "actual \\ predicted";
        const TOTAL: &str = "Total";

        let names: Vec<String> = self.labels.iter().map(ToString::to_string).collect();
        let first_width = names
            .iter()
            .map(String::len)
            .chain([CORNER.len(), TOTAL.len()])
            .max()
            .unwrap_or_default();
        let width = names
            .iter()
            .map(String::len)
            .chain([TOTAL.len(), self.total_count().to_string().len()])
            .max()
            .unwrap_or_default();

        write!(f, "{CORNER:<first_width$}")?;
        for name in &names {
            write!(f, "  {name:>width$}")?;
        }
        writeln!(f, "  {TOTAL:>width$}")?;

        for (name, row) in names.iter().zip(&self.counts) {
            write!(f, "{name:<first_width$}")?;
            for count in row {
                write!(f, "  {count:>width$}")?;
            }
            writeln!(f, "  {:>width$}", row.iter().sum::<usize>())?;
        }

        write!(f, "{TOTAL:<first_width$}")?;
        for col in 0..names.len() {
            let column_total: usize = self.counts.iter().map(|row| row[col]).sum();
            write!(f, "  {column_total:>width$}")?;
        }
        writeln!(f, "  {:>width$}", self.total_count())
    }
}

impl<L> ConfusionMatrix<L> {
    fn total_count(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Diagnosis::{Benign, Malignant};

    #[test]
    fn counts_and_accuracy() {
        let actual = [Benign, Benign, Malignant, Malignant, Malignant];
        let predicted = [Benign, Malignant, Malignant, Benign, Malignant];

        let matrix = ConfusionMatrix::from_predictions(&actual, &predicted).unwrap();

        assert_eq!(matrix.labels(), &[Benign, Malignant]);
        assert_eq!(matrix.count(&Benign, &Benign), 1);
        assert_eq!(matrix.count(&Benign, &Malignant), 1);
        assert_eq!(matrix.count(&Malignant, &Benign), 1);
        assert_eq!(matrix.count(&Malignant, &Malignant), 2);
        assert_eq!(matrix.total(), 5);
        assert_eq!(matrix.correct(), 3);
        assert!((matrix.accuracy() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn binary_summary() {
        let actual = [Benign, Benign, Benign, Malignant, Malignant];
        let predicted = [Benign, Benign, Malignant, Benign, Malignant];

        let summary = ConfusionMatrix::from_predictions(&actual, &predicted)
            .unwrap()
            .binary(&Malignant);

        assert_eq!(
            summary,
            BinarySummary {
                true_positives: 1,
                true_negatives: 2,
                false_positives: 1,
                false_negatives: 1,
            }
        );
        assert_eq!(summary.sensitivity(), Some(0.5));
        assert!((summary.specificity().unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn multi_class_matrix() {
        let actual = ["a", "b", "c", "c"];
        let predicted = ["a", "c", "c", "b"];

        let matrix = ConfusionMatrix::from_predictions(&actual, &predicted).unwrap();

        assert_eq!(matrix.labels(), &["a", "b", "c"]);
        assert_eq!(matrix.count(&"b", &"c"), 1);
        assert_eq!(matrix.count(&"c", &"b"), 1);
        assert_eq!(matrix.count(&"a", &"b"), 0);
        assert_eq!(matrix.correct(), 2);
    }

    #[test]
    fn label_only_in_predictions_gets_a_column() {
        let matrix = ConfusionMatrix::from_predictions(&[Benign], &[Malignant]).unwrap();

        assert_eq!(matrix.labels(), &[Benign, Malignant]);
        assert_eq!(matrix.binary(&Malignant).false_positives, 1);
    }

    #[test]
    fn length_mismatch() {
        let result = ConfusionMatrix::from_predictions(&[Benign, Malignant], &[Benign]);

        assert_eq!(
            result,
            Err(KnnError::LengthMismatch {
                actual: 2,
                predicted: 1
            })
        );
    }

    #[test]
    fn empty_matrix_has_zero_accuracy() {
        let matrix = ConfusionMatrix::<u8>::from_predictions(&[], &[]).unwrap();

        assert_eq!(matrix.total(), 0);
        assert!(matrix.accuracy().abs() < f64::EPSILON);
        assert_eq!(matrix.binary(&1).sensitivity(), None);
    }

    #[test]
    fn renders_table_with_totals() {
        let actual = [Benign, Benign, Malignant];
        let predicted = [Benign, Benign, Benign];

        let table = ConfusionMatrix::from_predictions(&actual, &predicted)
            .unwrap()
            .to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("actual \\ predicted"));
        assert!(lines[0].contains("Malignant"));
        assert!(lines[1].starts_with("Benign"));
        assert!(lines[1].trim_end().ends_with('2'));
        assert!(lines[2].starts_with("Malignant"));
        assert!(lines[3].starts_with("Total"));
        assert!(lines[3].split_whitespace().eq(["Total", "3", "0", "3"]));
    }
}
