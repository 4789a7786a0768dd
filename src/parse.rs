use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use crate::error::ParseError;
use crate::sample::Sample;

pub const DIMENSIONS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Diagnosis {
    Benign,
    Malignant,
}

impl FromStr for Diagnosis {
    type Err = String;

    fn from_str(diagnosis: &str) -> Result<Self, Self::Err> {
        match diagnosis.trim().to_ascii_lowercase().as_str() {
            "b" | "benign" => Ok(Diagnosis::Benign),
            "m" | "malignant" => Ok(Diagnosis::Malignant),
            val => Err(format!("unexpected diagnosis {val}")),
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnosis::Benign => write!(f, "Benign"),
            Diagnosis::Malignant => write!(f, "Malignant"),
        }
    }
}

/// Column layout of the input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Identifier column, dropped on load.
    pub id_column: Option<usize>,
    pub diagnosis_column: usize,
    /// Expected number of feature columns; `None` takes the width of the first row.
    pub dimensions: Option<usize>,
}

impl ParseOptions {
    fn check_layout(&self, fields: usize) -> Result<(), ParseError> {
        if self.id_column == Some(self.diagnosis_column) {
            return Err(ParseError::InvalidLayout(format!(
                "identifier and diagnosis share column {}",
                self.diagnosis_column
            )));
        }

        let last = self.id_column.map_or(self.diagnosis_column, |id| id.max(self.diagnosis_column));
        if last >= fields {
            return Err(ParseError::InvalidLayout(format!(
                "column {last} is out of range for {fields} fields"
            )));
        }

        Ok(())
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            id_column: Some(0),
            diagnosis_column: 1,
            dimensions: Some(DIMENSIONS),
        }
    }
}

pub fn parse<P: AsRef<Path>>(
    file_path: P,
    options: &ParseOptions,
) -> Result<Vec<Sample<Diagnosis>>, ParseError> {
    let file = File::open(file_path.as_ref()).map_err(|source| ParseError::Io {
        path: file_path.as_ref().display().to_string(),
        source,
    })?;

    parse_reader(BufReader::new(file), options)
}

pub fn parse_reader<R: Read>(
    reader: R,
    options: &ParseOptions,
) -> Result<Vec<Sample<Diagnosis>>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let skipped = usize::from(options.id_column.is_some()) + 1;
    let mut expected_fields = options.dimensions.map(|dimensions| dimensions + skipped);
    if let Some(fields) = expected_fields {
        options.check_layout(fields)?;
    }
    let mut samples = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record_number = index + 1;
        let record = result?;

        let expected = match expected_fields {
            Some(expected) => expected,
            None => {
                options.check_layout(record.len())?;
                *expected_fields.insert(record.len())
            }
        };
        if record.len() != expected {
            return Err(ParseError::RaggedRecord {
                record: record_number,
                expected,
                actual: record.len(),
            });
        }

        let diagnosis_str = record.get(options.diagnosis_column).unwrap_or_default();
        let diagnosis =
            diagnosis_str
                .parse::<Diagnosis>()
                .map_err(|_| ParseError::UnknownDiagnosis {
                    record: record_number,
                    value: diagnosis_str.to_string(),
                })?;

        let features = record
            .iter()
            .enumerate()
            .filter(|&(column, _)| {
                column != options.diagnosis_column && Some(column) != options.id_column
            })
            .map(|(column, value)| {
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|parsed| parsed.is_finite())
                    .ok_or_else(|| ParseError::InvalidValue {
                        record: record_number,
                        column,
                        value: value.to_string(),
                    })
            })
            .collect::<Result<Vec<f64>, ParseError>>()?;

        samples.push(Sample::new(features, diagnosis));
    }

    if samples.is_empty() {
        return Err(ParseError::Empty);
    }

    tracing::debug!(
        rows = samples.len(),
        features = samples[0].dimension(),
        "parsed biopsy table"
    );

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NARROW: ParseOptions = ParseOptions {
        id_column: Some(0),
        diagnosis_column: 1,
        dimensions: Some(2),
    };

    #[test]
    fn diagnosis_from_str() {
        assert_eq!("M".parse::<Diagnosis>(), Ok(Diagnosis::Malignant));
        assert_eq!("B".parse::<Diagnosis>(), Ok(Diagnosis::Benign));
        assert_eq!(" benign ".parse::<Diagnosis>(), Ok(Diagnosis::Benign));
        assert!("X".parse::<Diagnosis>().is_err());
    }

    #[test]
    fn benign_sorts_before_malignant() {
        assert!(Diagnosis::Benign < Diagnosis::Malignant);
    }

    #[test]
    fn parse_drops_identifier_and_recodes_diagnosis() {
        let data = "id,diagnosis,radius,texture\n\
                    842302,M,17.99,10.38\n\
                    8510426,B,13.54,14.36\n";

        let samples = parse_reader(data.as_bytes(), &NARROW).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, Diagnosis::Malignant);
        assert_eq!(samples[0].features, vec![17.99, 10.38]);
        assert_eq!(samples[1].label, Diagnosis::Benign);
        assert_eq!(samples[1].features, vec![13.54, 14.36]);
    }

    #[test]
    fn parse_without_identifier_column() {
        let options = ParseOptions {
            id_column: None,
            diagnosis_column: 2,
            dimensions: None,
        };
        let data = "radius,texture,diagnosis\n1.0,2.0,B\n";

        let samples = parse_reader(data.as_bytes(), &options).unwrap();

        assert_eq!(samples[0].features, vec![1.0, 2.0]);
        assert_eq!(samples[0].label, Diagnosis::Benign);
    }

    #[test]
    fn parse_rejects_unknown_diagnosis() {
        let data = "id,diagnosis,radius,texture\n1,B,1.0,2.0\n2,Q,1.0,2.0\n";

        let result = parse_reader(data.as_bytes(), &NARROW);

        assert!(matches!(
            result,
            Err(ParseError::UnknownDiagnosis { record: 2, ref value }) if value == "Q"
        ));
    }

    #[test]
    fn parse_rejects_missing_value() {
        let data = "id,diagnosis,radius,texture\n1,B,1.0,NA\n";

        let result = parse_reader(data.as_bytes(), &NARROW);

        assert!(matches!(
            result,
            Err(ParseError::InvalidValue {
                record: 1,
                column: 3,
                ..
            })
        ));
    }

    #[test]
    fn parse_rejects_ragged_record() {
        let data = "id,diagnosis,radius,texture\n1,B,1.0,2.0\n2,M,1.0\n";

        let result = parse_reader(data.as_bytes(), &NARROW);

        assert!(matches!(
            result,
            Err(ParseError::RaggedRecord {
                record: 2,
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn parse_rejects_empty_table() {
        let data = "id,diagnosis,radius,texture\n";

        assert!(matches!(
            parse_reader(data.as_bytes(), &NARROW),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn parse_rejects_shared_identifier_and_diagnosis_column() {
        let options = ParseOptions {
            id_column: Some(1),
            ..NARROW
        };
        let data = "id,diagnosis,radius,texture\n1,B,1.0,2.0\n";

        assert!(matches!(
            parse_reader(data.as_bytes(), &options),
            Err(ParseError::InvalidLayout(_))
        ));
    }

    #[test]
    fn parse_rejects_diagnosis_column_out_of_range() {
        let options = ParseOptions {
            id_column: None,
            diagnosis_column: 5,
            dimensions: None,
        };
        let data = "radius,texture,diagnosis\n1.0,2.0,B\n";

        assert!(matches!(
            parse_reader(data.as_bytes(), &options),
            Err(ParseError::InvalidLayout(_))
        ));
    }

    #[test]
    fn parse_reports_missing_file() {
        let result = parse("/nonexistent/biopsy.csv", &ParseOptions::default());

        assert!(matches!(result, Err(ParseError::Io { .. })));
    }
}
