use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnnError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Column has zero range (min-max) or zero standard deviation (z-score).
    #[error("degenerate feature at column {column}: {reason}")]
    DegenerateFeature { column: usize, reason: &'static str },

    #[error("length mismatch: {actual} actual labels, {predicted} predictions")]
    LengthMismatch { actual: usize, predicted: usize },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("record {record}: unexpected diagnosis {value:?}")]
    UnknownDiagnosis { record: usize, value: String },

    #[error("record {record}: column {column} is not a number ({value:?})")]
    InvalidValue {
        record: usize,
        column: usize,
        value: String,
    },

    #[error("record {record}: expected {expected} fields, got {actual}")]
    RaggedRecord {
        record: usize,
        expected: usize,
        actual: usize,
    },

    #[error("no records in input")]
    Empty,

    #[error("invalid column layout: {0}")]
    InvalidLayout(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Knn(#[from] KnnError),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to draw plot: {0}")]
    Plot(String),
}
