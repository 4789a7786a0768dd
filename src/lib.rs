pub mod error;
pub mod knn;
pub mod parse;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod sample;
pub mod scaling;
pub mod split;

pub use error::{KnnError, ParseError, PipelineError};
pub use knn::{classify, neighbors, KnnClassifier, Neighbor};
pub use parse::Diagnosis;
pub use report::{BinarySummary, ConfusionMatrix};
pub use sample::Sample;
pub use scaling::{
    apply_minmax, apply_zscore, fit_minmax, fit_zscore, FitOn, ScalingMethod, ScalingParameters,
};
pub use split::{split, Split, SplitStrategy, TestSize};
