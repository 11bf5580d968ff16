pub mod dataset;
pub mod partition;
pub mod sample;
pub mod stats;

pub use dataset::{Dataset, DatasetError, DatasetSchema, DatasetSummary, load_samples, shuffle};
pub use partition::{Partition, Quotas, partition, partition_by};
pub use sample::{BinaryLabels, Sample, class_counts};
pub use stats::{Accuracy, EvaluationStats};
