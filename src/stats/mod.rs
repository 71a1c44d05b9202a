//! Statistics and summary trait implementations

pub mod exposure;

pub use exposure::{ExposureStatistics, ExposureSummary};
