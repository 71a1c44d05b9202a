//! Writers for the per-step output of the reference runner.

mod exposure_writer;

pub use exposure_writer::{CsvExposureWriter, ExposureWriter};
