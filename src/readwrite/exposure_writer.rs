use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::Domain;
use crate::errors::{EpiError, Result};
use crate::stats::{ExposureStatistics, ExposureSummary};

pub trait ExposureWriter {
    /// Write the exposure of every agent of `domain` after `step`.
    fn write(&self, step: usize, domain: &Domain) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SummaryRecord {
    step: usize,
    susceptible: usize,
    exposed: usize,
    infectious: usize,
    recovered: usize,
    at_risk: usize,
    expected_infections: f64,
    max_infection_probability: f64,
}

impl SummaryRecord {
    fn new(step: usize, summary: &ExposureSummary) -> Self {
        Self {
            step,
            susceptible: summary.susceptible,
            exposed: summary.exposed,
            infectious: summary.infectious,
            recovered: summary.recovered,
            at_risk: summary.at_risk,
            expected_infections: summary.expected_infections,
            max_infection_probability: summary.max_infection_probability,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExposureRecord {
    tile: usize,
    agent: usize,
    age_group: String,
    household: u32,
    infection_probability: f64,
}

fn write_error<E: std::fmt::Display>(path: &Path) -> impl Fn(E) -> EpiError + '_ {
    move |e| EpiError::WriteError(format!("{}: {e}", path.display()))
}

/// Writes one summary row per step to `summary.csv` and, per step, the infection probability
/// of every susceptible agent at risk to `exposures_<step>.csv`.
pub struct CsvExposureWriter {
    path: PathBuf,
}

impl CsvExposureWriter {
    /// Create the output directory and a fresh summary file.
    pub fn new(path: &str) -> Result<Self> {
        let writer = Self {
            path: PathBuf::from(path),
        };
        fs::create_dir_all(&writer.path)?;
        let summary_path = writer.summary_path();
        // truncate any earlier run
        csv::Writer::from_path(&summary_path).map_err(write_error(&summary_path))?;
        Ok(writer)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.path.join("summary.csv")
    }

    pub fn exposures_path(&self, step: usize) -> PathBuf {
        self.path.join(format!("exposures_{step}.csv"))
    }

    fn append_summary(&self, record: &SummaryRecord) -> Result<()> {
        let path = self.summary_path();
        let has_header = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(!has_header)
            .from_writer(file);
        writer.serialize(record).map_err(write_error(&path))?;
        writer.flush()?;
        Ok(())
    }
}

impl ExposureWriter for CsvExposureWriter {
    fn write(&self, step: usize, domain: &Domain) -> Result<()> {
        log::debug!("Writing exposures of step {step} to {}", self.path.display());
        self.append_summary(&SummaryRecord::new(step, &domain.exposure_summary()))?;

        let path = self.exposures_path(step);
        let mut writer = csv::Writer::from_path(&path).map_err(write_error(&path))?;
        for tile in domain.tiles() {
            for (idx, probability) in tile.exposure_probabilities() {
                if probability <= 0. {
                    continue;
                }
                let agent = &tile.agents()[idx];
                writer
                    .serialize(ExposureRecord {
                        tile: tile.id(),
                        agent: idx,
                        age_group: agent.age_group.to_string(),
                        household: agent.household,
                        infection_probability: probability,
                    })
                    .map_err(write_error(&path))?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
