//! Settings module.

use serde::{Deserialize, Serialize};
use std::fs;

use super::contexts::ContextSettings;
use super::parameters::DiseaseParameters;
use super::population::PopulationSettings;
use super::schedule::Schedule;
use crate::errors::{EpiError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub disease: DiseaseParameters,
    pub contexts: ContextSettings,
    pub population: PopulationSettings,
    pub schedule: Schedule,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{}", String::from_utf8_lossy(&output))
    }
}

impl Settings {
    /// Check every section.
    ///
    /// The disease parameters are only range checked here; the derived tables are checked when
    /// the disease model is initialized.
    pub fn validate(&self) -> Result<()> {
        self.disease.validate()?;
        self.contexts.validate()?;
        self.population.validate()?;
        self.schedule.validate()?;
        if self.population.initial_infections.len() != self.disease.nstrain {
            return Err(EpiError::ConfigurationError(format!(
                "initial_infections must have one entry per strain ({}), but has {}",
                self.disease.nstrain,
                self.population.initial_infections.len()
            )));
        }
        Ok(())
    }

    pub fn write(&self, writer: &mut dyn std::io::Write) -> Result<()> {
        serde_yaml::to_writer(writer, self).map_err(|e| EpiError::WriteError(format!("{e}")))
    }

    pub fn read(reader: &mut dyn std::io::Read) -> Result<Settings> {
        serde_yaml::from_reader(reader).map_err(|e| EpiError::ReadError(format!("{e}")))
    }

    pub fn write_to_file(&self, filename: &str) -> Result<()> {
        let file = fs::File::create(filename)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    pub fn read_from_file(filename: &str) -> Result<Settings> {
        let file = fs::File::open(filename)
            .map_err(|e| EpiError::ReadError(format!("failed to open {filename}: {e}")))?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }
}
