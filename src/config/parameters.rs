use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs;
use std::ops::RangeBounds;

use crate::errors::{EpiError, Result};

/// Raw disease parameters.
///
/// The contact scaling factors and per-strain rates are the inputs from which the transmission
/// tables are derived (see `TransmissionTable::derive`). Fields absent from a configuration
/// file take the defaults below.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DiseaseParameters {
    /// Contact scaling factor for schools.
    pub p_sc: f64,
    /// Contact scaling factor for high schools.
    pub p_hsc: f64,
    /// Contact scaling factor for middle schools.
    pub p_msc: f64,
    /// Contact scaling factor for elementary schools.
    pub p_esc: f64,
    /// Contact scaling factor for the community.
    pub p_co: f64,
    /// Contact scaling factor for neighborhoods.
    pub p_nh: f64,
    /// Contact scaling factor for workplaces.
    pub p_wo: f64,
    /// Neighborhood cluster coefficient.
    pub p_hc: f64,
    /// Neighborhood cluster coefficient for the youngest children.
    pub p_hcc0: f64,
    /// Neighborhood cluster coefficient for school aged children.
    pub p_hcc1: f64,
    /// Contact scaling factor for families.
    pub p_fa: f64,
    /// Contact scaling factor for bars and other large gatherings. Negative values turn the
    /// context off.
    pub p_bar: f64,

    /// Number of strains.
    pub nstrain: usize,
    /// Probability of transmission given contact, per strain.
    pub p_trans: Vec<f64>,
    /// Fraction of cases that are asymptomatic, per strain.
    pub p_asymp: Vec<f64>,
    /// Relative infectiousness of asymptomatic agents, per strain.
    pub reduced_inf: Vec<f64>,

    /// Overall multiplier of infectiousness.
    pub infect: f64,
    /// Residual susceptibility to a strain an agent has already cleared.
    pub reinfect_prob: f64,
    /// Vaccine efficacy.
    pub vac_eff: f64,

    /// Fraction of children that comply with staying home while schools are closed.
    pub child_compliance: f64,
    /// Multiplier of household contact time for children while schools are closed.
    pub child_hh_closure: f64,

    /// Mean time (days) until infectious.
    pub incubation_length_mean: f64,
    /// Mean time (days) agents are infectious.
    pub infectious_length_mean: f64,
    /// Mean time (days) until symptoms show.
    pub symptomdev_length_mean: f64,
    pub incubation_length_std: f64,
    pub infectious_length_std: f64,
    pub symptomdev_length_std: f64,
}

impl Default for DiseaseParameters {
    fn default() -> Self {
        Self {
            p_sc: 0.2,
            p_hsc: 0.3,
            p_msc: 0.3,
            p_esc: 0.3,
            p_co: 1.45,
            p_nh: 1.45,
            p_wo: 0.5,
            p_hc: 0.5,
            p_hcc0: 0.5,
            p_hcc1: 0.5,
            p_fa: 1.0,
            p_bar: -1.0,
            nstrain: 2,
            p_trans: vec![0.2, 0.3],
            p_asymp: vec![0.4, 0.4],
            reduced_inf: vec![0.75, 0.75],
            infect: 1.0,
            reinfect_prob: 0.0,
            vac_eff: 1.0,
            child_compliance: 0.5,
            child_hh_closure: 2.0,
            incubation_length_mean: 3.0,
            infectious_length_mean: 6.0,
            symptomdev_length_mean: 5.0,
            incubation_length_std: 1.0,
            infectious_length_std: 1.0,
            symptomdev_length_std: 1.0,
        }
    }
}

impl DiseaseParameters {
    /// The twelve contact scaling factors with their names.
    pub fn scaling_factors(&self) -> [(&'static str, f64); 12] {
        [
            ("p_sc", self.p_sc),
            ("p_hsc", self.p_hsc),
            ("p_msc", self.p_msc),
            ("p_esc", self.p_esc),
            ("p_co", self.p_co),
            ("p_nh", self.p_nh),
            ("p_wo", self.p_wo),
            ("p_hc", self.p_hc),
            ("p_hcc0", self.p_hcc0),
            ("p_hcc1", self.p_hcc1),
            ("p_fa", self.p_fa),
            ("p_bar", self.p_bar),
        ]
    }

    /// Check all raw parameters.
    ///
    /// Scaling factors only need to be finite: a negative factor disables what it scales.
    pub fn validate(&self) -> Result<()> {
        for (name, factor) in self.scaling_factors() {
            if !factor.is_finite() {
                return Err(EpiError::ConfigurationError(format!(
                    "scaling factor {name} must be finite, but is {factor}"
                )));
            }
        }

        check_num("nstrain", self.nstrain, 1..)?;
        check_rates("p_trans", &self.p_trans, self.nstrain)?;
        check_rates("p_asymp", &self.p_asymp, self.nstrain)?;
        check_rates("reduced_inf", &self.reduced_inf, self.nstrain)?;

        check_num("infect", self.infect, 0.0..f64::INFINITY)?;
        check_num("reinfect_prob", self.reinfect_prob, 0.0..=1.0)?;
        check_num("vac_eff", self.vac_eff, 0.0..=1.0)?;
        check_num("child_compliance", self.child_compliance, 0.0..=1.0)?;
        check_positive("child_hh_closure", self.child_hh_closure)?;

        check_positive("incubation_length_mean", self.incubation_length_mean)?;
        check_positive("infectious_length_mean", self.infectious_length_mean)?;
        check_positive("symptomdev_length_mean", self.symptomdev_length_mean)?;
        check_num("incubation_length_std", self.incubation_length_std, 0.0..f64::INFINITY)?;
        check_num("infectious_length_std", self.infectious_length_std, 0.0..f64::INFINITY)?;
        check_num("symptomdev_length_std", self.symptomdev_length_std, 0.0..f64::INFINITY)?;

        Ok(())
    }

    /// Distribution of the time until an exposed agent becomes infectious.
    pub fn incubation_distribution(&self) -> Result<Normal<f64>> {
        duration_distribution(self.incubation_length_mean, self.incubation_length_std)
    }

    /// Distribution of the time an agent stays infectious.
    pub fn infectious_distribution(&self) -> Result<Normal<f64>> {
        duration_distribution(self.infectious_length_mean, self.infectious_length_std)
    }

    /// Distribution of the time until symptoms show.
    pub fn symptom_onset_distribution(&self) -> Result<Normal<f64>> {
        duration_distribution(self.symptomdev_length_mean, self.symptomdev_length_std)
    }

    pub fn write(&self, writer: &mut dyn std::io::Write) -> Result<()> {
        serde_yaml::to_writer(writer, self).map_err(|e| EpiError::WriteError(format!("{e}")))
    }

    pub fn read(reader: &mut dyn std::io::Read) -> Result<DiseaseParameters> {
        serde_yaml::from_reader(reader).map_err(|e| EpiError::ReadError(format!("{e}")))
    }

    pub fn read_from_file(filename: &str) -> Result<DiseaseParameters> {
        let file = fs::File::open(filename)
            .map_err(|e| EpiError::ReadError(format!("failed to open {filename}: {e}")))?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }
}

impl std::fmt::Display for DiseaseParameters {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{}", String::from_utf8_lossy(&output))
    }
}

fn duration_distribution(mean: f64, std: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std).map_err(|e| {
        EpiError::ConfigurationError(format!("invalid duration distribution ({mean}, {std}): {e}"))
    })
}

pub(crate) fn check_num<T, R>(name: &str, num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(EpiError::ConfigurationError(format!(
            "{name} must be in the range {range:?}, but is {num:?}"
        )));
    }
    Ok(())
}

pub(crate) fn check_positive(name: &str, num: f64) -> Result<()> {
    if !(num.is_finite() && num > 0.) {
        return Err(EpiError::ConfigurationError(format!(
            "{name} must be finite and positive, but is {num}"
        )));
    }
    Ok(())
}

fn check_rates(name: &str, rates: &[f64], nstrain: usize) -> Result<()> {
    if rates.len() != nstrain {
        return Err(EpiError::ConfigurationError(format!(
            "{name} must have one entry per strain ({nstrain}), but has {}",
            rates.len()
        )));
    }
    for (strain, &rate) in rates.iter().enumerate() {
        check_num(&format!("{name}[{strain}]"), rate, 0.0..=1.0)?;
    }
    Ok(())
}
