//! Initialized disease model.

use super::agent::{Agent, Strain};
use super::transmission::TransmissionTable;
use crate::config::DiseaseParameters;
use crate::errors::{EpiError, Result};

/// Validated disease parameters together with the tables derived from them.
///
/// Created once before the first interaction pass and shared read-only afterwards. There is
/// no way to change a parameter without deriving the whole model again.
#[derive(Clone, Debug, PartialEq)]
pub struct Disease {
    parameters: DiseaseParameters,
    table: TransmissionTable,
}

impl Disease {
    pub fn initialize(parameters: DiseaseParameters) -> Result<Self> {
        let table = TransmissionTable::derive(&parameters)?;
        log::info!(
            "Initialized disease model with {} strains",
            parameters.nstrain
        );
        log::debug!("Transmission probabilities\n{table}");
        Ok(Self { parameters, table })
    }

    #[inline]
    pub fn parameters(&self) -> &DiseaseParameters {
        &self.parameters
    }

    #[inline]
    pub fn table(&self) -> &TransmissionTable {
        &self.table
    }

    pub fn check_strain(&self, strain: Strain) -> Result<()> {
        if strain >= self.parameters.nstrain {
            return Err(EpiError::InvariantViolation(format!(
                "strain {strain} is not below nstrain={}",
                self.parameters.nstrain
            )));
        }
        Ok(())
    }

    /// Infectiousness multiplier of an agent transmitting `strain`.
    #[inline]
    pub fn infectiousness(&self, infector: &Agent, strain: Strain) -> f64 {
        let mut factor = self.parameters.infect;
        if !infector.symptomatic {
            factor *= self.parameters.reduced_inf[strain];
        }
        factor
    }

    /// Residual susceptibility of an agent to `strain`.
    #[inline]
    pub fn susceptibility(&self, susceptible: &Agent, strain: Strain) -> f64 {
        let mut factor = 1.;
        if susceptible.vaccinated {
            factor *= 1. - self.parameters.vac_eff;
        }
        if susceptible.prior_strain == Some(strain) {
            factor *= self.parameters.reinfect_prob;
        }
        factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::age::AgeGroup;

    #[test]
    fn invalid_parameters_fail_initialization() {
        let parameters = DiseaseParameters {
            p_trans: vec![0.2, f64::NAN],
            ..Default::default()
        };
        assert!(Disease::initialize(parameters).is_err());
    }

    #[test]
    fn infectiousness() {
        let disease = Disease::initialize(DiseaseParameters {
            infect: 0.5,
            ..Default::default()
        })
        .unwrap();
        let mut agent = Agent::new([0., 0.], AgeGroup::Adult, 0);
        agent.infect(1, true);
        assert_eq!(disease.infectiousness(&agent, 1), 0.5);
        agent.symptomatic = false;
        assert_eq!(disease.infectiousness(&agent, 1), 0.375);
    }

    #[test]
    fn susceptibility() {
        let disease = Disease::initialize(DiseaseParameters {
            vac_eff: 0.8,
            reinfect_prob: 0.1,
            ..Default::default()
        })
        .unwrap();
        let mut agent = Agent::new([0., 0.], AgeGroup::Adult, 0);
        assert_eq!(disease.susceptibility(&agent, 0), 1.);

        agent.vaccinated = true;
        assert!((disease.susceptibility(&agent, 0) - 0.2).abs() < 1e-12);

        agent.vaccinated = false;
        agent.prior_strain = Some(1);
        assert_eq!(disease.susceptibility(&agent, 0), 1.);
        assert_eq!(disease.susceptibility(&agent, 1), 0.1);
    }

    #[test]
    fn strain_range() {
        let disease = Disease::initialize(DiseaseParameters::default()).unwrap();
        disease.check_strain(1).unwrap();
        assert!(matches!(
            disease.check_strain(2),
            Err(EpiError::InvariantViolation(_))
        ));
    }
}
