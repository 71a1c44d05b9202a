use serde::{Deserialize, Serialize};

use super::parameters::{check_num, check_positive};
use crate::core::age::N_AGE_GROUPS;
use crate::errors::{EpiError, Result};

/// Settings of the synthetic population the reference runner simulates.
///
/// Households sit on a lattice with one household per unit cell. The lattice is cut into
/// `tiles[0] x tiles[1]` equally sized tiles.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PopulationSettings {
    /// Household lattice size along each axis.
    pub households: [usize; 2],
    /// Number of tiles along each axis. Must divide `households`.
    pub tiles: [usize; 2],
    /// Relative frequency of households with 1, 2, ... members.
    pub household_size_weights: Vec<f64>,
    /// Relative frequency of each age group.
    pub age_weights: [f64; N_AGE_GROUPS],
    /// Side length (in households) of the square blocks that form a neighborhood.
    pub neighborhood_size: usize,
    pub workgroup_size: usize,
    /// Fraction of working age adults that have a job.
    pub employment_rate: f64,
    /// Fraction of employed adults that work at a school.
    pub school_staff_fraction: f64,
    /// Fraction of the youngest children that attend day care.
    pub daycare_fraction: f64,
    pub vaccinated_fraction: f64,
    /// Number of initially infectious agents per strain.
    pub initial_infections: Vec<usize>,
    pub seed: u64,
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self {
            households: [16, 16],
            tiles: [2, 2],
            household_size_weights: vec![0.28, 0.34, 0.16, 0.14, 0.08],
            age_weights: [0.06, 0.17, 0.16, 0.45, 0.16],
            neighborhood_size: 2,
            workgroup_size: 10,
            employment_rate: 0.7,
            school_staff_fraction: 0.05,
            daycare_fraction: 0.5,
            vaccinated_fraction: 0.,
            initial_infections: vec![5, 0],
            seed: 42,
        }
    }
}

impl PopulationSettings {
    /// Households per tile along each axis.
    pub fn tile_shape(&self) -> [usize; 2] {
        [
            self.households[0] / self.tiles[0].max(1),
            self.households[1] / self.tiles[1].max(1),
        ]
    }

    pub fn n_tiles(&self) -> usize {
        self.tiles[0] * self.tiles[1]
    }

    pub fn validate(&self) -> Result<()> {
        for d in 0..2 {
            check_num(&format!("tiles[{d}]"), self.tiles[d], 1..)?;
            check_num(&format!("households[{d}]"), self.households[d], self.tiles[d]..)?;
            if self.households[d] % self.tiles[d] != 0 {
                return Err(EpiError::ConfigurationError(format!(
                    "households[{d}]={} must be a multiple of tiles[{d}]={}",
                    self.households[d], self.tiles[d]
                )));
            }
        }

        check_weights("household_size_weights", &self.household_size_weights)?;
        check_weights("age_weights", &self.age_weights)?;
        check_weights("age_weights of adults", &self.age_weights[2..])?;

        check_num("neighborhood_size", self.neighborhood_size, 1..)?;
        check_num("workgroup_size", self.workgroup_size, 1..)?;
        check_num("employment_rate", self.employment_rate, 0.0..=1.0)?;
        check_num("school_staff_fraction", self.school_staff_fraction, 0.0..=1.0)?;
        check_num("daycare_fraction", self.daycare_fraction, 0.0..=1.0)?;
        check_num("vaccinated_fraction", self.vaccinated_fraction, 0.0..=1.0)?;
        Ok(())
    }
}

fn check_weights(name: &str, weights: &[f64]) -> Result<()> {
    for (idx, &weight) in weights.iter().enumerate() {
        check_num(&format!("{name}[{idx}]"), weight, 0.0..f64::INFINITY)?;
    }
    check_positive(&format!("sum of {name}"), weights.iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = PopulationSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.tile_shape(), [8, 8]);
        assert_eq!(settings.n_tiles(), 4);
    }

    #[test]
    fn tiles_must_divide_lattice() {
        let settings = PopulationSettings {
            households: [10, 16],
            tiles: [3, 2],
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(EpiError::ConfigurationError(_))
        ));

        let settings = PopulationSettings {
            tiles: [0, 2],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn weights_are_checked() {
        let settings = PopulationSettings {
            household_size_weights: vec![0., 0.],
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = PopulationSettings {
            age_weights: [0.5, 0.5, 0., 0., 0.],
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = PopulationSettings {
            employment_rate: 1.5,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
