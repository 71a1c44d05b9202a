//! Derived transmission-probability tables.
//!
//! Each table is the product of a contact scaling factor and a fixed per-age-group base rate.
//! School-closed variants are derived in the same pass as the open-school values, so the two
//! can never disagree about the inputs they came from.

use std::fmt;

use super::age::{AgeGroup, AgeRates, N_AGE_GROUPS, Role};
use super::agent::{N_SCHOOL_KINDS, SchoolKind, Strain};
use super::context::{Context, N_CONTEXTS};
use crate::config::DiseaseParameters;
use crate::errors::{EpiError, Result};

const COMMUNITY_BASE: AgeRates = [0.0000125, 0.0000375, 0.00010, 0.00010, 0.00015];
const NEIGHBORHOOD_BASE: AgeRates = [0.00005, 0.00015, 0.00040, 0.00040, 0.00060];
const BAR_BASE: AgeRates = [0.00005, 0.00015, 0.00040, 0.00040, 0.00060];
const CLUSTER_ADULT_BASE: AgeRates = [0.08, 0.08, 0.1, 0.1, 0.1];
const CLUSTER_CHILD_BASE: AgeRates = [0.15, 0.15, 0.08, 0.08, 0.08];
const FAMILY_ADULT_BASE: AgeRates = [0.3, 0.3, 0.4, 0.4, 0.4];
const FAMILY_CHILD_BASE: AgeRates = [0.6, 0.6, 0.3, 0.3, 0.3];
const SCHOOL_ADULT_TO_CHILD_BASE: AgeRates = [0.3, 0.3, 0., 0., 0.];
const SCHOOL_CHILD_TO_ADULT_BASE: AgeRates = [0., 0., 0.2, 0.2, 0.2];

const WORK_BASE: f64 = 0.115;
const HIGH_SCHOOL_BASE: f64 = 0.105;
const MIDDLE_SCHOOL_BASE: f64 = 0.125;
const ELEMENTARY_SCHOOL_BASE: f64 = 0.145;
const DAY_CARE_RATE: f64 = 0.15;
const PLAY_GROUP_RATE: f64 = 0.35;

/// The attributes of a single contact that select a table entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Role of the infectious agent.
    pub infector: Role,
    /// Strain the infectious agent carries.
    pub strain: Strain,
    /// Age group of the susceptible agent.
    pub age_group: AgeGroup,
    /// School kind of the susceptible agent.
    pub school_kind: SchoolKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransmissionTable {
    comm: AgeRates,
    comm_sc: AgeRates,
    hood: AgeRates,
    hood_sc: AgeRates,
    nc_adult: AgeRates,
    nc_child: AgeRates,
    nc_adult_sc: AgeRates,
    nc_child_sc: AgeRates,
    work: f64,
    school: [f64; N_SCHOOL_KINDS],
    sch_a2c: AgeRates,
    sch_c2a: AgeRates,
    adult: AgeRates,
    child: AgeRates,
    adult_sc: AgeRates,
    child_sc: AgeRates,
    bar: AgeRates,
    generic: Vec<f64>,
    enabled: [bool; N_CONTEXTS],
}

#[inline]
fn scale(base: f64, factor: f64) -> f64 {
    if factor < 0. { 0. } else { base * factor }
}

#[inline]
fn scale_rates(base: &AgeRates, factor: f64) -> AgeRates {
    base.map(|rate| scale(rate, factor))
}

/// Apply `transform` to the child age bands only.
fn map_children<F: Fn(f64) -> f64>(rates: &AgeRates, transform: F) -> AgeRates {
    let mut mapped = *rates;
    for group in AgeGroup::ALL.iter().filter(|group| group.is_child()) {
        mapped[group.index()] = transform(rates[group.index()]);
    }
    mapped
}

impl TransmissionTable {
    /// Derive every table from the raw parameters.
    ///
    /// Fails if the parameters are invalid or any derived probability falls outside `[0, 1]`.
    pub fn derive(parameters: &DiseaseParameters) -> Result<Self> {
        parameters.validate()?;

        let child = scale_rates(&FAMILY_CHILD_BASE, parameters.p_fa);
        let adult = scale_rates(&FAMILY_ADULT_BASE, parameters.p_fa);
        let nc_adult = scale_rates(&CLUSTER_ADULT_BASE, parameters.p_hc);
        let mut nc_child = scale_rates(&CLUSTER_CHILD_BASE, parameters.p_hc);
        nc_child[AgeGroup::UnderFive.index()] =
            scale(CLUSTER_CHILD_BASE[AgeGroup::UnderFive.index()], parameters.p_hcc0);
        nc_child[AgeGroup::SchoolAge.index()] =
            scale(CLUSTER_CHILD_BASE[AgeGroup::SchoolAge.index()], parameters.p_hcc1);
        let comm = scale_rates(&COMMUNITY_BASE, parameters.p_co);
        let hood = scale_rates(&NEIGHBORHOOD_BASE, parameters.p_nh);

        // Children kept home from school spend `child_hh_closure` times as long with their
        // household, treated as that many independent exposures.
        let closure = |p: f64| 1. - (1. - p).powf(parameters.child_hh_closure);
        let outside = 1. + (1. - parameters.child_compliance);

        let mut enabled = [true; N_CONTEXTS];
        for (context, factor) in [
            (Context::Home, parameters.p_fa),
            (Context::Work, parameters.p_wo),
            (Context::School, parameters.p_sc),
            (Context::Neighborhood, parameters.p_nh),
            (Context::NeighborhoodCluster, parameters.p_hc),
            (Context::Community, parameters.p_co),
            (Context::Transit, parameters.p_co),
            (Context::Bar, parameters.p_bar),
        ] {
            enabled[context.index()] = factor >= 0.;
        }

        let table = Self {
            comm,
            comm_sc: map_children(&comm, |p| p * outside),
            hood,
            hood_sc: map_children(&hood, |p| p * outside),
            nc_adult,
            nc_child,
            nc_adult_sc: map_children(&nc_adult, closure),
            nc_child_sc: nc_child.map(closure),
            work: scale(WORK_BASE, parameters.p_wo),
            school: [
                0.,
                scale(HIGH_SCHOOL_BASE, parameters.p_hsc),
                scale(MIDDLE_SCHOOL_BASE, parameters.p_msc),
                scale(ELEMENTARY_SCHOOL_BASE, parameters.p_esc),
                scale(ELEMENTARY_SCHOOL_BASE, parameters.p_esc),
                DAY_CARE_RATE,
                PLAY_GROUP_RATE,
            ],
            sch_a2c: scale_rates(&SCHOOL_ADULT_TO_CHILD_BASE, parameters.p_sc),
            sch_c2a: scale_rates(&SCHOOL_CHILD_TO_ADULT_BASE, parameters.p_sc),
            adult,
            child,
            adult_sc: map_children(&adult, closure),
            child_sc: child.map(closure),
            bar: scale_rates(&BAR_BASE, parameters.p_bar),
            generic: parameters.p_trans.clone(),
            enabled,
        };

        table.check()?;
        Ok(table)
    }

    fn check(&self) -> Result<()> {
        let mut entries: Vec<(&str, f64)> = self
            .age_tables()
            .into_iter()
            .flat_map(|(name, rates)| rates.into_iter().map(move |rate| (name, rate)))
            .collect();
        entries.extend(self.school.iter().map(|&rate| ("xmit_school", rate)));
        entries.extend(self.generic.iter().map(|&rate| ("xmit_generic", rate)));

        for (name, probability) in entries {
            if !(0. ..=1.).contains(&probability) {
                return Err(EpiError::ConfigurationError(format!(
                    "derived probability in {name} must lie in [0, 1], but is {probability}"
                )));
            }
        }
        Ok(())
    }

    fn age_tables(&self) -> [(&'static str, AgeRates); 16] {
        [
            ("xmit_comm", self.comm),
            ("xmit_comm_SC", self.comm_sc),
            ("xmit_hood", self.hood),
            ("xmit_hood_SC", self.hood_sc),
            ("xmit_nc_adult", self.nc_adult),
            ("xmit_nc_child", self.nc_child),
            ("xmit_nc_adult_SC", self.nc_adult_sc),
            ("xmit_nc_child_SC", self.nc_child_sc),
            ("xmit_sch_a2c", self.sch_a2c),
            ("xmit_sch_c2a", self.sch_c2a),
            ("xmit_adult", self.adult),
            ("xmit_child", self.child),
            ("xmit_adult_SC", self.adult_sc),
            ("xmit_child_SC", self.child_sc),
            ("xmit_bar", self.bar),
            ("xmit_work", [self.work; N_AGE_GROUPS]),
        ]
    }

    #[inline]
    pub fn is_enabled(&self, context: Context) -> bool {
        self.enabled[context.index()]
    }

    #[inline]
    pub fn n_strains(&self) -> usize {
        self.generic.len()
    }

    /// Probability that one contact transmits.
    ///
    /// Disabled contexts, schools while closed, and generic contacts with an unknown strain
    /// yield zero.
    pub fn probability(&self, context: Context, contact: &Contact, school_open: bool) -> f64 {
        if !self.is_enabled(context) {
            return 0.;
        }
        let age = contact.age_group.index();
        match context {
            Context::Generic => self.generic.get(contact.strain).copied().unwrap_or(0.),
            Context::Home => match (contact.infector, school_open) {
                (Role::Child, true) => self.child[age],
                (Role::Child, false) => self.child_sc[age],
                (Role::Adult, true) => self.adult[age],
                (Role::Adult, false) => self.adult_sc[age],
            },
            Context::NeighborhoodCluster => match (contact.infector, school_open) {
                (Role::Child, true) => self.nc_child[age],
                (Role::Child, false) => self.nc_child_sc[age],
                (Role::Adult, true) => self.nc_adult[age],
                (Role::Adult, false) => self.nc_adult_sc[age],
            },
            Context::Neighborhood if school_open => self.hood[age],
            Context::Neighborhood => self.hood_sc[age],
            Context::Community if school_open => self.comm[age],
            Context::Community => self.comm_sc[age],
            Context::Transit => self.comm[age],
            Context::Work => self.work,
            Context::School if !school_open => 0.,
            Context::School => match (contact.infector, contact.age_group.role()) {
                (Role::Child, Role::Child) => self.school[contact.school_kind.index()],
                (Role::Adult, Role::Child) => self.sch_a2c[age],
                (Role::Child, Role::Adult) => self.sch_c2a[age],
                (Role::Adult, Role::Adult) => self.work,
            },
            Context::Bar => self.bar[age],
        }
    }
}

impl fmt::Display for TransmissionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<18}", "table")?;
        for group in AgeGroup::ALL {
            write!(f, "{:>12}", group.to_string())?;
        }
        writeln!(f)?;
        for (name, rates) in self.age_tables() {
            write!(f, "{name:<18}")?;
            for rate in rates {
                write!(f, "{rate:>12.7}")?;
            }
            writeln!(f)?;
        }
        write!(f, "{:<18}", "xmit_school")?;
        for (kind, rate) in SchoolKind::ALL.iter().zip(self.school) {
            write!(f, " {kind}={rate:.4}")?;
        }
        writeln!(f)?;
        write!(f, "{:<18}", "xmit_generic")?;
        for (strain, rate) in self.generic.iter().enumerate() {
            write!(f, " {strain}={rate:.4}")?;
        }
        writeln!(f)?;
        let disabled: Vec<&str> = Context::ALL
            .iter()
            .filter(|context| !self.is_enabled(**context))
            .map(|context| context.name())
            .collect();
        write!(f, "disabled contexts: {disabled:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn contact(infector: Role, age_group: AgeGroup) -> Contact {
        Contact {
            infector,
            strain: 0,
            age_group,
            school_kind: SchoolKind::None,
        }
    }

    #[test]
    fn default_tables() {
        let table = TransmissionTable::derive(&DiseaseParameters::default()).unwrap();

        assert!((table.adult[AgeGroup::YoungAdult.index()] - 0.4).abs() < EPS);
        assert!((table.child[AgeGroup::UnderFive.index()] - 0.6).abs() < EPS);
        assert!((table.comm[AgeGroup::Senior.index()] - 0.00015 * 1.45).abs() < EPS);
        assert!((table.hood[AgeGroup::SchoolAge.index()] - 0.00015 * 1.45).abs() < EPS);
        assert!((table.nc_child[AgeGroup::UnderFive.index()] - 0.075).abs() < EPS);
        assert!((table.nc_child[AgeGroup::Adult.index()] - 0.04).abs() < EPS);
        assert!((table.work - 0.0575).abs() < EPS);
        assert!((table.school[SchoolKind::High.index()] - 0.0315).abs() < EPS);
        assert!((table.school[SchoolKind::ElementaryLower.index()] - 0.0435).abs() < EPS);
        assert_eq!(table.school[SchoolKind::None.index()], 0.);
        assert_eq!(table.school[SchoolKind::PlayGroup.index()], 0.35);
        assert_eq!(table.generic, vec![0.2, 0.3]);
        assert_eq!(table.bar, [0.; N_AGE_GROUPS]);
        assert!(!table.is_enabled(Context::Bar));
        assert!(table.is_enabled(Context::Home));
    }

    #[test]
    fn school_closed_variants() {
        let table = TransmissionTable::derive(&DiseaseParameters::default()).unwrap();

        // children at home: two exposures instead of one
        assert!((table.child_sc[AgeGroup::Adult.index()] - (1. - 0.7 * 0.7)).abs() < EPS);
        assert!((table.child_sc[AgeGroup::UnderFive.index()] - (1. - 0.4 * 0.4)).abs() < EPS);
        assert!((table.adult_sc[AgeGroup::SchoolAge.index()] - (1. - 0.7 * 0.7)).abs() < EPS);
        assert_eq!(
            table.adult_sc[AgeGroup::Adult.index()],
            table.adult[AgeGroup::Adult.index()]
        );

        // non-compliant children mix outside
        for group in AgeGroup::ALL {
            let factor = if group.is_child() { 1.5 } else { 1. };
            assert!((table.comm_sc[group.index()] - table.comm[group.index()] * factor).abs() < EPS);
            assert!((table.hood_sc[group.index()] - table.hood[group.index()] * factor).abs() < EPS);
        }

        let home = contact(Role::Child, AgeGroup::Adult);
        assert_eq!(table.probability(Context::Home, &home, true), table.child[3]);
        assert_eq!(table.probability(Context::Home, &home, false), table.child_sc[3]);
    }

    #[test]
    fn derivation_is_deterministic() {
        let parameters = DiseaseParameters {
            p_co: 0.7,
            p_hcc1: 0.2,
            child_hh_closure: 1.5,
            ..Default::default()
        };
        let first = TransmissionTable::derive(&parameters).unwrap();
        let second = TransmissionTable::derive(&parameters).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn changed_factor_recomputes_closed_variants() {
        let first = TransmissionTable::derive(&DiseaseParameters::default()).unwrap();
        let second = TransmissionTable::derive(&DiseaseParameters {
            p_fa: 0.5,
            ..Default::default()
        })
        .unwrap();
        assert!((second.child[0] - 0.3).abs() < EPS);
        assert!((second.child_sc[0] - (1. - 0.7 * 0.7)).abs() < EPS);
        assert_ne!(first.child_sc, second.child_sc);
    }

    #[test]
    fn negative_factor_disables_context() {
        let parameters = DiseaseParameters {
            p_wo: -1.,
            ..Default::default()
        };
        let table = TransmissionTable::derive(&parameters).unwrap();
        assert!(!table.is_enabled(Context::Work));
        assert_eq!(
            table.probability(Context::Work, &contact(Role::Adult, AgeGroup::Adult), true),
            0.
        );
    }

    #[test]
    fn negative_sub_factor_zeroes_its_entries() {
        let parameters = DiseaseParameters {
            p_hsc: -1.,
            p_hcc0: -1.,
            ..Default::default()
        };
        let table = TransmissionTable::derive(&parameters).unwrap();
        assert!(table.is_enabled(Context::School));
        assert!(table.is_enabled(Context::NeighborhoodCluster));
        assert_eq!(table.school[SchoolKind::High.index()], 0.);
        assert!(table.school[SchoolKind::Middle.index()] > 0.);
        assert_eq!(table.nc_child[AgeGroup::UnderFive.index()], 0.);
        assert!(table.nc_child[AgeGroup::SchoolAge.index()] > 0.);
    }

    #[test]
    fn enabled_bar() {
        let parameters = DiseaseParameters {
            p_bar: 2.,
            ..Default::default()
        };
        let table = TransmissionTable::derive(&parameters).unwrap();
        assert!(table.is_enabled(Context::Bar));
        let p = table.probability(Context::Bar, &contact(Role::Adult, AgeGroup::Senior), true);
        assert!((p - 0.0012).abs() < EPS);
    }

    #[test]
    fn probability_above_one_is_rejected() {
        let parameters = DiseaseParameters {
            p_fa: 2.,
            ..Default::default()
        };
        assert!(matches!(
            TransmissionTable::derive(&parameters),
            Err(EpiError::ConfigurationError(_))
        ));
    }

    #[test]
    fn school_lookup() {
        let table = TransmissionTable::derive(&DiseaseParameters::default()).unwrap();
        let student = Contact {
            infector: Role::Child,
            strain: 1,
            age_group: AgeGroup::SchoolAge,
            school_kind: SchoolKind::Middle,
        };
        assert!((table.probability(Context::School, &student, true) - 0.0375).abs() < EPS);
        assert_eq!(table.probability(Context::School, &student, false), 0.);

        let teacher_to_student = Contact {
            infector: Role::Adult,
            ..student
        };
        assert!(
            (table.probability(Context::School, &teacher_to_student, true) - 0.06).abs() < EPS
        );

        let student_to_teacher = contact(Role::Child, AgeGroup::Adult);
        assert!(
            (table.probability(Context::School, &student_to_teacher, true) - 0.04).abs() < EPS
        );

        let staff = contact(Role::Adult, AgeGroup::Adult);
        assert_eq!(table.probability(Context::School, &staff, true), table.work);
    }

    #[test]
    fn generic_and_transit() {
        let table = TransmissionTable::derive(&DiseaseParameters::default()).unwrap();
        let mut generic = contact(Role::Adult, AgeGroup::Adult);
        generic.strain = 1;
        assert_eq!(table.probability(Context::Generic, &generic, true), 0.3);
        assert_eq!(
            table.probability(Context::Transit, &generic, false),
            table.comm[AgeGroup::Adult.index()]
        );
    }

    #[test]
    fn unknown_strain_is_not_transmitted() {
        let table = TransmissionTable::derive(&DiseaseParameters::default()).unwrap();
        let mut generic = contact(Role::Adult, AgeGroup::Adult);
        generic.strain = 5;
        assert_eq!(table.probability(Context::Generic, &generic, true), 0.);
    }

    #[test]
    fn printable() {
        let table = TransmissionTable::derive(&DiseaseParameters::default()).unwrap();
        let printed = format!("{table}");
        assert!(printed.contains("xmit_child_SC"));
        assert!(printed.contains("18-29"));
        assert!(printed.contains("disabled contexts: [\"bar\"]"));
    }
}
