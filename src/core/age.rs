//! Age bands and contact roles.
//!
//! Every per-age table in the transmission model is indexed by one of five fixed age bands. The
//! two youngest bands count as children, which decides the role an infectious agent plays in
//! household, neighborhood-cluster and school contacts.

use derive_more::Display;
use serde::{Deserialize, Serialize};

pub const N_AGE_GROUPS: usize = 5;

/// Per-age-group values, indexed by `AgeGroup::index`.
pub type AgeRates = [f64; N_AGE_GROUPS];

#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AgeGroup {
    #[display("<5")]
    UnderFive,
    #[display("5-17")]
    SchoolAge,
    #[display("18-29")]
    YoungAdult,
    #[display("30-64")]
    Adult,
    #[display("65+")]
    Senior,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; N_AGE_GROUPS] = [
        AgeGroup::UnderFive,
        AgeGroup::SchoolAge,
        AgeGroup::YoungAdult,
        AgeGroup::Adult,
        AgeGroup::Senior,
    ];

    /// Age band of a person aged `years`.
    pub fn from_years(years: u32) -> Self {
        match years {
            0..=4 => AgeGroup::UnderFive,
            5..=17 => AgeGroup::SchoolAge,
            18..=29 => AgeGroup::YoungAdult,
            30..=64 => AgeGroup::Adult,
            _ => AgeGroup::Senior,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_child(self) -> bool {
        matches!(self, AgeGroup::UnderFive | AgeGroup::SchoolAge)
    }

    #[inline]
    pub fn role(self) -> Role {
        if self.is_child() {
            Role::Child
        } else {
            Role::Adult
        }
    }
}

/// Role of an agent in a contact; selects between the child and adult tables.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Role {
    #[display("child")]
    Child,
    #[display("adult")]
    Adult,
}
