//! Synthetic population generator.
//!
//! Builds a reproducible population for the reference runner: households on a lattice,
//! neighborhoods made of square blocks of households, workgroups and schools within each tile,
//! and the initially infectious agents. Equal settings and seeds yield equal populations.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::{Bernoulli, Distribution};

use crate::config::{DiseaseParameters, PopulationSettings};
use crate::core::{
    AgeGroup, Agent, Bounds, Domain, Position, Role, SchoolKind, Tile, TileId,
};
use crate::errors::{EpiError, Result};

/// School kinds attended by school aged children.
const SCHOOL_AGE_KINDS: [SchoolKind; 4] = [
    SchoolKind::High,
    SchoolKind::Middle,
    SchoolKind::ElementaryUpper,
    SchoolKind::ElementaryLower,
];

fn sampler_error<E: std::fmt::Display>(name: &str) -> impl Fn(E) -> EpiError + '_ {
    move |e| EpiError::ConfigurationError(format!("invalid {name}: {e}"))
}

/// Random lattice cell center inside the household block of a tile.
fn random_site(rng: &mut StdRng, lo: [usize; 2], shape: [usize; 2]) -> Position {
    [
        (lo[0] + rng.random_range(0..shape[0])) as f64 + 0.5,
        (lo[1] + rng.random_range(0..shape[1])) as f64 + 0.5,
    ]
}

struct Samplers {
    household_size: WeightedIndex<f64>,
    age: WeightedIndex<f64>,
    head_age: WeightedIndex<f64>,
    school_kind: WeightedIndex<f64>,
    employed: Bernoulli,
    school_staff: Bernoulli,
    daycare: Bernoulli,
    vaccinated: Bernoulli,
}

impl Samplers {
    fn new(settings: &PopulationSettings) -> Result<Self> {
        Ok(Self {
            household_size: WeightedIndex::new(&settings.household_size_weights)
                .map_err(sampler_error("household_size_weights"))?,
            age: WeightedIndex::new(settings.age_weights)
                .map_err(sampler_error("age_weights"))?,
            head_age: WeightedIndex::new(&settings.age_weights[2..])
                .map_err(sampler_error("age_weights"))?,
            school_kind: WeightedIndex::new([1.; SCHOOL_AGE_KINDS.len()])
                .map_err(sampler_error("school kinds"))?,
            employed: Bernoulli::new(settings.employment_rate)
                .map_err(sampler_error("employment_rate"))?,
            school_staff: Bernoulli::new(settings.school_staff_fraction)
                .map_err(sampler_error("school_staff_fraction"))?,
            daycare: Bernoulli::new(settings.daycare_fraction)
                .map_err(sampler_error("daycare_fraction"))?,
            vaccinated: Bernoulli::new(settings.vaccinated_fraction)
                .map_err(sampler_error("vaccinated_fraction"))?,
        })
    }
}

/// Generate the domain described by `settings` and seed the initial infections.
pub fn generate(settings: &PopulationSettings, disease: &DiseaseParameters) -> Result<Domain> {
    settings.validate()?;
    if settings.initial_infections.len() != disease.nstrain {
        return Err(EpiError::ConfigurationError(format!(
            "initial_infections must have one entry per strain ({}), but has {}",
            disease.nstrain,
            settings.initial_infections.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let samplers = Samplers::new(settings)?;

    let shape = settings.tile_shape();
    let neighborhoods_x = settings.households[0].div_ceil(settings.neighborhood_size);
    let mut tiles = Vec::with_capacity(settings.n_tiles());
    let mut household: u32 = 0;
    let mut next_workgroup: u32 = 0;

    for tj in 0..settings.tiles[1] {
        for ti in 0..settings.tiles[0] {
            let id: TileId = tj * settings.tiles[0] + ti;
            let lo = [ti * shape[0], tj * shape[1]];
            let bounds = Bounds::new(
                [lo[0] as f64, lo[1] as f64],
                [(lo[0] + shape[0]) as f64, (lo[1] + shape[1]) as f64],
            );

            // one school of every kind per tile
            let schools: Vec<Position> = SchoolKind::ALL
                .iter()
                .map(|_| random_site(&mut rng, lo, shape))
                .collect();
            let school_id = |kind: SchoolKind| (id * SchoolKind::ALL.len() + kind.index()) as u32;

            let mut agents = Vec::new();
            let mut workers_in_group = settings.workgroup_size;
            let mut workplace = [0.; 2];

            for y in lo[1]..lo[1] + shape[1] {
                for x in lo[0]..lo[0] + shape[0] {
                    let home = [x as f64 + 0.5, y as f64 + 0.5];
                    let neighborhood = ((y / settings.neighborhood_size) * neighborhoods_x
                        + x / settings.neighborhood_size) as u32;
                    let size = samplers.household_size.sample(&mut rng) + 1;

                    for member in 0..size {
                        let age_group = if member == 0 {
                            AgeGroup::ALL[samplers.head_age.sample(&mut rng) + 2]
                        } else {
                            AgeGroup::ALL[samplers.age.sample(&mut rng)]
                        };
                        let mut agent = Agent::new(home, age_group, household);
                        agent.neighborhood = neighborhood;
                        agent.vaccinated = samplers.vaccinated.sample(&mut rng);

                        match (age_group, age_group.role()) {
                            (AgeGroup::UnderFive, _) => {
                                if samplers.daycare.sample(&mut rng) {
                                    agent.school_kind = SchoolKind::DayCare;
                                }
                            }
                            (_, Role::Child) => {
                                agent.school_kind =
                                    SCHOOL_AGE_KINDS[samplers.school_kind.sample(&mut rng)];
                            }
                            (AgeGroup::Senior, _) => {}
                            (_, Role::Adult) if samplers.employed.sample(&mut rng) => {
                                if samplers.school_staff.sample(&mut rng) {
                                    let kind = SCHOOL_AGE_KINDS
                                        [samplers.school_kind.sample(&mut rng)];
                                    agent.school_kind = kind;
                                    agent.school = Some(school_id(kind));
                                    agent.work = Some(schools[kind.index()]);
                                } else {
                                    if workers_in_group == settings.workgroup_size {
                                        workers_in_group = 0;
                                        next_workgroup += 1;
                                        workplace = random_site(&mut rng, lo, shape);
                                    }
                                    workers_in_group += 1;
                                    agent.workgroup = Some(next_workgroup - 1);
                                    agent.work = Some(workplace);
                                }
                            }
                            (_, Role::Adult) => {}
                        }

                        if agent.work.is_none() && agent.school_kind != SchoolKind::None {
                            agent.school = Some(school_id(agent.school_kind));
                            agent.work = Some(schools[agent.school_kind.index()]);
                        }
                        agents.push(agent);
                    }
                    household += 1;
                }
            }

            log::debug!("Generated tile {id} with {} agents", agents.len());
            tiles.push(Tile::new(id, bounds, agents));
        }
    }

    let mut domain = Domain::new(
        [0., 0.],
        [settings.households[0] as f64, settings.households[1] as f64],
        tiles,
    );
    seed_infections(&mut domain, settings, disease, &mut rng)?;

    log::info!(
        "Generated {} agents in {} households on {} tiles",
        domain.n_agents(),
        household,
        domain.tiles().len()
    );
    Ok(domain)
}

/// Infect distinct agents chosen uniformly at random.
fn seed_infections(
    domain: &mut Domain,
    settings: &PopulationSettings,
    disease: &DiseaseParameters,
    rng: &mut StdRng,
) -> Result<()> {
    let n_agents = domain.n_agents();
    let n_infections: usize = settings.initial_infections.iter().sum();
    if n_infections > n_agents {
        return Err(EpiError::ConfigurationError(format!(
            "cannot infect {n_infections} of {n_agents} agents"
        )));
    }

    // prefix sums of tile sizes to locate an agent by its global index
    let offsets: Vec<usize> = domain
        .tiles()
        .iter()
        .scan(0, |total, tile| {
            *total += tile.len();
            Some(*total - tile.len())
        })
        .collect();

    let mut chosen = rand::seq::index::sample(rng, n_agents, n_infections).into_iter();
    for (strain, &count) in settings.initial_infections.iter().enumerate() {
        let asymptomatic = Bernoulli::new(disease.p_asymp[strain])
            .map_err(sampler_error("p_asymp"))?;
        for idx in chosen.by_ref().take(count) {
            let tile = offsets.partition_point(|&offset| offset <= idx) - 1;
            let symptomatic = !asymptomatic.sample(rng);
            domain.tiles_mut()[tile].agents_mut()[idx - offsets[tile]].infect(strain, symptomatic);
        }
    }
    Ok(())
}
