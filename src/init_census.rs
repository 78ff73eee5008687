//! Demographic initializer (census mode).
//!
//! Populates each community with agents whose households, age structure,
//! neighborhoods, and school assignments respect the per-unit census tables.
//! Communities are filled unit by unit in grid order: cell `(i, j)` holds the
//! community with linear index `j * nx + i`, and a unit's communities are the
//! contiguous range `start[u]..start[u + 1]`.

use crate::agents::{school, AgentAttrs, AgentStore};
use crate::demographics::{DemographicData, COMMUNITY_SIZE};
use crate::geometry::Geometry;
use crate::rng::{StreamSeeds, Usage};
use rand::rngs::StdRng;
use rand::Rng;

/// Household-size CDF (sizes 1-7) on a 0-1000 scale, used when a unit reports
/// no household counts.
const DEFAULT_HOUSEHOLD_CDF: [i64; 7] = [330, 670, 800, 900, 970, 990, 1000];

/// School-age fraction (percent) among children when age tables are absent.
const DEFAULT_P_SCHOOLAGE: i64 = 76;

/// Per-cell geographic and demographic maps produced by initialization.
#[derive(Clone, Debug)]
pub struct CommunityMaps {
    /// Census unit of each cell; -1 for empty cells.
    pub unit: Vec<i32>,
    /// FIPS code of each cell; -1 for empty cells.
    pub fips: Vec<i32>,
    /// Census tract number of each cell; -1 for empty cells.
    pub tract: Vec<i32>,
    /// Community number of each cell; -1 for empty cells.
    pub comm: Vec<i32>,
    /// Residents per age group plus the total in component 5.
    pub num_residents: Vec<[i64; 6]>,
}

impl CommunityMaps {
    pub fn empty(ncells: usize) -> Self {
        CommunityMaps {
            unit: vec![-1; ncells],
            fips: vec![-1; ncells],
            tract: vec![-1; ncells],
            comm: vec![-1; ncells],
            num_residents: vec![[0; 6]; ncells],
        }
    }
}

/// Number of families of each size (1-7) in one cell.
type FamilyCounts = [i64; 7];

/// Draws a school assignment for a school-age child.
fn assign_school(nborhood: i32, rng: &mut StdRng) -> i32 {
    let draw = rng.gen_range(0..100);
    if draw < 36 {
        school::ELEM_A + nborhood / 2
    } else if draw < 68 {
        school::MIDDLE
    } else if draw < 93 {
        school::HIGH
    } else {
        // Not in school, presumably 18-year-olds or home-schooled.
        school::NONE
    }
}

/// Household-size CDF for a unit on a 0-1000 scale.
fn household_cdf(demo: &DemographicData, unit: usize) -> [i64; 7] {
    let counts = &demo.households[unit];
    let total: i64 = counts.iter().sum();
    if total == 0 {
        return DEFAULT_HOUSEHOLD_CDF;
    }
    let mut cdf = [0i64; 7];
    let mut cumulative = 0;
    for (size, count) in counts.iter().enumerate() {
        cumulative += count;
        cdf[size] = 1000 * cumulative / total;
    }
    cdf[6] = 1000;
    cdf
}

/// School-age percentage among a unit's children.
fn p_schoolage(demo: &DemographicData, unit: usize) -> i64 {
    let [under5, school_age, ..] = demo.age_pop[unit];
    if under5 + school_age > 0 {
        100 * school_age / (under5 + school_age)
    } else {
        DEFAULT_P_SCHOOLAGE
    }
}

/// Resident count of a community: the standard 2000, or zero for the
/// workgroup-only tail of a unit whose population has run out.
fn community_size(demo: &DemographicData, unit: usize, community: i64) -> i64 {
    let within = community - demo.start[unit];
    if demo.population[unit] < 1000 + COMMUNITY_SIZE * within {
        0
    } else {
        COMMUNITY_SIZE
    }
}

/// Draws the family-size composition of one cell: repeatedly samples the
/// household CDF until the population reaches `community_size + 1`.
fn draw_families(cdf: &[i64; 7], size: i64, rng: &mut StdRng) -> (FamilyCounts, i64) {
    let mut families = [0i64; 7];
    let mut npeople = 0;
    while npeople < size + 1 {
        let il = rng.gen_range(0..1000i64);
        let family_size = cdf.iter().position(|c| il < *c).unwrap() + 1;
        families[family_size - 1] += 1;
        npeople += family_size as i64;
    }
    (families, npeople)
}

/// Adult age group for a joint two-adult draw: 28% 65+, 40% 30-64, 32% 18-29.
fn adult_pair_group(il: i64) -> u8 {
    if il < 28 {
        4
    } else if il < 68 {
        3
    } else {
        2
    }
}

/// Parent age group: 2% 65+, 60% 30-64, 38% 18-29.
fn parent_group(il: i64) -> u8 {
    if il < 2 {
        4
    } else if il < 62 {
        3
    } else {
        2
    }
}

fn child_group(p_schoolage: i64, rng: &mut StdRng) -> u8 {
    if rng.gen_range(0..100) < p_schoolage {
        1
    } else {
        0
    }
}

/// Age groups of one family's members. Families of one are adults; families
/// of two are usually a same-age adult pair, with a 1% chance of a single
/// parent and child; larger families hold two same-age parents and
/// independently drawn children.
fn family_age_groups(family_size: usize, p_schoolage: i64, rng: &mut StdRng, out: &mut Vec<u8>) {
    out.clear();
    let il = rng.gen_range(0..100i64);
    match family_size {
        1 => out.push(adult_pair_group(il)),
        2 => {
            if il == 0 {
                let parent = parent_group(rng.gen_range(0..100i64));
                out.push(parent);
                out.push(child_group(p_schoolage, rng));
            } else {
                let pair = adult_pair_group(il);
                out.push(pair);
                out.push(pair);
            }
        }
        _ => {
            let parents = parent_group(il);
            out.push(parents);
            out.push(parents);
            for _ in 2..family_size {
                out.push(child_group(p_schoolage, rng));
            }
        }
    }
}

/// Synthesizes the population onto the grid. Returns the agent store and the
/// per-cell maps. Agents are laid out in family-size-major order: all
/// one-person families (in cell order), then all two-person families, and so
/// on; each family occupies a contiguous block.
pub fn init_agents_census(
    geom: &Geometry,
    demo: &DemographicData,
    seeds: &StreamSeeds,
) -> (AgentStore, CommunityMaps) {
    let ncells = geom.ncells();
    assert!(
        ncells as i64 >= demo.ncommunity,
        "grid holds {ncells} cells but the census needs {}",
        demo.ncommunity
    );

    let mut maps = CommunityMaps::empty(ncells);
    let mut num_families: Vec<FamilyCounts> = vec![[0; 7]; ncells];

    // First pass: per-cell household composition.
    for cell in 0..ncells {
        let community = cell as i64;
        let Some(unit) = demo.unit_of_community(community) else {
            continue;
        };
        maps.comm[cell] = community as i32;
        maps.unit[cell] = unit as i32;
        maps.fips[cell] = demo.fips[unit] as i32;
        maps.tract[cell] = demo.tract[unit] as i32;

        let cdf = household_cdf(demo, unit);
        let size = community_size(demo, unit, community);
        let mut rng = seeds.stream(cell as u64, Usage::Households);
        let (families, npeople) = draw_families(&cdf, size, &mut rng);

        let allocated: i64 = families
            .iter()
            .enumerate()
            .map(|(s, n)| (s as i64 + 1) * n)
            .sum();
        assert_eq!(
            npeople, allocated,
            "family blocks do not cover the cell population"
        );

        num_families[cell] = families;
        maps.num_residents[cell][5] = npeople;
    }

    // Deterministic exclusive scans, family-size-major: each (size, cell)
    // slot gets its first agent index and first family id.
    let nagents: i64 = (0..7)
        .flat_map(|n| num_families.iter().map(move |f| (n as i64 + 1) * f[n]))
        .sum();
    let mut next_family_id: i32 = 0;

    let mut store = AgentStore::new();
    store.reserve(nagents as usize);

    // Second pass: fill each (size, cell) block of agents.
    let mut ages = Vec::with_capacity(7);
    for n in 0..7usize {
        let family_size = n + 1;
        for cell in 0..ncells {
            let nf = num_families[cell][n];
            if nf == 0 {
                continue;
            }
            let unit = maps.unit[cell] as usize;
            let (ci, cj) = geom.cell_coords(cell);
            let center = geom.cell_center(ci, cj);
            let schoolage = if community_size(demo, unit, maps.comm[cell] as i64) > 0 {
                p_schoolage(demo, unit)
            } else {
                0
            };

            let mut rng = seeds.stream((n * ncells + cell) as u64, Usage::Ages);
            for _ in 0..nf {
                let family_id = next_family_id;
                next_family_id += 1;
                family_age_groups(family_size, schoolage, &mut rng, &mut ages);
                for &age_group in &ages {
                    let nborhood = rng.gen_range(0..4i32);
                    let mut attrs = AgentAttrs::resident(ci, cj, age_group, family_id, nborhood);
                    attrs.school = match age_group {
                        0 => school::DAYCARE,
                        1 => assign_school(nborhood, &mut rng),
                        _ => school::NOT_ASSIGNED,
                    };
                    store.push(center, attrs);
                    maps.num_residents[cell][age_group as usize] += 1;
                }
            }
        }
    }

    for (cell, residents) in maps.num_residents.iter().enumerate() {
        let by_age: i64 = residents[..5].iter().sum();
        assert_eq!(
            by_age, residents[5],
            "age-group counts do not sum to the cell population in cell {cell}"
        );
    }
    assert_eq!(store.len() as i64, nagents);

    (store, maps)
}
