//! Shared helpers for the integration tests

#![allow(dead_code)]

use city_traffic::simulation::{
    parse_city, Grid, MapDictionary, SimConfig, SimWorld, SpawnConfig, SpawnPolicy,
};

/// Parse a map written top row first, one string per row
pub fn grid_from_rows(rows: &[&str]) -> Grid {
    grid_with_dictionary(rows, &MapDictionary::builtin())
}

pub fn grid_with_dictionary(rows: &[&str], dictionary: &MapDictionary) -> Grid {
    parse_city(&rows.join("\n"), dictionary).expect("test map should parse")
}

/// Seeded configuration with all automatic spawning turned off
pub fn manual_config(seed: u64) -> SimConfig {
    SimConfig {
        seed: Some(seed),
        spawn: SpawnConfig {
            entry_points: Some(vec![]),
            interval: None,
            policy: SpawnPolicy::Skip,
        },
        ..SimConfig::default()
    }
}

pub fn manual_world(rows: &[&str], seed: u64) -> SimWorld {
    SimWorld::initialize(grid_from_rows(rows), manual_config(seed))
        .expect("test world should initialize")
}
