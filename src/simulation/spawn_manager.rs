//! Car spawning and despawn accounting for the traffic simulation
//!
//! New cars enter at a fixed list of entry cells, each heading to a
//! destination picked uniformly at random.

use anyhow::{bail, Result};
use log::{debug, warn};
use rand::seq::IndexedRandom;
use rand::Rng;

use super::car::SimCar;
use super::config::{SpawnConfig, SpawnPolicy};
use super::grid::Grid;
use super::types::{CarId, Position, SimId};

/// Owns the entry list and the live car count
#[derive(Debug, Clone)]
pub struct SpawnManager {
    entry_points: Vec<Position>,
    /// Spawns owed to each entry (zero or one), aligned with `entry_points`
    pending: Vec<usize>,
    interval: Option<u64>,
    policy: SpawnPolicy,
    next_car_id: usize,
    active: usize,
    total_spawned: usize,
    total_arrived: usize,
}

impl SpawnManager {
    /// The corner entry cells of a `width` x `height` grid
    pub fn default_entry_points(width: i32, height: i32) -> Vec<Position> {
        vec![
            Position::new(0, 0),
            Position::new(0, 1),
            Position::new(0, height - 1),
            Position::new(1, height - 1),
            Position::new(width - 1, 0),
            Position::new(width - 2, 1),
            Position::new(width - 1, height - 1),
            Position::new(width - 2, height - 2),
        ]
    }

    pub fn new(grid: &Grid, config: &SpawnConfig) -> Self {
        let requested = config
            .entry_points
            .clone()
            .unwrap_or_else(|| Self::default_entry_points(grid.width(), grid.height()));

        let mut entry_points: Vec<Position> = Vec::with_capacity(requested.len());
        for entry in requested {
            if !grid.is_traversable(entry) {
                warn!("Dropping entry point {}: not a traversable cell", entry);
            } else if grid.is_destination(entry) {
                warn!("Dropping entry point {}: it is a destination", entry);
            } else if !entry_points.contains(&entry) {
                entry_points.push(entry);
            }
        }

        Self {
            pending: vec![0; entry_points.len()],
            entry_points,
            interval: config.interval,
            policy: config.policy,
            next_car_id: 0,
            active: 0,
            total_spawned: 0,
            total_arrived: 0,
        }
    }

    pub fn entry_points(&self) -> &[Position] {
        &self.entry_points
    }

    /// Number of cars currently alive
    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn total_spawned(&self) -> usize {
        self.total_spawned
    }

    pub fn total_arrived(&self) -> usize {
        self.total_arrived
    }

    /// Spawns still owed to occupied entries
    pub fn pending_count(&self) -> usize {
        self.pending.iter().sum()
    }

    /// Whether a wave is due once the step counter reaches `step`
    pub fn is_spawn_step(&self, step: u64) -> bool {
        self.interval.is_some_and(|interval| step % interval == 0)
    }

    fn next_car_id(&mut self) -> CarId {
        let id = CarId(SimId(self.next_car_id));
        self.next_car_id += 1;
        id
    }

    /// Put a new car on the grid and count it as active
    pub fn spawn_car(
        &mut self,
        grid: &mut Grid,
        position: Position,
        destination: Position,
    ) -> Result<SimCar> {
        if !grid.in_bounds(position) {
            bail!("Cannot spawn a car outside the grid at {}", position);
        }
        let id = self.next_car_id();
        grid.place_car(id, position)?;
        self.active += 1;
        self.total_spawned += 1;
        debug!("Spawned car {:?} at {} heading to {}", id, position, destination);
        Ok(SimCar::new(id, position, destination))
    }

    /// Account for a car that reached its destination
    pub fn record_arrival(&mut self) {
        debug_assert!(self.active > 0, "arrival recorded with no active cars");
        self.active -= 1;
        self.total_arrived += 1;
    }

    /// Owe one spawn to every entry point. An entry is never owed more than
    /// one car, so a long-blocked entry does not release a burst later.
    fn schedule_wave(&mut self, destinations: &[Position]) {
        if destinations.is_empty() {
            warn!("No destinations on the map; skipping spawn wave");
            return;
        }
        self.pending.fill(1);
    }

    /// Spawn at every entry that is owed a car and holds none
    fn drain<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        destinations: &[Position],
        rng: &mut R,
    ) -> Result<Vec<SimCar>> {
        let mut spawned = Vec::new();
        for index in 0..self.entry_points.len() {
            let entry = self.entry_points[index];
            if self.pending[index] == 0 || grid.has_car(entry) {
                continue;
            }
            let Some(destination) = destinations.choose(rng).copied() else {
                break;
            };
            spawned.push(self.spawn_car(grid, entry, destination)?);
            self.pending[index] -= 1;
        }

        if self.policy == SpawnPolicy::Skip {
            self.pending.fill(0);
        }
        Ok(spawned)
    }

    /// The wave spawned when a run starts
    pub fn initial_wave<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        destinations: &[Position],
        rng: &mut R,
    ) -> Result<Vec<SimCar>> {
        self.schedule_wave(destinations);
        self.drain(grid, destinations, rng)
    }

    /// Called once per step after the counter has advanced to `step`
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        step: u64,
        grid: &mut Grid,
        destinations: &[Position],
        rng: &mut R,
    ) -> Result<Vec<SimCar>> {
        if self.is_spawn_step(step) {
            self.schedule_wave(destinations);
        }
        self.drain(grid, destinations, rng)
    }
}
