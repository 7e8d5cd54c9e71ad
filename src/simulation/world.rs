//! Main simulation world that ties everything together
//!
//! One call to [`SimWorld::step`] activates every traffic light and every car
//! exactly once, in an order shuffled from the world's own RNG, then advances
//! the step counter and lets the spawn manager add new cars.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

use super::car::{CarUpdateResult, SimCar, StepContext};
use super::city_graph::{CityGraph, CityGraphBuilder};
use super::config::SimConfig;
use super::grid::Grid;
use super::map::{parse_city, MapDictionary};
use super::path_planner::PathPlanner;
use super::snapshot::{CarSnapshot, WorldSnapshot};
use super::spawn_manager::SpawnManager;
use super::types::{CarId, Position};

/// One entry of a step's activation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Agent {
    TrafficLight(Position),
    Car(CarId),
}

/// Run statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimStats {
    pub steps: u64,
    pub total_spawned: usize,
    pub total_arrived: usize,
    pub active_cars: usize,
    pub lane_changes: usize,
    /// Cars whose blocked flag is set right now
    pub blocked_cars: usize,
    pub traffic_lights: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

impl SimStats {
    /// Share of spawned cars that have arrived, in percent
    pub fn success_rate(&self) -> f32 {
        if self.total_spawned > 0 {
            self.total_arrived as f32 / self.total_spawned as f32 * 100.0
        } else {
            0.0
        }
    }
}

/// The main simulation world
pub struct SimWorld {
    /// Cell occupancy, shared by every agent
    pub grid: Grid,

    /// Routing graph, built once at initialization
    pub city_graph: CityGraph,

    /// All live cars
    pub cars: HashMap<CarId, SimCar>,

    pub spawn_manager: SpawnManager,

    pub config: SimConfig,

    destinations: Vec<Position>,
    traffic_lights: Vec<Position>,

    /// Global step counter
    step: u64,

    lane_changes: usize,

    /// The only random source of the run
    rng: StdRng,

    last_activation: Vec<Agent>,
}

impl SimWorld {
    /// Start a new run on a populated grid
    pub fn initialize(grid: Grid, config: SimConfig) -> Result<Self> {
        config.validate().context("Invalid simulation configuration")?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let city_graph = CityGraphBuilder::from_config(&config).build(&grid);
        let spawn_manager = SpawnManager::new(&grid, &config.spawn);
        let destinations = grid.destinations();
        let traffic_lights = grid.traffic_light_positions();

        for destination in
            city_graph.unreachable_destinations(spawn_manager.entry_points(), &destinations)
        {
            warn!("Destination {} is unreachable from every entry point", destination);
        }

        let mut world = Self {
            grid,
            city_graph,
            cars: HashMap::new(),
            spawn_manager,
            config,
            destinations,
            traffic_lights,
            step: 0,
            lane_changes: 0,
            rng,
            last_activation: Vec::new(),
        };

        let initial = world.spawn_manager.initial_wave(
            &mut world.grid,
            &world.destinations,
            &mut world.rng,
        )?;
        world.register_cars(initial);

        info!(
            "Simulation initialized: {}x{} grid, {} destinations, {} traffic lights, {} cars",
            world.grid.width(),
            world.grid.height(),
            world.destinations.len(),
            world.traffic_lights.len(),
            world.cars.len()
        );
        Ok(world)
    }

    /// Parse map text with the given dictionary and start a run on it
    pub fn from_map(text: &str, dictionary: &MapDictionary, config: SimConfig) -> Result<Self> {
        let grid = parse_city(text, dictionary)?;
        Self::initialize(grid, config)
    }

    fn register_cars(&mut self, cars: Vec<SimCar>) {
        for car in cars {
            self.cars.insert(car.id, car);
        }
    }

    /// Number of completed steps
    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn destinations(&self) -> &[Position] {
        &self.destinations
    }

    pub fn car(&self, car_id: CarId) -> Option<&SimCar> {
        self.cars.get(&car_id)
    }

    pub fn planner(&self) -> PathPlanner<'_> {
        PathPlanner::new(&self.city_graph)
    }

    /// The shuffled order agents were activated in during the last step
    pub fn last_activation_order(&self) -> &[Agent] {
        &self.last_activation
    }

    /// Place a car by hand, outside the spawn schedule
    pub fn spawn_car(&mut self, position: Position, destination: Position) -> Result<CarId> {
        let car = self
            .spawn_manager
            .spawn_car(&mut self.grid, position, destination)?;
        let id = car.id;
        self.cars.insert(id, car);
        Ok(id)
    }

    /// Remove a car that reached its destination
    fn despawn_car(&mut self, car_id: CarId) -> Result<()> {
        let car = self
            .cars
            .remove(&car_id)
            .with_context(|| format!("Car {:?} is not active", car_id))?;
        self.grid.remove_car(car_id, car.position)?;
        self.spawn_manager.record_arrival();
        debug!(
            "Car {:?} arrived at {} on step {}",
            car_id, car.destination, self.step
        );
        Ok(())
    }

    fn activate_light(&mut self, position: Position) {
        if let Some(light) = self.grid.traffic_light_mut(position) {
            if light.update(self.step) {
                debug!(
                    "Traffic light {:?} at {} switched to {}",
                    light.id,
                    position,
                    if light.state { "pass" } else { "stop" }
                );
            }
        }
    }

    fn activate_car(&mut self, car_id: CarId) -> Result<()> {
        let Some(car) = self.cars.get_mut(&car_id) else {
            return Ok(());
        };

        let mut ctx = StepContext {
            step: self.step,
            grid: &mut self.grid,
            planner: PathPlanner::new(&self.city_graph),
            config: &self.config,
        };

        let result = car
            .update(&mut ctx)
            .with_context(|| format!("Failed to update car {:?}", car_id))?;

        match result {
            CarUpdateResult::Continue { lane_changed } => {
                if lane_changed {
                    self.lane_changes += 1;
                }
            }
            CarUpdateResult::Arrived => self.despawn_car(car_id)?,
        }
        Ok(())
    }

    /// Build this step's activation list: lights in grid order, cars in id
    /// order, then shuffled
    fn activation_order(&mut self) -> Vec<Agent> {
        let mut car_ids: Vec<CarId> = self.cars.keys().copied().collect();
        car_ids.sort();

        let mut order: Vec<Agent> = self
            .traffic_lights
            .iter()
            .map(|position| Agent::TrafficLight(*position))
            .chain(car_ids.into_iter().map(Agent::Car))
            .collect();
        order.shuffle(&mut self.rng);
        order
    }

    /// Main simulation step
    pub fn step(&mut self) -> Result<()> {
        let order = self.activation_order();

        for agent in &order {
            match *agent {
                Agent::TrafficLight(position) => self.activate_light(position),
                Agent::Car(car_id) => self.activate_car(car_id)?,
            }
        }
        self.last_activation = order;

        self.step += 1;

        let spawned = self.spawn_manager.update(
            self.step,
            &mut self.grid,
            &self.destinations,
            &mut self.rng,
        )?;
        self.register_cars(spawned);

        debug_assert_eq!(self.spawn_manager.active_count(), self.cars.len());
        Ok(())
    }

    /// Run several steps in a row
    pub fn run(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    pub fn statistics(&self) -> SimStats {
        SimStats {
            steps: self.step,
            total_spawned: self.spawn_manager.total_spawned(),
            total_arrived: self.spawn_manager.total_arrived(),
            active_cars: self.spawn_manager.active_count(),
            lane_changes: self.lane_changes,
            blocked_cars: self.cars.values().filter(|car| car.blocked).count(),
            traffic_lights: self.traffic_lights.len(),
            graph_nodes: self.city_graph.node_count(),
            graph_edges: self.city_graph.edge_count(),
        }
    }

    /// Read-only view of the world after the last completed step
    pub fn snapshot(&self) -> WorldSnapshot {
        let cars = self
            .cars
            .values()
            .map(|car| CarSnapshot {
                id: car.id,
                position: car.position,
                destination: car.destination,
                state: car.state,
            })
            .collect();
        WorldSnapshot::capture(self.step, &self.grid, cars)
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        let stats = self.statistics();
        println!("=== Traffic Simulation Summary ===");
        println!("Step: {}", stats.steps);
        println!(
            "Cars: {} active, {} spawned, {} arrived",
            stats.active_cars, stats.total_spawned, stats.total_arrived
        );
        println!(
            "Blocked: {}, Lane changes: {}",
            stats.blocked_cars, stats.lane_changes
        );

        let mut cars: Vec<&SimCar> = self.cars.values().collect();
        cars.sort_by_key(|car| car.id);
        if !cars.is_empty() {
            println!("--- Active Cars ---");
            for car in cars {
                println!(
                    "  Car {:?}: position={}, destination={}, state={:?}, path_remaining={}",
                    car.id.0 .0,
                    car.position,
                    car.destination,
                    car.state,
                    car.path.len()
                );
            }
        }
    }

    /// Log the end-of-run statistics
    pub fn log_statistics(&self) {
        let stats = self.statistics();
        info!("=== SIMULATION COMPLETE ===");
        info!("Steps run: {}", stats.steps);
        info!("Total cars spawned: {}", stats.total_spawned);
        info!("Total cars completed: {}", stats.total_arrived);
        info!("Active cars: {}", stats.active_cars);
        info!("Lane changes: {}", stats.lane_changes);
        info!("Total traffic lights: {}", stats.traffic_lights);
        info!(
            "City graph: {} nodes, {} edges",
            stats.graph_nodes, stats.graph_edges
        );
        info!("Success rate: {:.1}%", stats.success_rate());
    }
}
