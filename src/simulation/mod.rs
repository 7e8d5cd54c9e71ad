//! Grid traffic simulation
//!
//! This module contains the whole simulation engine: the city grid, the
//! routing graph derived from it, the path planner, traffic lights, cars and
//! the spawn schedule, tied together by [`SimWorld`].

mod car;
mod city_graph;
mod config;
mod grid;
mod map;
mod path_planner;
mod snapshot;
mod spawn_manager;
mod traffic_light;
mod types;
mod world;

pub use car::{CarState, CarUpdateResult, SimCar, StepContext};
pub use city_graph::{CityGraph, CityGraphBuilder, EdgeKind, GraphEdge};
pub use config::{CongestionPolicy, LightPhase, SimConfig, SpawnConfig, SpawnPolicy};
pub use grid::{Grid, Neighborhood, Occupant};
pub use map::{load_city, parse_city, CellKind, MapDictionary, DEMO_CITY};
pub use path_planner::PathPlanner;
pub use snapshot::{CarSnapshot, CellSnapshot, RoadSnapshot, TrafficLightSnapshot, WorldSnapshot};
pub use spawn_manager::SpawnManager;
pub use traffic_light::SimTrafficLight;
pub use types::{
    CarId, DestinationId, Direction, DirectionSet, ObstacleId, Position, RoadId, SimId,
    TrafficLightId, BASE_EDGE_WEIGHT, DEFAULT_CONGESTION_FACTOR, DEFAULT_LIGHT_PERIOD,
    DEFAULT_SPAWN_INTERVAL, DIAGONAL_WEIGHT_MULTIPLIER, LANE_CHANGE_COOLDOWN, VISION_THRESHOLD,
};
pub use world::{Agent, SimStats, SimWorld};
