//! Read-only view of a world after a completed step
//!
//! This is what an outside consumer (a renderer, a network bridge) gets to
//! see: ids, positions and light states, serializable to JSON.

use serde::Serialize;

use super::car::CarState;
use super::grid::{Grid, Occupant};
use super::types::{
    CarId, DestinationId, DirectionSet, ObstacleId, Position, RoadId, TrafficLightId,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarSnapshot {
    pub id: CarId,
    pub position: Position,
    pub destination: Position,
    pub state: CarState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficLightSnapshot {
    pub id: TrafficLightId,
    pub position: Position,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadSnapshot {
    pub id: RoadId,
    pub position: Position,
    pub directions: DirectionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellSnapshot<Id> {
    pub id: Id,
    pub position: Position,
}

/// Everything visible at the end of a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub step: u64,
    pub cars: Vec<CarSnapshot>,
    pub traffic_lights: Vec<TrafficLightSnapshot>,
    pub roads: Vec<RoadSnapshot>,
    pub destinations: Vec<CellSnapshot<DestinationId>>,
    pub obstacles: Vec<CellSnapshot<ObstacleId>>,
}

impl WorldSnapshot {
    /// Collect the static cells and lights from the grid; cars are supplied by
    /// the caller, which owns their state
    pub fn capture(step: u64, grid: &Grid, mut cars: Vec<CarSnapshot>) -> Self {
        cars.sort_by_key(|car| car.id);

        let mut snapshot = Self {
            step,
            cars,
            traffic_lights: Vec::new(),
            roads: Vec::new(),
            destinations: Vec::new(),
            obstacles: Vec::new(),
        };

        for (position, cell) in grid.cells() {
            for occupant in cell {
                match occupant {
                    Occupant::Road { id, directions } => snapshot.roads.push(RoadSnapshot {
                        id: *id,
                        position,
                        directions: *directions,
                    }),
                    Occupant::TrafficLight(light) => {
                        snapshot.traffic_lights.push(TrafficLightSnapshot {
                            id: light.id,
                            position,
                            state: light.state,
                        })
                    }
                    Occupant::Destination(id) => {
                        snapshot.destinations.push(CellSnapshot { id: *id, position })
                    }
                    Occupant::Obstacle(id) => {
                        snapshot.obstacles.push(CellSnapshot { id: *id, position })
                    }
                    Occupant::Car(_) => {}
                }
            }
        }
        snapshot
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
