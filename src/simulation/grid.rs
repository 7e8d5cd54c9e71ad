//! Spatial index over the city cells
//!
//! Each cell stores a small ordered list of occupants. Storage allows any
//! number of occupants per cell; the placement helpers keep at most one
//! static occupant (road, light, destination or obstacle) per cell and the
//! movement rules keep at most one car.

use anyhow::{anyhow, bail, Context, Result};

use super::traffic_light::SimTrafficLight;
use super::types::{
    CarId, DestinationId, DirectionSet, ObstacleId, Position, RoadId, SimId, TrafficLightId,
};

/// Anything that can sit in a grid cell
#[derive(Debug, Clone)]
pub enum Occupant {
    Road {
        id: RoadId,
        directions: DirectionSet,
    },
    TrafficLight(SimTrafficLight),
    Destination(DestinationId),
    Obstacle(ObstacleId),
    Car(CarId),
}

impl Occupant {
    /// Cars are the only occupants that move
    pub fn is_static(&self) -> bool {
        !matches!(self, Occupant::Car(_))
    }

    /// Whether the city graph has a node for a cell holding this occupant
    pub fn is_traversable(&self) -> bool {
        match self {
            Occupant::Road { .. } | Occupant::TrafficLight(_) | Occupant::Destination(_) => true,
            Occupant::Obstacle(_) | Occupant::Car(_) => false,
        }
    }
}

/// Which cells count as neighbors in [`Grid::neighborhood`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// The four orthogonal neighbors
    VonNeumann,
    /// All eight surrounding cells
    Moore,
}

/// A fixed-size city grid
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Vec<Occupant>>,
    next_id: usize,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            bail!("Grid dimensions must be positive, got {}x{}", width, height);
        }
        Ok(Self {
            width,
            height,
            cells: vec![Vec::new(); (width * height) as usize],
            next_id: 0,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    fn index(&self, position: Position) -> Option<usize> {
        if self.in_bounds(position) {
            Some((position.y * self.width + position.x) as usize)
        } else {
            None
        }
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Occupants of a cell, or `None` when the position is off the grid
    pub fn contents(&self, position: Position) -> Option<&[Occupant]> {
        self.index(position).map(|index| self.cells[index].as_slice())
    }

    fn contents_mut(&mut self, position: Position) -> Result<&mut Vec<Occupant>> {
        let index = self
            .index(position)
            .with_context(|| format!("Position {} is outside the grid", position))?;
        Ok(&mut self.cells[index])
    }

    /// Iterate over every cell with its position
    pub fn cells(&self) -> impl Iterator<Item = (Position, &[Occupant])> + '_ {
        self.cells.iter().enumerate().map(move |(index, occupants)| {
            let index = index as i32;
            (
                Position::new(index % self.width, index / self.width),
                occupants.as_slice(),
            )
        })
    }

    /// Place an occupant, rejecting a second static occupant in the same cell
    pub fn place(&mut self, position: Position, occupant: Occupant) -> Result<()> {
        if let Occupant::Road { directions, .. } = &occupant {
            if directions.is_empty() {
                bail!("Road at {} has no allowed directions", position);
            }
        }
        let cell = self.contents_mut(position)?;
        if occupant.is_static() && cell.iter().any(Occupant::is_static) {
            bail!("Cell {} already holds a static occupant", position);
        }
        cell.push(occupant);
        Ok(())
    }

    pub fn add_road(&mut self, position: Position, directions: DirectionSet) -> Result<RoadId> {
        let id = RoadId(self.next_sim_id());
        self.place(position, Occupant::Road { id, directions })?;
        Ok(id)
    }

    pub fn add_traffic_light(
        &mut self,
        position: Position,
        state: bool,
        period: u32,
    ) -> Result<TrafficLightId> {
        let id = TrafficLightId(self.next_sim_id());
        let light = SimTrafficLight::new(id, position, state, period)?;
        self.place(position, Occupant::TrafficLight(light))?;
        Ok(id)
    }

    pub fn add_destination(&mut self, position: Position) -> Result<DestinationId> {
        let id = DestinationId(self.next_sim_id());
        self.place(position, Occupant::Destination(id))?;
        Ok(id)
    }

    pub fn add_obstacle(&mut self, position: Position) -> Result<ObstacleId> {
        let id = ObstacleId(self.next_sim_id());
        self.place(position, Occupant::Obstacle(id))?;
        Ok(id)
    }

    /// Put a car on a cell. Fails if another car is already there.
    pub fn place_car(&mut self, car_id: CarId, position: Position) -> Result<()> {
        if self.has_car(position) {
            bail!("Cell {} is already occupied by a car", position);
        }
        self.contents_mut(position)?.push(Occupant::Car(car_id));
        Ok(())
    }

    pub fn remove_car(&mut self, car_id: CarId, position: Position) -> Result<()> {
        let cell = self.contents_mut(position)?;
        let index = cell
            .iter()
            .position(|occupant| matches!(occupant, Occupant::Car(id) if *id == car_id))
            .ok_or_else(|| anyhow!("Car {:?} not found at {}", car_id, position))?;
        cell.remove(index);
        Ok(())
    }

    pub fn move_car(&mut self, car_id: CarId, from: Position, to: Position) -> Result<()> {
        if !self.in_bounds(to) {
            bail!("Cannot move car {:?} outside the grid to {}", car_id, to);
        }
        self.remove_car(car_id, from)?;
        self.contents_mut(to)?.push(Occupant::Car(car_id));
        Ok(())
    }

    pub fn car_at(&self, position: Position) -> Option<CarId> {
        self.contents(position)?.iter().find_map(|occupant| match occupant {
            Occupant::Car(id) => Some(*id),
            _ => None,
        })
    }

    pub fn has_car(&self, position: Position) -> bool {
        self.car_at(position).is_some()
    }

    pub fn road_directions(&self, position: Position) -> Option<DirectionSet> {
        self.contents(position)?.iter().find_map(|occupant| match occupant {
            Occupant::Road { directions, .. } => Some(*directions),
            _ => None,
        })
    }

    pub fn traffic_light(&self, position: Position) -> Option<&SimTrafficLight> {
        self.contents(position)?.iter().find_map(|occupant| match occupant {
            Occupant::TrafficLight(light) => Some(light),
            _ => None,
        })
    }

    pub fn traffic_light_mut(&mut self, position: Position) -> Option<&mut SimTrafficLight> {
        let index = self.index(position)?;
        self.cells[index]
            .iter_mut()
            .find_map(|occupant| match occupant {
                Occupant::TrafficLight(light) => Some(light),
                _ => None,
            })
    }

    pub fn is_destination(&self, position: Position) -> bool {
        self.contents(position).is_some_and(|cell| {
            cell.iter()
                .any(|occupant| matches!(occupant, Occupant::Destination(_)))
        })
    }

    pub fn is_traversable(&self, position: Position) -> bool {
        self.contents(position)
            .is_some_and(|cell| cell.iter().any(Occupant::is_traversable))
    }

    /// A car may enter a cell unless another car holds it or a light there
    /// shows stop. Off-grid cells can never be entered.
    pub fn can_enter(&self, position: Position) -> bool {
        let Some(cell) = self.contents(position) else {
            return false;
        };
        !cell.iter().any(|occupant| match occupant {
            Occupant::Car(_) => true,
            Occupant::TrafficLight(light) => !light.is_pass(),
            _ => false,
        })
    }

    /// In-bounds cells around `center`
    pub fn neighborhood(
        &self,
        center: Position,
        kind: Neighborhood,
        include_center: bool,
    ) -> Vec<Position> {
        let mut positions = Vec::with_capacity(9);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let is_center = dx == 0 && dy == 0;
                let is_diagonal = dx != 0 && dy != 0;
                if (is_center && !include_center) || (is_diagonal && kind == Neighborhood::VonNeumann)
                {
                    continue;
                }
                let position = center.offset(dx, dy);
                if self.in_bounds(position) {
                    positions.push(position);
                }
            }
        }
        positions
    }

    /// Number of cars across the given cells
    pub fn count_cars(&self, positions: &[Position]) -> usize {
        positions
            .iter()
            .filter_map(|position| self.contents(*position))
            .flat_map(|cell| cell.iter())
            .filter(|occupant| matches!(occupant, Occupant::Car(_)))
            .count()
    }

    pub fn destinations(&self) -> Vec<Position> {
        self.cells()
            .filter(|(_, cell)| {
                cell.iter()
                    .any(|occupant| matches!(occupant, Occupant::Destination(_)))
            })
            .map(|(position, _)| position)
            .collect()
    }

    pub fn traffic_light_positions(&self) -> Vec<Position> {
        self.cells()
            .filter(|(_, cell)| {
                cell.iter()
                    .any(|occupant| matches!(occupant, Occupant::TrafficLight(_)))
            })
            .map(|(position, _)| position)
            .collect()
    }
}
