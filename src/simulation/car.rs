//! Car movement logic for the traffic simulation
//!
//! A car follows its planned path one cell per step, waits behind other cars
//! and red lights, and cuts over to a diagonal neighbor when the cells ahead
//! get crowded.

use anyhow::Result;
use log::debug;

use super::config::SimConfig;
use super::grid::{Grid, Neighborhood};
use super::path_planner::PathPlanner;
use super::types::{CarId, Direction, Position};

/// Everything a car may look at or change while it acts
pub struct StepContext<'a> {
    /// Global step counter, not yet incremented for the current step
    pub step: u64,
    pub grid: &'a mut Grid,
    pub planner: PathPlanner<'a>,
    pub config: &'a SimConfig,
}

/// Where a car is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CarState {
    /// No path; the planner is asked again on the next step
    Routing,
    /// Following its path
    Advancing,
    /// The next cell could not be entered this step
    Blocked,
    /// Took a diagonal step into the neighboring lane this step
    LaneChanging,
    /// The next hop is the destination; the world removes the car
    Arrived,
}

/// Result of a car update indicating what action should be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarUpdateResult {
    /// Car stays in the simulation
    Continue { lane_changed: bool },
    /// Car reached its destination and must be removed
    Arrived,
}

/// Diagonal lane-change candidates, tried in this order
const DIAGONALS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// A car in the traffic simulation
#[derive(Debug, Clone)]
pub struct SimCar {
    pub id: CarId,
    pub position: Position,
    pub destination: Position,
    /// Remaining cells to visit, head first
    pub path: Vec<Position>,
    pub direction: Option<Direction>,
    /// Set when the car could not move or the cell ahead is taken
    pub blocked: bool,
    /// Steps since the last lane change
    pub steps_since_lane_change: u32,
    pub state: CarState,
}

impl SimCar {
    pub fn new(id: CarId, position: Position, destination: Position) -> Self {
        Self {
            id,
            position,
            destination,
            path: Vec::new(),
            direction: None,
            blocked: false,
            steps_since_lane_change: 0,
            state: CarState::Routing,
        }
    }

    /// Direction toward the head of the path
    pub fn heading(&self) -> Option<Direction> {
        self.path
            .first()
            .and_then(|next| Direction::between(self.position, *next))
    }

    /// The cell straight ahead, if it lies on the grid
    pub fn cell_ahead(&self, grid: &Grid) -> Option<Position> {
        let ahead = self.position.step(self.heading()?);
        grid.in_bounds(ahead).then_some(ahead)
    }

    /// Update car movement logic
    /// Returns CarUpdateResult indicating what action should be taken with the car
    pub fn update(&mut self, ctx: &mut StepContext<'_>) -> Result<CarUpdateResult> {
        self.steps_since_lane_change = self.steps_since_lane_change.saturating_add(1);

        // A lane change is this step's move
        if self.check_for_lane_change(ctx)? {
            self.blocked = self.ahead_taken(ctx.grid);
            return Ok(CarUpdateResult::Continue { lane_changed: true });
        }

        if self.path.is_empty() {
            self.path = ctx
                .planner
                .plan(self.position, self.destination)
                .unwrap_or_default();

            if self.path.is_empty() {
                debug!(
                    "Car {:?} at {} has no path to {}",
                    self.id, self.position, self.destination
                );
                self.state = CarState::Routing;
                return Ok(CarUpdateResult::Continue {
                    lane_changed: false,
                });
            }
        }

        let next = self.path[0];
        if next == self.destination {
            self.state = CarState::Arrived;
            return Ok(CarUpdateResult::Arrived);
        }

        self.direction = self.heading();
        let moved = ctx.grid.can_enter(next);
        if moved {
            ctx.grid.move_car(self.id, self.position, next)?;
            self.position = next;
            self.path.remove(0);
            self.direction = self.heading().or(self.direction);
            self.state = CarState::Advancing;
        } else {
            self.state = CarState::Blocked;
        }

        self.blocked = !moved || self.ahead_taken(ctx.grid);

        Ok(CarUpdateResult::Continue {
            lane_changed: false,
        })
    }

    /// Whether the cell ahead holds a car or a red light
    fn ahead_taken(&self, grid: &Grid) -> bool {
        self.cell_ahead(grid)
            .is_some_and(|ahead| !grid.can_enter(ahead))
    }

    /// Looks at the 3x3 window around the cell ahead and changes lanes when it
    /// holds at least the vision threshold of cars (this car included).
    fn check_for_lane_change(&mut self, ctx: &mut StepContext<'_>) -> Result<bool> {
        let Some(direction) = self.heading() else {
            return Ok(false);
        };
        let Some(ahead) = self.cell_ahead(ctx.grid) else {
            return Ok(false);
        };

        let window = ctx.grid.neighborhood(ahead, Neighborhood::Moore, true);
        let cars_ahead = ctx.grid.count_cars(&window);

        if cars_ahead < ctx.config.vision_threshold
            || self.steps_since_lane_change < ctx.config.lane_change_cooldown
        {
            return Ok(false);
        }

        self.change_lane(ctx, direction)
    }

    /// Diagonal cells this car may change lanes into, in enumeration order
    pub fn lane_change_candidates(&self, grid: &Grid, direction: Direction) -> Vec<Position> {
        let (forward_x, forward_y) = direction.offset();
        DIAGONALS
            .iter()
            // a component against the direction of travel would reverse the car
            .filter(|(dx, dy)| dx * forward_x + dy * forward_y >= 0)
            .map(|(dx, dy)| self.position.offset(*dx, *dy))
            .filter(|candidate| {
                grid.is_traversable(*candidate)
                    && grid.can_enter(*candidate)
                    && !grid.is_destination(*candidate)
            })
            .collect()
    }

    fn change_lane(&mut self, ctx: &mut StepContext<'_>, direction: Direction) -> Result<bool> {
        let Some(target) = self
            .lane_change_candidates(ctx.grid, direction)
            .first()
            .copied()
        else {
            return Ok(false);
        };

        ctx.grid.move_car(self.id, self.position, target)?;
        debug!(
            "Car {:?} changed lanes from {} to {}",
            self.id, self.position, target
        );
        self.position = target;
        self.steps_since_lane_change = 0;
        self.state = CarState::LaneChanging;
        self.path = ctx
            .planner
            .plan(self.position, self.destination)
            .unwrap_or_default();
        self.direction = self.heading();
        Ok(true)
    }
}
