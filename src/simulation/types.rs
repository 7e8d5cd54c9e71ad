//! Core types for the traffic simulation
//!
//! Grid coordinates, travel directions and the typed identifiers shared by
//! every other simulation module.

use serde::Serialize;
use std::fmt;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SimId(pub usize);

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CarId(pub SimId);

/// A wrapper type for road IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RoadId(pub SimId);

/// A wrapper type for traffic light IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TrafficLightId(pub SimId);

/// A wrapper type for destination IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DestinationId(pub SimId);

/// A wrapper type for obstacle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObstacleId(pub SimId);

/// A cell coordinate on the city grid.
///
/// The origin is the bottom-left cell and `y` grows upward, so moving `Up`
/// increments `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }

    /// The neighboring cell one step in `direction`
    pub fn step(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    /// Straight-line distance, used as the A* heuristic
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when `other` is one of the eight cells around this one
    pub fn is_adjacent(&self, other: &Position) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx <= 1 && dy <= 1 && (dx, dy) != (0, 0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A cardinal travel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The two directions at right angles to this one
    pub fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }

    /// Direction of travel from `from` toward the adjacent cell `to`.
    ///
    /// The horizontal component wins for diagonal hops. Returns `None` when
    /// the two positions are equal.
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx > 0 {
            Some(Direction::Right)
        } else if dx < 0 {
            Some(Direction::Left)
        } else if dy > 0 {
            Some(Direction::Up)
        } else if dy < 0 {
            Some(Direction::Down)
        } else {
            None
        }
    }

    pub fn parse(name: &str) -> Option<Direction> {
        match name.trim() {
            "Up" => Some(Direction::Up),
            "Down" => Some(Direction::Down),
            "Left" => Some(Direction::Left),
            "Right" => Some(Direction::Right),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Direction::Up => 0b0001,
            Direction::Down => 0b0010,
            Direction::Left => 0b0100,
            Direction::Right => 0b1000,
        }
    }
}

/// The set of directions a road cell allows traffic to leave in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn single(direction: Direction) -> Self {
        Self(direction.bit())
    }

    pub fn insert(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = DirectionSet::empty();
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

impl Serialize for DirectionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Number of cars in the vision window that triggers a lane change
pub const VISION_THRESHOLD: usize = 3;

/// Steps a car must wait between two lane changes
pub const LANE_CHANGE_COOLDOWN: u32 = 4;

/// Cost of a single orthogonal move in the city graph
pub const BASE_EDGE_WEIGHT: f32 = 1.0;

/// Weight multiplier for diagonal lane-change shortcuts
pub const DIAGONAL_WEIGHT_MULTIPLIER: f32 = 1.5;

/// Weight multiplier for edges entering a traffic light in the congested state
pub const DEFAULT_CONGESTION_FACTOR: f32 = 2.0;

/// Steps between two waves of spawned cars
pub const DEFAULT_SPAWN_INTERVAL: u64 = 10;

/// Light period used when a map symbol does not carry one
pub const DEFAULT_LIGHT_PERIOD: u32 = 10;
