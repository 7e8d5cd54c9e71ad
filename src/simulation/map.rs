//! City map loading
//!
//! A map is a rectangular block of text with one character per cell. The
//! first line is the top row of the grid. A JSON dictionary resolves each
//! character to a cell kind:
//!
//! ```json
//! { ">": "Right", "+": "Up,Right", "S": 10, "s": 7, "#": "Obstacle", "D": "Destination" }
//! ```
//!
//! Integer values are traffic light periods; an uppercase symbol starts the
//! light in the stop state and a lowercase one in the pass state.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::grid::Grid;
use super::types::{Direction, DirectionSet, Position, DEFAULT_LIGHT_PERIOD};

/// The bundled demo city
pub const DEMO_CITY: &str = include_str!("../../maps/demo_city.txt");

/// What a single map character turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Road(DirectionSet),
    TrafficLight { state: bool, period: u32 },
    Destination,
    Obstacle,
}

/// Raw dictionary value as it appears in the JSON file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SymbolValue {
    Period(u32),
    Name(String),
}

/// Symbol to cell-kind mapping
#[derive(Debug, Clone, PartialEq)]
pub struct MapDictionary {
    symbols: HashMap<char, CellKind>,
}

impl Default for MapDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MapDictionary {
    /// Arrows for one-way roads, `S`/`s` for lights, `#` obstacles,
    /// `D` destinations and `.` for empty ground
    pub fn builtin() -> Self {
        let symbols = HashMap::from([
            ('>', CellKind::Road(DirectionSet::single(Direction::Right))),
            ('<', CellKind::Road(DirectionSet::single(Direction::Left))),
            ('^', CellKind::Road(DirectionSet::single(Direction::Up))),
            ('v', CellKind::Road(DirectionSet::single(Direction::Down))),
            (
                'S',
                CellKind::TrafficLight {
                    state: false,
                    period: DEFAULT_LIGHT_PERIOD,
                },
            ),
            (
                's',
                CellKind::TrafficLight {
                    state: true,
                    period: DEFAULT_LIGHT_PERIOD,
                },
            ),
            ('#', CellKind::Obstacle),
            ('D', CellKind::Destination),
            ('.', CellKind::Empty),
        ]);
        Self { symbols }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, SymbolValue> =
            serde_json::from_str(json).context("Map dictionary is not valid JSON")?;

        let mut symbols = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let mut chars = key.chars();
            let symbol = match (chars.next(), chars.next()) {
                (Some(symbol), None) => symbol,
                _ => bail!("Map dictionary key {:?} must be a single character", key),
            };
            let kind = Self::resolve_value(symbol, value)
                .with_context(|| format!("Invalid dictionary entry for {:?}", symbol))?;
            symbols.insert(symbol, kind);
        }
        Ok(Self { symbols })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read map dictionary {}", path.display()))?;
        Self::from_json(&json)
    }

    fn resolve_value(symbol: char, value: SymbolValue) -> Result<CellKind> {
        match value {
            SymbolValue::Period(0) => bail!("Traffic light period must be positive"),
            SymbolValue::Period(period) => Ok(CellKind::TrafficLight {
                state: symbol.is_lowercase(),
                period,
            }),
            SymbolValue::Name(name) => match name.trim() {
                "Obstacle" => Ok(CellKind::Obstacle),
                "Destination" => Ok(CellKind::Destination),
                "Empty" => Ok(CellKind::Empty),
                directions => {
                    let set = directions
                        .split(|c: char| c == ',' || c == '|' || c.is_whitespace())
                        .filter(|part| !part.is_empty())
                        .map(|part| {
                            Direction::parse(part)
                                .ok_or_else(|| anyhow!("Unknown direction {:?}", part))
                        })
                        .collect::<Result<DirectionSet>>()?;
                    if set.is_empty() {
                        bail!("Road entry has no directions");
                    }
                    Ok(CellKind::Road(set))
                }
            },
        }
    }

    pub fn resolve(&self, symbol: char) -> Option<CellKind> {
        self.symbols.get(&symbol).copied()
    }
}

/// Build a grid from map text. Any malformed input is an error.
pub fn parse_city(text: &str, dictionary: &MapDictionary) -> Result<Grid> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(first) = lines.first() else {
        bail!("Map is empty");
    };

    let width = first.chars().count();
    let height = lines.len();
    if width == 0 {
        bail!("Map rows must not be empty");
    }

    let mut grid = Grid::new(width as i32, height as i32)?;
    for (row, line) in lines.iter().enumerate() {
        let row_width = line.chars().count();
        if row_width != width {
            bail!(
                "Map row {} has {} cells, expected {}",
                row + 1,
                row_width,
                width
            );
        }

        // The first text row is the top of the grid
        let y = (height - row - 1) as i32;
        for (x, symbol) in line.chars().enumerate() {
            let position = Position::new(x as i32, y);
            let kind = dictionary.resolve(symbol).ok_or_else(|| {
                anyhow!(
                    "Unknown map symbol {:?} at row {}, column {}",
                    symbol,
                    row + 1,
                    x + 1
                )
            })?;
            place_cell(&mut grid, position, kind)?;
        }
    }
    Ok(grid)
}

fn place_cell(grid: &mut Grid, position: Position, kind: CellKind) -> Result<()> {
    match kind {
        CellKind::Empty => {}
        CellKind::Road(directions) => {
            grid.add_road(position, directions)?;
        }
        CellKind::TrafficLight { state, period } => {
            grid.add_traffic_light(position, state, period)?;
        }
        CellKind::Destination => {
            grid.add_destination(position)?;
        }
        CellKind::Obstacle => {
            grid.add_obstacle(position)?;
        }
    }
    Ok(())
}

/// Read a map file, resolving symbols with the given dictionary file or the
/// built-in one
pub fn load_city(map_path: &Path, dictionary_path: Option<&Path>) -> Result<Grid> {
    let dictionary = match dictionary_path {
        Some(path) => MapDictionary::load(path)?,
        None => MapDictionary::builtin(),
    };
    let text = fs::read_to_string(map_path)
        .with_context(|| format!("Failed to read map {}", map_path.display()))?;
    parse_city(&text, &dictionary).with_context(|| format!("Invalid map {}", map_path.display()))
}
