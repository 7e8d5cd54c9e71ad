//! Directed weighted graph over the traversable city cells
//!
//! Built once from the populated grid before the first step. Light state
//! changes later in the run never touch the weights stored here.

use log::info;
use ordered_float::OrderedFloat;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::config::{CongestionPolicy, SimConfig};
use super::grid::{Grid, Occupant};
use super::types::{Direction, Position, BASE_EDGE_WEIGHT, DIAGONAL_WEIGHT_MULTIPLIER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// One orthogonal step
    Straight,
    /// A lane-change shortcut to the parallel lane one cell ahead
    Diagonal,
}

/// Edge data for the city graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub weight: OrderedFloat<f32>,
}

impl GraphEdge {
    fn new(kind: EdgeKind, weight: f32) -> Self {
        Self {
            kind,
            weight: OrderedFloat(weight),
        }
    }
}

/// The routing graph for one run
#[derive(Debug, Default)]
pub struct CityGraph {
    /// The underlying petgraph directed graph
    graph: DiGraph<Position, GraphEdge>,

    /// Maps cell positions to their node indices in the graph
    position_to_node: HashMap<Position, NodeIndex>,
}

impl CityGraph {
    fn add_node(&mut self, position: Position) -> NodeIndex {
        if let Some(node) = self.position_to_node.get(&position) {
            return *node;
        }
        let node = self.graph.add_node(position);
        self.position_to_node.insert(position, node);
        node
    }

    /// Adds an edge, replacing any existing edge between the same two cells
    fn add_edge(&mut self, from: Position, to: Position, edge: GraphEdge) {
        let from_node = self.add_node(from);
        let to_node = self.add_node(to);
        self.graph.update_edge(from_node, to_node, edge);
    }

    /// The underlying petgraph graph
    pub fn graph(&self) -> &DiGraph<Position, GraphEdge> {
        &self.graph
    }

    pub fn node_index(&self, position: Position) -> Option<NodeIndex> {
        self.position_to_node.get(&position).copied()
    }

    pub fn position(&self, node: NodeIndex) -> Option<Position> {
        self.graph.node_weight(node).copied()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.position_to_node.contains_key(&position)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The edge running from `from` to `to`, if any
    pub fn edge(&self, from: Position, to: Position) -> Option<GraphEdge> {
        let from_node = self.node_index(from)?;
        let to_node = self.node_index(to)?;
        let edge = self.graph.find_edge(from_node, to_node)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Cells reachable in one hop from `position`, with the edge used
    pub fn successors(&self, position: Position) -> Vec<(Position, GraphEdge)> {
        let Some(node) = self.node_index(position) else {
            return Vec::new();
        };
        self.graph
            .edges(node)
            .map(|edge| (self.graph[edge.target()], *edge.weight()))
            .collect()
    }

    pub fn is_reachable(&self, from: Position, to: Position) -> bool {
        match (self.node_index(from), self.node_index(to)) {
            (Some(from_node), Some(to_node)) => {
                has_path_connecting(&self.graph, from_node, to_node, None)
            }
            _ => false,
        }
    }

    /// Destinations that no entry point can reach
    pub fn unreachable_destinations(
        &self,
        entry_points: &[Position],
        destinations: &[Position],
    ) -> Vec<Position> {
        destinations
            .iter()
            .filter(|destination| {
                !entry_points
                    .iter()
                    .any(|entry| self.is_reachable(*entry, **destination))
            })
            .copied()
            .collect()
    }
}

/// Derives the [`CityGraph`] from a populated grid
#[derive(Debug, Clone, Copy)]
pub struct CityGraphBuilder {
    congestion: CongestionPolicy,
    diagonal_weight: f32,
}

impl Default for CityGraphBuilder {
    fn default() -> Self {
        Self::new(CongestionPolicy::default())
    }
}

impl CityGraphBuilder {
    pub fn new(congestion: CongestionPolicy) -> Self {
        Self {
            congestion,
            diagonal_weight: DIAGONAL_WEIGHT_MULTIPLIER,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            congestion: config.congestion,
            diagonal_weight: config.diagonal_weight,
        }
    }

    pub fn build(&self, grid: &Grid) -> CityGraph {
        let mut city = CityGraph::default();

        for (position, cell) in grid.cells() {
            if cell.iter().any(Occupant::is_traversable) {
                city.add_node(position);
            }
        }

        for (position, cell) in grid.cells() {
            for occupant in cell {
                match occupant {
                    Occupant::Road { directions, .. } => {
                        for direction in directions.iter() {
                            self.add_road_edges(&mut city, grid, position, direction);
                        }
                    }
                    Occupant::TrafficLight(_) => {
                        self.add_light_edges(&mut city, grid, position);
                    }
                    Occupant::Destination(_) => {
                        Self::add_destination_edges(&mut city, grid, position);
                    }
                    Occupant::Obstacle(_) | Occupant::Car(_) => {}
                }
            }
        }

        info!(
            "City graph built: {} nodes, {} edges",
            city.node_count(),
            city.edge_count()
        );
        city
    }

    /// Weight of an edge ending on `target`, scaled when a light sits there
    fn entry_weight(&self, grid: &Grid, target: Position, base: f32) -> f32 {
        match grid.traffic_light(target) {
            Some(light) => base * self.congestion.multiplier(light.state),
            None => base,
        }
    }

    fn add_road_edges(
        &self,
        city: &mut CityGraph,
        grid: &Grid,
        position: Position,
        direction: Direction,
    ) {
        let ahead = position.step(direction);
        // Edges into lights come from the light's own neighbor scan
        if grid.is_traversable(ahead) && grid.traffic_light(ahead).is_none() {
            city.add_edge(
                position,
                ahead,
                GraphEdge::new(EdgeKind::Straight, BASE_EDGE_WEIGHT),
            );
        }

        for side in direction.perpendicular() {
            let diagonal = ahead.step(side);
            let parallel_lane = grid
                .road_directions(diagonal)
                .is_some_and(|lane| lane.contains(direction));
            if parallel_lane {
                city.add_edge(
                    position,
                    diagonal,
                    GraphEdge::new(EdgeKind::Diagonal, BASE_EDGE_WEIGHT * self.diagonal_weight),
                );
            }
        }
    }

    fn add_light_edges(&self, city: &mut CityGraph, grid: &Grid, light: Position) {
        for direction in Direction::ALL {
            let neighbor = light.step(direction);

            if let Some(lanes) = grid.road_directions(neighbor) {
                let feeds_light = lanes.iter().any(|lane| neighbor.step(lane) == light);
                if feeds_light {
                    let weight = self.entry_weight(grid, light, BASE_EDGE_WEIGHT);
                    city.add_edge(neighbor, light, GraphEdge::new(EdgeKind::Straight, weight));
                } else {
                    city.add_edge(
                        light,
                        neighbor,
                        GraphEdge::new(EdgeKind::Straight, BASE_EDGE_WEIGHT),
                    );
                }
            } else if grid.traffic_light(neighbor).is_some() {
                let weight = self.entry_weight(grid, neighbor, BASE_EDGE_WEIGHT);
                city.add_edge(light, neighbor, GraphEdge::new(EdgeKind::Straight, weight));
            }
        }
    }

    fn add_destination_edges(city: &mut CityGraph, grid: &Grid, destination: Position) {
        for direction in Direction::ALL {
            let neighbor = destination.step(direction);
            if grid.road_directions(neighbor).is_some() {
                city.add_edge(
                    neighbor,
                    destination,
                    GraphEdge::new(EdgeKind::Straight, BASE_EDGE_WEIGHT),
                );
            }
        }
    }
}
