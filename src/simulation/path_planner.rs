//! Shortest-path queries over the city graph
//!
//! Every call runs a fresh A* search. Nothing is cached between calls, so a
//! car that just changed lanes always gets a path from its new cell.

use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::visit::EdgeRef;

use super::city_graph::CityGraph;
use super::types::Position;

/// A* planner borrowing the run's city graph
#[derive(Debug, Clone, Copy)]
pub struct PathPlanner<'g> {
    city: &'g CityGraph,
}

impl<'g> PathPlanner<'g> {
    pub fn new(city: &'g CityGraph) -> Self {
        Self { city }
    }

    /// Finds a path from `start` to `goal`.
    ///
    /// The path excludes `start` and ends with `goal`. Returns `None` when
    /// either cell is not in the graph or the goal cannot be reached.
    pub fn plan(&self, start: Position, goal: Position) -> Option<Vec<Position>> {
        self.plan_with_cost(start, goal).map(|(_, path)| path)
    }

    /// Like [`PathPlanner::plan`], also returning the summed edge weight
    pub fn plan_with_cost(&self, start: Position, goal: Position) -> Option<(f32, Vec<Position>)> {
        if start == goal {
            return Some((0.0, vec![]));
        }

        let start_node = self.city.node_index(start)?;
        let goal_node = self.city.node_index(goal)?;
        let graph = self.city.graph();

        let (cost, node_path) = astar(
            graph,
            start_node,
            |node| node == goal_node,
            |edge| edge.weight().weight,
            |node| OrderedFloat(graph[node].distance(&goal)),
        )?;

        // Convert node indices to positions, excluding the start node
        let path = node_path
            .iter()
            .skip(1)
            .filter_map(|node| self.city.position(*node))
            .collect();

        Some((cost.into_inner(), path))
    }
}
