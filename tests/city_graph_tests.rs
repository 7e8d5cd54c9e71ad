//! Construction of the routing graph from the grid

mod common;

use city_traffic::simulation::{
    CityGraphBuilder, CongestionPolicy, EdgeKind, LightPhase, Position,
};
use common::grid_from_rows;

fn p(x: i32, y: i32) -> Position {
    Position::new(x, y)
}

#[test]
fn test_roads_follow_their_directions() {
    let grid = grid_from_rows(&["#####", ">>>>D", "#####"]);
    let city = CityGraphBuilder::default().build(&grid);

    // four roads and the destination, obstacles are not nodes
    assert_eq!(city.node_count(), 5);
    assert!(!city.contains(p(0, 0)));

    let edge = city.edge(p(0, 1), p(1, 1)).unwrap();
    assert_eq!(edge.kind, EdgeKind::Straight);
    assert_eq!(edge.weight.into_inner(), 1.0);
    assert!(city.edge(p(1, 1), p(0, 1)).is_none());
    assert!(city.edge(p(3, 1), p(4, 1)).is_some());
}

#[test]
fn test_destinations_only_have_inbound_edges() {
    let grid = grid_from_rows(&[".^.", ">D<", "..."]);
    let city = CityGraphBuilder::default().build(&grid);
    let destination = p(1, 1);

    assert!(city.successors(destination).is_empty());
    assert!(city.edge(p(0, 1), destination).is_some());
    assert!(city.edge(p(2, 1), destination).is_some());
    // adjacent roads feed the destination whatever their direction
    assert!(city.edge(p(1, 2), destination).is_some());
}

#[test]
fn test_diagonal_shortcuts_join_parallel_lanes() {
    let grid = grid_from_rows(&[">>>>", ">>>>"]);
    let city = CityGraphBuilder::default().build(&grid);

    let down = city.edge(p(0, 1), p(1, 0)).unwrap();
    assert_eq!(down.kind, EdgeKind::Diagonal);
    assert_eq!(down.weight.into_inner(), 1.5);

    let up = city.edge(p(0, 0), p(1, 1)).unwrap();
    assert_eq!(up.kind, EdgeKind::Diagonal);

    // never backwards
    assert!(city.edge(p(1, 0), p(0, 1)).is_none());
}

#[test]
fn test_no_diagonal_into_opposing_lane() {
    let grid = grid_from_rows(&["<<<<", ">>>>"]);
    let city = CityGraphBuilder::default().build(&grid);

    assert!(city.edge(p(0, 0), p(1, 1)).is_none());
    assert!(city.edge(p(3, 1), p(2, 0)).is_none());
    let diagonals = city
        .graph()
        .edge_weights()
        .filter(|edge| edge.kind == EdgeKind::Diagonal)
        .count();
    assert_eq!(diagonals, 0);
}

#[test]
fn test_traffic_light_edges_run_with_the_traffic() {
    let grid = grid_from_rows(&[">>S>>D"]);
    let city = CityGraphBuilder::default().build(&grid);
    let light = p(2, 0);

    assert!(city.edge(p(1, 0), light).is_some());
    assert!(city.edge(light, p(3, 0)).is_some());
    assert!(city.edge(p(3, 0), light).is_none());
    assert!(city.edge(light, p(1, 0)).is_none());
}

#[test]
fn test_neighboring_lights_are_connected() {
    let grid = grid_from_rows(&["<S<", ">S>"]);
    let city = CityGraphBuilder::default().build(&grid);

    assert!(city.edge(p(1, 1), p(1, 0)).is_some());
    assert!(city.edge(p(1, 0), p(1, 1)).is_some());
    assert!(city.edge(p(2, 1), p(1, 1)).is_some());
    assert!(city.edge(p(0, 0), p(1, 0)).is_some());
}

/// Which light state the congestion factor fires on is a policy choice;
/// both settings are checked here.
#[test]
fn test_congestion_policy_applies_on_configured_phase() {
    // `S` starts in the stop state, `s` in the pass state
    let grid = grid_from_rows(&[">S>s>"]);
    let into_stop = (p(0, 0), p(1, 0));
    let into_pass = (p(2, 0), p(3, 0));

    let on_stop = CityGraphBuilder::new(CongestionPolicy {
        factor: 3.0,
        applies_when: LightPhase::Stop,
    })
    .build(&grid);
    assert_eq!(on_stop.edge(into_stop.0, into_stop.1).unwrap().weight.into_inner(), 3.0);
    assert_eq!(on_stop.edge(into_pass.0, into_pass.1).unwrap().weight.into_inner(), 1.0);

    let on_pass = CityGraphBuilder::new(CongestionPolicy {
        factor: 3.0,
        applies_when: LightPhase::Pass,
    })
    .build(&grid);
    assert_eq!(on_pass.edge(into_stop.0, into_stop.1).unwrap().weight.into_inner(), 1.0);
    assert_eq!(on_pass.edge(into_pass.0, into_pass.1).unwrap().weight.into_inner(), 3.0);

    // edges leaving a light are never scaled
    assert_eq!(on_stop.edge(p(1, 0), p(2, 0)).unwrap().weight.into_inner(), 1.0);
}

#[test]
fn test_disconnected_destination_is_reported() {
    let grid = grid_from_rows(&[">>D#D<"]);
    let city = CityGraphBuilder::default().build(&grid);

    let unreachable =
        city.unreachable_destinations(&[p(0, 0)], &[p(2, 0), p(4, 0)]);
    assert_eq!(unreachable, vec![p(4, 0)]);
    assert!(city.is_reachable(p(5, 0), p(4, 0)));
    assert!(!city.is_reachable(p(0, 0), p(4, 0)));
}
