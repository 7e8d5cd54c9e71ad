//! Entry points, spawn waves and car accounting

mod common;

use city_traffic::simulation::{
    parse_city, CarId, MapDictionary, Position, SimConfig, SimId, SimWorld, SpawnConfig,
    SpawnManager, SpawnPolicy, DEMO_CITY,
};
use common::grid_from_rows;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

fn p(x: i32, y: i32) -> Position {
    Position::new(x, y)
}

fn single_entry(interval: Option<u64>, policy: SpawnPolicy) -> SpawnConfig {
    SpawnConfig {
        entry_points: Some(vec![p(0, 0)]),
        interval,
        policy,
    }
}

#[test]
fn test_default_entry_points_are_the_grid_corners() {
    let entries = SpawnManager::default_entry_points(12, 6);
    assert_eq!(
        entries,
        vec![
            p(0, 0),
            p(0, 1),
            p(0, 5),
            p(1, 5),
            p(11, 0),
            p(10, 1),
            p(11, 5),
            p(10, 4),
        ]
    );

    let grid = parse_city(DEMO_CITY, &MapDictionary::builtin()).unwrap();
    let manager = SpawnManager::new(&grid, &SpawnConfig::default());
    assert_eq!(manager.entry_points(), entries.as_slice());
}

#[test]
fn test_unusable_entry_points_are_dropped() {
    let grid = grid_from_rows(&[">>#D", ">>>>"]);
    let config = SpawnConfig {
        entry_points: Some(vec![p(0, 0), p(2, 1), p(3, 1), p(9, 9), p(0, 0), p(1, 1)]),
        ..SpawnConfig::default()
    };
    let manager = SpawnManager::new(&grid, &config);
    assert_eq!(manager.entry_points(), &[p(0, 0), p(1, 1)]);
}

#[test]
fn test_spawn_steps_follow_the_interval() {
    let grid = grid_from_rows(&[">>D"]);
    let every_ten = SpawnManager::new(&grid, &single_entry(Some(10), SpawnPolicy::Skip));
    assert!(every_ten.is_spawn_step(10));
    assert!(every_ten.is_spawn_step(30));
    assert!(!every_ten.is_spawn_step(15));

    let never = SpawnManager::new(&grid, &single_entry(None, SpawnPolicy::Skip));
    assert!(!never.is_spawn_step(10));
}

#[test]
fn test_skip_policy_drops_spawns_for_occupied_entries() {
    let mut grid = grid_from_rows(&[">>>D"]);
    let destinations = grid.destinations();
    let mut rng = StdRng::seed_from_u64(1);
    let mut manager = SpawnManager::new(&grid, &single_entry(Some(5), SpawnPolicy::Skip));

    let parked = CarId(SimId(99));
    grid.place_car(parked, p(0, 0)).unwrap();
    let spawned = manager.initial_wave(&mut grid, &destinations, &mut rng).unwrap();
    assert!(spawned.is_empty());
    assert_eq!(manager.pending_count(), 0);

    grid.remove_car(parked, p(0, 0)).unwrap();
    let spawned = manager.update(1, &mut grid, &destinations, &mut rng).unwrap();
    assert!(spawned.is_empty());

    let spawned = manager.update(5, &mut grid, &destinations, &mut rng).unwrap();
    assert_eq!(spawned.len(), 1);
    assert_eq!(manager.total_spawned(), 1);
}

#[test]
fn test_queue_policy_spawns_once_entry_frees_up() {
    let mut grid = grid_from_rows(&[">>>D"]);
    let destinations = grid.destinations();
    let mut rng = StdRng::seed_from_u64(1);
    let mut manager = SpawnManager::new(&grid, &single_entry(Some(5), SpawnPolicy::Queue));

    let parked = CarId(SimId(99));
    grid.place_car(parked, p(0, 0)).unwrap();
    let spawned = manager.initial_wave(&mut grid, &destinations, &mut rng).unwrap();
    assert!(spawned.is_empty());
    assert_eq!(manager.pending_count(), 1);

    let spawned = manager.update(1, &mut grid, &destinations, &mut rng).unwrap();
    assert!(spawned.is_empty());

    grid.remove_car(parked, p(0, 0)).unwrap();
    let spawned = manager.update(2, &mut grid, &destinations, &mut rng).unwrap();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].position, p(0, 0));
    assert_eq!(spawned[0].destination, p(3, 0));
    assert_eq!(manager.pending_count(), 0);
    assert_eq!(grid.car_at(p(0, 0)), Some(spawned[0].id));
}

#[test]
fn test_queue_policy_owes_at_most_one_car_per_entry() {
    let mut grid = grid_from_rows(&[">>>D"]);
    let destinations = grid.destinations();
    let mut rng = StdRng::seed_from_u64(2);
    let mut manager = SpawnManager::new(&grid, &single_entry(Some(5), SpawnPolicy::Queue));

    let parked = CarId(SimId(99));
    grid.place_car(parked, p(0, 0)).unwrap();
    manager.initial_wave(&mut grid, &destinations, &mut rng).unwrap();
    for step in [5, 10, 15] {
        assert!(manager.update(step, &mut grid, &destinations, &mut rng).unwrap().is_empty());
        assert_eq!(manager.pending_count(), 1);
    }

    grid.remove_car(parked, p(0, 0)).unwrap();
    let spawned = manager.update(16, &mut grid, &destinations, &mut rng).unwrap();
    assert_eq!(spawned.len(), 1);
    assert_eq!(manager.pending_count(), 0);

    // the entry frees again before the next wave; nothing is left to spawn
    grid.remove_car(spawned[0].id, p(0, 0)).unwrap();
    assert!(manager.update(17, &mut grid, &destinations, &mut rng).unwrap().is_empty());
    assert_eq!(manager.total_spawned(), 1);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "no active cars")]
fn test_arrival_without_active_car_is_caught() {
    let grid = grid_from_rows(&[">>>D"]);
    let mut manager = SpawnManager::new(&grid, &single_entry(None, SpawnPolicy::Skip));
    manager.record_arrival();
}

#[test]
fn test_no_spawns_without_destinations() {
    let mut grid = grid_from_rows(&[">>>>"]);
    let mut rng = StdRng::seed_from_u64(1);
    let mut manager = SpawnManager::new(&grid, &single_entry(Some(1), SpawnPolicy::Queue));

    let spawned = manager.initial_wave(&mut grid, &[], &mut rng).unwrap();
    assert!(spawned.is_empty());
    assert_eq!(manager.pending_count(), 0);
    assert!(manager.update(1, &mut grid, &[], &mut rng).unwrap().is_empty());
}

#[test]
fn test_manual_spawn_accounting() {
    let mut grid = grid_from_rows(&[">>>D"]);
    let mut manager = SpawnManager::new(&grid, &single_entry(None, SpawnPolicy::Skip));

    let first = manager.spawn_car(&mut grid, p(1, 0), p(3, 0)).unwrap();
    let second = manager.spawn_car(&mut grid, p(2, 0), p(3, 0)).unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(manager.active_count(), 2);

    assert!(manager.spawn_car(&mut grid, p(7, 0), p(3, 0)).is_err());
    assert!(manager.spawn_car(&mut grid, p(1, 0), p(3, 0)).is_err());
    assert_eq!(manager.active_count(), 2);

    manager.record_arrival();
    assert_eq!(manager.active_count(), 1);
    assert_eq!(manager.total_arrived(), 1);
    assert_eq!(manager.total_spawned(), 2);
}

#[test]
fn test_world_spawns_initial_wave_on_every_entry() {
    let world = SimWorld::from_map(DEMO_CITY, &MapDictionary::builtin(), SimConfig::with_seed(4))
        .unwrap();
    assert_eq!(world.cars.len(), 8);
    assert_eq!(world.spawn_manager.total_spawned(), 8);
    for car in world.cars.values() {
        assert!(world.spawn_manager.entry_points().contains(&car.position));
        assert!(world.destinations().contains(&car.destination));
    }
}

#[test]
fn test_car_accounting_holds_over_long_runs() {
    for seed in 0..5 {
        let mut world =
            SimWorld::from_map(DEMO_CITY, &MapDictionary::builtin(), SimConfig::with_seed(seed))
                .unwrap();

        for _ in 0..150 {
            let before: HashMap<CarId, Position> = world
                .cars
                .values()
                .map(|car| (car.id, car.position))
                .collect();

            world.step().unwrap();

            // one cell per step at most, lane changes included
            for car in world.cars.values() {
                if let Some(previous) = before.get(&car.id) {
                    assert!(
                        *previous == car.position || previous.is_adjacent(&car.position),
                        "seed {}: car {:?} jumped from {} to {}",
                        seed,
                        car.id,
                        previous,
                        car.position
                    );
                }
            }

            let stats = world.statistics();
            assert_eq!(stats.active_cars, world.cars.len());
            assert_eq!(stats.total_spawned, stats.active_cars + stats.total_arrived);

            for car in world.cars.values() {
                assert_eq!(world.grid.car_at(car.position), Some(car.id));
                assert!(world.grid.is_traversable(car.position));
                assert!(!world.grid.is_destination(car.position));
                assert!(world.destinations().contains(&car.destination));
                if let Some(head) = car.path.first() {
                    assert!(car.position.is_adjacent(head), "seed {}", seed);
                }
            }
        }
        assert!(world.spawn_manager.total_arrived() > 0, "seed {}", seed);
    }
}
