use super::*;
use crate::helpers::{test_solution, TestClient, TestProblem};

fn line_problem() -> std::sync::Arc<ProblemData> {
    TestProblem {
        clients: vec![
            TestClient { x: 1, weight: 1, volume: 1, salvage: 1, ..TestClient::default() },
            TestClient { x: 2, weight: 1, volume: 1, salvage: 1, ..TestClient::default() },
            TestClient { x: 3, weight: 1, volume: 1, salvage: 1, ..TestClient::default() },
        ],
        weight_capacity: 10,
        volume_capacity: 10,
        salvage_capacity: 10,
        route_store_limit: 10,
        ..TestProblem::default()
    }
    .build()
}

#[test]
fn solution_computes_route_statistics() {
    let data = line_problem();
    let solution = test_solution(&data, &[&[1, 2, 3]]);

    assert_eq!(solution.num_routes(), 1);
    assert_eq!(solution.num_clients(), 3);
    assert_eq!(solution.distance(), Distance::new(6));
    assert_eq!(solution.time_warp(), Duration::ZERO);
    assert!(solution.is_feasible());

    let route = &solution.routes()[0];
    assert_eq!(route.demand_weight(), Load::new(3));
    assert_eq!(route.demand_volume(), Load::new(3));
    assert_eq!(route.demand_salvage(), Salvage::new(3));
}

#[test]
fn solution_reports_capacity_excess() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 1, weight: 3, ..TestClient::default() },
            TestClient { x: 2, weight: 3, ..TestClient::default() },
            TestClient { x: 3, weight: 3, ..TestClient::default() },
            TestClient { x: 4, weight: 3, ..TestClient::default() },
        ],
        num_vehicles: 2,
        weight_capacity: 6,
        ..TestProblem::default()
    }
    .build();

    let single = test_solution(&data, &[&[1, 2, 3, 4]]);
    assert_eq!(single.excess_weight(), Load::new(6));
    assert!(!single.is_feasible());

    let split = test_solution(&data, &[&[1, 2], &[3, 4]]);
    assert_eq!(split.excess_weight(), Load::ZERO);
    assert!(split.is_feasible());
}

#[test]
fn solution_counts_distinct_stores_per_route() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 1, store: 1, ..TestClient::default() },
            TestClient { x: 2, store: 2, ..TestClient::default() },
            TestClient { x: 3, store: 3, ..TestClient::default() },
        ],
        num_vehicles: 2,
        route_store_limit: 2,
        ..TestProblem::default()
    }
    .build();

    let single = test_solution(&data, &[&[1, 2, 3]]);
    assert_eq!(single.routes()[0].stores(), Store::new(3));
    assert_eq!(single.excess_stores(), Store::new(1));

    let split = test_solution(&data, &[&[1, 2], &[3]]);
    assert_eq!(split.excess_stores(), Store::ZERO);
}

#[test]
fn solution_reports_time_warp() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 100, ..TestClient::default() },
            TestClient { x: 200, tw_early: 100, tw_late: 110, ..TestClient::default() },
        ],
        num_vehicles: 2,
        ..TestProblem::default()
    }
    .build();

    let solution = test_solution(&data, &[&[1, 2]]);

    // client 2 is reached at time 200 while its window closes at 110
    assert_eq!(solution.time_warp(), Duration::new(90));
    assert!(solution.has_time_warp());
}

#[test]
fn solution_tracks_uncollected_prizes() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 1, ..TestClient::default() },
            TestClient { x: 2, prize: 10, required: false, ..TestClient::default() },
        ],
        num_vehicles: 2,
        ..TestProblem::default()
    }
    .build();

    let without = test_solution(&data, &[&[1]]);
    assert_eq!(without.uncollected_prizes(), Cost::new(10));

    let with = test_solution(&data, &[&[1, 2]]);
    assert_eq!(with.uncollected_prizes(), Cost::ZERO);
    assert_eq!(with.prizes(), Cost::new(10));
}

#[test]
fn solution_rejects_invalid_partitions() {
    let data = line_problem();

    assert!(Solution::new(&data, vec![vec![1, 2, 3], vec![]]).is_err()); // too many routes
    assert!(Solution::new(&data, vec![vec![1, 2]]).is_err()); // client 3 missing
    assert!(Solution::new(&data, vec![vec![1, 2, 3, 1]]).is_err()); // duplicate visit
}

#[test]
fn equal_solutions_compare_equal() {
    let data = line_problem();

    let first = test_solution(&data, &[&[1, 2, 3]]);
    let second = test_solution(&data, &[&[1, 2, 3]]);
    let reversed = test_solution(&data, &[&[3, 2, 1]]);

    assert_eq!(first, second);
    assert_ne!(first, reversed);
}
