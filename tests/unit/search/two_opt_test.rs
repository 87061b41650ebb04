use super::*;
use crate::helpers::{loaded_plan, TestClient, TestProblem};
use crate::models::common::Store;
use crate::models::solution::Solution;

fn cost_evaluator() -> CostEvaluator {
    CostEvaluator::new(Cost::new(10), Cost::new(10), Cost::new(10), Cost::new(10), Cost::new(1))
}

fn penalised(data: &ProblemData, plan: &RoutePlan, cost_evaluator: &CostEvaluator) -> Cost {
    let solution = Solution::new(data, plan.export()).expect("exported routes are valid");
    cost_evaluator.penalised_cost(&solution)
}

#[test]
fn reverses_a_crossing_segment_within_a_route() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 10, y: 0, ..TestClient::default() },
            TestClient { x: 10, y: 10, ..TestClient::default() },
            TestClient { x: 0, y: 10, ..TestClient::default() },
        ],
        ..TestProblem::default()
    }
    .build();
    let cost_evaluator = cost_evaluator();

    let mut plan = loaded_plan(&data, &[&[1, 3, 2]]);
    let mut two_opt = TwoOpt::new(data.clone());

    let u = plan.client_node(1);
    let v = plan.client_node(2);

    let delta = two_opt.evaluate(&plan, u, v, &cost_evaluator);
    assert_eq!(delta, Cost::new(-8));

    let before = penalised(&data, &plan, &cost_evaluator);
    two_opt.apply(&mut plan, u, v);
    plan.update_route(0);

    assert_eq!(plan.export(), vec![vec![1, 2, 3]]);
    assert_eq!(penalised(&data, &plan, &cost_evaluator) - before, delta);
}

#[test]
fn exchanges_tails_between_routes() {
    // the routes cross: each second client sits in the other route's corridor, and the
    // tails carry the store tag of the other route
    let data = TestProblem {
        clients: vec![
            TestClient { x: 1, y: 0, store: 7, ..TestClient::default() },
            TestClient { x: 2, y: 0, store: 7, ..TestClient::default() },
            TestClient { x: 1, y: 5, store: 8, ..TestClient::default() },
            TestClient { x: 2, y: 5, store: 8, ..TestClient::default() },
        ],
        num_vehicles: 2,
        route_store_limit: 1,
        ..TestProblem::default()
    }
    .build();
    let cost_evaluator = cost_evaluator();

    let mut plan = loaded_plan(&data, &[&[1, 4], &[3, 2]]);
    let mut two_opt = TwoOpt::new(data.clone());

    let u = plan.client_node(1);
    let v = plan.client_node(3);

    let delta = two_opt.evaluate(&plan, u, v, &cost_evaluator);
    assert_eq!(delta, Cost::new(-8 - 20));

    let before = penalised(&data, &plan, &cost_evaluator);
    two_opt.apply(&mut plan, u, v);
    plan.update_route(0);
    plan.update_route(1);

    assert_eq!(plan.export(), vec![vec![1, 2], vec![3, 4]]);
    assert_eq!(plan.route(0).stores(), Store::new(1));
    assert_eq!(plan.route(1).stores(), Store::new(1));
    assert_eq!(penalised(&data, &plan, &cost_evaluator) - before, delta);
}

#[test]
fn pairs_are_evaluated_in_route_index_order() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 1, ..TestClient::default() },
            TestClient { x: 2, ..TestClient::default() },
        ],
        num_vehicles: 2,
        ..TestProblem::default()
    }
    .build();
    let cost_evaluator = cost_evaluator();

    let plan = loaded_plan(&data, &[&[1], &[2]]);
    let mut two_opt = TwoOpt::new(data.clone());

    // U's route index is larger, so the pair is deferred
    assert_eq!(
        two_opt.evaluate(&plan, plan.client_node(2), plan.client_node(1), &cost_evaluator),
        Cost::ZERO
    );
}

#[test]
fn adjacent_positions_within_a_route_are_rejected() {
    let data = TestProblem {
        clients: (1..=3).map(|x| TestClient { x, ..TestClient::default() }).collect(),
        ..TestProblem::default()
    }
    .build();
    let cost_evaluator = cost_evaluator();

    let plan = loaded_plan(&data, &[&[1, 2, 3]]);
    let mut two_opt = TwoOpt::new(data.clone());

    assert_eq!(
        two_opt.evaluate(&plan, plan.client_node(1), plan.client_node(2), &cost_evaluator),
        Cost::ZERO
    );
    assert_eq!(
        two_opt.evaluate(&plan, plan.client_node(2), plan.client_node(1), &cost_evaluator),
        Cost::ZERO
    );
}
