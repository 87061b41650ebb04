use super::*;
use crate::helpers::{loaded_plan, TestClient, TestProblem};
use crate::models::solution::Solution;

fn cost_evaluator() -> CostEvaluator {
    CostEvaluator::new(Cost::new(10), Cost::new(10), Cost::new(10), Cost::new(10), Cost::new(1))
}

#[test]
fn moves_the_pair_in_reversed_order() {
    let data = TestProblem {
        clients: vec![
            TestClient { x: 2, ..TestClient::default() },
            TestClient { x: 1, ..TestClient::default() },
            TestClient { x: 10, ..TestClient::default() },
        ],
        num_vehicles: 2,
        ..TestProblem::default()
    }
    .build();
    let cost_evaluator = cost_evaluator();

    let mut plan = loaded_plan(&data, &[&[1, 2], &[3]]);
    let mut op = MoveTwoClientsReversed::new(data.clone());

    let u = plan.client_node(1);
    let v = plan.client_node(3);

    let delta = op.evaluate(&plan, u, v, &cost_evaluator);
    assert_eq!(delta, Cost::new(-2));

    let before = Solution::new(&data, plan.export()).expect("valid routes");
    op.apply(&mut plan, u, v);
    plan.update_route(0);
    plan.update_route(1);
    let after = Solution::new(&data, plan.export()).expect("valid routes");

    assert_eq!(plan.export(), vec![vec![], vec![3, 2, 1]]);
    assert_eq!(cost_evaluator.penalised_cost(&after) - cost_evaluator.penalised_cost(&before), delta);
}

#[test]
fn rejects_adjacent_anchors_and_short_segments() {
    let data = TestProblem {
        clients: (1..=3).map(|x| TestClient { x, ..TestClient::default() }).collect(),
        ..TestProblem::default()
    }
    .build();
    let cost_evaluator = cost_evaluator();

    let plan = loaded_plan(&data, &[&[1, 2, 3]]);
    let mut op = MoveTwoClientsReversed::new(data.clone());

    // U follows V directly
    assert_eq!(op.evaluate(&plan, plan.client_node(2), plan.client_node(1), &cost_evaluator), Cost::ZERO);
    // V follows U directly
    assert_eq!(op.evaluate(&plan, plan.client_node(1), plan.client_node(2), &cost_evaluator), Cost::ZERO);
    // the pair would include the end depot
    assert_eq!(op.evaluate(&plan, plan.client_node(3), plan.client_node(1), &cost_evaluator), Cost::ZERO);
}
