#[cfg(test)]
#[path = "../../tests/unit/search/move_two_reversed_test.rs"]
mod move_two_reversed_test;

use crate::models::common::{Cost, TimeWindowSegment};
use crate::models::problem::ProblemData;
use crate::models::CostEvaluator;
use crate::search::operator::{NodeOperator, SequencePolicy, SEQUENCE_VIOLATION_COST};
use crate::search::route::{NodeIndex, RoutePlan};
use std::sync::Arc;

/// Moves the pair `(U, n(U))` after V in reversed order, so the route continues as
/// `V -> n(U) -> U -> n(V)`.
pub struct MoveTwoClientsReversed {
    data: Arc<ProblemData>,
    policy: SequencePolicy,
}

impl MoveTwoClientsReversed {
    /// Creates a new operator without a sequence rule.
    pub fn new(data: Arc<ProblemData>) -> Self {
        Self::with_policy(data, SequencePolicy::default())
    }

    /// Creates a new operator with the given sequence policy.
    pub fn with_policy(data: Arc<ProblemData>, policy: SequencePolicy) -> Self {
        Self { data, policy }
    }
}

impl NodeOperator for MoveTwoClientsReversed {
    fn evaluate(
        &mut self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        if u == plan.next(v) || plan.next(u) == v || plan.is_depot(plan.next(u)) {
            return Cost::ZERO;
        }

        if self.policy.forbids(&self.data, plan, u, v) {
            return SEQUENCE_VIOLATION_COST;
        }

        let data = self.data.as_ref();

        let pos_u = plan.node(u).position;
        let pos_v = plan.node(v).position;

        let route_u = plan.route_of(u).expect("U belongs to a route");
        let route_v = plan.route_of(v).expect("V belongs to a route");

        let next_u = plan.next(u);

        let current = plan.dist_between(route_u, pos_u - 1, pos_u + 2)
            + data.dist(plan.node(v).client, plan.node(plan.next(v)).client);
        let proposed = data.dist(plan.node(plan.prev(u)).client, plan.node(plan.next(next_u)).client)
            + data.dist(plan.node(v).client, plan.node(next_u).client)
            + data.dist(plan.node(next_u).client, plan.node(u).client)
            + data.dist(plan.node(u).client, plan.node(plan.next(v)).client);

        let mut delta_cost = Cost::from(proposed - current);

        if route_u != route_v {
            if plan.route(route_u).is_feasible() && delta_cost >= Cost::ZERO {
                return delta_cost;
            }

            let u_tws = TimeWindowSegment::merge(
                data.duration_matrix(),
                plan.node(plan.prev(u)).tw_before,
                plan.node(plan.next(next_u)).tw_after,
            );

            delta_cost += cost_evaluator.tw_penalty(u_tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route_u).time_warp());

            let weight_diff = plan.weight_between(route_u, pos_u, pos_u + 1);
            let volume_diff = plan.volume_between(route_u, pos_u, pos_u + 1);
            let salvage_diff = plan.salvage_between(route_u, pos_u, pos_u + 1);
            let segment_tags = plan.segment_store_tags(route_u, pos_u, pos_u + 1);

            let u_stores = plan.stores_after_exchange(route_u, Some((pos_u, pos_u + 1)), &[]);
            let v_stores = plan.stores_after_exchange(route_v, None, &segment_tags);

            delta_cost += cost_evaluator
                .weight_penalty(plan.route(route_u).weight() - weight_diff, data.weight_capacity());
            delta_cost += cost_evaluator
                .volume_penalty(plan.route(route_u).volume() - volume_diff, data.volume_capacity());
            delta_cost += cost_evaluator
                .salvage_penalty(plan.route(route_u).salvage() - salvage_diff, data.salvage_capacity());
            delta_cost += cost_evaluator.stores_penalty(u_stores, data.route_store_limit());

            delta_cost -=
                cost_evaluator.weight_penalty(plan.route(route_u).weight(), data.weight_capacity());
            delta_cost -=
                cost_evaluator.volume_penalty(plan.route(route_u).volume(), data.volume_capacity());
            delta_cost -=
                cost_evaluator.salvage_penalty(plan.route(route_u).salvage(), data.salvage_capacity());
            delta_cost -=
                cost_evaluator.stores_penalty(plan.route(route_u).stores(), data.route_store_limit());

            if delta_cost >= Cost::ZERO {
                // the delta of U's route alone is not enough: even without V's route, the
                // move can never be good
                return delta_cost;
            }

            delta_cost += cost_evaluator
                .weight_penalty(plan.route(route_v).weight() + weight_diff, data.weight_capacity());
            delta_cost += cost_evaluator
                .volume_penalty(plan.route(route_v).volume() + volume_diff, data.volume_capacity());
            delta_cost += cost_evaluator
                .salvage_penalty(plan.route(route_v).salvage() + salvage_diff, data.salvage_capacity());
            delta_cost += cost_evaluator.stores_penalty(v_stores, data.route_store_limit());

            delta_cost -=
                cost_evaluator.weight_penalty(plan.route(route_v).weight(), data.weight_capacity());
            delta_cost -=
                cost_evaluator.volume_penalty(plan.route(route_v).volume(), data.volume_capacity());
            delta_cost -=
                cost_evaluator.salvage_penalty(plan.route(route_v).salvage(), data.salvage_capacity());
            delta_cost -=
                cost_evaluator.stores_penalty(plan.route(route_v).stores(), data.route_store_limit());

            let v_tws = TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [
                    plan.node(v).tw_before,
                    plan.node(next_u).tw,
                    plan.node(u).tw,
                    plan.node(plan.next(v)).tw_after,
                ],
            );

            delta_cost += cost_evaluator.tw_penalty(v_tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route_v).time_warp());
        } else {
            let route = route_u;

            if !plan.route(route).has_time_warp() && delta_cost >= Cost::ZERO {
                return delta_cost;
            }

            let tws = if pos_u < pos_v {
                TimeWindowSegment::merge_all(
                    data.duration_matrix(),
                    [
                        plan.node(plan.prev(u)).tw_before,
                        plan.tw_between(route, pos_u + 2, pos_v),
                        plan.node(next_u).tw,
                        plan.node(u).tw,
                        plan.node(plan.next(v)).tw_after,
                    ],
                )
            } else {
                TimeWindowSegment::merge_all(
                    data.duration_matrix(),
                    [
                        plan.node(v).tw_before,
                        plan.node(next_u).tw,
                        plan.node(u).tw,
                        plan.tw_between(route, pos_v + 1, pos_u - 1),
                        plan.node(plan.next(next_u)).tw_after,
                    ],
                )
            };

            delta_cost += cost_evaluator.tw_penalty(tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route).time_warp());
        }

        delta_cost
    }

    fn apply(&self, plan: &mut RoutePlan, u: NodeIndex, v: NodeIndex) {
        // copy the successor, the first insert below rewires it
        let x = plan.next(u);

        plan.insert_after(u, v);
        plan.insert_after(x, v);
    }
}
