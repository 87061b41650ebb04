#[cfg(test)]
#[path = "../../tests/unit/search/two_opt_test.rs"]
mod two_opt_test;

use crate::models::common::{Cost, TimeWindowSegment};
use crate::models::problem::ProblemData;
use crate::models::CostEvaluator;
use crate::search::operator::{NodeOperator, SequencePolicy, SEQUENCE_VIOLATION_COST};
use crate::search::route::{NodeIndex, RouteIndex, RoutePlan};
use std::sync::Arc;

/// A 2-opt move: within a single route it reverses the segment between `n(U)` and `V`;
/// between two routes it exchanges the tails following `U` and `V`.
pub struct TwoOpt {
    data: Arc<ProblemData>,
    policy: SequencePolicy,
}

impl TwoOpt {
    /// Creates a new 2-opt operator without a sequence rule.
    pub fn new(data: Arc<ProblemData>) -> Self {
        Self::with_policy(data, SequencePolicy::default())
    }

    /// Creates a new 2-opt operator with the given sequence policy.
    pub fn with_policy(data: Arc<ProblemData>, policy: SequencePolicy) -> Self {
        Self { data, policy }
    }

    fn eval_within_route(
        &self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        let data = self.data.as_ref();

        if plan.node(u).position + 1 >= plan.node(v).position {
            return Cost::ZERO;
        }

        let route = plan.route_of(u).expect("U belongs to a route");

        let delta_dist = data.dist(plan.node(u).client, plan.node(v).client)
            + data.dist(plan.node(plan.next(u)).client, plan.node(plan.next(v)).client)
            + plan.node(v).cumulated_reversal_distance
            - data.dist(plan.node(u).client, plan.node(plan.next(u)).client)
            - data.dist(plan.node(v).client, plan.node(plan.next(v)).client)
            - plan.node(plan.next(u)).cumulated_reversal_distance;

        let mut delta_cost = Cost::from(delta_dist);

        if !plan.route(route).has_time_warp() && delta_cost >= Cost::ZERO {
            return delta_cost;
        }

        // the reversed segment is traversed from V back to n(U)
        let mut tws = plan.node(u).tw_before;
        let mut node = v;

        while node != u {
            tws = TimeWindowSegment::merge(data.duration_matrix(), tws, plan.node(node).tw);
            node = plan.prev(node);
        }

        tws = TimeWindowSegment::merge(data.duration_matrix(), tws, plan.node(plan.next(v)).tw_after);

        delta_cost += cost_evaluator.tw_penalty(tws.total_time_warp());
        delta_cost -= cost_evaluator.tw_penalty(plan.route(route).time_warp());

        delta_cost
    }

    fn eval_between_routes(
        &self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        let data = self.data.as_ref();

        let route_u = plan.route_of(u).expect("U belongs to a route");
        let route_v = plan.route_of(v).expect("V belongs to a route");

        let current = data.dist(plan.node(u).client, plan.node(plan.next(u)).client)
            + data.dist(plan.node(v).client, plan.node(plan.next(v)).client);
        let proposed = data.dist(plan.node(u).client, plan.node(plan.next(v)).client)
            + data.dist(plan.node(v).client, plan.node(plan.next(u)).client);

        let mut delta_cost = Cost::from(proposed - current);

        if plan.route(route_u).is_feasible() && plan.route(route_v).is_feasible() && delta_cost >= Cost::ZERO {
            return delta_cost;
        }

        let u_tws = TimeWindowSegment::merge(
            data.duration_matrix(),
            plan.node(u).tw_before,
            plan.node(plan.next(v)).tw_after,
        );

        delta_cost += cost_evaluator.tw_penalty(u_tws.total_time_warp());
        delta_cost -= cost_evaluator.tw_penalty(plan.route(route_u).time_warp());

        let v_tws = TimeWindowSegment::merge(
            data.duration_matrix(),
            plan.node(v).tw_before,
            plan.node(plan.next(u)).tw_after,
        );

        delta_cost += cost_evaluator.tw_penalty(v_tws.total_time_warp());
        delta_cost -= cost_evaluator.tw_penalty(plan.route(route_v).time_warp());

        let delta_weight = plan.node(u).cumulated_weight - plan.node(v).cumulated_weight;
        let delta_volume = plan.node(u).cumulated_volume - plan.node(v).cumulated_volume;
        let delta_salvage = plan.node(u).cumulated_salvage - plan.node(v).cumulated_salvage;

        let tail_u = self.tail_range(plan, route_u, u);
        let tail_v = self.tail_range(plan, route_v, v);

        let tail_u_tags =
            tail_u.map(|(start, end)| plan.segment_store_tags(route_u, start, end)).unwrap_or_default();
        let tail_v_tags =
            tail_v.map(|(start, end)| plan.segment_store_tags(route_v, start, end)).unwrap_or_default();

        let u_stores = plan.stores_after_exchange(route_u, tail_u, &tail_v_tags);
        let v_stores = plan.stores_after_exchange(route_v, tail_v, &tail_u_tags);

        delta_cost += cost_evaluator
            .weight_penalty(plan.route(route_u).weight() - delta_weight, data.weight_capacity());
        delta_cost += cost_evaluator
            .volume_penalty(plan.route(route_u).volume() - delta_volume, data.volume_capacity());
        delta_cost += cost_evaluator
            .salvage_penalty(plan.route(route_u).salvage() - delta_salvage, data.salvage_capacity());
        delta_cost += cost_evaluator.stores_penalty(u_stores, data.route_store_limit());

        delta_cost -= cost_evaluator.weight_penalty(plan.route(route_u).weight(), data.weight_capacity());
        delta_cost -= cost_evaluator.volume_penalty(plan.route(route_u).volume(), data.volume_capacity());
        delta_cost -= cost_evaluator.salvage_penalty(plan.route(route_u).salvage(), data.salvage_capacity());
        delta_cost -= cost_evaluator.stores_penalty(plan.route(route_u).stores(), data.route_store_limit());

        delta_cost += cost_evaluator
            .weight_penalty(plan.route(route_v).weight() + delta_weight, data.weight_capacity());
        delta_cost += cost_evaluator
            .volume_penalty(plan.route(route_v).volume() + delta_volume, data.volume_capacity());
        delta_cost += cost_evaluator
            .salvage_penalty(plan.route(route_v).salvage() + delta_salvage, data.salvage_capacity());
        delta_cost += cost_evaluator.stores_penalty(v_stores, data.route_store_limit());

        delta_cost -= cost_evaluator.weight_penalty(plan.route(route_v).weight(), data.weight_capacity());
        delta_cost -= cost_evaluator.volume_penalty(plan.route(route_v).volume(), data.volume_capacity());
        delta_cost -= cost_evaluator.salvage_penalty(plan.route(route_v).salvage(), data.salvage_capacity());
        delta_cost -= cost_evaluator.stores_penalty(plan.route(route_v).stores(), data.route_store_limit());

        delta_cost
    }

    // The positions of the tail strictly after the given node, if non-empty.
    fn tail_range(&self, plan: &RoutePlan, route_idx: RouteIndex, node: NodeIndex) -> Option<(usize, usize)> {
        let start = plan.node(node).position + 1;
        let end = plan.route(route_idx).size();

        (start <= end).then_some((start, end))
    }

    fn apply_within_route(&self, plan: &mut RoutePlan, u: NodeIndex, v: NodeIndex) {
        let mut node = v;
        let mut insertion_point = u;
        let current_next = plan.next(u);

        // no need to move n(U) itself, the reversal pivots around it
        while node != current_next {
            let current = node;
            node = plan.prev(node);
            plan.insert_after(current, insertion_point);
            insertion_point = current;
        }
    }

    fn apply_between_routes(&self, plan: &mut RoutePlan, u: NodeIndex, v: NodeIndex) {
        let mut node_u = plan.next(u);
        let mut node_v = plan.next(v);

        let mut insert_location = u;
        while !plan.is_depot(node_v) {
            let node = node_v;
            node_v = plan.next(node_v);
            plan.insert_after(node, insert_location);
            insert_location = node;
        }

        let mut insert_location = v;
        while !plan.is_depot(node_u) {
            let node = node_u;
            node_u = plan.next(node_u);
            plan.insert_after(node, insert_location);
            insert_location = node;
        }
    }
}

impl NodeOperator for TwoOpt {
    fn evaluate(
        &mut self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        if self.policy.forbids(&self.data, plan, u, v) {
            return SEQUENCE_VIOLATION_COST;
        }

        let route_u = plan.route_of(u).expect("U belongs to a route");
        let route_v = plan.route_of(v).expect("V belongs to a route");

        // the pair is picked up again in a later iteration with the routes swapped
        if route_u > route_v {
            return Cost::ZERO;
        }

        if route_u == route_v {
            self.eval_within_route(plan, u, v, cost_evaluator)
        } else {
            self.eval_between_routes(plan, u, v, cost_evaluator)
        }
    }

    fn apply(&self, plan: &mut RoutePlan, u: NodeIndex, v: NodeIndex) {
        if plan.route_of(u) == plan.route_of(v) {
            self.apply_within_route(plan, u, v);
        } else {
            self.apply_between_routes(plan, u, v);
        }
    }
}
