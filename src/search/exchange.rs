#[cfg(test)]
#[path = "../../tests/unit/search/exchange_test.rs"]
mod exchange_test;

use crate::models::common::{Cost, TimeWindowSegment};
use crate::models::problem::ProblemData;
use crate::models::CostEvaluator;
use crate::search::operator::{NodeOperator, SequencePolicy, SEQUENCE_VIOLATION_COST};
use crate::search::route::{NodeIndex, RoutePlan};
use std::sync::Arc;

/// Exchanges `N` consecutive nodes from U's route (starting at U) with `M` consecutive
/// nodes from V's route (starting at V). As special cases, `(1, 0)` is pure relocate and
/// `(1, 1)` pure swap.
pub struct Exchange<const N: usize, const M: usize> {
    data: Arc<ProblemData>,
    policy: SequencePolicy,
}

/// A pure relocate move.
pub type Relocate = Exchange<1, 0>;

/// A pure swap move.
pub type Swap = Exchange<1, 1>;

impl<const N: usize, const M: usize> Exchange<N, M> {
    /// Creates a new exchange operator without a sequence rule.
    pub fn new(data: Arc<ProblemData>) -> Self {
        Self::with_policy(data, SequencePolicy::default())
    }

    /// Creates a new exchange operator with the given sequence policy.
    pub fn with_policy(data: Arc<ProblemData>, policy: SequencePolicy) -> Self {
        assert!(N >= M && N > 0, "N < M or N == 0 does not make sense");
        Self { data, policy }
    }

    // Tests if the segment starting at the node of the given length contains a depot.
    fn contains_depot(&self, plan: &RoutePlan, node: NodeIndex, segment_length: usize) -> bool {
        if plan.is_depot(node) {
            return true;
        }

        // size() is the position of the last client in the route, so the segment includes
        // the end depot whenever position + segment length - 1 goes past it
        let route = plan.route_of(node).expect("node is not a depot, so it has a route");
        plan.node(node).position + segment_length - 1 > plan.route(route).size()
    }

    // Tests if the segments of U and V overlap in the same route.
    fn overlap(&self, plan: &RoutePlan, u: NodeIndex, v: NodeIndex) -> bool {
        plan.route_of(u) == plan.route_of(v)
            && plan.node(u).position <= plan.node(v).position + M.max(1) - 1
            && plan.node(v).position <= plan.node(u).position + N - 1
    }

    // Tests if the segments of U and V are adjacent in the same route.
    fn adjacent(&self, plan: &RoutePlan, u: NodeIndex, v: NodeIndex) -> bool {
        if plan.route_of(u) != plan.route_of(v) {
            return false;
        }

        plan.node(u).position + N == plan.node(v).position
            || plan.node(v).position + M == plan.node(u).position
    }

    // Applied when M == 0: moves the N-segment starting at U to just after V.
    fn eval_relocate_move(
        &self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        let data = self.data.as_ref();

        let pos_u = plan.node(u).position;
        let pos_v = plan.node(v).position;
        debug_assert!(pos_u > 0);

        let route_u = plan.route_of(u).expect("U is not a depot");
        let route_v = plan.route_of(v).expect("V belongs to a route");

        let end_u = if N == 1 { u } else { plan.route_node(route_u, pos_u + N - 1) };

        let client_u = plan.node(u).client;
        let client_v = plan.node(v).client;

        let current = plan.dist_between(route_u, pos_u - 1, pos_u + N)
            + data.dist(client_v, plan.node(plan.next(v)).client);

        let proposed = data.dist(client_v, client_u)
            + plan.dist_between(route_u, pos_u, pos_u + N - 1)
            + data.dist(plan.node(end_u).client, plan.node(plan.next(v)).client)
            + data.dist(plan.node(plan.prev(u)).client, plan.node(plan.next(end_u)).client);

        let mut delta_cost = Cost::from(proposed - current);

        if route_u != route_v {
            if plan.route(route_u).is_feasible() && delta_cost >= Cost::ZERO {
                return delta_cost;
            }

            let u_tws = TimeWindowSegment::merge(
                data.duration_matrix(),
                plan.node(plan.prev(u)).tw_before,
                plan.node(plan.next(end_u)).tw_after,
            );

            delta_cost += cost_evaluator.tw_penalty(u_tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route_u).time_warp());

            let weight_diff = plan.weight_between(route_u, pos_u, pos_u + N - 1);
            let volume_diff = plan.volume_between(route_u, pos_u, pos_u + N - 1);
            let salvage_diff = plan.salvage_between(route_u, pos_u, pos_u + N - 1);
            let u_stores = plan.stores_after_exchange(route_u, Some((pos_u, pos_u + N - 1)), &[]);

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

            let segment_tags = plan.segment_store_tags(route_u, pos_u, pos_u + N - 1);
            let v_stores = plan.stores_after_exchange(route_v, None, &segment_tags);

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
                    plan.tw_between(route_u, pos_u, pos_u + N - 1),
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
                        plan.tw_between(route, pos_u + N, pos_v),
                        plan.tw_between(route, pos_u, pos_u + N - 1),
                        plan.node(plan.next(v)).tw_after,
                    ],
                )
            } else {
                TimeWindowSegment::merge_all(
                    data.duration_matrix(),
                    [
                        plan.node(v).tw_before,
                        plan.tw_between(route, pos_u, pos_u + N - 1),
                        plan.tw_between(route, pos_v + 1, pos_u - 1),
                        plan.node(plan.next(end_u)).tw_after,
                    ],
                )
            };

            delta_cost += cost_evaluator.tw_penalty(tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route).time_warp());
        }

        delta_cost
    }

    // Applied when M != 0: swaps the two segments.
    fn eval_swap_move(
        &self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        let data = self.data.as_ref();

        let pos_u = plan.node(u).position;
        let pos_v = plan.node(v).position;
        debug_assert!(pos_u > 0 && pos_v > 0);

        let route_u = plan.route_of(u).expect("U is not a depot");
        let route_v = plan.route_of(v).expect("V is not a depot");

        let end_u = if N == 1 { u } else { plan.route_node(route_u, pos_u + N - 1) };
        let end_v = if M == 1 { v } else { plan.route_node(route_v, pos_v + M - 1) };

        let current = plan.dist_between(route_u, pos_u - 1, pos_u + N)
            + plan.dist_between(route_v, pos_v - 1, pos_v + M);

        //   p(U) -> V -> ... -> endV -> n(endU)
        // + p(V) -> U -> ... -> endU -> n(endV)
        let proposed = data.dist(plan.node(plan.prev(u)).client, plan.node(v).client)
            + plan.dist_between(route_v, pos_v, pos_v + M - 1)
            + data.dist(plan.node(end_v).client, plan.node(plan.next(end_u)).client)
            + data.dist(plan.node(plan.prev(v)).client, plan.node(u).client)
            + plan.dist_between(route_u, pos_u, pos_u + N - 1)
            + data.dist(plan.node(end_u).client, plan.node(plan.next(end_v)).client);

        let mut delta_cost = Cost::from(proposed - current);

        if route_u != route_v {
            if plan.route(route_u).is_feasible()
                && plan.route(route_v).is_feasible()
                && delta_cost >= Cost::ZERO
            {
                return delta_cost;
            }

            let u_tws = TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [
                    plan.node(plan.prev(u)).tw_before,
                    plan.tw_between(route_v, pos_v, pos_v + M - 1),
                    plan.node(plan.next(end_u)).tw_after,
                ],
            );

            delta_cost += cost_evaluator.tw_penalty(u_tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route_u).time_warp());

            let weight_diff = plan.weight_between(route_u, pos_u, pos_u + N - 1)
                - plan.weight_between(route_v, pos_v, pos_v + M - 1);
            let volume_diff = plan.volume_between(route_u, pos_u, pos_u + N - 1)
                - plan.volume_between(route_v, pos_v, pos_v + M - 1);
            let salvage_diff = plan.salvage_between(route_u, pos_u, pos_u + N - 1)
                - plan.salvage_between(route_v, pos_v, pos_v + M - 1);

            let u_segment_tags = plan.segment_store_tags(route_u, pos_u, pos_u + N - 1);
            let v_segment_tags = plan.segment_store_tags(route_v, pos_v, pos_v + M - 1);

            let u_stores =
                plan.stores_after_exchange(route_u, Some((pos_u, pos_u + N - 1)), &v_segment_tags);
            let v_stores =
                plan.stores_after_exchange(route_v, Some((pos_v, pos_v + M - 1)), &u_segment_tags);

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

            let v_tws = TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [
                    plan.node(plan.prev(v)).tw_before,
                    plan.tw_between(route_u, pos_u, pos_u + N - 1),
                    plan.node(plan.next(end_v)).tw_after,
                ],
            );

            delta_cost += cost_evaluator.tw_penalty(v_tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route_v).time_warp());

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
                        plan.tw_between(route, pos_v, pos_v + M - 1),
                        plan.tw_between(route, pos_u + N, pos_v - 1),
                        plan.tw_between(route, pos_u, pos_u + N - 1),
                        plan.node(plan.next(end_v)).tw_after,
                    ],
                )
            } else {
                TimeWindowSegment::merge_all(
                    data.duration_matrix(),
                    [
                        plan.node(plan.prev(v)).tw_before,
                        plan.tw_between(route, pos_u, pos_u + N - 1),
                        plan.tw_between(route, pos_v + M, pos_u - 1),
                        plan.tw_between(route, pos_v, pos_v + M - 1),
                        plan.node(plan.next(end_u)).tw_after,
                    ],
                )
            };

            delta_cost += cost_evaluator.tw_penalty(tws.total_time_warp());
            delta_cost -= cost_evaluator.tw_penalty(plan.route(route).time_warp());
        }

        delta_cost
    }
}

impl<const N: usize, const M: usize> NodeOperator for Exchange<N, M> {
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

        if self.contains_depot(plan, u, N) || self.overlap(plan, u, v) {
            return Cost::ZERO;
        }

        if M > 0 && self.contains_depot(plan, v, M) {
            return Cost::ZERO;
        }

        if M == 0 {
            // special case where nothing in V is moved
            if u == plan.next(v) {
                return Cost::ZERO;
            }

            self.eval_relocate_move(plan, u, v, cost_evaluator)
        } else {
            // symmetric, so each unordered pair has to be evaluated only once
            if N == M && plan.node(u).client >= plan.node(v).client {
                return Cost::ZERO;
            }

            if self.adjacent(plan, u, v) {
                return Cost::ZERO;
            }

            self.eval_swap_move(plan, u, v, cost_evaluator)
        }
    }

    fn apply(&self, plan: &mut RoutePlan, u: NodeIndex, v: NodeIndex) {
        let route_u = plan.route_of(u).expect("U belongs to a route");
        let route_v = plan.route_of(v).expect("V belongs to a route");

        let pos_u = plan.node(u).position;
        let pos_v = plan.node(v).position;

        let mut u_to_insert = if N == 1 { u } else { plan.route_node(route_u, pos_u + N - 1) };
        let insert_u_after = if M == 0 { v } else { plan.route_node(route_v, pos_v + M - 1) };

        // insert the 'extra' nodes of U after the end of V's segment...
        for _ in 0..(N - M) {
            let prev = plan.prev(u_to_insert);
            plan.insert_after(u_to_insert, insert_u_after);
            u_to_insert = prev;
        }

        // ...and swap the overlapping nodes
        let (mut u, mut v) = (u, v);
        for _ in 0..M {
            plan.swap_with(u, v);
            u = plan.next(u);
            v = plan.next(v);
        }
    }
}
