#[cfg(test)]
#[path = "../../tests/unit/search/swap_star_test.rs"]
mod swap_star_test;

use crate::models::common::{Cost, Matrix, Store, TimeWindowSegment};
use crate::models::problem::ProblemData;
use crate::models::solution::Solution;
use crate::models::CostEvaluator;
use crate::search::operator::{RouteOperator, SequencePolicy};
use crate::search::route::{NodeIndex, RouteIndex, RoutePlan};
use std::sync::Arc;

/// The best, second and third best insert point of a client in a route.
#[derive(Clone, Copy, Debug)]
struct InsertPositions {
    costs: [Cost; 3],
    locs: [Option<NodeIndex>; 3],
    should_update: bool,
}

impl Default for InsertPositions {
    fn default() -> Self {
        Self { costs: [Cost::MAX; 3], locs: [None; 3], should_update: true }
    }
}

impl InsertPositions {
    fn maybe_add(&mut self, cost_insert: Cost, place_insert: NodeIndex) {
        if cost_insert >= self.costs[2] {
            return;
        }

        if cost_insert >= self.costs[1] {
            self.costs[2] = cost_insert;
            self.locs[2] = Some(place_insert);
        } else if cost_insert >= self.costs[0] {
            self.costs[2] = self.costs[1];
            self.locs[2] = self.locs[1];
            self.costs[1] = cost_insert;
            self.locs[1] = Some(place_insert);
        } else {
            self.costs[2] = self.costs[1];
            self.locs[2] = self.locs[1];
            self.costs[1] = self.costs[0];
            self.locs[1] = self.locs[0];
            self.costs[0] = cost_insert;
            self.locs[0] = Some(place_insert);
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BestMove {
    cost: Cost,
    u: Option<NodeIndex>,
    u_after: Option<NodeIndex>,
    v: Option<NodeIndex>,
    v_after: Option<NodeIndex>,
}

/// Implements the SWAP* move between two routes: one client of each route is relocated
/// into the other at its locally best position, as described in "Hybrid Genetic Search
/// for the CVRP: Open-Source Implementation and SWAP* Neighborhood" by Thibaut Vidal.
///
/// A per-(route, client) cache of removal costs and of the three cheapest insertion
/// points amortizes the O(n) route scans over the quadratic number of candidate pairs;
/// the caches are refreshed lazily through the route-changed notifications.
pub struct SwapStar {
    data: Arc<ProblemData>,
    policy: SequencePolicy,
    removal_costs: Matrix<Cost>,
    cache: Vec<InsertPositions>,
    updated: Vec<bool>,
    best: BestMove,
}

impl SwapStar {
    /// Creates a new SWAP* operator without a sequence rule.
    pub fn new(data: Arc<ProblemData>) -> Self {
        Self::with_policy(data, SequencePolicy::default())
    }

    /// Creates a new SWAP* operator with the given sequence policy.
    pub fn with_policy(data: Arc<ProblemData>, policy: SequencePolicy) -> Self {
        let num_vehicles = data.num_vehicles();
        let num_clients = data.num_clients();

        Self {
            data,
            policy,
            removal_costs: Matrix::from_data(
                num_vehicles,
                num_clients + 1,
                vec![Cost::ZERO; num_vehicles * (num_clients + 1)],
            )
            .expect("removal cost dimensions are consistent"),
            cache: vec![InsertPositions::default(); num_vehicles * (num_clients + 1)],
            updated: vec![true; num_vehicles],
            best: BestMove::default(),
        }
    }

    fn cache_index(&self, route_idx: RouteIndex, client: usize) -> usize {
        route_idx * (self.data.num_clients() + 1) + client
    }

    /// Computes the cost of removing each client of the route in place.
    fn update_removal_costs(&mut self, plan: &RoutePlan, route_idx: RouteIndex, cost_evaluator: &CostEvaluator) {
        let data = self.data.as_ref();
        let route_time_warp = plan.route(route_idx).time_warp();

        let mut u = plan.next(plan.start_depot(route_idx));
        while !plan.is_depot(u) {
            let tw_data = TimeWindowSegment::merge(
                data.duration_matrix(),
                plan.node(plan.prev(u)).tw_before,
                plan.node(plan.next(u)).tw_after,
            );

            let client_u = plan.node(u).client;
            let client_prev = plan.node(plan.prev(u)).client;
            let client_next = plan.node(plan.next(u)).client;

            let delta_dist = data.dist(client_prev, client_next)
                - data.dist(client_prev, client_u)
                - data.dist(client_u, client_next);

            self.removal_costs.set(
                route_idx,
                client_u,
                Cost::from(delta_dist) + cost_evaluator.tw_penalty(tw_data.total_time_warp())
                    - cost_evaluator.tw_penalty(route_time_warp),
            );

            u = plan.next(u);
        }
    }

    /// Recomputes the three cheapest insertion points for U in the given route.
    fn update_insertion_cost(
        &mut self,
        plan: &RoutePlan,
        route_idx: RouteIndex,
        u: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) {
        let data = self.data.as_ref();
        let route_time_warp = plan.route(route_idx).time_warp();
        let client_u = plan.node(u).client;

        let cache_idx = self.cache_index(route_idx, client_u);
        self.cache[cache_idx] = InsertPositions { should_update: false, ..InsertPositions::default() };

        let depot = plan.start_depot(route_idx);
        let first = plan.next(depot);

        // insert cost of U just after the depot (0 -> U -> ...)
        let tw_data = TimeWindowSegment::merge_all(
            data.duration_matrix(),
            [plan.node(depot).tw_before, plan.node(u).tw, plan.node(first).tw_after],
        );

        let delta_dist = data.dist(0, client_u) + data.dist(client_u, plan.node(first).client)
            - data.dist(0, plan.node(first).client);

        let delta_cost = Cost::from(delta_dist) + cost_evaluator.tw_penalty(tw_data.total_time_warp())
            - cost_evaluator.tw_penalty(route_time_warp);

        self.cache[cache_idx].maybe_add(delta_cost, depot);

        let mut v = first;
        while !plan.is_depot(v) {
            // insert cost of U just after V (V -> U -> ...)
            let client_v = plan.node(v).client;
            let next_v = plan.next(v);

            let tw_data = TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [plan.node(v).tw_before, plan.node(u).tw, plan.node(next_v).tw_after],
            );

            let delta_dist = data.dist(client_v, client_u)
                + data.dist(client_u, plan.node(next_v).client)
                - data.dist(client_v, plan.node(next_v).client);

            let delta_cost = Cost::from(delta_dist)
                + cost_evaluator.tw_penalty(tw_data.total_time_warp())
                - cost_evaluator.tw_penalty(route_time_warp);

            self.cache[cache_idx].maybe_add(delta_cost, v);

            v = next_v;
        }
    }

    /// Returns the cheapest place in V's route to insert U, excluding the positions
    /// adjacent to V itself. Falls back to inserting in place of V.
    fn get_best_insert_point(
        &mut self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> (Cost, NodeIndex) {
        let data = self.data.clone();
        let data = data.as_ref();
        let route_v = plan.route_of(v).expect("V is not a depot");
        let client_u = plan.node(u).client;

        if self.cache[self.cache_index(route_v, client_u)].should_update {
            self.update_insertion_cost(plan, route_v, u, cost_evaluator);
        }

        let positions = &self.cache[self.cache_index(route_v, client_u)];

        for idx in 0..3 {
            // only valid when the spot is not adjacent to V
            if let Some(loc) = positions.locs[idx] {
                if loc != v && plan.next(loc) != v {
                    return (positions.costs[idx], loc);
                }
            }
        }

        // as a fallback, consider inserting in the place of V
        let prev_v = plan.prev(v);
        let next_v = plan.next(v);

        let tw_data = TimeWindowSegment::merge_all(
            data.duration_matrix(),
            [plan.node(prev_v).tw_before, plan.node(u).tw, plan.node(next_v).tw_after],
        );

        let delta_dist = data.dist(plan.node(prev_v).client, client_u)
            + data.dist(client_u, plan.node(next_v).client)
            - data.dist(plan.node(prev_v).client, plan.node(next_v).client);

        let delta_cost = Cost::from(delta_dist) + cost_evaluator.tw_penalty(tw_data.total_time_warp())
            - cost_evaluator.tw_penalty(plan.route(route_v).time_warp());

        (delta_cost, prev_v)
    }

    fn stores_after_swap(
        &self,
        plan: &RoutePlan,
        route_idx: RouteIndex,
        out: NodeIndex,
        into: NodeIndex,
    ) -> Store {
        let tag_in = self.data.client(plan.node(into).client).client_store;
        let added = if tag_in == Store::NONE { vec![] } else { vec![tag_in] };
        let position = plan.node(out).position;

        plan.stores_after_exchange(route_idx, Some((position, position)), &added)
    }
}

impl RouteOperator for SwapStar {
    fn init(&mut self, solution: &Solution) {
        let _ = solution;
        self.updated.iter_mut().for_each(|updated| *updated = true);
    }

    fn evaluate(
        &mut self,
        plan: &RoutePlan,
        route_u: RouteIndex,
        route_v: RouteIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        let data = self.data.clone();

        self.best = BestMove::default();

        if self.updated[route_v] {
            self.update_removal_costs(plan, route_v, cost_evaluator);
            self.updated[route_v] = false;

            for client in 1..=data.num_clients() {
                let cache_idx = self.cache_index(route_v, client);
                self.cache[cache_idx].should_update = true;
            }
        }

        if self.updated[route_u] {
            self.update_removal_costs(plan, route_u, cost_evaluator);
            self.updated[route_u] = false;

            for client in 1..=data.num_clients() {
                let cache_idx = self.cache_index(route_u, client);
                self.cache[cache_idx].should_update = true;
            }
        }

        let mut u = plan.next(plan.start_depot(route_u));
        while !plan.is_depot(u) {
            let mut v = plan.next(plan.start_depot(route_v));
            while !plan.is_depot(v) {
                if self.policy.forbids(&data, plan, u, v) {
                    v = plan.next(v);
                    continue;
                }

                let client_u = data.client(plan.node(u).client);
                let client_v = data.client(plan.node(v).client);

                let weight_diff = client_u.demand_weight - client_v.demand_weight;
                let volume_diff = client_u.demand_volume - client_v.demand_volume;
                let salvage_diff = client_u.demand_salvage - client_v.demand_salvage;

                let u_stores = self.stores_after_swap(plan, route_u, u, v);
                let v_stores = self.stores_after_swap(plan, route_v, v, u);

                let mut delta_cost = Cost::ZERO;

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

                delta_cost += self.removal_costs.at(route_u, plan.node(u).client);
                delta_cost += self.removal_costs.at(route_v, plan.node(v).client);

                // an early filter on many moves, before the costly insertion points
                if delta_cost >= Cost::ZERO {
                    v = plan.next(v);
                    continue;
                }

                let (extra_v, u_after) = self.get_best_insert_point(plan, u, v, cost_evaluator);
                delta_cost += extra_v;

                // continuing here avoids evaluating another costly insertion point
                if delta_cost >= Cost::ZERO {
                    v = plan.next(v);
                    continue;
                }

                let (extra_u, v_after) = self.get_best_insert_point(plan, v, u, cost_evaluator);
                delta_cost += extra_u;

                if delta_cost < self.best.cost {
                    self.best = BestMove {
                        cost: delta_cost,
                        u: Some(u),
                        u_after: Some(u_after),
                        v: Some(v),
                        v_after: Some(v_after),
                    };
                }

                v = plan.next(v);
            }

            u = plan.next(u);
        }

        // positive delta costs can in principle turn negative under a complete
        // evaluation, but in practice that almost never happens
        if self.best.cost >= Cost::ZERO {
            return self.best.cost;
        }

        let (Some(u), Some(u_after), Some(v), Some(v_after)) =
            (self.best.u, self.best.u_after, self.best.v, self.best.v_after)
        else {
            return self.best.cost;
        };

        // a full evaluation of the proposed swap move, including time warp penalties
        let client_u = plan.node(u).client;
        let client_v = plan.node(v).client;

        let current = data.dist(plan.node(plan.prev(u)).client, client_u)
            + data.dist(client_u, plan.node(plan.next(u)).client)
            + data.dist(plan.node(plan.prev(v)).client, client_v)
            + data.dist(client_v, plan.node(plan.next(v)).client);

        let proposed =
            data.dist(plan.node(v_after).client, client_v) + data.dist(plan.node(u_after).client, client_u);

        let mut delta_dist = proposed - current;

        if v_after == plan.prev(u) {
            // insert in place of U
            delta_dist += data.dist(client_v, plan.node(plan.next(u)).client);
        } else {
            delta_dist += data.dist(client_v, plan.node(plan.next(v_after)).client)
                + data.dist(plan.node(plan.prev(u)).client, plan.node(plan.next(u)).client)
                - data.dist(plan.node(v_after).client, plan.node(plan.next(v_after)).client);
        }

        if u_after == plan.prev(v) {
            // insert in place of V
            delta_dist += data.dist(client_u, plan.node(plan.next(v)).client);
        } else {
            delta_dist += data.dist(client_u, plan.node(plan.next(u_after)).client)
                + data.dist(plan.node(plan.prev(v)).client, plan.node(plan.next(v)).client)
                - data.dist(plan.node(u_after).client, plan.node(plan.next(u_after)).client);
        }

        let mut delta_cost = Cost::from(delta_dist);

        // UAfter == V or VAfter == U is impossible, so the positions always differ
        let u_tws = if plan.node(v_after).position + 1 == plan.node(u).position {
            TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [plan.node(v_after).tw_before, plan.node(v).tw, plan.node(plan.next(u)).tw_after],
            )
        } else if plan.node(v_after).position < plan.node(u).position {
            TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [
                    plan.node(v_after).tw_before,
                    plan.node(v).tw,
                    plan.tw_between(route_u, plan.node(v_after).position + 1, plan.node(u).position - 1),
                    plan.node(plan.next(u)).tw_after,
                ],
            )
        } else {
            TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [
                    plan.node(plan.prev(u)).tw_before,
                    plan.tw_between(route_u, plan.node(u).position + 1, plan.node(v_after).position),
                    plan.node(v).tw,
                    plan.node(plan.next(v_after)).tw_after,
                ],
            )
        };

        delta_cost += cost_evaluator.tw_penalty(u_tws.total_time_warp());

        let v_tws = if plan.node(u_after).position + 1 == plan.node(v).position {
            TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [plan.node(u_after).tw_before, plan.node(u).tw, plan.node(plan.next(v)).tw_after],
            )
        } else if plan.node(u_after).position < plan.node(v).position {
            TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [
                    plan.node(u_after).tw_before,
                    plan.node(u).tw,
                    plan.tw_between(route_v, plan.node(u_after).position + 1, plan.node(v).position - 1),
                    plan.node(plan.next(v)).tw_after,
                ],
            )
        } else {
            TimeWindowSegment::merge_all(
                data.duration_matrix(),
                [
                    plan.node(plan.prev(v)).tw_before,
                    plan.tw_between(route_v, plan.node(v).position + 1, plan.node(u_after).position),
                    plan.node(u).tw,
                    plan.node(plan.next(u_after)).tw_after,
                ],
            )
        };

        delta_cost += cost_evaluator.tw_penalty(v_tws.total_time_warp());

        delta_cost -= cost_evaluator.tw_penalty(plan.route(route_u).time_warp());
        delta_cost -= cost_evaluator.tw_penalty(plan.route(route_v).time_warp());

        let u_client = data.client(client_u);
        let v_client = data.client(client_v);

        let u_stores = self.stores_after_swap(plan, route_u, u, v);
        let v_stores = self.stores_after_swap(plan, route_v, v, u);

        delta_cost += cost_evaluator.weight_penalty(
            plan.route(route_u).weight() - u_client.demand_weight + v_client.demand_weight,
            data.weight_capacity(),
        );
        delta_cost += cost_evaluator.volume_penalty(
            plan.route(route_u).volume() - u_client.demand_volume + v_client.demand_volume,
            data.volume_capacity(),
        );
        delta_cost += cost_evaluator.salvage_penalty(
            plan.route(route_u).salvage() - u_client.demand_salvage + v_client.demand_salvage,
            data.salvage_capacity(),
        );
        delta_cost += cost_evaluator.stores_penalty(u_stores, data.route_store_limit());

        delta_cost -= cost_evaluator.weight_penalty(plan.route(route_u).weight(), data.weight_capacity());
        delta_cost -= cost_evaluator.volume_penalty(plan.route(route_u).volume(), data.volume_capacity());
        delta_cost -= cost_evaluator.salvage_penalty(plan.route(route_u).salvage(), data.salvage_capacity());
        delta_cost -= cost_evaluator.stores_penalty(plan.route(route_u).stores(), data.route_store_limit());

        delta_cost += cost_evaluator.weight_penalty(
            plan.route(route_v).weight() + u_client.demand_weight - v_client.demand_weight,
            data.weight_capacity(),
        );
        delta_cost += cost_evaluator.volume_penalty(
            plan.route(route_v).volume() + u_client.demand_volume - v_client.demand_volume,
            data.volume_capacity(),
        );
        delta_cost += cost_evaluator.salvage_penalty(
            plan.route(route_v).salvage() + u_client.demand_salvage - v_client.demand_salvage,
            data.salvage_capacity(),
        );
        delta_cost += cost_evaluator.stores_penalty(v_stores, data.route_store_limit());

        delta_cost -= cost_evaluator.weight_penalty(plan.route(route_v).weight(), data.weight_capacity());
        delta_cost -= cost_evaluator.volume_penalty(plan.route(route_v).volume(), data.volume_capacity());
        delta_cost -= cost_evaluator.salvage_penalty(plan.route(route_v).salvage(), data.salvage_capacity());
        delta_cost -= cost_evaluator.stores_penalty(plan.route(route_v).stores(), data.route_store_limit());

        delta_cost
    }

    fn apply(&self, plan: &mut RoutePlan, _route_u: RouteIndex, _route_v: RouteIndex) {
        if let (Some(u), Some(u_after), Some(v), Some(v_after)) =
            (self.best.u, self.best.u_after, self.best.v, self.best.v_after)
        {
            plan.insert_after(u, u_after);
            plan.insert_after(v, v_after);
        }
    }

    fn update(&mut self, route: RouteIndex) {
        self.updated[route] = true;
    }
}
