#[cfg(test)]
#[path = "../../tests/unit/search/local_search_test.rs"]
mod local_search_test;

use crate::models::common::{Cost, Store, TimeWindowSegment};
use crate::models::problem::ProblemData;
use crate::models::solution::Solution;
use crate::models::CostEvaluator;
use crate::search::operator::{NodeOperator, RouteOperator};
use crate::search::route::{NodeIndex, RouteIndex, RoutePlan};
use crate::search::sector::CIRCLE;
use rand::seq::SliceRandom;
use rosomaxa::utils::{GenericError, GenericResult, Random};
use std::sync::Arc;

/// A granular neighbourhood: for each client (index 0, the depot, included for shape),
/// the list of client indices whose pairings with it are explored per pass.
pub type Neighbours = Vec<Vec<usize>>;

/// The local search driver: walks client neighbourhoods (node operators) or route pairs
/// (route operators) and greedily applies improving moves until no operator finds one.
///
/// Within a pass the evaluation order of pairs is deterministic given a fixed
/// neighbourhood; [`LocalSearch::shuffle`] lets the outer metaheuristic randomize the
/// exploration order between searches.
pub struct LocalSearch {
    data: Arc<ProblemData>,
    plan: RoutePlan,
    neighbours: Neighbours,
    order_nodes: Vec<usize>,
    order_routes: Vec<RouteIndex>,
    last_modified: Vec<i64>,
    node_ops: Vec<Box<dyn NodeOperator>>,
    route_ops: Vec<Box<dyn RouteOperator>>,
    search_completed: bool,
    num_moves: i64,
}

impl LocalSearch {
    /// Creates a new local search over the given problem and granular neighbourhood.
    pub fn new(data: Arc<ProblemData>, neighbours: Neighbours) -> GenericResult<Self> {
        let mut search = Self {
            plan: RoutePlan::new(data.clone()),
            neighbours: vec![Vec::new(); data.num_clients() + 1],
            order_nodes: (1..=data.num_clients()).collect(),
            order_routes: (0..data.num_vehicles()).collect(),
            last_modified: vec![-1; data.num_vehicles()],
            node_ops: Vec::new(),
            route_ops: Vec::new(),
            search_completed: false,
            num_moves: 0,
            data,
        };

        search.set_neighbours(neighbours)?;

        Ok(search)
    }

    /// Adds a node operator to the search.
    pub fn add_node_operator(&mut self, op: Box<dyn NodeOperator>) {
        self.node_ops.push(op);
    }

    /// Adds a route operator to the search.
    pub fn add_route_operator(&mut self, op: Box<dyn RouteOperator>) {
        self.route_ops.push(op);
    }

    /// Replaces the granular neighbourhood, validating its shape: one (possibly empty)
    /// list per client, no list containing the client itself or the depot, and at least
    /// one non-empty list.
    pub fn set_neighbours(&mut self, neighbours: Neighbours) -> GenericResult<()> {
        if neighbours.len() != self.data.num_clients() + 1 {
            return Err(GenericError::from("neighbourhood dimensions do not match"));
        }

        for (client, candidates) in neighbours.iter().enumerate() {
            if candidates.iter().any(|&candidate| candidate == client || candidate == 0) {
                return Err(GenericError::from(format!(
                    "neighbourhood of client {client} contains itself or the depot"
                )));
            }
        }

        if neighbours.iter().all(|candidates| candidates.is_empty()) {
            return Err(GenericError::from("neighbourhood is empty"));
        }

        self.neighbours = neighbours;

        Ok(())
    }

    /// Returns the current granular neighbourhood.
    pub fn neighbours(&self) -> &Neighbours {
        &self.neighbours
    }

    /// Shuffles the exploration order of nodes, routes and operators.
    pub fn shuffle(&mut self, random: &(dyn Random + Send + Sync)) {
        self.order_nodes.shuffle(&mut random.get_rng());
        self.node_ops.shuffle(&mut random.get_rng());

        self.order_routes.shuffle(&mut random.get_rng());
        self.route_ops.shuffle(&mut random.get_rng());
    }

    /// Improves the given solution with the registered node operators until no improving
    /// move remains in the neighbourhood.
    pub fn search(&mut self, solution: &Solution, cost_evaluator: &CostEvaluator) -> GenericResult<Solution> {
        self.load_solution(solution);

        if self.node_ops.is_empty() {
            return Err(GenericError::from("no known node operators"));
        }

        // tracks when nodes were last tested (via num_moves), while last_modified tracks
        // when a route was last actually changed
        let mut last_tested_nodes = vec![-1_i64; self.data.num_clients() + 1];
        self.last_modified = vec![0; self.data.num_vehicles()];

        self.search_completed = false;
        self.num_moves = 0;

        let mut step = 0;
        while !self.search_completed {
            self.search_completed = true;

            // node operators are evaluated at neighbouring (U, V) pairs
            for order_idx in 0..self.order_nodes.len() {
                let u_client = self.order_nodes[order_idx];
                let u = self.plan.client_node(u_client);

                let last_tested_node = last_tested_nodes[u_client];
                last_tested_nodes[u_client] = self.num_moves;

                // test removing U when it is optional
                if self.plan.route_of(u).is_some() && !self.data.client(u_client).required {
                    self.maybe_remove(u, cost_evaluator);
                }

                for neighbour_idx in 0..self.neighbours[u_client].len() {
                    let v = self.plan.client_node(self.neighbours[u_client][neighbour_idx]);

                    // U is not in the solution, so try inserting it into V's route
                    if self.plan.route_of(u).is_none() && self.plan.route_of(v).is_some() {
                        self.maybe_insert(u, v, cost_evaluator);
                    }

                    let (Some(route_u), Some(route_v)) = (self.plan.route_of(u), self.plan.route_of(v))
                    else {
                        continue;
                    };

                    if self.last_modified[route_u] > last_tested_node
                        || self.last_modified[route_v] > last_tested_node
                    {
                        if self.apply_node_ops(u, v, cost_evaluator) {
                            continue;
                        }

                        let prev_v = self.plan.prev(v);
                        if self.plan.is_depot(prev_v) && self.apply_node_ops(u, prev_v, cost_evaluator) {
                            continue;
                        }
                    }
                }

                // empty moves are not tested initially to avoid using too many routes
                if step > 0 {
                    let empty = (0..self.plan.num_routes()).find(|&route| self.plan.route(route).is_empty());

                    let Some(empty) = empty else {
                        continue;
                    };

                    let depot = self.plan.start_depot(empty);

                    if self.plan.route_of(u).is_some() {
                        self.apply_node_ops(u, depot, cost_evaluator);
                    } else {
                        self.maybe_insert(u, depot, cost_evaluator);
                    }
                }
            }

            step += 1;
        }

        Solution::new(&self.data, self.plan.export())
    }

    /// Improves the given solution with the registered route operators, visiting pairs
    /// of routes whose circle sectors overlap within the given tolerance (in degrees).
    pub fn intensify(
        &mut self,
        solution: &Solution,
        cost_evaluator: &CostEvaluator,
        overlap_tolerance_degrees: i32,
    ) -> GenericResult<Solution> {
        self.load_solution(solution);

        if self.route_ops.is_empty() {
            return Err(GenericError::from("no known route operators"));
        }

        let overlap_tolerance = overlap_tolerance_degrees * CIRCLE / 360;

        let mut last_tested_routes = vec![-1_i64; self.data.num_vehicles()];
        self.last_modified = vec![0; self.data.num_vehicles()];

        self.search_completed = false;
        self.num_moves = 0;

        while !self.search_completed {
            self.search_completed = true;

            for order_idx in 0..self.order_routes.len() {
                let route_u = self.order_routes[order_idx];

                if self.plan.route(route_u).is_empty() {
                    continue;
                }

                let last_tested = last_tested_routes[route_u];
                last_tested_routes[route_u] = self.num_moves;

                for route_v in 0..route_u {
                    if self.plan.route(route_v).is_empty()
                        || !self.plan.route(route_u).overlaps_with(self.plan.route(route_v), overlap_tolerance)
                    {
                        continue;
                    }

                    let last_modified_route =
                        self.last_modified[route_u].max(self.last_modified[route_v]);

                    if last_modified_route > last_tested
                        && self.apply_route_ops(route_u, route_v, cost_evaluator)
                    {
                        continue;
                    }
                }
            }
        }

        Solution::new(&self.data, self.plan.export())
    }

    fn apply_node_ops(&mut self, u: NodeIndex, v: NodeIndex, cost_evaluator: &CostEvaluator) -> bool {
        for op_idx in 0..self.node_ops.len() {
            if self.node_ops[op_idx].evaluate(&self.plan, u, v, cost_evaluator) < Cost::ZERO {
                // copy the route indices, the operator changes route membership
                let route_u = self.plan.route_of(u).expect("U belongs to a route");
                let route_v = self.plan.route_of(v).expect("V belongs to a route");

                self.node_ops[op_idx].apply(&mut self.plan, u, v);
                self.update(route_u, route_v);

                return true;
            }
        }

        false
    }

    fn apply_route_ops(&mut self, route_u: RouteIndex, route_v: RouteIndex, cost_evaluator: &CostEvaluator) -> bool {
        for op_idx in 0..self.route_ops.len() {
            if self.route_ops[op_idx].evaluate(&self.plan, route_u, route_v, cost_evaluator) < Cost::ZERO {
                self.route_ops[op_idx].apply(&mut self.plan, route_u, route_v);
                self.update(route_u, route_v);

                // keeps operator caches (notably SWAP*) in sync
                for op in self.route_ops.iter_mut() {
                    op.update(route_u);
                    op.update(route_v);
                }

                return true;
            }
        }

        false
    }

    /// Tries inserting the detached node U into V's route, right after V.
    fn maybe_insert(&mut self, u: NodeIndex, v: NodeIndex, cost_evaluator: &CostEvaluator) {
        debug_assert!(self.plan.route_of(u).is_none() && self.plan.route_of(v).is_some());

        let data = self.data.as_ref();
        let plan = &self.plan;

        let route_v = plan.route_of(v).expect("V belongs to a route");
        let client_u = data.client(plan.node(u).client);

        let delta_dist = data.dist(plan.node(v).client, plan.node(u).client)
            + data.dist(plan.node(u).client, plan.node(plan.next(v)).client)
            - data.dist(plan.node(v).client, plan.node(plan.next(v)).client);

        let mut delta_cost = Cost::from(delta_dist) - client_u.prize;

        let added = if client_u.client_store == Store::NONE { vec![] } else { vec![client_u.client_store] };
        let v_stores = plan.stores_after_exchange(route_v, None, &added);

        delta_cost += cost_evaluator
            .weight_penalty(plan.route(route_v).weight() + client_u.demand_weight, data.weight_capacity());
        delta_cost += cost_evaluator
            .volume_penalty(plan.route(route_v).volume() + client_u.demand_volume, data.volume_capacity());
        delta_cost += cost_evaluator
            .salvage_penalty(plan.route(route_v).salvage() + client_u.demand_salvage, data.salvage_capacity());
        delta_cost += cost_evaluator.stores_penalty(v_stores, data.route_store_limit());

        delta_cost -= cost_evaluator.weight_penalty(plan.route(route_v).weight(), data.weight_capacity());
        delta_cost -= cost_evaluator.volume_penalty(plan.route(route_v).volume(), data.volume_capacity());
        delta_cost -= cost_evaluator.salvage_penalty(plan.route(route_v).salvage(), data.salvage_capacity());
        delta_cost -= cost_evaluator.stores_penalty(plan.route(route_v).stores(), data.route_store_limit());

        // adding U cannot decrease the time warp in V's route by more than this bound
        if delta_cost >= cost_evaluator.tw_penalty(plan.route(route_v).time_warp()) {
            return;
        }

        let v_tws = TimeWindowSegment::merge_all(
            data.duration_matrix(),
            [plan.node(v).tw_before, plan.node(u).tw, plan.node(plan.next(v)).tw_after],
        );

        delta_cost += cost_evaluator.tw_penalty(v_tws.total_time_warp());
        delta_cost -= cost_evaluator.tw_penalty(plan.route(route_v).time_warp());

        if delta_cost < Cost::ZERO {
            // U has no route, so there is nothing to update on its side
            self.plan.insert_after(u, v);
            self.update(route_v, route_v);
        }
    }

    /// Tries removing the optional node U from its route, collecting no prize for it.
    fn maybe_remove(&mut self, u: NodeIndex, cost_evaluator: &CostEvaluator) {
        let data = self.data.as_ref();
        let plan = &self.plan;

        let route_u = plan.route_of(u).expect("U belongs to a route");
        let client_u = data.client(plan.node(u).client);
        let pos_u = plan.node(u).position;

        let delta_dist = data.dist(plan.node(plan.prev(u)).client, plan.node(plan.next(u)).client)
            - data.dist(plan.node(plan.prev(u)).client, plan.node(u).client)
            - data.dist(plan.node(u).client, plan.node(plan.next(u)).client);

        let mut delta_cost = Cost::from(delta_dist) + client_u.prize;

        let u_stores = plan.stores_after_exchange(route_u, Some((pos_u, pos_u)), &[]);

        delta_cost += cost_evaluator
            .weight_penalty(plan.route(route_u).weight() - client_u.demand_weight, data.weight_capacity());
        delta_cost += cost_evaluator
            .volume_penalty(plan.route(route_u).volume() - client_u.demand_volume, data.volume_capacity());
        delta_cost += cost_evaluator
            .salvage_penalty(plan.route(route_u).salvage() - client_u.demand_salvage, data.salvage_capacity());
        delta_cost += cost_evaluator.stores_penalty(u_stores, data.route_store_limit());

        delta_cost -= cost_evaluator.weight_penalty(plan.route(route_u).weight(), data.weight_capacity());
        delta_cost -= cost_evaluator.volume_penalty(plan.route(route_u).volume(), data.volume_capacity());
        delta_cost -= cost_evaluator.salvage_penalty(plan.route(route_u).salvage(), data.salvage_capacity());
        delta_cost -= cost_evaluator.stores_penalty(plan.route(route_u).stores(), data.route_store_limit());

        let u_tws = TimeWindowSegment::merge(
            data.duration_matrix(),
            plan.node(plan.prev(u)).tw_before,
            plan.node(plan.next(u)).tw_after,
        );

        delta_cost += cost_evaluator.tw_penalty(u_tws.total_time_warp());
        delta_cost -= cost_evaluator.tw_penalty(plan.route(route_u).time_warp());

        if delta_cost < Cost::ZERO {
            self.plan.remove(u);
            self.update(route_u, route_u);
        }
    }

    fn update(&mut self, route_u: RouteIndex, route_v: RouteIndex) {
        self.num_moves += 1;
        self.search_completed = false;

        self.plan.update_route(route_u);
        self.last_modified[route_u] = self.num_moves;

        if route_u != route_v {
            self.plan.update_route(route_v);
            self.last_modified[route_v] = self.num_moves;
        }
    }

    fn load_solution(&mut self, solution: &Solution) {
        self.plan.load(solution);

        for op in self.route_ops.iter_mut() {
            op.init(solution);
        }
    }
}
