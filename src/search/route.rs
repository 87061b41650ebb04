#[cfg(test)]
#[path = "../../tests/unit/search/route_test.rs"]
mod route_test;

use crate::models::common::{Distance, Duration, Load, Salvage, Store, TimeWindowSegment};
use crate::models::problem::ProblemData;
use crate::models::solution::Solution;
use crate::search::sector::CircleSector;
use hashbrown::{HashMap, HashSet};
use std::f64::consts::PI;
use std::sync::Arc;

/// An index of a node slot within a [`RoutePlan`].
pub type NodeIndex = usize;

/// An index of a route within a [`RoutePlan`].
pub type RouteIndex = usize;

/// A visit within the linked route representation, carrying cached cumulative statistics
/// which are valid after the owning route's last [`RoutePlan::update_route`] call.
#[derive(Clone, Debug, Default)]
pub struct Node {
    /// The client this node visits; 0 for depot nodes.
    pub client: usize,
    /// 1-based position within the route; 0 for the route's start depot.
    pub position: usize,
    prev: NodeIndex,
    next: NodeIndex,
    route: Option<RouteIndex>,
    /// Weight demand from the depot up to and including this node.
    pub cumulated_weight: Load,
    /// Volume demand from the depot up to and including this node.
    pub cumulated_volume: Load,
    /// Salvage demand from the depot up to and including this node.
    pub cumulated_salvage: Salvage,
    /// Distinct store tags seen from the depot up to and including this node.
    pub cumulated_stores: Store,
    /// Distance from the depot through this node.
    pub cumulated_distance: Distance,
    /// Reversed-minus-forward distance of the prefix, used by 2-opt style moves.
    pub cumulated_reversal_distance: Distance,
    /// Time window segment of this node alone.
    pub tw: TimeWindowSegment,
    /// Time window segment of the prefix from the start depot through this node.
    pub tw_before: TimeWindowSegment,
    /// Time window segment of the suffix from this node through the end depot.
    pub tw_after: TimeWindowSegment,
}

/// A single route within a [`RoutePlan`]: aggregates, feasibility flags and the angular
/// sector of its clients, all refreshed by [`RoutePlan::update_route`].
///
/// A route moves between three states: empty, populated, and dirty. Any structural
/// mutation ([`RoutePlan::insert_after`], [`RoutePlan::swap_with`],
/// [`RoutePlan::remove`]) marks the affected routes dirty; the driver must update them
/// before the next evaluation touches their cached state.
#[derive(Clone, Debug, Default)]
pub struct Route {
    start_depot: NodeIndex,
    end_depot: NodeIndex,
    nodes: Vec<NodeIndex>,
    sector: CircleSector,
    store_counts: HashMap<Store, usize>,
    weight: Load,
    volume: Load,
    salvage: Salvage,
    stores: Store,
    time_warp: Duration,
    is_weight_feasible: bool,
    is_volume_feasible: bool,
    is_salvage_feasible: bool,
    is_stores_feasible: bool,
    is_time_warp_feasible: bool,
    dirty: bool,
}

impl Route {
    /// Checks whether this route satisfies all constraints.
    pub fn is_feasible(&self) -> bool {
        !self.has_excess_weight()
            && !self.has_excess_volume()
            && !self.has_excess_salvage()
            && !self.has_excess_stores()
            && !self.has_time_warp()
    }

    /// Checks whether this route exceeds the vehicle weight capacity.
    pub fn has_excess_weight(&self) -> bool {
        !self.is_weight_feasible
    }

    /// Checks whether this route exceeds the vehicle volume capacity.
    pub fn has_excess_volume(&self) -> bool {
        !self.is_volume_feasible
    }

    /// Checks whether this route exceeds the salvage capacity.
    pub fn has_excess_salvage(&self) -> bool {
        !self.is_salvage_feasible
    }

    /// Checks whether this route visits more distinct stores than allowed.
    pub fn has_excess_stores(&self) -> bool {
        !self.is_stores_feasible
    }

    /// Checks whether this route has time warp.
    pub fn has_time_warp(&self) -> bool {
        !self.is_time_warp_feasible
    }

    /// Returns the total weight load on this route.
    pub fn weight(&self) -> Load {
        self.weight
    }

    /// Returns the total volume load on this route.
    pub fn volume(&self) -> Load {
        self.volume
    }

    /// Returns the total salvage demand on this route.
    pub fn salvage(&self) -> Salvage {
        self.salvage
    }

    /// Returns the number of distinct store tags on this route.
    pub fn stores(&self) -> Store {
        self.stores
    }

    /// Returns the total time warp on this route.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    /// Checks whether this route is empty.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the number of clients in this route.
    pub fn size(&self) -> usize {
        // the end depot is part of the node list
        self.nodes.len().max(1) - 1
    }

    /// Checks whether any client of this route carries the given store tag.
    pub fn contains_store(&self, tag: Store) -> bool {
        tag != Store::NONE && self.store_counts.contains_key(&tag)
    }

    /// Returns how often the given store tag occurs on this route.
    pub fn store_occurrences(&self, tag: Store) -> usize {
        self.store_counts.get(&tag).copied().unwrap_or(0)
    }

    /// Tests whether the circle sectors of two routes overlap with the given tolerance.
    pub fn overlaps_with(&self, other: &Route, tolerance: i32) -> bool {
        CircleSector::overlaps(&self.sector, &other.sector, tolerance)
    }
}

/// The mutable linked-node representation of a solution which local search operators
/// evaluate and mutate in place.
///
/// Node storage is a fixed slab: one slot per client plus a start and an end depot slot
/// per vehicle. Nodes move between routes through O(1) pointer surgery and are never
/// created or destroyed during search, while each route keeps an ordered vector of its
/// node slots for O(1) positional access.
pub struct RoutePlan {
    data: Arc<ProblemData>,
    nodes: Vec<Node>,
    routes: Vec<Route>,
}

impl RoutePlan {
    /// Creates an empty plan for the given problem.
    pub fn new(data: Arc<ProblemData>) -> Self {
        let num_clients = data.num_clients();
        let num_vehicles = data.num_vehicles();

        let mut nodes = vec![Node::default(); num_clients + 1 + 2 * num_vehicles];
        (0..=num_clients).for_each(|client| nodes[client].client = client);

        let routes = (0..num_vehicles)
            .map(|route_idx| {
                let start_depot = num_clients + 1 + route_idx;
                let end_depot = num_clients + 1 + num_vehicles + route_idx;

                nodes[start_depot].route = Some(route_idx);
                nodes[end_depot].route = Some(route_idx);

                Route { start_depot, end_depot, ..Route::default() }
            })
            .collect();

        Self { data, nodes, routes }
    }

    /// Returns the problem this plan is built for.
    pub fn data(&self) -> &ProblemData {
        &self.data
    }

    /// Returns the number of routes (one per vehicle).
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Returns the route with the given index.
    pub fn route(&self, route_idx: RouteIndex) -> &Route {
        &self.routes[route_idx]
    }

    /// Returns the node in the given slot.
    pub fn node(&self, node: NodeIndex) -> &Node {
        &self.nodes[node]
    }

    /// Returns the slot of the given client's node.
    pub fn client_node(&self, client: usize) -> NodeIndex {
        debug_assert!(client >= 1 && client <= self.data.num_clients());
        client
    }

    /// Returns the start depot slot of the given route.
    pub fn start_depot(&self, route_idx: RouteIndex) -> NodeIndex {
        self.routes[route_idx].start_depot
    }

    /// Returns the end depot slot of the given route.
    pub fn end_depot(&self, route_idx: RouteIndex) -> NodeIndex {
        self.routes[route_idx].end_depot
    }

    /// Returns the predecessor of the given node.
    pub fn prev(&self, node: NodeIndex) -> NodeIndex {
        self.nodes[node].prev
    }

    /// Returns the successor of the given node.
    pub fn next(&self, node: NodeIndex) -> NodeIndex {
        self.nodes[node].next
    }

    /// Returns the route the given node currently belongs to, if any.
    pub fn route_of(&self, node: NodeIndex) -> Option<RouteIndex> {
        self.nodes[node].route
    }

    /// Checks whether the given node is a depot node.
    pub fn is_depot(&self, node: NodeIndex) -> bool {
        self.nodes[node].client == 0
    }

    /// Returns the node at the given 1-based position of the route.
    pub fn route_node(&self, route_idx: RouteIndex, position: usize) -> NodeIndex {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(position > 0);

        route.nodes[position - 1]
    }

    /// Loads the given solution into the plan, resetting all node links and updating
    /// every route.
    pub fn load(&mut self, solution: &Solution) {
        for client in 0..=self.data.num_clients() {
            let client_data = self.data.client(client);

            self.nodes[client].tw = TimeWindowSegment::new(
                client,
                client_data.service_duration,
                Duration::ZERO,
                client_data.tw_early,
                client_data.tw_late,
                Duration::ZERO,
            );
            // detached until wired below; detached nodes are "not in the solution"
            self.nodes[client].route = None;
            self.nodes[client].prev = client;
            self.nodes[client].next = client;
        }

        let depot_tw = self.nodes[0].tw;

        for route_idx in 0..self.routes.len() {
            let start_depot = self.routes[route_idx].start_depot;
            let end_depot = self.routes[route_idx].end_depot;

            self.nodes[start_depot].prev = end_depot;
            self.nodes[start_depot].next = end_depot;
            self.nodes[end_depot].prev = start_depot;
            self.nodes[end_depot].next = start_depot;

            self.nodes[start_depot].tw = depot_tw;
            self.nodes[start_depot].tw_before = depot_tw;
            self.nodes[start_depot].position = 0;

            self.nodes[end_depot].tw = depot_tw;
            self.nodes[end_depot].tw_after = depot_tw;

            if let Some(route) = solution.routes().get(route_idx) {
                let mut prev = start_depot;

                for &client in route.visits() {
                    self.nodes[client].route = Some(route_idx);
                    self.nodes[client].prev = prev;
                    self.nodes[prev].next = client;
                    prev = client;
                }

                self.nodes[prev].next = end_depot;
                self.nodes[end_depot].prev = prev;
            }

            self.routes[route_idx].dirty = true;
            self.update_route(route_idx);
        }
    }

    /// Exports the current routes as client visit lists, one per vehicle.
    pub fn export(&self) -> Vec<Vec<usize>> {
        (0..self.routes.len())
            .map(|route_idx| {
                let mut visits = Vec::new();
                let mut node = self.nodes[self.routes[route_idx].start_depot].next;

                while !self.is_depot(node) {
                    visits.push(self.nodes[node].client);
                    node = self.nodes[node].next;
                }

                visits
            })
            .collect()
    }

    /// Removes the given node from its current route (if any) and inserts it directly
    /// after the `after` node. Marks the affected routes dirty.
    pub fn insert_after(&mut self, node: NodeIndex, after: NodeIndex) {
        debug_assert!(node != after);

        if let Some(route) = self.nodes[node].route {
            self.routes[route].dirty = true;

            let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
            self.nodes[prev].next = next;
            self.nodes[next].prev = prev;
        }

        let after_next = self.nodes[after].next;

        self.nodes[node].prev = after;
        self.nodes[node].next = after_next;
        self.nodes[after].next = node;
        self.nodes[after_next].prev = node;

        let route = self.nodes[after].route;
        self.nodes[node].route = route;

        if let Some(route) = route {
            self.routes[route].dirty = true;
        }
    }

    /// Exchanges the positions of two nodes, possibly across routes. Marks the affected
    /// routes dirty.
    pub fn swap_with(&mut self, first: NodeIndex, second: NodeIndex) {
        debug_assert!(first != second);

        let first_prev = self.nodes[first].prev;
        let first_next = self.nodes[first].next;
        let second_prev = self.nodes[second].prev;
        let second_next = self.nodes[second].next;

        let first_route = self.nodes[first].route;
        let second_route = self.nodes[second].route;

        self.nodes[first_prev].next = second;
        self.nodes[first_next].prev = second;
        self.nodes[second_prev].next = first;
        self.nodes[second_next].prev = first;

        self.nodes[first].prev = second_prev;
        self.nodes[first].next = second_next;
        self.nodes[second].prev = first_prev;
        self.nodes[second].next = first_next;

        self.nodes[first].route = second_route;
        self.nodes[second].route = first_route;

        if let Some(route) = first_route {
            self.routes[route].dirty = true;
        }
        if let Some(route) = second_route {
            self.routes[route].dirty = true;
        }
    }

    /// Detaches the given node from its route. Marks the route dirty.
    pub fn remove(&mut self, node: NodeIndex) {
        let route = self.nodes[node].route.expect("cannot remove a detached node");
        self.routes[route].dirty = true;

        let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        self.nodes[node].prev = node;
        self.nodes[node].next = node;
        self.nodes[node].route = None;
    }

    /// Recomputes the cached state of the given route after a structural change.
    ///
    /// The pass rebuilds the route's node vector, finds the first position where it
    /// diverges from the previous snapshot, resumes the cumulative statistics from the
    /// last unchanged node's caches, and refreshes every subsequent node, the route
    /// aggregates, the circle sector, and the prefix/suffix time window chains.
    pub fn update_route(&mut self, route_idx: RouteIndex) {
        let old_nodes = std::mem::take(&mut self.routes[route_idx].nodes);
        let nodes = self.collect_nodes(route_idx);
        self.routes[route_idx].nodes = nodes.clone();

        let mut weight = Load::ZERO;
        let mut volume = Load::ZERO;
        let mut salvage = Salvage::ZERO;
        let mut distance = Distance::ZERO;
        let mut reversal_distance = Distance::ZERO;
        let mut store_tags: HashSet<Store> = HashSet::new();
        let mut found_change = false;

        for pos in 0..nodes.len() {
            let node_idx = nodes[pos];

            if !found_change && (pos >= old_nodes.len() || node_idx != old_nodes[pos]) {
                found_change = true;

                if pos > 0 {
                    let last_unchanged = &self.nodes[nodes[pos - 1]];
                    weight = last_unchanged.cumulated_weight;
                    volume = last_unchanged.cumulated_volume;
                    salvage = last_unchanged.cumulated_salvage;
                    distance = last_unchanged.cumulated_distance;
                    reversal_distance = last_unchanged.cumulated_reversal_distance;

                    for &idx in &nodes[..pos] {
                        let tag = self.data.client(self.nodes[idx].client).client_store;
                        if tag != Store::NONE {
                            store_tags.insert(tag);
                        }
                    }
                }
            }

            if !found_change {
                continue;
            }

            let client = self.nodes[node_idx].client;
            let prev_idx = self.nodes[node_idx].prev;
            let prev_client = self.nodes[prev_idx].client;
            let client_data = self.data.client(client);

            weight += client_data.demand_weight;
            volume += client_data.demand_volume;
            salvage += client_data.demand_salvage;

            if client_data.client_store != Store::NONE {
                store_tags.insert(client_data.client_store);
            }

            distance += self.data.dist(prev_client, client);
            reversal_distance += self.data.dist(client, prev_client);
            reversal_distance -= self.data.dist(prev_client, client);

            let node = &mut self.nodes[node_idx];
            node.position = pos + 1;
            node.cumulated_weight = weight;
            node.cumulated_volume = volume;
            node.cumulated_salvage = salvage;
            node.cumulated_stores = Store::new(store_tags.len() as i64);
            node.cumulated_distance = distance;
            node.cumulated_reversal_distance = reversal_distance;

            let prev_tw_before = self.nodes[prev_idx].tw_before;
            let tw = self.nodes[node_idx].tw;
            self.nodes[node_idx].tw_before =
                TimeWindowSegment::merge(self.data.duration_matrix(), prev_tw_before, tw);
        }

        self.setup_sector(route_idx);
        self.setup_route_time_windows(route_idx);
        self.rebuild_store_counts(route_idx);

        let last = &self.nodes[*nodes.last().expect("route holds at least the end depot")];
        let (weight, volume, salvage, stores) =
            (last.cumulated_weight, last.cumulated_volume, last.cumulated_salvage, last.cumulated_stores);
        let time_warp = last.tw_before.total_time_warp();

        let route = &mut self.routes[route_idx];
        route.weight = weight;
        route.volume = volume;
        route.salvage = salvage;
        route.stores = stores;
        route.time_warp = time_warp;

        route.is_weight_feasible = weight <= self.data.weight_capacity();
        route.is_volume_feasible = volume <= self.data.volume_capacity();
        route.is_salvage_feasible = salvage <= self.data.salvage_capacity();
        route.is_stores_feasible = stores <= self.data.route_store_limit();
        route.is_time_warp_feasible = time_warp == Duration::ZERO;
        route.dirty = false;
    }

    fn collect_nodes(&self, route_idx: RouteIndex) -> Vec<NodeIndex> {
        let mut nodes = Vec::new();
        let mut node = self.routes[route_idx].start_depot;

        loop {
            node = self.nodes[node].next;
            nodes.push(node);

            if self.is_depot(node) {
                return nodes;
            }
        }
    }

    fn setup_sector(&mut self, route_idx: RouteIndex) {
        // a sector has no meaning for an empty route
        if self.routes[route_idx].nodes.len() < 2 {
            return;
        }

        let first_client = self.nodes[self.routes[route_idx].nodes[0]].client;
        let mut sector = CircleSector::new(self.client_angle(first_client));

        for pos in 0..self.routes[route_idx].nodes.len() - 1 {
            let node_idx = self.routes[route_idx].nodes[pos];
            debug_assert!(!self.is_depot(node_idx));
            sector.extend(self.client_angle(self.nodes[node_idx].client));
        }

        self.routes[route_idx].sector = sector;
    }

    fn client_angle(&self, client: usize) -> i32 {
        let depot = self.data.client(0);
        let client_data = self.data.client(client);

        let diff_x = (client_data.x - depot.x).value() as f64;
        let diff_y = (client_data.y - depot.y).value() as f64;

        CircleSector::positive_mod((32768. * diff_y.atan2(diff_x) / PI) as i32)
    }

    fn setup_route_time_windows(&mut self, route_idx: RouteIndex) {
        let mut node = *self.routes[route_idx].nodes.last().expect("route holds at least the end depot");

        loop {
            let prev = self.nodes[node].prev;
            let merged = TimeWindowSegment::merge(
                self.data.duration_matrix(),
                self.nodes[prev].tw,
                self.nodes[node].tw_after,
            );
            self.nodes[prev].tw_after = merged;
            node = prev;

            if self.is_depot(node) {
                return;
            }
        }
    }

    fn rebuild_store_counts(&mut self, route_idx: RouteIndex) {
        let mut store_counts = HashMap::new();

        for pos in 0..self.routes[route_idx].nodes.len().max(1) - 1 {
            let node_idx = self.routes[route_idx].nodes[pos];
            let tag = self.data.client(self.nodes[node_idx].client).client_store;

            if tag != Store::NONE {
                *store_counts.entry(tag).or_insert(0) += 1;
            }
        }

        self.routes[route_idx].store_counts = store_counts;
    }

    /// Calculates the time window segment of the route slice `[start, end]` (1-based,
    /// inclusive).
    pub fn tw_between(&self, route_idx: RouteIndex, start: usize, end: usize) -> TimeWindowSegment {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(0 < start && start <= end && end <= route.nodes.len());

        let mut tws = self.nodes[route.nodes[start - 1]].tw;

        for step in start..end {
            tws = TimeWindowSegment::merge(self.data.duration_matrix(), tws, self.nodes[route.nodes[step]].tw);
        }

        tws
    }

    /// Calculates the distance of the route slice `[start, end]`.
    pub fn dist_between(&self, route_idx: RouteIndex, start: usize, end: usize) -> Distance {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(start <= end && end <= route.nodes.len());

        let start_dist =
            if start == 0 { Distance::ZERO } else { self.nodes[route.nodes[start - 1]].cumulated_distance };
        let end_dist = self.nodes[route.nodes[end - 1]].cumulated_distance;

        debug_assert!(start_dist <= end_dist);

        end_dist - start_dist
    }

    /// Calculates the weight load of the route slice `[start, end]`.
    pub fn weight_between(&self, route_idx: RouteIndex, start: usize, end: usize) -> Load {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(start <= end && end <= route.nodes.len());

        let start_node =
            if start == 0 { &self.nodes[route.start_depot] } else { &self.nodes[route.nodes[start - 1]] };
        let at_start = self.data.client(start_node.client).demand_weight;

        self.nodes[route.nodes[end - 1]].cumulated_weight - start_node.cumulated_weight + at_start
    }

    /// Calculates the volume load of the route slice `[start, end]`.
    pub fn volume_between(&self, route_idx: RouteIndex, start: usize, end: usize) -> Load {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(start <= end && end <= route.nodes.len());

        let start_node =
            if start == 0 { &self.nodes[route.start_depot] } else { &self.nodes[route.nodes[start - 1]] };
        let at_start = self.data.client(start_node.client).demand_volume;

        self.nodes[route.nodes[end - 1]].cumulated_volume - start_node.cumulated_volume + at_start
    }

    /// Calculates the salvage demand of the route slice `[start, end]`.
    pub fn salvage_between(&self, route_idx: RouteIndex, start: usize, end: usize) -> Salvage {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(start <= end && end <= route.nodes.len());

        let start_node =
            if start == 0 { &self.nodes[route.start_depot] } else { &self.nodes[route.nodes[start - 1]] };
        let at_start = self.data.client(start_node.client).demand_salvage;

        self.nodes[route.nodes[end - 1]].cumulated_salvage - start_node.cumulated_salvage + at_start
    }

    /// Counts the distinct store tags within the route slice `[start, end]`. Tags may
    /// repeat along a route, so the slice is scanned instead of differencing prefix
    /// counts; slices handled by the operators span at most a handful of nodes.
    pub fn stores_between(&self, route_idx: RouteIndex, start: usize, end: usize) -> Store {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(0 < start && start <= end && end <= route.nodes.len());

        let mut tags = HashSet::new();

        for &node_idx in &route.nodes[start - 1..end] {
            let tag = self.data.client(self.nodes[node_idx].client).client_store;
            if tag != Store::NONE {
                tags.insert(tag);
            }
        }

        Store::new(tags.len() as i64)
    }

    /// Collects the store tags of the route slice `[start, end]`, repeats included and
    /// untagged clients skipped.
    pub fn segment_store_tags(&self, route_idx: RouteIndex, start: usize, end: usize) -> Vec<Store> {
        let route = &self.routes[route_idx];
        debug_assert!(!route.dirty);
        assert!(0 < start && start <= end && end <= route.nodes.len());

        route.nodes[start - 1..end]
            .iter()
            .map(|&node_idx| self.data.client(self.nodes[node_idx].client).client_store)
            .filter(|&tag| tag != Store::NONE)
            .collect()
    }

    /// Predicts the distinct store count of a route after the slice `removed` leaves it
    /// and the clients carrying `added` tags arrive. A tag is lost only when the slice
    /// holds all of its occurrences on the route, and gained only when it is absent from
    /// what remains.
    pub fn stores_after_exchange(
        &self,
        route_idx: RouteIndex,
        removed: Option<(usize, usize)>,
        added: &[Store],
    ) -> Store {
        let removed_tags =
            removed.map(|(start, end)| self.segment_store_tags(route_idx, start, end)).unwrap_or_default();
        let route = &self.routes[route_idx];

        let removed_count =
            |tag: Store| removed_tags.iter().filter(|&&candidate| candidate == tag).count();

        let mut stores = route.stores;
        let mut seen = HashSet::new();

        for &tag in &removed_tags {
            if seen.insert(tag) && route.store_occurrences(tag) == removed_count(tag) {
                stores -= Store::new(1);
            }
        }

        seen.clear();

        for &tag in added {
            if seen.insert(tag) && route.store_occurrences(tag) == removed_count(tag) {
                stores += Store::new(1);
            }
        }

        stores
    }
}
