#[cfg(test)]
#[path = "../../../tests/unit/models/solution/solution_test.rs"]
mod solution_test;

use crate::models::common::{Cost, Distance, Duration, Load, Salvage, Store};
use crate::models::problem::ProblemData;
use hashbrown::HashSet;
use rosomaxa::utils::{GenericError, GenericResult};

/// An immutable route of a [`Solution`]: the ordered client visits plus statistics
/// evaluated once at construction.
#[derive(Clone, Debug, Default)]
pub struct Route {
    visits: Vec<usize>,
    distance: Distance,
    demand_weight: Load,
    demand_volume: Load,
    demand_salvage: Salvage,
    stores: Store,
    excess_weight: Load,
    excess_volume: Load,
    excess_salvage: Salvage,
    excess_stores: Store,
    duration: Duration,
    service: Duration,
    time_warp: Duration,
    wait: Duration,
    prizes: Cost,
    centroid: (f64, f64),
}

impl Route {
    /// Evaluates a new route over the given visits.
    pub fn new(data: &ProblemData, visits: Vec<usize>) -> Self {
        let mut route = Route { visits, ..Route::default() };

        if route.visits.is_empty() {
            return route;
        }

        let mut time = data.depot().tw_early;
        let mut prev_client = 0;
        let mut store_tags = HashSet::new();

        for idx in 0..route.visits.len() {
            let visit = route.visits[idx];
            let client = data.client(visit);

            route.distance += data.dist(prev_client, visit);
            route.duration += data.duration(prev_client, visit);
            route.demand_weight += client.demand_weight;
            route.demand_volume += client.demand_volume;
            route.demand_salvage += client.demand_salvage;
            route.service += client.service_duration;
            route.prizes += client.prize;

            if client.client_store != Store::NONE {
                store_tags.insert(client.client_store);
            }

            route.centroid.0 += client.x.value() as f64 / route.visits.len() as f64;
            route.centroid.1 += client.y.value() as f64 / route.visits.len() as f64;

            time += data.client(prev_client).service_duration + data.duration(prev_client, visit);

            if time < client.tw_early {
                route.wait += client.tw_early - time;
                time = client.tw_early;
            }

            if time > client.tw_late {
                route.time_warp += time - client.tw_late;
                time = client.tw_late;
            }

            prev_client = visit;
        }

        let last = *route.visits.last().expect("route is not empty");
        route.distance += data.dist(last, 0);
        route.duration += data.duration(last, 0);

        time += data.client(last).service_duration + data.duration(last, 0);
        route.time_warp += (time - data.depot().tw_late).max(Duration::ZERO);

        route.stores = Store::new(store_tags.len() as i64);

        route.excess_weight = (route.demand_weight - data.weight_capacity()).max(Load::ZERO);
        route.excess_volume = (route.demand_volume - data.volume_capacity()).max(Load::ZERO);
        route.excess_salvage = (route.demand_salvage - data.salvage_capacity()).max(Salvage::ZERO);
        route.excess_stores = (route.stores - data.route_store_limit()).max(Store::ZERO);

        route
    }

    /// Checks whether this route is empty.
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    /// Returns the number of clients in this route.
    pub fn size(&self) -> usize {
        self.visits.len()
    }

    /// Returns the client visits in traversal order.
    pub fn visits(&self) -> &[usize] {
        self.visits.as_slice()
    }

    /// Returns the total travel distance on this route.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Returns the total weight demand served on this route.
    pub fn demand_weight(&self) -> Load {
        self.demand_weight
    }

    /// Returns the total volume demand served on this route.
    pub fn demand_volume(&self) -> Load {
        self.demand_volume
    }

    /// Returns the total salvage demand collected on this route.
    pub fn demand_salvage(&self) -> Salvage {
        self.demand_salvage
    }

    /// Returns the number of distinct store tags visited by this route.
    pub fn stores(&self) -> Store {
        self.stores
    }

    /// Returns the excess weight wrt the vehicle capacity.
    pub fn excess_weight(&self) -> Load {
        self.excess_weight
    }

    /// Returns the excess volume wrt the vehicle capacity.
    pub fn excess_volume(&self) -> Load {
        self.excess_volume
    }

    /// Returns the excess salvage wrt the route salvage capacity.
    pub fn excess_salvage(&self) -> Salvage {
        self.excess_salvage
    }

    /// Returns the amount of distinct stores above the route store limit.
    pub fn excess_stores(&self) -> Store {
        self.excess_stores
    }

    /// Returns the total travel duration on this route.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns the total service duration on this route.
    pub fn service_duration(&self) -> Duration {
        self.service
    }

    /// Returns the total time warp on this route.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    /// Returns the total waiting duration on this route.
    pub fn wait_duration(&self) -> Duration {
        self.wait
    }

    /// Returns the total prize value collected on this route.
    pub fn prizes(&self) -> Cost {
        self.prizes
    }

    /// Returns the center of the route's client locations.
    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    /// Checks whether the route satisfies all constraints.
    pub fn is_feasible(&self) -> bool {
        !self.has_excess_weight()
            && !self.has_excess_volume()
            && !self.has_excess_salvage()
            && !self.has_excess_stores()
            && !self.has_time_warp()
    }

    /// Checks whether the route violates the weight capacity.
    pub fn has_excess_weight(&self) -> bool {
        self.excess_weight > Load::ZERO
    }

    /// Checks whether the route violates the volume capacity.
    pub fn has_excess_volume(&self) -> bool {
        self.excess_volume > Load::ZERO
    }

    /// Checks whether the route violates the salvage capacity.
    pub fn has_excess_salvage(&self) -> bool {
        self.excess_salvage > Salvage::ZERO
    }

    /// Checks whether the route visits more distinct stores than allowed.
    pub fn has_excess_stores(&self) -> bool {
        self.excess_stores > Store::ZERO
    }

    /// Checks whether the route violates time window constraints.
    pub fn has_time_warp(&self) -> bool {
        self.time_warp > Duration::ZERO
    }
}

/// An immutable solution: a partition of (a subset of) clients over routes, with
/// solution-level statistics evaluated once at construction.
#[derive(Clone, Debug)]
pub struct Solution {
    num_clients: usize,
    distance: Distance,
    excess_weight: Load,
    excess_volume: Load,
    excess_salvage: Salvage,
    excess_stores: Store,
    prizes: Cost,
    uncollected_prizes: Cost,
    time_warp: Duration,
    routes: Vec<Route>,
    neighbours: Vec<(usize, usize)>,
}

impl Solution {
    /// Creates a solution over the given routes, validating the partition: every required
    /// client must be visited, no client more than once, and the number of routes must not
    /// exceed the number of vehicles.
    pub fn new(data: &ProblemData, routes: Vec<Vec<usize>>) -> GenericResult<Self> {
        if routes.len() > data.num_vehicles() {
            return Err(GenericError::from("number of routes must not exceed number of vehicles"));
        }

        let mut visits = vec![0_usize; data.num_clients() + 1];
        routes.iter().flatten().for_each(|&client| visits[client] += 1);

        for client in 1..=data.num_clients() {
            if data.client(client).required && visits[client] == 0 {
                return Err(GenericError::from(format!("client {client} is required but not present")));
            }

            if visits[client] > 1 {
                return Err(GenericError::from(format!("client {client} is visited more than once")));
            }
        }

        // only non-empty routes are kept
        let routes = routes
            .into_iter()
            .filter(|visits| !visits.is_empty())
            .map(|visits| Route::new(data, visits))
            .collect::<Vec<_>>();

        let mut solution = Self {
            num_clients: 0,
            distance: Distance::ZERO,
            excess_weight: Load::ZERO,
            excess_volume: Load::ZERO,
            excess_salvage: Salvage::ZERO,
            excess_stores: Store::ZERO,
            prizes: Cost::ZERO,
            uncollected_prizes: Cost::ZERO,
            time_warp: Duration::ZERO,
            routes,
            neighbours: vec![(0, 0); data.num_clients() + 1],
        };

        solution.evaluate(data);
        solution.make_neighbours();

        Ok(solution)
    }

    fn evaluate(&mut self, data: &ProblemData) {
        let all_prizes = (1..=data.num_clients()).map(|client| data.client(client).prize).sum::<Cost>();

        for route in &self.routes {
            self.num_clients += route.size();
            self.prizes += route.prizes();
            self.distance += route.distance();
            self.time_warp += route.time_warp();
            self.excess_weight += route.excess_weight();
            self.excess_volume += route.excess_volume();
            self.excess_salvage += route.excess_salvage();
            self.excess_stores += route.excess_stores();
        }

        self.uncollected_prizes = all_prizes - self.prizes;
    }

    fn make_neighbours(&mut self) {
        for route in &self.routes {
            let visits = route.visits();
            for idx in 0..visits.len() {
                self.neighbours[visits[idx]] = (
                    if idx == 0 { 0 } else { visits[idx - 1] },
                    if idx == visits.len() - 1 { 0 } else { visits[idx + 1] },
                );
            }
        }
    }

    /// Returns the number of non-empty routes in this solution.
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Returns the number of clients in this solution.
    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// Returns the routing decisions.
    pub fn routes(&self) -> &[Route] {
        self.routes.as_slice()
    }

    /// Returns the `(pred, succ)` client pair for each client index; `(0, 0)` when the
    /// client is not part of the solution.
    pub fn neighbours(&self) -> &[(usize, usize)] {
        self.neighbours.as_slice()
    }

    /// Checks whether the solution satisfies all constraints.
    pub fn is_feasible(&self) -> bool {
        !self.has_excess_weight()
            && !self.has_excess_volume()
            && !self.has_excess_salvage()
            && !self.has_excess_stores()
            && !self.has_time_warp()
    }

    /// Checks whether the solution violates weight constraints.
    pub fn has_excess_weight(&self) -> bool {
        self.excess_weight > Load::ZERO
    }

    /// Checks whether the solution violates volume constraints.
    pub fn has_excess_volume(&self) -> bool {
        self.excess_volume > Load::ZERO
    }

    /// Checks whether the solution violates salvage constraints.
    pub fn has_excess_salvage(&self) -> bool {
        self.excess_salvage > Salvage::ZERO
    }

    /// Checks whether any route visits more distinct stores than allowed.
    pub fn has_excess_stores(&self) -> bool {
        self.excess_stores > Store::ZERO
    }

    /// Checks whether the solution violates time window constraints.
    pub fn has_time_warp(&self) -> bool {
        self.time_warp > Duration::ZERO
    }

    /// Returns the total distance over all routes.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Returns the total excess weight over all routes.
    pub fn excess_weight(&self) -> Load {
        self.excess_weight
    }

    /// Returns the total excess volume over all routes.
    pub fn excess_volume(&self) -> Load {
        self.excess_volume
    }

    /// Returns the total excess salvage over all routes.
    pub fn excess_salvage(&self) -> Salvage {
        self.excess_salvage
    }

    /// Returns the total excess of distinct stores over all routes.
    pub fn excess_stores(&self) -> Store {
        self.excess_stores
    }

    /// Returns the total collected prize value over all routes.
    pub fn prizes(&self) -> Cost {
        self.prizes
    }

    /// Returns the total prize value of all unvisited clients.
    pub fn uncollected_prizes(&self) -> Cost {
        self.uncollected_prizes
    }

    /// Returns the total time warp over all routes.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        // cheap statistics first, the neighbour list only when those match
        self.distance == other.distance
            && self.excess_weight == other.excess_weight
            && self.excess_volume == other.excess_volume
            && self.excess_salvage == other.excess_salvage
            && self.excess_stores == other.excess_stores
            && self.time_warp == other.time_warp
            && self.routes.len() == other.routes.len()
            && self.neighbours == other.neighbours
    }
}

impl Eq for Solution {}
