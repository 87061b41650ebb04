#[cfg(test)]
#[path = "../../../tests/unit/models/problem/problem_test.rs"]
mod problem_test;

use crate::models::common::{Coordinate, Cost, Distance, Duration, Load, Matrix, Salvage, Store};
use rosomaxa::utils::{GenericError, GenericResult};

/// Describes a single client visit (or the depot, at index 0 of [`ProblemData`]).
#[derive(Clone, Debug)]
pub struct Client {
    /// A x coordinate of the client location.
    pub x: Coordinate,
    /// A y coordinate of the client location.
    pub y: Coordinate,
    /// A weight demand delivered to the client.
    pub demand_weight: Load,
    /// A volume demand delivered to the client.
    pub demand_volume: Load,
    /// A salvage pickup demand collected at the client.
    pub demand_salvage: Salvage,
    /// An order tag, `-1` when the client carries none.
    pub client_order: i64,
    /// A store tag, [`Store::NONE`] when the client belongs to no store.
    pub client_store: Store,
    /// A service duration spent at the client.
    pub service_duration: Duration,
    /// Earliest possible start of service.
    pub tw_early: Duration,
    /// Latest possible start of service.
    pub tw_late: Duration,
    /// A prize collected when the client is visited.
    pub prize: Cost,
    /// Whether the client must be part of a solution.
    pub required: bool,
}

impl Client {
    /// Creates a new client, validating its data.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: Coordinate,
        y: Coordinate,
        demand_weight: Load,
        demand_volume: Load,
        demand_salvage: Salvage,
        client_order: i64,
        client_store: Store,
        service_duration: Duration,
        tw_early: Duration,
        tw_late: Duration,
        prize: Cost,
        required: bool,
    ) -> GenericResult<Self> {
        if demand_weight < Load::ZERO {
            return Err(GenericError::from("demand_weight must be >= 0"));
        }

        if demand_volume < Load::ZERO {
            return Err(GenericError::from("demand_volume must be >= 0"));
        }

        if demand_salvage < Salvage::ZERO {
            return Err(GenericError::from("demand_salvage must be >= 0"));
        }

        if client_order < -1 {
            return Err(GenericError::from("client_order must be >= -1"));
        }

        if client_store < Store::NONE {
            return Err(GenericError::from("client_store must be >= -1"));
        }

        if service_duration < Duration::ZERO {
            return Err(GenericError::from("service_duration must be >= 0"));
        }

        if tw_early > tw_late {
            return Err(GenericError::from("tw_early must be <= tw_late"));
        }

        if prize < Cost::ZERO {
            return Err(GenericError::from("prize must be >= 0"));
        }

        Ok(Self {
            x,
            y,
            demand_weight,
            demand_volume,
            demand_salvage,
            client_order,
            client_store,
            service_duration,
            tw_early,
            tw_late,
            prize,
            required,
        })
    }

    /// Checks whether the client receives a delivery (weight or volume demand).
    pub fn is_delivery(&self) -> bool {
        self.demand_weight > Load::ZERO || self.demand_volume > Load::ZERO
    }

    /// Checks whether a salvage pickup happens at the client.
    pub fn is_salvage(&self) -> bool {
        self.demand_salvage > Salvage::ZERO
    }
}

/// An immutable snapshot of the problem instance: clients (depot included at index 0),
/// fleet size, per-vehicle capacities, and the distance/duration matrices.
pub struct ProblemData {
    clients: Vec<Client>,
    centroid: (f64, f64),
    dist: Matrix<Distance>,
    dur: Matrix<Duration>,
    num_clients: usize,
    num_vehicles: usize,
    weight_capacity: Load,
    volume_capacity: Load,
    salvage_capacity: Salvage,
    order_route_limit: i64,
    route_store_limit: Store,
}

impl ProblemData {
    /// Creates a new problem snapshot with the given data. The list of clients is assumed
    /// to contain the depot at index 0, so both matrices are one longer per side than the
    /// number of clients.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clients: Vec<Client>,
        num_vehicles: usize,
        weight_capacity: Load,
        volume_capacity: Load,
        salvage_capacity: Salvage,
        order_route_limit: i64,
        route_store_limit: Store,
        dist: Matrix<Distance>,
        dur: Matrix<Duration>,
    ) -> GenericResult<Self> {
        if clients.is_empty() {
            return Err(GenericError::from("client list must contain at least the depot"));
        }

        if !dist.is_square_of(clients.len()) || !dur.is_square_of(clients.len()) {
            return Err(GenericError::from(format!(
                "matrices must be square of side {}, got {}x{} and {}x{}",
                clients.len(),
                dist.rows(),
                dist.cols(),
                dur.rows(),
                dur.cols()
            )));
        }

        let num_clients = clients.len() - 1;
        let centroid = clients.iter().skip(1).fold((0., 0.), |acc, client| {
            (
                acc.0 + client.x.value() as f64 / num_clients as f64,
                acc.1 + client.y.value() as f64 / num_clients as f64,
            )
        });

        Ok(Self {
            clients,
            centroid,
            dist,
            dur,
            num_clients,
            num_vehicles,
            weight_capacity,
            volume_capacity,
            salvage_capacity,
            order_route_limit,
            route_store_limit,
        })
    }

    /// Returns the client with the given index.
    pub fn client(&self, client: usize) -> &Client {
        &self.clients[client]
    }

    /// Returns the depot.
    pub fn depot(&self) -> &Client {
        self.client(0)
    }

    /// Returns the centroid of client locations.
    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    /// Returns the travel distance between the two given clients.
    pub fn dist(&self, first: usize, second: usize) -> Distance {
        self.dist.at(first, second)
    }

    /// Returns the travel duration between the two given clients.
    pub fn duration(&self, first: usize, second: usize) -> Duration {
        self.dur.at(first, second)
    }

    /// Returns the full travel distance matrix.
    pub fn distance_matrix(&self) -> &Matrix<Distance> {
        &self.dist
    }

    /// Returns the full travel duration matrix.
    pub fn duration_matrix(&self) -> &Matrix<Duration> {
        &self.dur
    }

    /// Returns the total number of clients (the depot excluded).
    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// Returns the number of available vehicles.
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// Returns the weight capacity of each vehicle.
    pub fn weight_capacity(&self) -> Load {
        self.weight_capacity
    }

    /// Returns the volume capacity of each vehicle.
    pub fn volume_capacity(&self) -> Load {
        self.volume_capacity
    }

    /// Returns the salvage pickup capacity of each route.
    pub fn salvage_capacity(&self) -> Salvage {
        self.salvage_capacity
    }

    /// Returns the limit on distinct order tags per route. The limit is carried for
    /// integrators; no search constraint consumes it.
    pub fn order_route_limit(&self) -> i64 {
        self.order_route_limit
    }

    /// Returns the limit on distinct store tags per route.
    pub fn route_store_limit(&self) -> Store {
        self.route_store_limit
    }
}
