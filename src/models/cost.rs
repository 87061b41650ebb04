#[cfg(test)]
#[path = "../../tests/unit/models/cost_test.rs"]
mod cost_test;

use crate::models::common::{Cost, Duration, Load, Salvage, Store};
use crate::models::solution::Solution;

/// Computes penalty values for capacity, store and time window violations, and combines
/// them with distance and uncollected prizes into the penalized cost which local search
/// optimizes.
///
/// All penalties are linear in the violation, which lets move evaluators compute cost
/// deltas in O(1) by subtracting the old penalties and adding the new ones on the two
/// affected routes only.
pub struct CostEvaluator {
    weight_capacity_penalty: Cost,
    volume_capacity_penalty: Cost,
    salvage_capacity_penalty: Cost,
    stores_limit_penalty: Cost,
    time_warp_penalty: Cost,
}

impl CostEvaluator {
    /// Creates a new cost evaluator with the given non-negative penalty weights.
    pub fn new(
        weight_capacity_penalty: Cost,
        volume_capacity_penalty: Cost,
        salvage_capacity_penalty: Cost,
        stores_limit_penalty: Cost,
        time_warp_penalty: Cost,
    ) -> Self {
        Self {
            weight_capacity_penalty,
            volume_capacity_penalty,
            salvage_capacity_penalty,
            stores_limit_penalty,
            time_warp_penalty,
        }
    }

    /// Computes the excess weight penalty for the given excess load.
    pub fn weight_penalty_excess(&self, excess_weight: Load) -> Cost {
        Cost::new(excess_weight.value() * self.weight_capacity_penalty.value())
    }

    /// Computes the weight penalty for the given total load and capacity.
    pub fn weight_penalty(&self, weight: Load, capacity: Load) -> Cost {
        if weight > capacity {
            self.weight_penalty_excess(weight - capacity)
        } else {
            Cost::ZERO
        }
    }

    /// Computes the excess volume penalty for the given excess load.
    pub fn volume_penalty_excess(&self, excess_volume: Load) -> Cost {
        Cost::new(excess_volume.value() * self.volume_capacity_penalty.value())
    }

    /// Computes the volume penalty for the given total load and capacity.
    pub fn volume_penalty(&self, volume: Load, capacity: Load) -> Cost {
        if volume > capacity {
            self.volume_penalty_excess(volume - capacity)
        } else {
            Cost::ZERO
        }
    }

    /// Computes the excess salvage penalty for the given excess demand.
    pub fn salvage_penalty_excess(&self, excess_salvage: Salvage) -> Cost {
        Cost::new(excess_salvage.value() * self.salvage_capacity_penalty.value())
    }

    /// Computes the salvage penalty for the given total demand and capacity.
    pub fn salvage_penalty(&self, salvage: Salvage, capacity: Salvage) -> Cost {
        if salvage > capacity {
            self.salvage_penalty_excess(salvage - capacity)
        } else {
            Cost::ZERO
        }
    }

    /// Computes the excess stores penalty for the given amount above the limit.
    pub fn stores_penalty_excess(&self, excess_stores: Store) -> Cost {
        Cost::new(excess_stores.value() * self.stores_limit_penalty.value())
    }

    /// Computes the stores penalty for the given distinct store count and limit.
    pub fn stores_penalty(&self, stores: Store, limit: Store) -> Cost {
        if stores > limit {
            self.stores_penalty_excess(stores - limit)
        } else {
            Cost::ZERO
        }
    }

    /// Computes the time warp penalty for the given time warp.
    pub fn tw_penalty(&self, time_warp: Duration) -> Cost {
        Cost::new(time_warp.value() * self.time_warp_penalty.value())
    }

    /// Computes a smoothed objective (penalized cost) for the given solution.
    pub fn penalised_cost(&self, solution: &Solution) -> Cost {
        Cost::from(solution.distance())
            + solution.uncollected_prizes()
            + self.weight_penalty_excess(solution.excess_weight())
            + self.volume_penalty_excess(solution.excess_volume())
            + self.salvage_penalty_excess(solution.excess_salvage())
            + self.stores_penalty_excess(solution.excess_stores())
            + self.tw_penalty(solution.time_warp())
    }

    /// Computes the objective for the given solution. Returns the largest representable
    /// cost value when the solution is infeasible.
    pub fn cost(&self, solution: &Solution) -> Cost {
        // penalties are zero for feasible solutions, so penalized cost applies as is
        if solution.is_feasible() {
            self.penalised_cost(solution)
        } else {
            Cost::MAX
        }
    }
}
