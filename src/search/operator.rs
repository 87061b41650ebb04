use crate::models::common::Cost;
use crate::models::problem::ProblemData;
use crate::models::solution::Solution;
use crate::models::CostEvaluator;
use crate::search::route::{NodeIndex, RouteIndex, RoutePlan};

/// A cost returned for moves which would break the configured visit sequence rule: large
/// enough to be dominated by any genuine improvement, yet finite so that comparisons
/// stay total.
pub const SEQUENCE_VIOLATION_COST: Cost = Cost::new(i64::MAX / 1000);

/// Controls whether salvage pickups are allowed to precede deliveries within a route.
///
/// The rule forbids the in-route sequences S→D, S→B, B→B and B→D, where S is a pure
/// salvage stop, D a pure delivery, and B a client with both. It is off by default;
/// operators consult the policy before computing a move's cost.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SequencePolicy {
    /// No sequence rule: salvage pickups and deliveries may interleave.
    #[default]
    Ignore,
    /// Salvage pickups must follow all deliveries within a route.
    SalvageAfterDelivery,
}

impl SequencePolicy {
    /// Checks whether placing `u` (followed by its successor) next to `v` (followed by
    /// its successor) would break the sequence rule.
    pub fn forbids(&self, data: &ProblemData, plan: &RoutePlan, u: NodeIndex, v: NodeIndex) -> bool {
        if *self == SequencePolicy::Ignore {
            return false;
        }

        let u_client = data.client(plan.node(u).client);
        let v_client = data.client(plan.node(v).client);

        let u_is_both = u_client.is_delivery() && u_client.is_salvage();
        let v_is_both = v_client.is_delivery() && v_client.is_salvage();

        let next_u_delivery = data.client(plan.node(plan.next(u)).client).is_delivery();
        let next_v_delivery = data.client(plan.node(plan.next(v)).client).is_delivery();

        // S-B or S-D
        if u_client.is_salvage() && !u_is_both && (v_client.is_delivery() || v_is_both || next_v_delivery) {
            return true;
        }

        // B-B or B-D
        if u_is_both && (v_is_both || v_client.is_delivery() || next_u_delivery) {
            return true;
        }

        false
    }
}

/// An operator working on pairs of nodes drawn from a granular neighbourhood.
///
/// The contract for `evaluate`: a negative return value is the true cost delta of the
/// move, fully evaluated. The operator is free to return early with any non-negative
/// value once it knows the move cannot improve; such a value is not a full evaluation.
/// Zero also signals guard rejections (depot inclusion, overlap, adjacency, symmetry).
pub trait NodeOperator {
    /// Determines the cost delta of applying this operator to the given node pair.
    fn evaluate(
        &mut self,
        plan: &RoutePlan,
        u: NodeIndex,
        v: NodeIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost;

    /// Applies this operator to the given node pair. Should only be called when
    /// `evaluate` returned a negative delta for the same pair.
    fn apply(&self, plan: &mut RoutePlan, u: NodeIndex, v: NodeIndex);
}

/// An operator working on route pairs.
pub trait RouteOperator {
    /// Called once after a solution is loaded, before the first evaluation.
    fn init(&mut self, solution: &Solution) {
        let _ = solution;
    }

    /// Determines the cost delta of applying this operator to the given route pair.
    fn evaluate(
        &mut self,
        plan: &RoutePlan,
        route_u: RouteIndex,
        route_v: RouteIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost;

    /// Applies this operator to the given route pair. Should only be called when
    /// `evaluate` returned a negative delta for the same pair.
    fn apply(&self, plan: &mut RoutePlan, route_u: RouteIndex, route_v: RouteIndex);

    /// Called every time the given route has been changed; used to keep caches in sync,
    /// so implementations should be fast.
    fn update(&mut self, route: RouteIndex) {
        let _ = route;
    }
}
