#[cfg(test)]
#[path = "../../tests/unit/search/relocate_star_test.rs"]
mod relocate_star_test;

use crate::models::common::Cost;
use crate::models::problem::ProblemData;
use crate::models::CostEvaluator;
use crate::search::exchange::Relocate;
use crate::search::operator::{NodeOperator, RouteOperator, SequencePolicy};
use crate::search::route::{NodeIndex, RouteIndex, RoutePlan};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default)]
struct BestRelocate {
    delta_cost: Cost,
    from: Option<NodeIndex>,
    to: Option<NodeIndex>,
}

/// Relocates the best single client between two routes, trying every insertion point of
/// both routes in both directions. Delta evaluation is delegated to [`Relocate`].
pub struct RelocateStar {
    relocate: Relocate,
    best: BestRelocate,
}

impl RelocateStar {
    /// Creates a new relocate-star operator without a sequence rule.
    pub fn new(data: Arc<ProblemData>) -> Self {
        Self::with_policy(data, SequencePolicy::default())
    }

    /// Creates a new relocate-star operator with the given sequence policy.
    pub fn with_policy(data: Arc<ProblemData>, policy: SequencePolicy) -> Self {
        Self { relocate: Relocate::with_policy(data, policy), best: BestRelocate::default() }
    }
}

impl RouteOperator for RelocateStar {
    fn evaluate(
        &mut self,
        plan: &RoutePlan,
        route_u: RouteIndex,
        route_v: RouteIndex,
        cost_evaluator: &CostEvaluator,
    ) -> Cost {
        self.best = BestRelocate::default();

        let mut u = plan.next(plan.start_depot(route_u));
        while !plan.is_depot(u) {
            // test inserting U right after V's depot
            let v_depot = plan.start_depot(route_v);
            let delta_cost = self.relocate.evaluate(plan, u, v_depot, cost_evaluator);

            if delta_cost < self.best.delta_cost {
                self.best = BestRelocate { delta_cost, from: Some(u), to: Some(v_depot) };
            }

            let mut v = plan.next(v_depot);
            while !plan.is_depot(v) {
                // test inserting U after V
                let delta_cost = self.relocate.evaluate(plan, u, v, cost_evaluator);

                if delta_cost < self.best.delta_cost {
                    self.best = BestRelocate { delta_cost, from: Some(u), to: Some(v) };
                }

                // test inserting V after U
                let delta_cost = self.relocate.evaluate(plan, v, u, cost_evaluator);

                if delta_cost < self.best.delta_cost {
                    self.best = BestRelocate { delta_cost, from: Some(v), to: Some(u) };
                }

                v = plan.next(v);
            }

            u = plan.next(u);
        }

        self.best.delta_cost
    }

    fn apply(&self, plan: &mut RoutePlan, _route_u: RouteIndex, _route_v: RouteIndex) {
        if let (Some(from), Some(to)) = (self.best.from, self.best.to) {
            plan.insert_after(from, to);
        }
    }
}
