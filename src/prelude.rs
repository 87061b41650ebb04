//! Re-exports the types most integrations need.

pub use crate::models::common::{
    Coordinate, Cost, Distance, Duration, Load, Matrix, Salvage, Store, TimeWindowSegment,
};
pub use crate::models::problem::{Client, ProblemData};
pub use crate::models::solution::Solution;
pub use crate::models::CostEvaluator;
pub use crate::search::{
    Exchange, LocalSearch, MoveTwoClientsReversed, NodeOperator, Relocate, RelocateStar, RouteOperator,
    RoutePlan, SequencePolicy, Swap, SwapStar, TwoOpt,
};

pub use rosomaxa::utils::{GenericError, GenericResult};
