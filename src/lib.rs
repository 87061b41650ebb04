//! A crate which implements a neighbourhood local search over vehicle routes for a rich
//! Capacitated Vehicle Routing Problem with Time Windows (CVRPTW), extended with multiple
//! side capacities: weight, volume, salvage pickups, and a per-route limit on distinct
//! store visits.
//!
//! # Key points
//!
//! Given a candidate solution, an assignment of clients to vehicle routes in a specific
//! order, the search iteratively applies small structural moves (relocations and swaps of
//! nodes and node sequences within and between routes) to reduce a penalized cost, and
//! stops at a local optimum under the chosen neighbourhood.
//!
//! The crate is the move evaluation and route-state engine only. Instance parsing, the
//! outer metaheuristic, initial solution construction, and output formatting are left to
//! the caller, which supplies a [`ProblemData`] snapshot, a [`CostEvaluator`] with fixed
//! penalty weights, and an initial [`Solution`], and consumes the improved solution back.
//!
//! Correctness of the engine hinges on O(1) incremental delta evaluation using cumulative
//! and time-window-segment summaries cached on route nodes; the neighbourhood explores a
//! quadratic number of node pairs per pass, so per-move recomputation over whole routes
//! is avoided throughout.
//!
//! # Modeling
//!
//! Model definitions can be split into two groups:
//!
//! - [`models`] contains problem and solution models: measures, matrices, time window
//!   segments, clients, and route statistics
//! - [`search`] contains the mutable linked-node route state and the local search
//!   operators working on it
//!
//! [`ProblemData`]: crate::models::problem::ProblemData
//! [`CostEvaluator`]: crate::models::CostEvaluator
//! [`Solution`]: crate::models::solution::Solution

#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
pub mod helpers;

pub mod models;
pub mod search;

pub mod prelude;

pub use rosomaxa;
