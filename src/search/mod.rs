//! The mutable route state used by local search and the operators working on it.

mod sector;
pub use self::sector::CircleSector;

mod route;
pub use self::route::{NodeIndex, Route, RouteIndex, RoutePlan};

mod operator;
pub use self::operator::{NodeOperator, RouteOperator, SequencePolicy, SEQUENCE_VIOLATION_COST};

mod exchange;
pub use self::exchange::{Exchange, Relocate, Swap};

mod swap_star;
pub use self::swap_star::SwapStar;

mod two_opt;
pub use self::two_opt::TwoOpt;

mod move_two_reversed;
pub use self::move_two_reversed::MoveTwoClientsReversed;

mod relocate_star;
pub use self::relocate_star::RelocateStar;

mod local_search;
pub use self::local_search::{LocalSearch, Neighbours};
