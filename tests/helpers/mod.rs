//! Shared fixtures for unit tests.


pub use self::models::*;
pub use self::search::*;
