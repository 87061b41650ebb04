//! Common models: measures, matrices and time window segments.

mod measure;
pub use self::measure::*;

mod matrix;
pub use self::matrix::Matrix;

mod tw_segment;
pub use self::tw_segment::TimeWindowSegment;
