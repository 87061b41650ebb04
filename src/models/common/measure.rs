#[cfg(test)]
#[path = "../../../tests/unit/models/common/measure_test.rs"]
mod measure_test;

use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

macro_rules! measure {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name(i64);

        impl $name {
            /// A zero value.
            pub const ZERO: $name = $name(0);
            /// The largest representable value.
            pub const MAX: $name = $name(i64::MAX);

            /// Creates a new measure from the raw underlying value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw underlying value.
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, Add::add)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! measure_into_cost {
    ($name:ident) => {
        impl From<$name> for Cost {
            fn from(value: $name) -> Self {
                Cost::new(value.value())
            }
        }
    };
}

measure! {
    /// Specifies a travel distance between two locations.
    Distance
}

measure! {
    /// Specifies a time duration: travel or service time, a time window bound, or time warp.
    Duration
}

measure! {
    /// Specifies a load amount in one of the delivery dimensions (weight or volume).
    Load
}

measure! {
    /// Specifies an amount of salvage pickup demand.
    Salvage
}

measure! {
    /// Specifies a store tag or an amount of distinct stores on a route.
    Store
}

measure! {
    /// Specifies a cost value: the unit in which distances, prizes and penalties are combined.
    Cost
}

measure! {
    /// Specifies a planar coordinate component.
    Coordinate
}

measure_into_cost!(Distance);
measure_into_cost!(Duration);
measure_into_cost!(Load);
measure_into_cost!(Salvage);
measure_into_cost!(Store);

impl Store {
    /// A sentinel tag for clients which are not associated with any store.
    pub const NONE: Store = Store(-1);
}
