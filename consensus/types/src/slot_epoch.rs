//! The `Slot` and `Epoch` types are defined as new types over u64 to enforce type-safety between
//! the two types.
//!
//! `Slot` and `Epoch` have implementations which permit conversion, comparison and math operations
//! between each and `u64`, however specifically not between each other.
//!
//! All math operations on `Slot` and `Epoch` are saturating, they never wrap. Use the `safe_*`
//! methods where an overflow must be reported rather than clamped.
//!
//! It would be easy to define `PartialOrd` and other traits generically across all types which
//! implement `Into<u64>`, however this would allow operations between `Slots` and `Epochs` which
//! may lead to programming errors which are not detected by the compiler.

use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Iterator;
use std::ops::{Add, AddAssign, Div, Rem, Sub, SubAssign};

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(u64);

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(u64);

macro_rules! impl_common {
    ($main: ident) => {
        impl $main {
            pub const fn new(n: u64) -> $main {
                $main(n)
            }

            pub fn max_value() -> $main {
                $main(u64::MAX)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn safe_add(&self, other: u64) -> Result<$main, ArithError> {
                self.0.safe_add(other).map($main)
            }

            pub fn safe_sub(&self, other: u64) -> Result<$main, ArithError> {
                self.0.safe_sub(other).map($main)
            }

            pub fn safe_mul(&self, other: u64) -> Result<$main, ArithError> {
                self.0.safe_mul(other).map($main)
            }

            pub fn safe_div(&self, other: u64) -> Result<$main, ArithError> {
                self.0.safe_div(other).map($main)
            }

            pub fn saturating_sub<T: Into<u64>>(&self, other: T) -> $main {
                $main(self.0.saturating_sub(other.into()))
            }

            pub fn saturating_add<T: Into<u64>>(&self, other: T) -> $main {
                $main(self.0.saturating_add(other.into()))
            }
        }

        impl From<u64> for $main {
            fn from(n: u64) -> $main {
                $main(n)
            }
        }

        impl From<$main> for u64 {
            fn from(n: $main) -> u64 {
                n.0
            }
        }

        impl PartialEq<u64> for $main {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $main {
            fn partial_cmp(&self, other: &u64) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }

        impl Add<u64> for $main {
            type Output = $main;

            fn add(self, other: u64) -> $main {
                $main(self.0.saturating_add(other))
            }
        }

        impl Add<$main> for $main {
            type Output = $main;

            fn add(self, other: $main) -> $main {
                $main(self.0.saturating_add(other.0))
            }
        }

        impl AddAssign<u64> for $main {
            fn add_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_add(other);
            }
        }

        impl Sub<u64> for $main {
            type Output = $main;

            fn sub(self, other: u64) -> $main {
                $main(self.0.saturating_sub(other))
            }
        }

        impl Sub<$main> for $main {
            type Output = $main;

            fn sub(self, other: $main) -> $main {
                $main(self.0.saturating_sub(other.0))
            }
        }

        impl SubAssign<u64> for $main {
            fn sub_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_sub(other);
            }
        }

        impl Div<u64> for $main {
            type Output = $main;

            /// Panics if `rhs == 0`, like `u64`. Prefer `safe_div` for untrusted divisors.
            fn div(self, rhs: u64) -> $main {
                $main(self.0 / rhs)
            }
        }

        impl Rem<u64> for $main {
            type Output = $main;

            fn rem(self, modulus: u64) -> $main {
                $main(self.0 % modulus)
            }
        }

        impl fmt::Display for $main {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $main {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($main), self.0)
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    /// Returns the epoch containing this slot.
    ///
    /// Returns `Epoch(0)` if `slots_per_epoch == 0` rather than panicking.
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0.checked_div(slots_per_epoch).unwrap_or(0))
    }
}

impl Epoch {
    /// The first slot in the epoch.
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::from(self.0.saturating_mul(slots_per_epoch))
    }

    /// The last slot in the epoch.
    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::from(
            self.0
                .saturating_mul(slots_per_epoch)
                .saturating_add(slots_per_epoch.saturating_sub(1)),
        )
    }

    /// Position of some slot inside an epoch, if any.
    ///
    /// E.g., the first `slot` in `epoch` is at position `0`.
    pub fn position(self, slot: Slot, slots_per_epoch: u64) -> Option<usize> {
        let start = self.start_slot(slots_per_epoch);
        let end = self.end_slot(slots_per_epoch);

        if slot >= start && slot <= end && slots_per_epoch > 0 {
            slot.as_u64().checked_sub(start.as_u64()).map(|i| i as usize)
        } else {
            None
        }
    }

    /// Returns an iterator over every slot in the epoch, in ascending order.
    pub fn slot_iter(&self, slots_per_epoch: u64) -> SlotIter {
        SlotIter {
            current_iteration: 0,
            epoch: *self,
            slots_per_epoch,
        }
    }
}

pub struct SlotIter {
    current_iteration: u64,
    epoch: Epoch,
    slots_per_epoch: u64,
}

impl Iterator for SlotIter {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        if self.current_iteration >= self.slots_per_epoch {
            None
        } else {
            let start_slot = self.epoch.start_slot(self.slots_per_epoch);
            let previous = self.current_iteration;
            self.current_iteration = self.current_iteration.checked_add(1)?;
            start_slot.safe_add(previous).ok()
        }
    }
}
