pub mod collections;

pub use collections::{AvlSet, DefaultHashFunction, HashFunction, HashSet};

/// Read-only membership capability shared by every set in this crate.
///
/// Consumers that only need to test whether a value is known (e.g. a spelling
/// dictionary) should depend on this trait rather than on a concrete set.
pub trait Membership<T> {
    /// Checks whether a value is present or not.
    fn contains(&self, value: &T) -> bool;
}

/// Trait to represent a mutable, deduplicating collection of values.
///
/// [`AvlSet`] and [`HashSet`] implement this contract and can be used
/// interchangeably by code that is generic over it.
pub trait Set<T>: Membership<T> {
    /// Adds a value to the set. Adding a value that is already present has no effect.
    fn add(&mut self, value: T);

    /// Returns the number of distinct values in the set.
    fn size(&self) -> usize;

    /// Indicates whether the set is backed by a working implementation.
    fn is_implemented(&self) -> bool {
        true
    }
}
