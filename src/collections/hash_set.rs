use bytemuck::{Pod, Zeroable};
use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};
use tracing::debug;

use crate::{Membership, Set};

/// Constant to represent an empty value.
const SENTINEL: u32 = 0;

/// Number of buckets of a set created without an explicit capacity.
pub const DEFAULT_CAPACITY: usize = 10;

// The load factor bound (0.8) as a fraction, so the check stays in integers.
const LOAD_FACTOR_NUMERATOR: usize = 4;
const LOAD_FACTOR_DENOMINATOR: usize = 5;

/// Enum representing the fields of a chain entry.
#[derive(Copy, Clone)]
enum Register {
    Next,
    Hash,
}

/// Macro to access a node.
macro_rules! node {
    ( $array:expr, $index:expr ) => {
        $array[($index - 1) as usize]
    };
}

/// Function used by a [`HashSet`] to place values into buckets.
///
/// The bucket of a value is its hash modulo the number of buckets, so equal
/// values must produce equal hashes.
pub trait HashFunction<T: ?Sized> {
    fn hash(&self, value: &T) -> u32;
}

impl<T: ?Sized, F: Fn(&T) -> u32> HashFunction<T> for F {
    fn hash(&self, value: &T) -> u32 {
        self(value)
    }
}

/// Hashes any [`Hash`] value with the standard library hasher.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHashFunction;

impl<T: Hash + ?Sized> HashFunction<T> for DefaultHashFunction {
    fn hash(&self, value: &T) -> u32 {
        let mut hasher = DefaultHasher::new();
        Hash::hash(value, &mut hasher);
        let hash = hasher.finish();

        (hash ^ (hash >> 32)) as u32
    }
}

/// Separately-chained `HashSet` that doubles its number of buckets whenever
/// the ratio of values to buckets would exceed 0.8.
///
/// Values are stored in a contiguous array and never move; each bucket holds the
/// index of the head of its chain, and chains are linked through a parallel
/// array of entries.
#[derive(Clone)]
pub struct HashSet<T, H = DefaultHashFunction> {
    /// Function used to hash values.
    hash_function: H,

    /// Head of the chain of each bucket.
    buckets: Vec<u32>,

    /// Chain entries, indexed as `values`.
    chains: Vec<Chain>,

    /// Array to store the values.
    values: Vec<T>,
}

impl<T: Hash + Eq> HashSet<T, DefaultHashFunction> {
    /// Creates an empty set with the default capacity and hash function.
    pub fn new() -> Self {
        Self::with_hash_function(DefaultHashFunction)
    }
}

impl<T, H> HashSet<T, H> {
    /// Creates an empty set with the default capacity that places values
    /// using `hash_function`.
    pub fn with_hash_function(hash_function: H) -> Self {
        Self::with_capacity_and_hash_function(DEFAULT_CAPACITY, hash_function)
    }

    /// Creates an empty set with `capacity` buckets that places values
    /// using `hash_function`.
    ///
    /// A capacity of zero is raised to one bucket.
    pub fn with_capacity_and_hash_function(capacity: usize, hash_function: H) -> Self {
        Self {
            hash_function,
            buckets: vec![SENTINEL; capacity.max(1)],
            chains: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Returns the number of buckets of the set.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of values in the set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Indicates whether the set is empty or not.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values stored in the bucket at `index`.
    ///
    /// An index outside of the bucket array holds no values.
    pub fn elements_at_index(&self, index: usize) -> usize {
        if index >= self.capacity() {
            return 0;
        }

        let mut count = 0;
        let mut current = self.buckets[index];

        while current != SENTINEL {
            count += 1;
            current = node!(self.chains, current).get_register(Register::Next);
        }

        count
    }

    /// An iterator visiting all values, bucket by bucket.
    pub fn iter(&self) -> HashSetIterator<'_, T, H> {
        HashSetIterator {
            hash_set: self,
            bucket: 0,
            node: SENTINEL,
        }
    }

    #[inline(always)]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize % self.buckets.len()
    }

    fn exceeds_load_factor(&self, size: usize) -> bool {
        size * LOAD_FACTOR_DENOMINATOR > self.capacity() * LOAD_FACTOR_NUMERATOR
    }

    /// Replaces the bucket array by one with `capacity` buckets and relinks
    /// every value into the chain of its new bucket.
    fn resize(&mut self, capacity: usize) {
        debug!(
            from = self.capacity(),
            to = capacity,
            size = self.len(),
            "resizing hash set"
        );

        self.buckets = vec![SENTINEL; capacity];

        for index in 1..=self.values.len() as u32 {
            let bucket = self.bucket_of(node!(self.chains, index).get_register(Register::Hash));

            node!(self.chains, index).set_register(Register::Next, self.buckets[bucket]);
            self.buckets[bucket] = index;
        }
    }
}

impl<T: Eq, H> HashSet<T, H> {
    /// Checks whether `value` is stored in the bucket at `index`.
    ///
    /// An index outside of the bucket array holds no values.
    pub fn is_element_at_index(&self, value: &T, index: usize) -> bool {
        if index >= self.capacity() {
            return false;
        }

        let mut current = self.buckets[index];

        while current != SENTINEL {
            if &node!(self.values, current) == value {
                return true;
            }

            current = node!(self.chains, current).get_register(Register::Next);
        }

        false
    }

    /// Returns the index of the entry holding `value`, looking only at the
    /// bucket of `hash`.
    fn find(&self, hash: u32, value: &T) -> Option<u32> {
        let mut current = self.buckets[self.bucket_of(hash)];

        while current != SENTINEL {
            let chain = node!(self.chains, current);

            if chain.get_register(Register::Hash) == hash && &node!(self.values, current) == value {
                return Some(current);
            }

            current = chain.get_register(Register::Next);
        }

        None
    }
}

impl<T: Eq, H: HashFunction<T>> HashSet<T, H> {
    /// Insert a value on the set.
    ///
    /// Returns whether the value was newly inserted. If the set already
    /// contained this value, `false` is returned and the set is not modified.
    ///
    /// When placing the value would take the load factor above 0.8, the
    /// number of buckets is doubled first.
    ///
    /// # Arguments
    ///
    /// * `value` - the value to add.
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash_function.hash(&value);

        if self.find(hash, &value).is_some() {
            return false;
        }

        while self.exceeds_load_factor(self.len() + 1) {
            self.resize(self.capacity() * 2);
        }

        let length = self.values.len();

        if length >= u32::MAX as usize {
            panic!("set is full ({} values)", length);
        }

        let index = (length + 1) as u32;
        let bucket = self.bucket_of(hash);

        let mut chain = Chain::zeroed();
        chain.set_register(Register::Next, self.buckets[bucket]);
        chain.set_register(Register::Hash, hash);

        self.chains.push(chain);
        self.values.push(value);
        self.buckets[bucket] = index;

        true
    }

    /// Checks whether a value is present in the set or not.
    ///
    /// # Arguments
    ///
    /// * `value` - the value to check.
    pub fn contains(&self, value: &T) -> bool {
        self.find(self.hash_function.hash(value), value).is_some()
    }
}

impl<T, H: Default> Default for HashSet<T, H> {
    fn default() -> Self {
        Self::with_hash_function(H::default())
    }
}

impl<T: Eq, H: HashFunction<T>> Membership<T> for HashSet<T, H> {
    fn contains(&self, value: &T) -> bool {
        HashSet::contains(self, value)
    }
}

impl<T: Eq, H: HashFunction<T>> Set<T> for HashSet<T, H> {
    fn add(&mut self, value: T) {
        self.insert(value);
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Eq, H: HashFunction<T>> Extend<T> for HashSet<T, H> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Eq, H: HashFunction<T> + Default> FromIterator<T> for HashSet<T, H> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<'a, T, H> IntoIterator for &'a HashSet<T, H> {
    type Item = &'a T;
    type IntoIter = HashSetIterator<'a, T, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, H> fmt::Debug for HashSet<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

pub struct HashSetIterator<'a, T, H> {
    hash_set: &'a HashSet<T, H>,
    bucket: usize,
    node: u32,
}

impl<'a, T, H> Iterator for HashSetIterator<'a, T, H> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.node == SENTINEL {
            if self.bucket >= self.hash_set.capacity() {
                return None;
            }

            self.node = self.hash_set.buckets[self.bucket];
            self.bucket += 1;
        }

        let index = self.node;
        self.node = node!(self.hash_set.chains, index).get_register(Register::Next);

        Some(&node!(self.hash_set.values, index))
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
struct Chain {
    /// Registers for a chain entry. This is fixed to include:
    ///   [0] - next
    ///   [1] - hash
    ///
    /// Note that the index of nodes are always stored as `index + 1` to
    /// reserve the index 0 as the SENTINEL value.
    registers: [u32; 2],
}

impl Chain {
    #[inline(always)]
    fn get_register(&self, register: Register) -> u32 {
        self.registers[register as usize]
    }

    #[inline(always)]
    fn set_register(&mut self, register: Register, value: u32) {
        self.registers[register as usize] = value;
    }
}
