//! Property-based tests for `AvlSet` and `HashSet`.

use duoset::{AvlSet, HashSet, Membership, Set};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn modulo_hash(value: &i32) -> u32 {
    value.unsigned_abs()
}

fn preorder_of(set: &AvlSet<u16>) -> Vec<u16> {
    let mut visited = Vec::new();
    set.preorder(|value| visited.push(*value));
    visited
}

fn postorder_of(set: &AvlSet<u16>) -> Vec<u16> {
    let mut visited = Vec::new();
    set.postorder(|value| visited.push(*value));
    visited
}

proptest! {
    /// The size of every engine equals the number of distinct values added.
    #[test]
    fn prop_size_counts_distinct_values(values in prop::collection::vec(-500i32..500, 0..300)) {
        let distinct: BTreeSet<i32> = values.iter().copied().collect();

        let mut engines: Vec<Box<dyn Set<i32>>> = vec![
            Box::new(AvlSet::<i32>::new()),
            Box::new(AvlSet::<i32>::unbalanced()),
            Box::new(HashSet::<i32, _>::with_hash_function(modulo_hash)),
            Box::new(HashSet::<i32>::new()),
        ];

        for set in engines.iter_mut() {
            for value in &values {
                set.add(*value);
            }

            prop_assert_eq!(set.size(), distinct.len());

            for value in -500..500 {
                prop_assert_eq!(set.contains(&value), distinct.contains(&value));
            }
        }
    }

    /// Membership does not depend on the order values were added in.
    #[test]
    fn prop_membership_is_order_independent(
        values in prop::collection::vec(any::<i32>(), 0..200).prop_shuffle()
    ) {
        let mut reversed = values.clone();
        reversed.reverse();

        let forward: AvlSet<i32> = values.iter().copied().collect();
        let backward: AvlSet<i32> = reversed.iter().copied().collect();

        prop_assert!(forward.iter().eq(backward.iter()));

        let forward: HashSet<i32> = values.iter().copied().collect();
        let backward: HashSet<i32> = reversed.iter().copied().collect();

        prop_assert_eq!(forward.len(), backward.len());
        prop_assert!(values.iter().all(|value| forward.contains(value) && backward.contains(value)));
    }

    /// In-order traversal is strictly ascending whatever the insertion order.
    #[test]
    fn prop_inorder_is_ascending(values in prop::collection::vec(any::<i64>(), 0..300), balancing: bool) {
        let mut set = AvlSet::with_balancing(balancing);
        set.extend(values.iter().copied());

        let mut visited = Vec::new();
        set.inorder(|value| visited.push(*value));

        prop_assert!(visited.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert_eq!(visited.len(), set.len());
    }

    /// Pre-order and post-order traversals yield the same sequence on repeated calls.
    #[test]
    fn prop_traversals_are_restartable(values in prop::collection::vec(any::<u16>(), 0..200)) {
        let set: AvlSet<u16> = values.into_iter().collect();

        prop_assert_eq!(preorder_of(&set), preorder_of(&set));
        prop_assert_eq!(postorder_of(&set), postorder_of(&set));
        prop_assert_eq!(preorder_of(&set).len(), set.len());
    }

    /// A balanced tree of n values is never higher than 1.45 * log2(n + 2).
    #[test]
    fn prop_balanced_height_is_logarithmic(values in prop::collection::vec(any::<u32>(), 1..500)) {
        let set: AvlSet<u32> = values.into_iter().collect();
        let bound = 1.45 * ((set.len() + 2) as f64).log2();

        prop_assert!(f64::from(set.height()) <= bound);
    }

    /// The load factor never exceeds 0.8 once an add has completed, and every
    /// value stays in the bucket of its hash across resizes.
    #[test]
    fn prop_hash_load_factor_and_placement(values in prop::collection::vec(any::<u32>(), 0..400)) {
        let mut set = HashSet::with_hash_function(|value: &u32| *value);

        for value in &values {
            set.add(*value);
            prop_assert!(set.len() * 5 <= set.capacity() * 4);
        }

        for value in &values {
            let index = (*value as usize) % set.capacity();
            prop_assert!(set.contains(value));
            prop_assert!(set.is_element_at_index(value, index));
        }

        let total: usize = (0..set.capacity()).map(|index| set.elements_at_index(index)).sum();
        prop_assert_eq!(total, set.len());
    }

    /// Mutating a copy never affects the original.
    #[test]
    fn prop_copies_are_independent(
        values in prop::collection::vec(0u32..1_000, 0..200),
        extra in prop::collection::vec(1_000u32..2_000, 1..50)
    ) {
        let tree: AvlSet<u32> = values.iter().copied().collect();
        let table: HashSet<u32> = values.iter().copied().collect();

        let mut tree_copy = tree.clone();
        let mut table_copy = table.clone();

        let mut before = Vec::new();
        tree.preorder(|value| before.push(*value));
        let mut copied = Vec::new();
        tree_copy.preorder(|value| copied.push(*value));
        prop_assert_eq!(&before, &copied);

        tree_copy.extend(extra.iter().copied());
        table_copy.extend(extra.iter().copied());

        let mut after = Vec::new();
        tree.preorder(|value| after.push(*value));
        prop_assert_eq!(before, after);

        for value in &extra {
            prop_assert!(!tree.contains(value));
            prop_assert!(!table.contains(value));
            prop_assert!(tree_copy.contains(value));
            prop_assert!(table_copy.contains(value));
        }
    }
}
