pub mod avl_set;
pub mod hash_set;

pub use avl_set::AvlSet;
pub use avl_set::AvlSetIterator;
pub use hash_set::DefaultHashFunction;
pub use hash_set::HashFunction;
pub use hash_set::HashSet;
pub use hash_set::HashSetIterator;
