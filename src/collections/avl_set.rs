use bytemuck::{Pod, Zeroable};
use std::{borrow::Borrow, cmp::Ordering, fmt};
use tracing::trace;

use crate::{Membership, Set};

// Constant to represent an empty link.
const SENTINEL: u32 = 0;

// Enum representing the registers of a node.
#[derive(Copy, Clone)]
enum Register {
    Left,
    Right,
    Parent,
    Balance,
}

/// Macro to access the entry of a node.
///
/// Links and keys share the same indexing, so this works for both arrays.
macro_rules! node {
    ( $array:expr, $index:expr ) => {
        $array[($index - 1) as usize]
    };
}

// Child slot of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Branch {
    Left,
    Right,
}

impl Branch {
    #[inline(always)]
    fn register(self) -> Register {
        match self {
            Branch::Left => Register::Left,
            Branch::Right => Register::Right,
        }
    }

    #[inline(always)]
    fn opposite(self) -> Branch {
        match self {
            Branch::Left => Branch::Right,
            Branch::Right => Branch::Left,
        }
    }
}

// Balance tag of a node, indicating which of its subtrees is taller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
enum Balance {
    Balanced = 0,
    LeftHeavy = 1,
    RightHeavy = 2,
}

impl Balance {
    fn heavy(branch: Branch) -> Self {
        match branch {
            Branch::Left => Balance::LeftHeavy,
            Branch::Right => Balance::RightHeavy,
        }
    }

    fn heavy_branch(self) -> Option<Branch> {
        match self {
            Balance::Balanced => None,
            Balance::LeftHeavy => Some(Branch::Left),
            Balance::RightHeavy => Some(Branch::Right),
        }
    }

    fn from_register(value: u32) -> Self {
        match value {
            1 => Balance::LeftHeavy,
            2 => Balance::RightHeavy,
            _ => Balance::Balanced,
        }
    }
}

/// Set backed by a binary search tree with optional AVL balancing.
///
/// The structure of the tree is stored in an arena of link records addressed by
/// index, separate from the keys. Nodes never move once allocated; rotations only
/// rewrite links. When balancing is enabled the heights of two sibling subtrees
/// differ by one at most.
#[derive(Clone)]
pub struct AvlSet<T> {
    /// Index of the root node.
    root: u32,

    /// Array of links to store the tree structure.
    links: Vec<Links>,

    /// Array of keys, indexed as `links`.
    keys: Vec<T>,

    /// Whether the AVL rule is maintained on insertion.
    balancing: bool,
}

impl<T> AvlSet<T> {
    /// Creates an empty set that keeps the tree balanced.
    pub fn new() -> Self {
        Self::with_balancing(true)
    }

    /// Creates an empty set that behaves as a plain binary search tree.
    ///
    /// Inserting keys in sorted order degenerates the tree into a chain.
    pub fn unbalanced() -> Self {
        Self::with_balancing(false)
    }

    /// Creates an empty set, with or without balancing.
    pub fn with_balancing(balancing: bool) -> Self {
        Self {
            root: SENTINEL,
            links: Vec::new(),
            keys: Vec::new(),
            balancing,
        }
    }

    /// Indicates whether the set balances the tree on insertion.
    pub fn is_balancing(&self) -> bool {
        self.balancing
    }

    /// Returns the number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Indicates whether the set is empty or not.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the height of the tree, measured in edges on the longest path
    /// from the root to a leaf. The height of an empty tree is `-1`.
    pub fn height(&self) -> i32 {
        let mut height = -1;
        let mut stack = Vec::new();

        if self.root != SENTINEL {
            stack.push((self.root, 0));
        }

        while let Some((index, depth)) = stack.pop() {
            height = height.max(depth);

            for branch in [Branch::Left, Branch::Right] {
                let child = self.child(index, branch);
                if child != SENTINEL {
                    stack.push((child, depth + 1));
                }
            }
        }

        height
    }

    /// Returns the lowest key of the set.
    pub fn lowest(&self) -> Option<&T> {
        self.extreme(Branch::Left)
    }

    /// Returns the highest key of the set.
    pub fn highest(&self) -> Option<&T> {
        self.extreme(Branch::Right)
    }

    /// Calls `visit` on every key: node, left subtree, right subtree.
    pub fn preorder<F: FnMut(&T)>(&self, visit: F) {
        self.traverse(Order::Pre).for_each(visit);
    }

    /// Calls `visit` on every key: left subtree, node, right subtree.
    ///
    /// Keys are visited in ascending order.
    pub fn inorder<F: FnMut(&T)>(&self, visit: F) {
        self.traverse(Order::In).for_each(visit);
    }

    /// Calls `visit` on every key: left subtree, right subtree, node.
    pub fn postorder<F: FnMut(&T)>(&self, visit: F) {
        self.traverse(Order::Post).for_each(visit);
    }

    /// An iterator visiting all keys in ascending order.
    pub fn iter(&self) -> AvlSetIterator<'_, T> {
        self.traverse(Order::In)
    }

    /// Checks whether a key is present in the set or not.
    ///
    /// The key may be any borrowed form of the set's key type.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    fn find<Q>(&self, key: &Q) -> Option<u32>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut reference_node = self.root;

        while reference_node != SENTINEL {
            let current: &Q = node!(self.keys, reference_node).borrow();

            reference_node = match key.cmp(current) {
                Ordering::Less => self.child(reference_node, Branch::Left),
                Ordering::Greater => self.child(reference_node, Branch::Right),
                Ordering::Equal => return Some(reference_node),
            };
        }

        None
    }

    fn extreme(&self, branch: Branch) -> Option<&T> {
        let mut node = self.root;

        if node == SENTINEL {
            return None;
        }

        while self.child(node, branch) != SENTINEL {
            node = self.child(node, branch);
        }

        Some(&node!(self.keys, node))
    }

    fn traverse(&self, order: Order) -> AvlSetIterator<'_, T> {
        let mut stack = Vec::new();

        if self.root != SENTINEL {
            stack.push((self.root, false));
        }

        AvlSetIterator {
            set: self,
            order,
            stack,
        }
    }

    /// Allocates a detached node holding `key`.
    fn allocate(&mut self, key: T) -> u32 {
        let length = self.keys.len();

        if length >= u32::MAX as usize {
            panic!("tree is full ({} nodes)", length);
        }

        self.links.push(Links::zeroed());
        self.keys.push(key);

        (length + 1) as u32
    }

    #[inline(always)]
    fn child(&self, index: u32, branch: Branch) -> u32 {
        node!(self.links, index).get_register(branch.register())
    }

    #[inline(always)]
    fn parent(&self, index: u32) -> u32 {
        node!(self.links, index).get_register(Register::Parent)
    }

    #[inline(always)]
    fn balance(&self, index: u32) -> Balance {
        Balance::from_register(node!(self.links, index).get_register(Register::Balance))
    }

    #[inline(always)]
    fn set_balance(&mut self, index: u32, balance: Balance) {
        node!(self.links, index).set_register(Register::Balance, balance as u32);
    }

    /// Returns the slot of `parent` that holds `child`.
    fn branch_of(&self, parent: u32, child: u32) -> Branch {
        if self.child(parent, Branch::Left) == child {
            Branch::Left
        } else {
            Branch::Right
        }
    }

    /// Updates the child of a parent node, keeping the child's parent link in sync.
    fn set_child(&mut self, parent: u32, branch: Branch, child: u32) {
        node!(self.links, parent).set_register(branch.register(), child);

        if child != SENTINEL {
            node!(self.links, child).set_register(Register::Parent, parent);
        }
    }

    /// Replaces `old` by `new` in the slot that owns `old`, which is the root
    /// when `parent` is the sentinel.
    fn replace_child(&mut self, parent: u32, old: u32, new: u32) {
        if parent == SENTINEL {
            self.root = new;
            node!(self.links, new).set_register(Register::Parent, SENTINEL);
        } else {
            let branch = self.branch_of(parent, old);
            self.set_child(parent, branch, new);
        }
    }

    /// Performs an AVL rotation around `index`, lifting its child on `raise`
    /// into its place. The lifted child's inner subtree moves under `index`.
    ///
    /// Returns the index of the new subtree root.
    fn rotate(&mut self, index: u32, raise: Branch) -> u32 {
        trace!(node = index, raise = ?raise, "rotate");

        let lower = raise.opposite();
        let raised = self.child(index, raise);
        let inner = self.child(raised, lower);
        let parent = self.parent(index);

        self.set_child(index, raise, inner);
        self.replace_child(parent, index, raised);
        self.set_child(raised, lower, index);

        raised
    }

    /// Tags every node on the path from `node` up to, but excluding, `stop` as
    /// heavy on the side the path came from.
    ///
    /// A `stop` equal to the sentinel tags the whole path including the root.
    fn propagate(&mut self, stop: u32, node: u32) {
        let mut child = node;
        let mut current = self.parent(node);

        while current != stop && current != SENTINEL {
            let branch = self.branch_of(current, child);
            self.set_balance(current, Balance::heavy(branch));

            child = current;
            current = self.parent(current);
        }
    }
}

impl<T: Ord> AvlSet<T> {
    /// Insert a key on the set.
    ///
    /// Returns whether the key was newly inserted. If the set already contains
    /// the key, `false` is returned and the set is not modified.
    ///
    /// # Arguments
    ///
    /// * `key` - the key to add.
    pub fn insert(&mut self, key: T) -> bool {
        let mut reference_node = self.root;
        let mut parent = SENTINEL;
        let mut branch = Branch::Left;
        // nearest node on the path that is not balanced
        let mut critical = SENTINEL;

        while reference_node != SENTINEL {
            if self.balance(reference_node) != Balance::Balanced {
                critical = reference_node;
            }

            branch = match key.cmp(&node!(self.keys, reference_node)) {
                Ordering::Less => Branch::Left,
                Ordering::Greater => Branch::Right,
                Ordering::Equal => return false,
            };

            parent = reference_node;
            reference_node = self.child(parent, branch);
        }

        let node = self.allocate(key);

        if parent == SENTINEL {
            self.root = node;
            return true;
        }

        self.set_child(parent, branch, node);

        if self.balancing {
            self.restore(critical, node);
        }

        true
    }

    /// Restores the AVL rule after `node` was attached as a leaf.
    ///
    /// # Arguments
    ///
    /// * `critical` - nearest ancestor of `node` that was not balanced before the insertion.
    /// * `node` - index of the inserted node.
    fn restore(&mut self, critical: u32, node: u32) {
        let heavy = if critical == SENTINEL {
            None
        } else {
            self.balance(critical).heavy_branch()
        };

        let Some(heavy) = heavy else {
            trace!(node, "path balanced");
            self.propagate(SENTINEL, node);
            return;
        };

        if self.side(critical, node) != heavy {
            trace!(critical, node, "short side grew");
            self.set_balance(critical, Balance::Balanced);
            self.propagate(critical, node);
            return;
        }

        let child = self.child(critical, heavy);

        if self.side(child, node) == heavy {
            trace!(critical, node, "single rotation");
            let subtree = self.rotate(critical, heavy);
            self.set_balance(critical, Balance::Balanced);
            self.propagate(subtree, node);
        } else {
            trace!(critical, node, "double rotation");
            let pivot = self.child(child, heavy.opposite());

            self.rotate(child, heavy.opposite());
            self.rotate(critical, heavy);
            self.set_balance(pivot, Balance::Balanced);

            if pivot == node {
                self.set_balance(critical, Balance::Balanced);
                self.set_balance(child, Balance::Balanced);
            } else if self.side(pivot, node) == heavy {
                self.set_balance(child, Balance::Balanced);
                self.set_balance(critical, Balance::heavy(heavy.opposite()));
                self.propagate(child, node);
            } else {
                self.set_balance(critical, Balance::Balanced);
                self.set_balance(child, Balance::heavy(heavy));
                self.propagate(critical, node);
            }
        }
    }

    /// Returns the side of `ancestor` under which `node` lives.
    fn side(&self, ancestor: u32, node: u32) -> Branch {
        if node!(self.keys, node) < node!(self.keys, ancestor) {
            Branch::Left
        } else {
            Branch::Right
        }
    }
}

impl<T> Default for AvlSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> Membership<T> for AvlSet<T> {
    fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }
}

impl<T: Ord> Set<T> for AvlSet<T> {
    fn add(&mut self, value: T) {
        self.insert(value);
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Ord> Extend<T> for AvlSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<T: Ord> FromIterator<T> for AvlSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, T> IntoIterator for &'a AvlSet<T> {
    type Item = &'a T;
    type IntoIter = AvlSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for AvlSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// Depth-first visiting order.
#[derive(Copy, Clone)]
enum Order {
    Pre,
    In,
    Post,
}

/// Depth-first iterator over the keys of an [`AvlSet`].
///
/// The iterator borrows the set, so the tree cannot change while it is in use.
pub struct AvlSetIterator<'a, T> {
    set: &'a AvlSet<T>,
    order: Order,
    /// Pending nodes; the flag marks nodes whose subtrees were already expanded.
    stack: Vec<(u32, bool)>,
}

impl<'a, T> Iterator for AvlSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, expanded)) = self.stack.pop() {
            if expanded {
                return Some(&node!(self.set.keys, index));
            }

            let left = self.set.child(index, Branch::Left);
            let right = self.set.child(index, Branch::Right);

            // pushed in reverse visiting order
            let pending = match self.order {
                Order::Pre => [(right, false), (left, false), (index, true)],
                Order::In => [(right, false), (index, true), (left, false)],
                Order::Post => [(index, true), (right, false), (left, false)],
            };

            self.stack
                .extend(pending.into_iter().filter(|(node, _)| *node != SENTINEL));
        }

        None
    }
}

/// Structure of a node in the arena.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
struct Links {
    /// Registers for a node. This is fixed to include:
    ///   [0] - left child
    ///   [1] - right child
    ///   [2] - parent
    ///   [3] - balance tag
    ///
    /// Note that the index of nodes are always stored as `index + 1` to
    /// reserve the index 0 as the SENTINEL value.
    registers: [u32; 4],
}

impl Links {
    #[inline(always)]
    fn get_register(&self, register: Register) -> u32 {
        self.registers[register as usize]
    }

    #[inline(always)]
    fn set_register(&mut self, register: Register, value: u32) {
        self.registers[register as usize] = value;
    }
}
