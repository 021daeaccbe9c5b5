//! An arena backed red-black tree.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. The absent
//! child / absent parent of the root is the reserved [`NodeId::NIL`] marker,
//! which is always treated as black and never owns a slot.
//!
//! Keys that compare equal descend to the right on insert, so entries with
//! equal keys come out of [`RbTree::extract_minimum`] in insertion order.

use std::fmt::{self, Display};

/// Handle to a node owned by one [`RbTree`].
///
/// A handle stays valid until the node it names is deleted or extracted.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
#[repr(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Absent child, or the parent of the root.
    pub const NIL: NodeId = NodeId(usize::MAX);

    pub fn is_nil(self) -> bool {
        self == NodeId::NIL
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<K, T> {
    key: K,
    value: T,
    color: Color,
    left: NodeId,
    right: NodeId,
    parent: NodeId,
}

/// A broken red-black property found by [`RbTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root is red.
    RedRoot,
    /// A red node has a red child.
    RedChildOfRed { node: NodeId },
    /// Two paths below `node` cross a different number of black nodes.
    BlackHeight { node: NodeId, left: usize, right: usize },
    /// A child does not point back to its parent.
    ParentLink { node: NodeId },
    /// A key is on the wrong side of its parent.
    KeyOrder { node: NodeId },
    /// The maintained size differs from the number of reachable nodes.
    Size { counted: usize, recorded: usize },
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::RedRoot => write!(f, "the root is red"),
            InvariantViolation::RedChildOfRed { node } => {
                write!(f, "red node {:?} has a red child", node)
            }
            InvariantViolation::BlackHeight { node, left, right } => write!(
                f,
                "black height below {:?} differs ({} on the left, {} on the right)",
                node, left, right
            ),
            InvariantViolation::ParentLink { node } => {
                write!(f, "node {:?} does not point back to its parent", node)
            }
            InvariantViolation::KeyOrder { node } => {
                write!(f, "key of node {:?} is out of order", node)
            }
            InvariantViolation::Size { counted, recorded } => write!(
                f,
                "tree records {} nodes but {} are reachable",
                recorded, counted
            ),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// A red-black tree mapping keys to payloads.
#[derive(Debug)]
pub struct RbTree<K, T> {
    slots: Vec<Option<Node<K, T>>>,
    free: Vec<usize>,
    root: NodeId,
    len: usize,
}

impl<K, T> Default for RbTree<K, T> {
    fn default() -> Self {
        RbTree {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::NIL,
            len: 0,
        }
    }
}

impl<K: Ord + Copy, T> RbTree<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_nil()
    }

    /// Returns the key and payload of a live node.
    pub fn get(&self, id: NodeId) -> Option<(K, &T)> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|node| (node.key, &node.value))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Inserts `value` under `key` and rebalances.
    pub fn insert(&mut self, key: K, value: T) -> NodeId {
        let mut parent = NodeId::NIL;
        let mut cursor = self.root;
        while !cursor.is_nil() {
            parent = cursor;
            cursor = if key < self.node(cursor).key {
                self.node(cursor).left
            } else {
                self.node(cursor).right
            };
        }

        let z = self.alloc(Node {
            key,
            value,
            color: Color::Red,
            left: NodeId::NIL,
            right: NodeId::NIL,
            parent,
        });

        if parent.is_nil() {
            self.root = z;
        } else if key < self.node(parent).key {
            self.node_mut(parent).left = z;
        } else {
            self.node_mut(parent).right = z;
        }

        self.len += 1;
        self.insert_fixup(z);
        z
    }

    /// Removes the leftmost node and returns its key and payload.
    pub fn extract_minimum(&mut self) -> Option<(K, T)> {
        if self.is_empty() {
            return None;
        }
        let id = self.minimum(self.root);
        Some(self.delete(id))
    }

    /// Removes the node named by `id` and returns its key and payload.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a live node of this tree.
    pub fn delete(&mut self, z: NodeId) -> (K, T) {
        assert!(self.contains(z), "delete of stale node handle {:?}", z);

        let mut removed_color = self.color(z);
        let x;
        let x_parent;

        if self.left(z).is_nil() {
            x = self.right(z);
            x_parent = self.parent(z);
            self.transplant(z, x);
        } else if self.right(z).is_nil() {
            x = self.left(z);
            x_parent = self.parent(z);
            self.transplant(z, x);
        } else {
            let y = self.minimum(self.right(z));
            removed_color = self.color(y);
            x = self.right(y);
            if self.parent(y) == z {
                x_parent = y;
            } else {
                x_parent = self.parent(y);
                self.transplant(y, x);
                let z_right = self.right(z);
                self.node_mut(y).right = z_right;
                self.node_mut(z_right).parent = y;
            }
            self.transplant(z, y);
            let z_left = self.left(z);
            self.node_mut(y).left = z_left;
            self.node_mut(z_left).parent = y;
            let z_color = self.color(z);
            self.set_color(y, z_color);
        }

        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        self.len -= 1;
        let node = self.release(z);
        (node.key, node.value)
    }

    /// In-order iterator over `(key, payload)` pairs.
    pub fn iter(&self) -> Iter<'_, K, T> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// Checks every red-black property and returns the black height.
    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        if self.color(self.root) == Color::Red {
            return Err(InvariantViolation::RedRoot);
        }
        if !self.root.is_nil() && !self.node(self.root).parent.is_nil() {
            return Err(InvariantViolation::ParentLink { node: self.root });
        }
        let mut counted = 0;
        let height = self.validate_subtree(self.root, None, None, &mut counted)?;
        if counted != self.len {
            return Err(InvariantViolation::Size {
                counted,
                recorded: self.len,
            });
        }
        Ok(height)
    }

    fn validate_subtree(
        &self,
        id: NodeId,
        lower: Option<K>,
        upper: Option<K>,
        counted: &mut usize,
    ) -> Result<usize, InvariantViolation> {
        if id.is_nil() {
            return Ok(1);
        }
        *counted += 1;
        let node = self.node(id);
        if lower.map_or(false, |lower| node.key < lower) || upper.map_or(false, |upper| node.key > upper) {
            return Err(InvariantViolation::KeyOrder { node: id });
        }
        for child in [node.left, node.right] {
            if child.is_nil() {
                continue;
            }
            let child_node = self.node(child);
            if child_node.parent != id {
                return Err(InvariantViolation::ParentLink { node: child });
            }
            if node.color == Color::Red && child_node.color == Color::Red {
                return Err(InvariantViolation::RedChildOfRed { node: id });
            }
        }

        let left = self.validate_subtree(node.left, lower, Some(node.key), counted)?;
        let right = self.validate_subtree(node.right, Some(node.key), upper, counted)?;
        if left != right {
            return Err(InvariantViolation::BlackHeight { node: id, left, right });
        }
        Ok(left + usize::from(node.color == Color::Black))
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while self.color(self.parent(z)) == Color::Red {
            let p = self.parent(z);
            let g = self.parent(p);
            if p == self.left(g) {
                let uncle = self.right(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.right(p) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.left(p) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    // `x` may be NIL, so its parent is tracked separately.
    fn delete_fixup(&mut self, mut x: NodeId, mut parent: NodeId) {
        while x != self.root && self.color(x) == Color::Black {
            if x == self.left(parent) {
                let mut w = self.right(parent);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_left(parent);
                    w = self.right(parent);
                }
                if self.color(self.left(w)) == Color::Black
                    && self.color(self.right(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = parent;
                    parent = self.parent(x);
                } else {
                    if self.color(self.right(w)) == Color::Black {
                        let w_left = self.left(w);
                        self.set_color(w_left, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = self.right(parent);
                    }
                    let parent_color = self.color(parent);
                    self.set_color(w, parent_color);
                    self.set_color(parent, Color::Black);
                    let w_right = self.right(w);
                    self.set_color(w_right, Color::Black);
                    self.rotate_left(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.left(parent);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_right(parent);
                    w = self.left(parent);
                }
                if self.color(self.right(w)) == Color::Black
                    && self.color(self.left(w)) == Color::Black
                {
                    self.set_color(w, Color::Red);
                    x = parent;
                    parent = self.parent(x);
                } else {
                    if self.color(self.left(w)) == Color::Black {
                        let w_right = self.right(w);
                        self.set_color(w_right, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = self.left(parent);
                    }
                    let parent_color = self.color(parent);
                    self.set_color(w, parent_color);
                    self.set_color(parent, Color::Black);
                    let w_left = self.left(w);
                    self.set_color(w_left, Color::Black);
                    self.rotate_right(parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Pivots `x` down to the left:
    ///
    /// ```text
    ///     x              y
    ///    / \            / \
    ///   a   y   ==>    x   c
    ///      / \        / \
    ///     b   c      a   b
    /// ```
    fn rotate_left(&mut self, x: NodeId) {
        let y = self.right(x);
        assert!(!y.is_nil(), "left rotation at {:?} without a right child", x);

        let b = self.left(y);
        self.node_mut(x).right = b;
        if !b.is_nil() {
            self.node_mut(b).parent = x;
        }
        self.transplant(x, y);
        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;
    }

    /// Mirror of [`RbTree::rotate_left`].
    fn rotate_right(&mut self, y: NodeId) {
        let x = self.left(y);
        assert!(!x.is_nil(), "right rotation at {:?} without a left child", y);

        let b = self.right(x);
        self.node_mut(y).left = b;
        if !b.is_nil() {
            self.node_mut(b).parent = y;
        }
        self.transplant(y, x);
        self.node_mut(x).right = y;
        self.node_mut(y).parent = x;
    }

    /// Puts `new` where `old` hangs from its parent.
    fn transplant(&mut self, old: NodeId, new: NodeId) {
        let parent = self.parent(old);
        if parent.is_nil() {
            self.root = new;
        } else if old == self.left(parent) {
            self.node_mut(parent).left = new;
        } else {
            self.node_mut(parent).right = new;
        }
        if !new.is_nil() {
            self.node_mut(new).parent = parent;
        }
    }

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while !self.left(id).is_nil() {
            id = self.left(id);
        }
        id
    }

    fn alloc(&mut self, node: Node<K, T>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node<K, T> {
        let node = self.slots[id.0]
            .take()
            .unwrap_or_else(|| panic!("release of empty slot {:?}", id));
        self.free.push(id.0);
        node
    }

    fn node(&self, id: NodeId) -> &Node<K, T> {
        match self.slots.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("no live node at {:?}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, T> {
        match self.slots.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => panic!("no live node at {:?}", id),
        }
    }

    fn color(&self, id: NodeId) -> Color {
        if id.is_nil() {
            Color::Black
        } else {
            self.node(id).color
        }
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        if id.is_nil() {
            debug_assert_eq!(color, Color::Black, "the absent marker is always black");
            return;
        }
        self.node_mut(id).color = color;
    }

    fn left(&self, id: NodeId) -> NodeId {
        self.node(id).left
    }

    fn right(&self, id: NodeId) -> NodeId {
        self.node(id).right
    }

    fn parent(&self, id: NodeId) -> NodeId {
        if id.is_nil() {
            NodeId::NIL
        } else {
            self.node(id).parent
        }
    }
}

/// In-order iterator returned by [`RbTree::iter`].
pub struct Iter<'a, K, T> {
    tree: &'a RbTree<K, T>,
    stack: Vec<NodeId>,
}

impl<'a, K: Ord + Copy, T> Iter<'a, K, T> {
    fn push_left(&mut self, mut id: NodeId) {
        while !id.is_nil() {
            self.stack.push(id);
            id = self.tree.node(id).left;
        }
    }
}

impl<'a, K: Ord + Copy, T> Iterator for Iter<'a, K, T> {
    type Item = (K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.push_left(node.right);
        Some((node.key, &node.value))
    }
}

impl<K: Ord + Copy + Display, T: Display> Display for RbTree<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", key, value)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(tree: &mut RbTree<u64, u64>) -> Vec<u64> {
        let mut keys = vec![];
        while let Some((key, _)) = tree.extract_minimum() {
            keys.push(key);
            tree.validate().unwrap();
        }
        keys
    }

    #[test]
    fn empty_tree() {
        let mut tree: RbTree<u64, ()> = RbTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.validate(), Ok(1));
        assert!(tree.extract_minimum().is_none());
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree = RbTree::new();
        for key in 0..1024u64 {
            tree.insert(key, key);
            tree.validate().unwrap();
        }
        assert_eq!(tree.len(), 1024);
        // n >= 2^bh - 1 internal nodes, plus one for the absent marker.
        assert!(tree.validate().unwrap() <= 11);
        assert_eq!(drain(&mut tree), (0..1024).collect::<Vec<_>>());
        assert!(tree.is_empty());
    }

    #[test]
    fn descending_inserts_extract_sorted() {
        let mut tree = RbTree::new();
        for key in (0..200u64).rev() {
            tree.insert(key, key);
        }
        tree.validate().unwrap();
        assert_eq!(drain(&mut tree), (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn equal_keys_come_out_in_insertion_order() {
        let mut tree = RbTree::new();
        for name in ["A", "B", "C", "D", "E", "F", "G"] {
            tree.insert(0u64, name);
        }
        tree.insert(3, "late");
        tree.validate().unwrap();

        let order: Vec<&str> = tree.iter().map(|(_, name)| *name).collect();
        assert_eq!(order, ["A", "B", "C", "D", "E", "F", "G", "late"]);
        assert_eq!(tree.extract_minimum(), Some((0, "A")));
        assert_eq!(tree.extract_minimum(), Some((0, "B")));
    }

    #[test]
    fn delete_by_handle() {
        let mut tree = RbTree::new();
        let handles: Vec<NodeId> = [50u64, 20, 70, 10, 30, 60, 80, 25, 35]
            .iter()
            .map(|key| tree.insert(*key, *key * 10))
            .collect();

        // 20 has two children, 10 is a leaf, 70 has two children.
        assert_eq!(tree.delete(handles[1]), (20, 200));
        tree.validate().unwrap();
        assert_eq!(tree.delete(handles[3]), (10, 100));
        tree.validate().unwrap();
        assert_eq!(tree.delete(handles[2]), (70, 700));
        tree.validate().unwrap();

        assert_eq!(tree.len(), 6);
        assert!(!tree.contains(handles[1]));
        assert_eq!(tree.get(handles[0]), Some((50, &500)));
        let keys: Vec<u64> = tree.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, [25, 30, 35, 50, 60, 80]);
    }

    #[test]
    fn slots_are_reused() {
        let mut tree = RbTree::new();
        let a = tree.insert(1u64, 'a');
        tree.insert(2, 'b');
        tree.delete(a);
        let c = tree.insert(3, 'c');
        assert_eq!(a, c);
        assert_eq!(tree.get(c), Some((3, &'c')));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    #[should_panic(expected = "stale")]
    fn delete_stale_handle_panics() {
        let mut tree = RbTree::new();
        let id = tree.insert(1u64, ());
        tree.delete(id);
        tree.delete(id);
    }

    #[test]
    #[should_panic(expected = "without a right child")]
    fn rotation_without_child_panics() {
        let mut tree = RbTree::new();
        let id = tree.insert(1u64, ());
        tree.rotate_left(id);
    }

    #[test]
    fn display_lists_in_order() {
        let mut tree = RbTree::new();
        tree.insert(5u64, "B");
        tree.insert(0, "A");
        tree.insert(5, "C");
        assert_eq!(tree.to_string(), "[0:A, 5:B, 5:C]");
    }

    #[test]
    fn validate_reports_red_root() {
        let mut tree = RbTree::new();
        let id = tree.insert(1u64, ());
        tree.set_color(id, Color::Red);
        assert_eq!(tree.validate(), Err(InvariantViolation::RedRoot));
    }
}

#[cfg(test)]
mod proptests {
    use super::RbTree;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8),
        DeleteNth(usize),
        ExtractMinimum,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => any::<u8>().prop_map(Op::Insert),
            1 => any::<usize>().prop_map(Op::DeleteNth),
            1 => Just(Op::ExtractMinimum),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_after_every_operation(ops in proptest::collection::vec(op(), 0..200)) {
            let mut tree = RbTree::new();
            let mut live = Vec::new();
            let mut inserted = 0usize;
            let mut removed = 0usize;

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        live.push(tree.insert(key, ()));
                        inserted += 1;
                    }
                    Op::DeleteNth(n) => {
                        if !live.is_empty() {
                            let id = live.swap_remove(n % live.len());
                            tree.delete(id);
                            removed += 1;
                        }
                    }
                    Op::ExtractMinimum => {
                        if let Some((key, _)) = tree.extract_minimum() {
                            prop_assert!(tree.iter().all(|(other, _)| other >= key));
                            live.retain(|id| tree.contains(*id));
                            removed += 1;
                        }
                    }
                }
                prop_assert!(tree.validate().is_ok(), "{:?}", tree.validate());
                prop_assert_eq!(tree.len(), inserted - removed);
            }
        }

        #[test]
        fn extraction_is_sorted(keys in proptest::collection::vec(any::<u32>(), 0..300)) {
            let mut tree = RbTree::new();
            for key in &keys {
                tree.insert(*key, ());
            }
            let mut drained = vec![];
            while let Some((key, ())) = tree.extract_minimum() {
                drained.push(key);
            }
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(drained, sorted);
        }
    }
}
