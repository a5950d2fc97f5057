//! Comparator-free red-black index over an arena of caller-owned records.
//!
//! The tree stores no key of its own: callers walk down with
//! [`RBIndex::find_insertion_point`] using their own comparison over the
//! payload, then splice with [`RBIndex::insert_at`]. The balancing core only
//! maintains links and colors, so the same index works for any ordering the
//! caller can express as a descent predicate.
//!
//! Nodes live in a `Vec`-backed arena addressed by [`NodeId`] and recycled
//! through a free list, so "links are undefined after erase" is a checkable
//! state rather than a dangling pointer.

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    Red,
    Black,
}

/// Which child slot of the parent a new node attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Attachment descriptor produced by [`RBIndex::find_insertion_point`].
///
/// `parent == None` means the tree was empty and the new node becomes the
/// root. The descriptor is only valid until the next structural mutation.
#[derive(Debug, Clone, Copy)]
pub struct InsertionPoint {
    parent: Option<NodeId>,
    side: Side,
}

#[derive(Debug, Clone)]
struct Node<T> {
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    color: Color,
    // None marks a vacant arena slot
    value: Option<T>,
}

impl<T> Node<T> {
    fn detached(value: T) -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            color: Color::Red,
            value: Some(value),
        }
    }
}

/// An intrusive-style red-black tree whose nodes are arena slots.
///
/// Allocation and linkage are separate: [`RBIndex::alloc`] produces a
/// detached node, [`RBIndex::insert_at`] links it, [`RBIndex::erase`]
/// unlinks it (leaving it allocated), and [`RBIndex::free`] recovers the
/// payload. All operations are total over well-formed inputs; misuse of the
/// attach/detach contract trips `debug_assert!`s instead of error paths.
#[derive(Debug)]
pub struct RBIndex<T> {
    nodes: Vec<Node<T>>,
    free_list: Vec<u32>,
    root: Option<NodeId>,
    len: usize,
}

impl<T> RBIndex<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Number of attached nodes (detached allocations are not counted).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Detach and drop every node, keeping the arena capacity.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
        for node in &mut self.nodes {
            node.value = None;
        }
        self.free_list.clear();
        for i in (0..self.nodes.len()).rev() {
            self.free_list.push(i as u32);
        }
    }

    // ===== Arena operations =====

    /// Allocate a detached node holding `value`.
    pub fn alloc(&mut self, value: T) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.nodes[idx as usize];
            debug_assert!(slot.value.is_none());
            *slot = Node::detached(value);
            NodeId(idx)
        } else {
            let idx = self.nodes.len();
            assert!(idx < u32::MAX as usize, "node arena exhausted");
            self.nodes.push(Node::detached(value));
            NodeId(idx as u32)
        }
    }

    /// Release a detached node's slot and recover its payload.
    ///
    /// The node must not be attached; erase it first.
    pub fn free(&mut self, id: NodeId) -> T {
        debug_assert!(!self.is_attached(id));
        match self.nodes[id.index()].value.take() {
            Some(value) => {
                self.free_list.push(id.0);
                value
            }
            None => panic!("free of a vacant node slot"),
        }
    }

    pub fn get(&self, id: NodeId) -> &T {
        match self.nodes[id.index()].value {
            Some(ref value) => value,
            None => panic!("access to a vacant node slot"),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        match self.nodes[id.index()].value {
            Some(ref mut value) => value,
            None => panic!("access to a vacant node slot"),
        }
    }

    /// Payload lookup that tolerates vacant or out-of-range slots.
    pub fn try_get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.index())?.value.as_ref()
    }

    /// True if the node is currently linked into the tree.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.root == Some(id) || self.parent(id).is_some()
    }

    // ===== Field accessors =====

    #[inline(always)]
    fn node(&self, id: NodeId) -> &Node<T> {
        let node = &self.nodes[id.index()];
        debug_assert!(node.value.is_some());
        node
    }

    #[inline(always)]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        let node = &mut self.nodes[id.index()];
        debug_assert!(node.value.is_some());
        node
    }

    #[inline(always)]
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline(always)]
    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    #[inline(always)]
    fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    #[inline(always)]
    fn color_of(&self, id: NodeId) -> Color {
        self.node(id).color
    }

    #[inline(always)]
    fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    // Absent children count as black leaves.
    fn is_red_opt(&self, id: Option<NodeId>) -> bool {
        id.map_or(false, |n| self.color_of(n) == Color::Red)
    }

    fn is_black_opt(&self, id: Option<NodeId>) -> bool {
        !self.is_red_opt(id)
    }

    // ===== Search seam =====

    /// Walk from the root to a leaf slot using the caller's comparison.
    ///
    /// `go_left(probe)` returns true when the key being inserted sorts
    /// before `probe`. Ties therefore descend right, which keeps equal keys
    /// in insertion order under in-order traversal.
    pub fn find_insertion_point<F>(&self, mut go_left: F) -> InsertionPoint
    where
        F: FnMut(&T) -> bool,
    {
        let mut parent = None;
        let mut side = Side::Left;
        let mut current = self.root;

        while let Some(probe) = current {
            parent = Some(probe);
            if go_left(self.get(probe)) {
                side = Side::Left;
                current = self.left(probe);
            } else {
                side = Side::Right;
                current = self.right(probe);
            }
        }

        InsertionPoint { parent, side }
    }

    // ===== Insert =====

    /// Splice a detached node in at `point` and restore the invariants.
    ///
    /// `point` must come from `find_insertion_point` with no structural
    /// mutation in between.
    pub fn insert_at(&mut self, point: InsertionPoint, id: NodeId) {
        debug_assert!(!self.is_attached(id));
        debug_assert!(self.left(id).is_none() && self.right(id).is_none());

        let parent = match point.parent {
            Some(p) => p,
            None => {
                debug_assert!(self.root.is_none());
                self.node_mut(id).color = Color::Black;
                self.root = Some(id);
                self.len += 1;
                return;
            }
        };

        self.node_mut(id).parent = Some(parent);
        self.node_mut(id).color = Color::Red;
        match point.side {
            Side::Left => {
                debug_assert!(self.left(parent).is_none());
                self.node_mut(parent).left = Some(id);
            }
            Side::Right => {
                debug_assert!(self.right(parent).is_none());
                self.node_mut(parent).right = Some(id);
            }
        }
        self.len += 1;

        self.insert_fixup(id);
    }

    fn insert_fixup(&mut self, mut node: NodeId) {
        while self.is_red_opt(self.parent(node)) {
            let parent = match self.parent(node) {
                Some(p) => p,
                None => break,
            };
            // A red parent is never the root, so the grandparent exists
            let grandparent = match self.parent(parent) {
                Some(g) => g,
                None => break,
            };

            if Some(parent) == self.left(grandparent) {
                let uncle = self.right(grandparent);

                if self.is_red_opt(uncle) {
                    // Case 1: uncle is red, push the violation upward
                    self.set_color(parent, Color::Black);
                    if let Some(u) = uncle {
                        self.set_color(u, Color::Black);
                    }
                    self.set_color(grandparent, Color::Red);
                    node = grandparent;
                } else {
                    if Some(node) == self.right(parent) {
                        // Case 2: inner grandchild, rotate into case 3
                        node = parent;
                        self.left_rotate(node);
                    }
                    // Case 3: outer grandchild, recolor and rotate out
                    if let Some(parent) = self.parent(node) {
                        self.set_color(parent, Color::Black);
                        if let Some(grandparent) = self.parent(parent) {
                            self.set_color(grandparent, Color::Red);
                            self.right_rotate(grandparent);
                        }
                    }
                }
            } else {
                // Mirror case: parent is right child
                let uncle = self.left(grandparent);

                if self.is_red_opt(uncle) {
                    self.set_color(parent, Color::Black);
                    if let Some(u) = uncle {
                        self.set_color(u, Color::Black);
                    }
                    self.set_color(grandparent, Color::Red);
                    node = grandparent;
                } else {
                    if Some(node) == self.left(parent) {
                        node = parent;
                        self.right_rotate(node);
                    }
                    if let Some(parent) = self.parent(node) {
                        self.set_color(parent, Color::Black);
                        if let Some(grandparent) = self.parent(parent) {
                            self.set_color(grandparent, Color::Red);
                            self.left_rotate(grandparent);
                        }
                    }
                }
            }
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    // ===== Rotations =====

    fn left_rotate(&mut self, x: NodeId) {
        let y = match self.right(x) {
            Some(y) => y,
            None => return,
        };
        let y_left = self.left(y);
        let x_parent = self.parent(x);

        // y's left subtree migrates across to x's right
        self.node_mut(x).right = y_left;
        if let Some(yl) = y_left {
            self.node_mut(yl).parent = Some(x);
        }

        self.node_mut(y).parent = x_parent;
        match x_parent {
            None => self.root = Some(y),
            Some(p) => {
                if self.left(p) == Some(x) {
                    self.node_mut(p).left = Some(y);
                } else {
                    self.node_mut(p).right = Some(y);
                }
            }
        }

        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);
    }

    fn right_rotate(&mut self, y: NodeId) {
        let x = match self.left(y) {
            Some(x) => x,
            None => return,
        };
        let x_right = self.right(x);
        let y_parent = self.parent(y);

        self.node_mut(y).left = x_right;
        if let Some(xr) = x_right {
            self.node_mut(xr).parent = Some(y);
        }

        self.node_mut(x).parent = y_parent;
        match y_parent {
            None => self.root = Some(x),
            Some(p) => {
                if self.right(p) == Some(y) {
                    self.node_mut(p).right = Some(x);
                } else {
                    self.node_mut(p).left = Some(x);
                }
            }
        }

        self.node_mut(x).right = Some(y);
        self.node_mut(y).parent = Some(x);
    }

    // ===== Erase =====

    /// Unlink an attached node and restore the invariants.
    ///
    /// The node stays allocated but detached; `free` it to recover the
    /// payload, or re-insert it.
    pub fn erase(&mut self, id: NodeId) {
        debug_assert!(self.is_attached(id));

        // splice: the node that physically leaves its slot. With two
        // children this is the in-order successor, relinked by pure pointer
        // surgery rather than copying one record over another.
        let splice = if self.left(id).is_none() || self.right(id).is_none() {
            id
        } else {
            match self.right(id) {
                Some(right) => self.subtree_min(right),
                None => id,
            }
        };

        // splice has at most one child
        let child = self.left(splice).or(self.right(splice));

        // Where the unlinking happened: normally the splice's old parent,
        // but when the successor was id's direct right child the successor
        // itself inherits the vacated slot.
        let child_parent = if self.parent(splice) != Some(id) {
            self.parent(splice)
        } else {
            Some(splice)
        };

        self.replace_child(child, splice);
        let removed_black = self.color_of(splice) == Color::Black;

        if splice != id {
            self.transplant(splice, id);
        }
        self.len -= 1;

        if removed_black {
            self.erase_fixup(child, child_parent);
        }

        let node = self.node_mut(id);
        node.parent = None;
        node.left = None;
        node.right = None;
        node.color = Color::Red;
    }

    /// Point dest's parent (or the root handle) at source instead.
    fn replace_child(&mut self, source: Option<NodeId>, dest: NodeId) {
        match self.parent(dest) {
            None => {
                debug_assert!(self.root == Some(dest));
                self.root = source;
            }
            Some(p) => {
                if self.left(p) == Some(dest) {
                    self.node_mut(p).left = source;
                } else {
                    self.node_mut(p).right = source;
                }
            }
        }
        if let Some(s) = source {
            self.node_mut(s).parent = self.parent(dest);
        }
    }

    /// Move source into dest's structural position, taking dest's children
    /// and color.
    fn transplant(&mut self, source: NodeId, dest: NodeId) {
        self.replace_child(Some(source), dest);

        let dest_left = self.left(dest);
        let dest_right = self.right(dest);
        let dest_color = self.color_of(dest);

        self.node_mut(source).left = dest_left;
        if let Some(l) = dest_left {
            self.node_mut(l).parent = Some(source);
        }
        self.node_mut(source).right = dest_right;
        if let Some(r) = dest_right {
            self.node_mut(r).parent = Some(source);
        }
        self.node_mut(source).color = dest_color;
    }

    fn erase_fixup(&mut self, mut node: Option<NodeId>, mut parent: Option<NodeId>) {
        while let Some(p) = parent {
            if !self.is_black_opt(node) {
                break;
            }
            debug_assert!(node == self.left(p) || node == self.right(p));

            if node == self.left(p) {
                let mut sibling = match self.right(p) {
                    Some(s) => s,
                    None => break,
                };

                if self.color_of(sibling) == Color::Red {
                    // Case 1: red sibling, rotate to expose a black one
                    self.set_color(sibling, Color::Black);
                    self.set_color(p, Color::Red);
                    self.left_rotate(p);
                    sibling = match self.right(p) {
                        Some(s) => s,
                        None => break,
                    };
                }

                if self.is_black_opt(self.left(sibling)) && self.is_black_opt(self.right(sibling))
                {
                    // Case 2: both sibling children black, move the
                    // deficiency up
                    self.set_color(sibling, Color::Red);
                    node = Some(p);
                    parent = self.parent(p);
                } else {
                    if self.is_black_opt(self.right(sibling)) {
                        // Case 3: far child black, rotate the sibling to
                        // expose a red far child
                        if let Some(sl) = self.left(sibling) {
                            self.set_color(sl, Color::Black);
                        }
                        self.set_color(sibling, Color::Red);
                        self.right_rotate(sibling);
                        sibling = match self.right(p) {
                            Some(s) => s,
                            None => break,
                        };
                    }
                    // Case 4: far child red, recolor and rotate, done
                    let parent_color = self.color_of(p);
                    self.set_color(sibling, parent_color);
                    self.set_color(p, Color::Black);
                    if let Some(sr) = self.right(sibling) {
                        self.set_color(sr, Color::Black);
                    }
                    self.left_rotate(p);
                    node = self.root;
                    parent = None;
                }
            } else {
                // Mirror case
                let mut sibling = match self.left(p) {
                    Some(s) => s,
                    None => break,
                };

                if self.color_of(sibling) == Color::Red {
                    self.set_color(sibling, Color::Black);
                    self.set_color(p, Color::Red);
                    self.right_rotate(p);
                    sibling = match self.left(p) {
                        Some(s) => s,
                        None => break,
                    };
                }

                if self.is_black_opt(self.right(sibling)) && self.is_black_opt(self.left(sibling))
                {
                    self.set_color(sibling, Color::Red);
                    node = Some(p);
                    parent = self.parent(p);
                } else {
                    if self.is_black_opt(self.left(sibling)) {
                        if let Some(sr) = self.right(sibling) {
                            self.set_color(sr, Color::Black);
                        }
                        self.set_color(sibling, Color::Red);
                        self.left_rotate(sibling);
                        sibling = match self.left(p) {
                            Some(s) => s,
                            None => break,
                        };
                    }
                    let parent_color = self.color_of(p);
                    self.set_color(sibling, parent_color);
                    self.set_color(p, Color::Black);
                    if let Some(sl) = self.left(sibling) {
                        self.set_color(sl, Color::Black);
                    }
                    self.right_rotate(p);
                    node = self.root;
                    parent = None;
                }
            }
        }

        if let Some(n) = node {
            self.set_color(n, Color::Black);
        }
    }

    // ===== Replace =====

    /// Substitute `replacement` for `victim` at the same position without
    /// rebalancing. The caller guarantees an equal sort key; `victim`
    /// becomes detached.
    pub fn replace(&mut self, victim: NodeId, replacement: NodeId) {
        debug_assert!(victim != replacement);
        debug_assert!(self.is_attached(victim));
        debug_assert!(!self.is_attached(replacement));
        debug_assert!(self.left(replacement).is_none() && self.right(replacement).is_none());

        let parent = self.parent(victim);
        let left = self.left(victim);
        let right = self.right(victim);
        let color = self.color_of(victim);

        {
            let node = self.node_mut(replacement);
            node.parent = parent;
            node.left = left;
            node.right = right;
            node.color = color;
        }

        match parent {
            None => self.root = Some(replacement),
            Some(p) => {
                if self.left(p) == Some(victim) {
                    self.node_mut(p).left = Some(replacement);
                } else {
                    self.node_mut(p).right = Some(replacement);
                }
            }
        }
        if let Some(l) = left {
            self.node_mut(l).parent = Some(replacement);
        }
        if let Some(r) = right {
            self.node_mut(r).parent = Some(replacement);
        }

        let node = self.node_mut(victim);
        node.parent = None;
        node.left = None;
        node.right = None;
        node.color = Color::Red;
    }

    // ===== Traversal =====

    fn subtree_min(&self, mut node: NodeId) -> NodeId {
        while let Some(left) = self.left(node) {
            node = left;
        }
        node
    }

    fn subtree_max(&self, mut node: NodeId) -> NodeId {
        while let Some(right) = self.right(node) {
            node = right;
        }
        node
    }

    /// Minimum attached node, or None on an empty tree.
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|root| self.subtree_min(root))
    }

    /// Maximum attached node, or None on an empty tree.
    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|root| self.subtree_max(root))
    }

    /// Next node in sorted order, or None if `id` is the maximum.
    pub fn successor(&self, id: NodeId) -> Option<NodeId> {
        debug_assert!(self.is_attached(id));
        if let Some(right) = self.right(id) {
            return Some(self.subtree_min(right));
        }
        let mut current = id;
        let mut parent = self.parent(current);
        while let Some(p) = parent {
            if self.left(p) == Some(current) {
                return Some(p);
            }
            current = p;
            parent = self.parent(p);
        }
        None
    }

    /// Previous node in sorted order, or None if `id` is the minimum.
    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        debug_assert!(self.is_attached(id));
        if let Some(left) = self.left(id) {
            return Some(self.subtree_max(left));
        }
        let mut current = id;
        let mut parent = self.parent(current);
        while let Some(p) = parent {
            if self.right(p) == Some(current) {
                return Some(p);
            }
            current = p;
            parent = self.parent(p);
        }
        None
    }

    /// In-order iterator over `(NodeId, &T)`.
    pub fn iter(&self) -> InOrder<'_, T> {
        InOrder {
            tree: self,
            next: self.first(),
        }
    }

    // ===== Structural validation =====

    /// Check all five red-black invariants plus the attached-node count.
    /// Intended for tests and debugging; runs in O(n).
    pub fn is_valid(&self) -> bool {
        let root = match self.root {
            Some(root) => root,
            None => return self.len == 0,
        };

        // Root is black and has no parent
        if self.parent(root).is_some() || self.color_of(root) != Color::Black {
            return false;
        }

        if !self.check_links(root) {
            return false;
        }

        if !self.check_no_red_red(root) {
            return false;
        }

        let expected = self.leftmost_black_height(root);
        if !self.check_black_height(Some(root), expected, 0) {
            return false;
        }

        self.count_nodes(root) == self.len
    }

    // Parent/child links are mutually consistent
    fn check_links(&self, id: NodeId) -> bool {
        if let Some(left) = self.left(id) {
            if self.parent(left) != Some(id) || !self.check_links(left) {
                return false;
            }
        }
        if let Some(right) = self.right(id) {
            if self.parent(right) != Some(id) || !self.check_links(right) {
                return false;
            }
        }
        true
    }

    // No red node has a red child
    fn check_no_red_red(&self, id: NodeId) -> bool {
        if self.color_of(id) == Color::Red
            && (self.is_red_opt(self.left(id)) || self.is_red_opt(self.right(id)))
        {
            return false;
        }
        let left_ok = self.left(id).map_or(true, |l| self.check_no_red_red(l));
        let right_ok = self.right(id).map_or(true, |r| self.check_no_red_red(r));
        left_ok && right_ok
    }

    fn leftmost_black_height(&self, id: NodeId) -> u32 {
        let mut height = 0;
        let mut current = Some(id);
        while let Some(node) = current {
            if self.color_of(node) == Color::Black {
                height += 1;
            }
            current = self.left(node);
        }
        height
    }

    // Every root-to-nil path carries the same number of black nodes
    fn check_black_height(&self, id: Option<NodeId>, expected: u32, acc: u32) -> bool {
        let node = match id {
            Some(node) => node,
            None => return acc == expected,
        };
        let acc = if self.color_of(node) == Color::Black {
            acc + 1
        } else {
            acc
        };
        self.check_black_height(self.left(node), expected, acc)
            && self.check_black_height(self.right(node), expected, acc)
    }

    fn count_nodes(&self, id: NodeId) -> usize {
        let left = self.left(id).map_or(0, |l| self.count_nodes(l));
        let right = self.right(id).map_or(0, |r| self.count_nodes(r));
        1 + left + right
    }
}

/// Iterator returned by [`RBIndex::iter`].
pub struct InOrder<'a, T> {
    tree: &'a RBIndex<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for InOrder<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.successor(id);
        Some((id, self.tree.get(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn insert_key(tree: &mut RBIndex<u64>, key: u64) -> NodeId {
        let id = tree.alloc(key);
        let point = tree.find_insertion_point(|probe| key < *probe);
        tree.insert_at(point, id);
        id
    }

    fn find_key(tree: &RBIndex<u64>, key: u64) -> Option<NodeId> {
        let mut current = tree.first();
        while let Some(id) = current {
            if *tree.get(id) == key {
                return Some(id);
            }
            current = tree.successor(id);
        }
        None
    }

    fn erase_key(tree: &mut RBIndex<u64>, key: u64) {
        let id = find_key(tree, key).expect("key not present");
        tree.erase(id);
        tree.free(id);
    }

    fn in_order_keys(tree: &RBIndex<u64>) -> Vec<u64> {
        tree.iter().map(|(_, key)| *key).collect()
    }

    fn height(tree: &RBIndex<u64>, id: Option<NodeId>) -> usize {
        match id {
            Some(node) => 1 + height(tree, tree.left(node)).max(height(tree, tree.right(node))),
            None => 0,
        }
    }

    #[test]
    fn empty_tree_boundaries() {
        let tree: RBIndex<u64> = RBIndex::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.first(), None);
        assert_eq!(tree.last(), None);
        assert!(tree.is_valid());
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn single_node() {
        let mut tree = RBIndex::new();
        let id = insert_key(&mut tree, 42);
        assert_eq!(tree.first(), Some(id));
        assert_eq!(tree.last(), Some(id));
        assert_eq!(tree.successor(id), None);
        assert_eq!(tree.predecessor(id), None);
        assert!(tree.is_valid());

        tree.erase(id);
        assert!(tree.is_empty());
        assert!(tree.is_valid());
        assert_eq!(tree.free(id), 42);
    }

    #[test]
    fn concrete_scenario() {
        // Insert [10, 20, 30, 15, 25, 5, 1], then erase 10 (two children)
        let mut tree = RBIndex::new();
        for key in [10, 20, 30, 15, 25, 5, 1] {
            insert_key(&mut tree, key);
            assert!(tree.is_valid());
        }
        assert_eq!(in_order_keys(&tree), vec![1, 5, 10, 15, 20, 25, 30]);

        erase_key(&mut tree, 10);
        assert!(tree.is_valid());
        assert_eq!(in_order_keys(&tree), vec![1, 5, 15, 20, 25, 30]);
    }

    #[test]
    fn successor_predecessor_walk() {
        let mut tree = RBIndex::new();
        for key in [8, 3, 10, 1, 6, 14, 4, 7, 13] {
            insert_key(&mut tree, key);
        }

        let keys = in_order_keys(&tree);
        assert_eq!(keys, vec![1, 3, 4, 6, 7, 8, 10, 13, 14]);

        // Backward walk mirrors the forward one
        let mut backward = Vec::new();
        let mut current = tree.last();
        while let Some(id) = current {
            backward.push(*tree.get(id));
            current = tree.predecessor(id);
        }
        backward.reverse();
        assert_eq!(backward, keys);
    }

    #[test]
    fn erase_single_child_and_leaf() {
        let mut tree = RBIndex::new();
        for key in [20, 10, 30, 5] {
            insert_key(&mut tree, key);
        }
        // 10 has a single left child
        erase_key(&mut tree, 10);
        assert!(tree.is_valid());
        assert_eq!(in_order_keys(&tree), vec![5, 20, 30]);

        // 5 is a leaf
        erase_key(&mut tree, 5);
        assert!(tree.is_valid());
        assert_eq!(in_order_keys(&tree), vec![20, 30]);

        // erase the rest down to empty
        erase_key(&mut tree, 20);
        erase_key(&mut tree, 30);
        assert!(tree.is_empty());
        assert!(tree.is_valid());
    }

    #[test]
    fn erased_node_can_be_reinserted() {
        let mut tree = RBIndex::new();
        for key in [2, 1, 3] {
            insert_key(&mut tree, key);
        }
        let id = find_key(&tree, 2).expect("key not present");
        tree.erase(id);
        assert!(!tree.is_attached(id));

        // Same allocation, new position
        *tree.get_mut(id) = 9;
        let point = tree.find_insertion_point(|probe| 9 < *probe);
        tree.insert_at(point, id);
        assert!(tree.is_valid());
        assert_eq!(in_order_keys(&tree), vec![1, 3, 9]);
    }

    #[test]
    fn replace_preserves_structure() {
        let mut tree = RBIndex::new();
        for key in [10, 20, 30, 15, 25, 5, 1] {
            insert_key(&mut tree, key);
        }
        let victim = find_key(&tree, 15).expect("key not present");
        let replacement = tree.alloc(15);
        tree.replace(victim, replacement);

        assert!(!tree.is_attached(victim));
        assert!(tree.is_attached(replacement));
        assert!(tree.is_valid());
        assert_eq!(in_order_keys(&tree), vec![1, 5, 10, 15, 20, 25, 30]);
        assert_eq!(tree.free(victim), 15);
    }

    #[test]
    fn replace_root() {
        let mut tree = RBIndex::new();
        let old_root = insert_key(&mut tree, 7);
        let replacement = tree.alloc(7);
        tree.replace(old_root, replacement);
        assert_eq!(tree.first(), Some(replacement));
        assert!(tree.is_valid());
        tree.free(old_root);
    }

    #[test]
    fn duplicate_keys_keep_insertion_order() {
        let mut tree = RBIndex::new();
        let a = tree.alloc(5u64);
        let point = tree.find_insertion_point(|probe| 5 < *probe);
        tree.insert_at(point, a);
        let b = tree.alloc(5u64);
        let point = tree.find_insertion_point(|probe| 5 < *probe);
        tree.insert_at(point, b);

        // Ties go right, so the first insert stays leftmost
        assert_eq!(tree.first(), Some(a));
        assert_eq!(tree.successor(a), Some(b));
        assert!(tree.is_valid());
    }

    #[test]
    fn round_trip_membership() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tree = RBIndex::new();
        let keys: Vec<u64> = (0..200).collect();
        for &key in &keys {
            insert_key(&mut tree, key);
        }

        // Erase a random subset
        let mut erased = Vec::new();
        for &key in &keys {
            if rng.random_bool(0.5) {
                erase_key(&mut tree, key);
                erased.push(key);
            }
        }
        assert!(tree.is_valid());

        // Exactly the complement remains, in order
        let expected: Vec<u64> = keys
            .iter()
            .copied()
            .filter(|k| !erased.contains(k))
            .collect();
        assert_eq!(in_order_keys(&tree), expected);
    }

    #[test]
    fn height_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut tree = RBIndex::new();
        for _ in 0..1024 {
            insert_key(&mut tree, rng.random::<u64>());
        }
        assert!(tree.is_valid());

        let n = tree.len() as f64;
        let bound = (2.0 * (n + 1.0).log2()).ceil() as usize;
        assert!(height(&tree, tree.root) <= bound);
    }

    #[test]
    fn stress_random_ops_hold_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut tree = RBIndex::new();
        let mut resident: Vec<(u64, NodeId)> = Vec::new();

        for step in 0..10_000 {
            let do_erase = !resident.is_empty() && rng.random_bool(0.4);
            if do_erase {
                let idx = rng.random_range(0..resident.len());
                let (_, id) = resident.swap_remove(idx);
                tree.erase(id);
                tree.free(id);
            } else {
                let key = rng.random_range(0..1_000u64);
                let id = insert_key(&mut tree, key);
                resident.push((key, id));
            }

            assert!(tree.is_valid(), "invariants broken at step {}", step);
            assert_eq!(tree.len(), resident.len());
        }

        // Final traversal is sorted and complete
        let mut expected: Vec<u64> = resident.iter().map(|&(k, _)| k).collect();
        expected.sort_unstable();
        assert_eq!(in_order_keys(&tree), expected);
    }

    #[test]
    fn clear_recycles_slots() {
        let mut tree = RBIndex::new();
        for key in 0..16 {
            insert_key(&mut tree, key);
        }
        let capacity = tree.nodes.len();
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.is_valid());

        for key in 0..16 {
            insert_key(&mut tree, key);
        }
        // Slots were reused, not regrown
        assert_eq!(tree.nodes.len(), capacity);
        assert_eq!(in_order_keys(&tree), (0..16).collect::<Vec<u64>>());
    }
}
