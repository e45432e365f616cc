/*!
 * AVL Ordered Map
 * Arena-backed self-balancing search tree keyed by a caller-supplied comparator
 *
 * # Properties
 *
 * - O(log n) insert and lookup, O(1) count
 * - Insert-if-absent: an equal entry is never replaced
 * - At most one rotation (single or double) per insertion
 * - In-order traversal depends only on key order, never on insertion history
 *
 * Nodes live in a `Vec` and refer to each other by index, so rotations only
 * rewrite a handful of `Option<NodeId>` links. Entries are never removed
 * before teardown, which keeps every index stable for the life of the map.
 */

use crate::core::errors::MapError;
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use thiserror::Error;

type NodeId = usize;

/// Branch taken from a node: `Low` holds smaller keys, `High` larger ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Direction {
    Low = 0,
    High = 1,
}

impl Direction {
    #[inline]
    fn towards(ord: Ordering) -> Self {
        if ord == Ordering::Greater {
            Direction::High
        } else {
            Direction::Low
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    #[inline]
    fn opposite(self) -> Self {
        match self {
            Direction::Low => Direction::High,
            Direction::High => Direction::Low,
        }
    }

    /// Balance contribution of growing the subtree on this side
    #[inline]
    fn weight(self) -> i8 {
        match self {
            Direction::Low => -1,
            Direction::High => 1,
        }
    }
}

struct Node<T> {
    links: [Option<NodeId>; 2],
    /// height(high) - height(low); ±2 only transiently inside `insert`
    balance: i8,
    payload: T,
}

impl<T> Node<T> {
    #[inline]
    fn child(&self, dir: Direction) -> Option<NodeId> {
        self.links[dir.index()]
    }
}

/// Branches taken on the way down, one bit per level (set = `High`).
/// An AVL tree addressable by `usize` ids is far shallower than 128 levels.
#[derive(Clone, Copy, Default)]
struct DescentPath {
    bits: u128,
    len: u32,
}

impl DescentPath {
    const CAPACITY: u32 = u128::BITS;

    #[inline]
    fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    fn push(&mut self, dir: Direction) {
        debug_assert!(self.len < Self::CAPACITY);
        if dir == Direction::High {
            self.bits |= 1u128 << self.len;
        }
        self.len += 1;
    }

    fn steps(self) -> impl Iterator<Item = Direction> {
        (0..self.len).map(move |level| {
            if self.bits >> level & 1 == 1 {
                Direction::High
            } else {
                Direction::Low
            }
        })
    }
}

/// Outcome of the descent performed by `insert`
enum Probe {
    Occupied(NodeId),
    Vacant { parent: NodeId, dir: Direction },
}

/// Rejected insertion. The payload that was offered is always handed back.
#[derive(Error)]
pub enum InsertError<'a, T> {
    #[error("duplicate key: an equal entry is already stored")]
    Duplicate { existing: &'a T, rejected: T },

    #[error("allocation failure while growing node storage")]
    AllocationFailure { rejected: T },
}

impl<'a, T> InsertError<'a, T> {
    /// Payload-free classification of the failure
    pub fn kind(&self) -> MapError {
        match self {
            InsertError::Duplicate { .. } => MapError::DuplicateKey,
            InsertError::AllocationFailure { .. } => MapError::AllocationFailure,
        }
    }

    /// The stored entry that caused a duplicate rejection
    pub fn existing(&self) -> Option<&'a T> {
        match self {
            InsertError::Duplicate { existing, .. } => Some(*existing),
            InsertError::AllocationFailure { .. } => None,
        }
    }

    /// Take back the payload that was not stored
    pub fn into_rejected(self) -> T {
        match self {
            InsertError::Duplicate { rejected, .. } => rejected,
            InsertError::AllocationFailure { rejected } => rejected,
        }
    }
}

impl<T> fmt::Debug for InsertError<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InsertError::{:?}", self.kind())
    }
}

/// Destructor invoked once per payload at teardown
pub type Destructor<T> = Box<dyn FnMut(T) + Send>;

/// Generic AVL tree holding payloads ordered by `compare`.
///
/// `compare` must be a consistent total order for the lifetime of the map.
pub struct OrderedMap<T, C> {
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
    compare: C,
    destructor: Option<Destructor<T>>,
}

impl<T, C> OrderedMap<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    /// Create an empty map ordered by `compare`
    pub fn new(compare: C) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            compare,
            destructor: None,
        }
    }

    /// Create an empty map that runs `destructor` on every payload at teardown
    pub fn with_destructor<D>(compare: C, destructor: D) -> Self
    where
        D: FnMut(T) + Send + 'static,
    {
        Self {
            nodes: Vec::new(),
            root: None,
            compare,
            destructor: Some(Box::new(destructor)),
        }
    }

    /// Insert `payload` unless an entry comparing equal already exists.
    ///
    /// On a duplicate the stored entry is left untouched and returned together
    /// with the rejected payload.
    pub fn insert(&mut self, payload: T) -> Result<(), InsertError<'_, T>> {
        let Some(root) = self.root else {
            return match self.alloc_node(payload) {
                Ok(id) => {
                    self.root = Some(id);
                    Ok(())
                }
                Err(rejected) => Err(InsertError::AllocationFailure { rejected }),
            };
        };

        // Deepest ancestor with a non-zero balance and its parent. Balances
        // are only adjusted from here down, and only here can a rotation be
        // needed. The root stands in when every node on the path is balanced.
        let mut unbal = root;
        let mut unbal_parent: Option<NodeId> = None;
        // Branches taken from `unbal` down to the new leaf's parent
        let mut path = DescentPath::default();

        let mut current = root;
        let mut parent: Option<NodeId> = None;
        let probe = loop {
            let node = &self.nodes[current];
            let ord = (self.compare)(&payload, &node.payload);
            if ord == Ordering::Equal {
                break Probe::Occupied(current);
            }

            if node.balance != 0 {
                unbal = current;
                unbal_parent = parent;
                path.clear();
            }

            let dir = Direction::towards(ord);
            path.push(dir);

            match node.child(dir) {
                Some(next) => {
                    parent = Some(current);
                    current = next;
                }
                None => break Probe::Vacant { parent: current, dir },
            }
        };

        let (leaf_parent, dir) = match probe {
            Probe::Occupied(id) => {
                return Err(InsertError::Duplicate {
                    existing: &self.nodes[id].payload,
                    rejected: payload,
                })
            }
            Probe::Vacant { parent, dir } => (parent, dir),
        };

        let leaf = match self.alloc_node(payload) {
            Ok(id) => id,
            Err(rejected) => return Err(InsertError::AllocationFailure { rejected }),
        };
        self.nodes[leaf_parent].links[dir.index()] = Some(leaf);

        let mut node = unbal;
        for step in path.steps() {
            let current = &mut self.nodes[node];
            current.balance += step.weight();
            match current.child(step) {
                Some(next) => node = next,
                None => break,
            }
        }
        debug_assert_eq!(node, leaf);

        let subtree = match self.nodes[unbal].balance {
            -2 => self.rotate(unbal, Direction::Low),
            2 => self.rotate(unbal, Direction::High),
            _ => return Ok(()),
        };

        match unbal_parent {
            None => self.root = Some(subtree),
            Some(p) => {
                let side = if self.nodes[p].child(Direction::Low) == Some(unbal) {
                    Direction::Low
                } else {
                    Direction::High
                };
                self.nodes[p].links[side.index()] = Some(subtree);
            }
        }

        Ok(())
    }

    /// Restore balance at `y`, whose `heavy` side is two levels taller.
    /// Returns the new root of the rotated subtree.
    fn rotate(&mut self, y: NodeId, heavy: Direction) -> NodeId {
        let light = heavy.opposite();
        let sign = heavy.weight();
        let x = self.nodes[y]
            .child(heavy)
            .expect("a balance of ±2 implies a child on the heavy side");

        if self.nodes[x].balance == sign {
            // Single rotation: x rises, y becomes its light child
            self.nodes[y].links[heavy.index()] = self.nodes[x].child(light);
            self.nodes[x].links[light.index()] = Some(y);
            self.nodes[x].balance = 0;
            self.nodes[y].balance = 0;
            return x;
        }

        debug_assert_eq!(self.nodes[x].balance, -sign);

        // Double rotation: the pivot w (x's light child) rises above both
        let w = self.nodes[x]
            .child(light)
            .expect("an inner-heavy child implies a pivot on its light side");
        self.nodes[x].links[light.index()] = self.nodes[w].child(heavy);
        self.nodes[w].links[heavy.index()] = Some(x);
        self.nodes[y].links[heavy.index()] = self.nodes[w].child(light);
        self.nodes[w].links[light.index()] = Some(y);

        let (y_balance, x_balance) = match self.nodes[w].balance {
            b if b == sign => (-sign, 0),
            b if b == -sign => (0, sign),
            _ => (0, 0),
        };
        self.nodes[y].balance = y_balance;
        self.nodes[x].balance = x_balance;
        self.nodes[w].balance = 0;
        w
    }

    /// Find the stored entry comparing equal to `probe`
    pub fn get(&self, probe: &T) -> Option<&T> {
        let mut node = self.root;
        while let Some(id) = node {
            let current = &self.nodes[id];
            match (self.compare)(probe, &current.payload) {
                Ordering::Less => node = current.child(Direction::Low),
                Ordering::Greater => node = current.child(Direction::High),
                Ordering::Equal => return Some(&current.payload),
            }
        }
        None
    }

    /// Check whether an entry comparing equal to `probe` is stored
    pub fn contains(&self, probe: &T) -> bool {
        self.get(probe).is_some()
    }
}

impl<T, C> OrderedMap<T, C> {
    fn alloc_node(&mut self, payload: T) -> Result<NodeId, T> {
        if self.nodes.try_reserve(1).is_err() {
            return Err(payload);
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            links: [None, None],
            balance: 0,
            payload,
        });
        Ok(id)
    }

    /// Number of stored entries
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes on the longest root-to-leaf path (0 when empty)
    pub fn height(&self) -> usize {
        self.subtree_height(self.root)
    }

    fn subtree_height(&self, node: Option<NodeId>) -> usize {
        match node {
            None => 0,
            Some(id) => {
                let n = &self.nodes[id];
                1 + self
                    .subtree_height(n.child(Direction::Low))
                    .max(self.subtree_height(n.child(Direction::High)))
            }
        }
    }

    /// Payloads in ascending key order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            order: InOrder::new(&self.nodes, self.root),
        }
    }

    /// Visit every payload once, in ascending key order
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&T),
    {
        for payload in self.iter() {
            visit(payload);
        }
    }

    /// Visit every payload mutably, in ascending key order.
    ///
    /// `visit` may change payload contents but must not change how the
    /// payload compares, or later lookups and inserts will misbehave.
    pub fn for_each_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut T),
    {
        let order: Vec<NodeId> = InOrder::new(&self.nodes, self.root).collect();
        for id in order {
            visit(&mut self.nodes[id].payload);
        }
    }

    /// Borrow every payload into a vector, ascending
    pub fn to_vec(&self) -> Vec<&T> {
        self.iter().collect()
    }

    /// Consume the map, returning payloads in ascending order.
    /// The destructor is not run; ownership passes to the caller.
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        self.destructor = None;
        self.drain_sorted()
    }

    /// Release the map, running the destructor (if any) on every payload
    pub fn teardown(self) {
        drop(self);
    }

    fn drain_sorted(&mut self) -> Vec<T> {
        let order: Vec<NodeId> = InOrder::new(&self.nodes, self.root).collect();
        self.root = None;
        let mut slots: Vec<Option<T>> = mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| Some(node.payload))
            .collect();
        order.into_iter().filter_map(|id| slots[id].take()).collect()
    }
}

impl<T, C> Drop for OrderedMap<T, C> {
    fn drop(&mut self) {
        if let Some(mut destroy) = self.destructor.take() {
            for payload in self.drain_sorted() {
                destroy(payload);
            }
        }
    }
}

impl<T: fmt::Debug, C> fmt::Debug for OrderedMap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, C> IntoIterator for &'a OrderedMap<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order walk over node ids using an explicit stack
struct InOrder<'a, T> {
    nodes: &'a [Node<T>],
    stack: Vec<NodeId>,
    remaining: usize,
}

impl<'a, T> InOrder<'a, T> {
    fn new(nodes: &'a [Node<T>], root: Option<NodeId>) -> Self {
        let mut walk = Self {
            nodes,
            stack: Vec::new(),
            remaining: nodes.len(),
        };
        walk.descend_low(root);
        walk
    }

    fn descend_low(&mut self, mut node: Option<NodeId>) {
        while let Some(id) = node {
            self.stack.push(id);
            node = self.nodes[id].child(Direction::Low);
        }
    }
}

impl<T> Iterator for InOrder<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.descend_low(self.nodes[id].child(Direction::High));
        self.remaining -= 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Ascending iterator over the payloads of an `OrderedMap`
pub struct Iter<'a, T> {
    order: InOrder<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let nodes = self.order.nodes;
        self.order.next().map(|id| &nodes[id].payload)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
