/*!
 * Data Structures
 *
 * Specialized data structures for snapshot bookkeeping:
 * - AVL ordered map with insert-if-absent semantics
 *
 * # Performance
 *
 * - Insert and lookup: O(log n), at most one rotation per insert
 * - Count: O(1)
 * - Traversal: O(n), explicit stack, no recursion
 */

mod avl;

pub use avl::{Destructor, InsertError, Iter, OrderedMap};
