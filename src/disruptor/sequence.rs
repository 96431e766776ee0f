//! Sequence implementation for the Disruptor
//!
//! The Sequence is used to track progress through the ring buffer and coordinate
//! between producers and consumers. It provides atomic operations while preventing
//! false sharing through cache line padding.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::disruptor::INITIAL_CURSOR_VALUE;

/// A sequence number that prevents false sharing
///
/// The counter occupies its own cache line, so a hot producer cursor never
/// shares a line with a neighbouring consumer sequence.
///
/// Writes from `set` are release stores and reads from `get` are acquire loads:
/// anything written before publishing a sequence value is visible to a thread
/// that observes that value.
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    /// Create a new sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(initial_value)),
        }
    }

    /// Create a new sequence starting at [`INITIAL_CURSOR_VALUE`]
    pub fn new_with_initial_value() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }

    /// Get the current sequence value
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the sequence value (ordered store)
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Set the sequence value with a full fence
    ///
    /// Subsequent loads on this thread cannot be reordered before this store.
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Atomically set the value to `new` if it currently equals `expected`
    ///
    /// # Returns
    /// True if the swap happened
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Increment and get the new value
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Add a value and get the new result
    #[inline]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel) + increment
    }

    /// Get the current value and then add
    #[inline]
    pub fn get_and_add(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel)
    }

    /// Get the minimum value across `sequences`, or `minimum` if it is lower
    ///
    /// An empty slice yields `minimum`.
    pub fn get_minimum_sequence(sequences: &[Arc<Sequence>], minimum: i64) -> i64 {
        sequences
            .iter()
            .fold(minimum, |current, sequence| current.min(sequence.get()))
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new_with_initial_value()
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("value", &self.get())
            .finish()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A fixed group of sequences read as their minimum
///
/// Used by barriers to track the slowest member of an upstream consumer group.
#[derive(Debug, Clone)]
pub struct FixedSequenceGroup {
    sequences: Vec<Arc<Sequence>>,
}

impl FixedSequenceGroup {
    pub fn new(sequences: Vec<Arc<Sequence>>) -> Self {
        Self { sequences }
    }

    /// The minimum value of the group (`i64::MAX` when empty)
    pub fn get(&self) -> i64 {
        Sequence::get_minimum_sequence(&self.sequences, i64::MAX)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// The sequence a consumer must additionally stay behind
///
/// A consumer with no upstream dependencies follows the producer cursor;
/// otherwise it follows the slowest of its upstream consumers.
#[derive(Debug, Clone)]
pub enum DependentSequence {
    Cursor(Arc<Sequence>),
    Group(FixedSequenceGroup),
}

impl DependentSequence {
    /// Build the dependent view for a barrier
    pub fn new(cursor: Arc<Sequence>, dependents: &[Arc<Sequence>]) -> Self {
        if dependents.is_empty() {
            Self::Cursor(cursor)
        } else {
            Self::Group(FixedSequenceGroup::new(dependents.to_vec()))
        }
    }

    #[inline]
    pub fn get(&self) -> i64 {
        match self {
            Self::Cursor(cursor) => cursor.get(),
            Self::Group(group) => group.get(),
        }
    }
}
