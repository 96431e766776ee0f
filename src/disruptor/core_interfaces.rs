//! Core Interfaces for the Disruptor Pattern
//!
//! This module defines the fundamental interfaces shared by sequencers and the
//! ring buffer: cursor access, sequence claiming/publishing, and data access.

use crate::disruptor::Result;

/// Provides access to a cursor value
pub trait Cursored {
    /// Get the current cursor value
    fn get_cursor(&self) -> i64;
}

/// Operations related to sequencing items in a ring buffer
pub trait Sequenced {
    /// Get the capacity of the data structure
    fn get_buffer_size(&self) -> usize;

    /// Check if the buffer has capacity for additional sequences
    ///
    /// This is a concurrent method, so the response should only be taken
    /// as an indication of available capacity.
    fn has_available_capacity(&self, required_capacity: usize) -> bool;

    /// Get the remaining capacity for this sequencer
    fn remaining_capacity(&self) -> i64;

    /// Claim the next sequence for publishing, waiting for capacity if needed
    ///
    /// # Errors
    /// Only fails for an invalid claim size
    fn next(&self) -> Result<i64>;

    /// Claim the next n sequences for publishing
    ///
    /// This is for batch event producing:
    ///
    /// ```ignore
    /// let n = 10;
    /// let hi = sequencer.next_n(n)?;
    /// let lo = hi - (n - 1);
    /// for sequence in lo..=hi {
    ///     // Do work
    /// }
    /// sequencer.publish_range(lo, hi);
    /// ```
    ///
    /// # Returns
    /// The highest claimed sequence value
    ///
    /// # Errors
    /// Returns `InvalidClaimSize` if `n` is less than 1 or larger than the buffer
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Attempt to claim the next sequence without waiting
    ///
    /// # Errors
    /// Returns `InsufficientCapacity` if no slot is free; the cursor is untouched
    fn try_next(&self) -> Result<i64>;

    /// Attempt to claim the next n sequences without waiting
    ///
    /// # Errors
    /// Returns `InsufficientCapacity` if fewer than `n` slots are free, or
    /// `InvalidClaimSize` for a claim size outside `1..=buffer_size`
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Publish a sequence once its event has been filled
    fn publish(&self, sequence: i64);

    /// Publish the inclusive range `lo..=hi`
    fn publish_range(&self, lo: i64, hi: i64);
}

/// Provides data access abstraction
///
/// Decouples consumers from the concrete ring buffer, mostly for testing.
pub trait DataProvider<T> {
    /// Get the data item at the specified sequence
    fn get(&self, sequence: i64) -> &T;
}
