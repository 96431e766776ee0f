//! Ring Buffer Implementation
//!
//! This module provides the core ring buffer for the Disruptor pattern.
//! The ring buffer is a pre-allocated circular array of events paired with the
//! sequencer that decides which slot a producer may write and which slots a
//! consumer may read.

use crate::disruptor::{
    Cursored, DataProvider, EventFactory, MultiProducerSequencer, ProducerType, Result, Sequence,
    SequenceBarrier, Sequenced, Sequencer, SingleProducerSequencer, WaitStrategy,
};
use std::cell::UnsafeCell;
use std::sync::Arc;

/// The core ring buffer for storing events
///
/// Every slot is created up front by the event factory and reused on every
/// lap. Slot `s` lives at index `s & (buffer_size - 1)`.
///
/// # Type Parameters
/// * `T` - The event type stored in the buffer
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    index_mask: i64,
    sequencer: Arc<dyn Sequencer>,
}

impl<T> RingBuffer<T>
where
    T: Send + Sync,
{
    /// Create a ring buffer for the given producer type
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    ///
    /// # Examples
    /// ```
    /// use lapring::disruptor::{
    ///     BlockingWaitStrategy, DefaultEventFactory, ProducerType, RingBuffer,
    /// };
    /// use std::sync::Arc;
    ///
    /// let ring_buffer = RingBuffer::<i64>::create(
    ///     ProducerType::Single,
    ///     DefaultEventFactory::new(),
    ///     16,
    ///     Arc::new(BlockingWaitStrategy::new()),
    /// )
    /// .unwrap();
    /// assert_eq!(ring_buffer.buffer_size(), 16);
    /// ```
    pub fn create<F>(
        producer_type: ProducerType,
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        match producer_type {
            ProducerType::Single => {
                Self::create_single_producer(event_factory, buffer_size, wait_strategy)
            }
            ProducerType::Multi => {
                Self::create_multi_producer(event_factory, buffer_size, wait_strategy)
            }
        }
    }

    /// Create a ring buffer driven by a [`SingleProducerSequencer`]
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create_single_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = SingleProducerSequencer::new(buffer_size, wait_strategy)?;
        Ok(Self::with_sequencer(event_factory, Arc::new(sequencer)))
    }

    /// Create a ring buffer driven by a [`MultiProducerSequencer`]
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create_multi_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = MultiProducerSequencer::new(buffer_size, wait_strategy)?;
        Ok(Self::with_sequencer(event_factory, Arc::new(sequencer)))
    }

    /// Create a ring buffer over an existing sequencer
    ///
    /// The buffer takes its size from the sequencer, which has already
    /// validated it.
    pub fn with_sequencer<F>(event_factory: F, sequencer: Arc<dyn Sequencer>) -> Self
    where
        F: EventFactory<T>,
    {
        let buffer_size = sequencer.get_buffer_size();
        let slots: Box<[UnsafeCell<T>]> = (0..buffer_size)
            .map(|_| UnsafeCell::new(event_factory.new_instance()))
            .collect();

        Self {
            slots,
            index_mask: (buffer_size - 1) as i64,
            sequencer,
        }
    }

    /// Get a reference to the event at the specified sequence
    ///
    /// Callers must only read sequences the barrier reported as available;
    /// the slot of an unpublished sequence may be under construction.
    #[inline]
    pub fn get(&self, sequence: i64) -> &T {
        let index = (sequence & self.index_mask) as usize;
        // SAFETY: Index is within bounds - guaranteed by invariant and index mask.
        let slot = unsafe { self.slots.get_unchecked(index) };
        unsafe { &*slot.get() }
    }

    /// Get a mutable reference to the event at the specified sequence
    pub fn get_mut(&mut self, sequence: i64) -> &mut T {
        let index = (sequence & self.index_mask) as usize;
        self.slots[index].get_mut()
    }

    /// Raw pointer to the event at the specified sequence
    ///
    /// # Safety
    /// The caller must hold the claim for `sequence` (returned by `next` or
    /// `try_next` and not yet published), and every consumer that can read
    /// the slot must be registered as a gating sequence.
    #[inline]
    pub unsafe fn get_mut_unchecked(&self, sequence: i64) -> *mut T {
        let index = (sequence & self.index_mask) as usize;
        self.slots.get_unchecked(index).get()
    }

    /// Claim the next slot, fill it through `translator`, then publish it
    ///
    /// The slot is published even if the translator panics, so consumers never
    /// stall behind a half-written sequence.
    ///
    /// # Errors
    /// Never fails for a valid ring buffer; the claim itself waits for capacity.
    ///
    /// # Examples
    /// ```
    /// use lapring::disruptor::{BlockingWaitStrategy, DefaultEventFactory, RingBuffer};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicI64, Ordering};
    ///
    /// let ring_buffer = RingBuffer::<AtomicI64>::create_multi_producer(
    ///     DefaultEventFactory::new(),
    ///     8,
    ///     Arc::new(BlockingWaitStrategy::new()),
    /// )
    /// .unwrap();
    ///
    /// let sequence = ring_buffer
    ///     .publish_event(|event, sequence| event.store(sequence * 10, Ordering::Relaxed))
    ///     .unwrap();
    /// assert!(ring_buffer.is_published(sequence));
    /// assert_eq!(ring_buffer.get(sequence).load(Ordering::Relaxed), 0);
    /// ```
    pub fn publish_event<F>(&self, translator: F) -> Result<i64>
    where
        F: FnOnce(&mut T, i64),
    {
        let sequence = self.sequencer.next()?;
        self.translate_and_publish(sequence, translator);
        Ok(sequence)
    }

    /// Like [`publish_event`](Self::publish_event) but fails instead of waiting
    ///
    /// # Errors
    /// `InsufficientCapacity` when no slot is free; nothing is claimed
    pub fn try_publish_event<F>(&self, translator: F) -> Result<i64>
    where
        F: FnOnce(&mut T, i64),
    {
        let sequence = self.sequencer.try_next()?;
        self.translate_and_publish(sequence, translator);
        Ok(sequence)
    }

    /// Claim `count` slots, fill each through `translator`, publish them together
    ///
    /// # Returns
    /// The highest published sequence
    ///
    /// # Errors
    /// `InvalidClaimSize` for a count outside `1..=buffer_size`
    pub fn publish_events<F>(&self, count: i64, mut translator: F) -> Result<i64>
    where
        F: FnMut(&mut T, i64),
    {
        let hi = self.sequencer.next_n(count)?;
        let lo = hi - (count - 1);
        let _guard = PublishGuard {
            sequencer: self.sequencer.as_ref(),
            lo,
            hi,
        };
        for sequence in lo..=hi {
            // SAFETY: lo..=hi is claimed by this call and not yet published.
            let event = unsafe { &mut *self.get_mut_unchecked(sequence) };
            translator(event, sequence);
        }
        Ok(hi)
    }

    fn translate_and_publish<F>(&self, sequence: i64, translator: F)
    where
        F: FnOnce(&mut T, i64),
    {
        let _guard = PublishGuard {
            sequencer: self.sequencer.as_ref(),
            lo: sequence,
            hi: sequence,
        };
        // SAFETY: `sequence` was claimed by the caller and is not yet published.
        let event = unsafe { &mut *self.get_mut_unchecked(sequence) };
        translator(event, sequence);
    }

    /// Get the size of the buffer
    pub fn buffer_size(&self) -> usize {
        self.slots.len()
    }

    /// Whether `sequence` has been published and not yet overwritten
    pub fn is_published(&self, sequence: i64) -> bool {
        self.sequencer.is_available(sequence)
    }

    /// Add consumer sequences the producers must not overtake
    pub fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_sequences(gating_sequences);
    }

    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_sequence(sequence)
    }

    /// Minimum of the gating sequences, or the cursor if there are none
    pub fn get_minimum_gating_sequence(&self) -> i64 {
        self.sequencer.get_minimum_sequence()
    }

    /// Create a barrier for a consumer that follows `sequences_to_track`
    pub fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> Arc<dyn SequenceBarrier> {
        Arc::clone(&self.sequencer).new_barrier(sequences_to_track)
    }

    /// The sequencer coordinating this buffer
    pub fn sequencer(&self) -> &Arc<dyn Sequencer> {
        &self.sequencer
    }
}

/// Publishes a claimed range when dropped
struct PublishGuard<'a> {
    sequencer: &'a dyn Sequencer,
    lo: i64,
    hi: i64,
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        if self.lo == self.hi {
            self.sequencer.publish(self.hi);
        } else {
            self.sequencer.publish_range(self.lo, self.hi);
        }
    }
}

impl<T: Send + Sync> Cursored for RingBuffer<T> {
    fn get_cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }
}

impl<T: Send + Sync> Sequenced for RingBuffer<T> {
    fn get_buffer_size(&self) -> usize {
        self.slots.len()
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        self.sequencer.has_available_capacity(required_capacity)
    }

    fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    fn next(&self) -> Result<i64> {
        self.sequencer.next()
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.next_n(n)
    }

    fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.try_next_n(n)
    }

    fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        self.sequencer.publish_range(lo, hi);
    }
}

impl<T: Send + Sync> DataProvider<T> for RingBuffer<T> {
    fn get(&self, sequence: i64) -> &T {
        RingBuffer::get(self, sequence)
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.slots.len())
            .field("sequencer", &self.sequencer)
            .finish()
    }
}

// SAFETY: slots are only written by the producer holding the claim and only
// read after publication, which the sequencer orders with release/acquire.
unsafe impl<T: Send + Sync> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}
