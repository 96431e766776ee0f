//! Sequencer Implementation
//!
//! Sequencers hand out sequence numbers to producers and make sure a producer
//! never laps the slowest gating consumer. The single producer variant keeps
//! its claim state in plain counters owned by the publishing thread; the multi
//! producer variant claims through a CAS loop on the shared cursor and tracks
//! per-slot availability so consumers can find the contiguous published frontier.

use crate::disruptor::{
    is_power_of_two, Cursored, DisruptorError, ProcessingSequenceBarrier, Result, Sequence,
    SequenceBarrier, Sequenced, WaitStrategy,
};
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::sync::atomic::{fence, AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::trace;

/// Coordinates claiming and publishing of sequences for a ring buffer
///
/// Producer operations come from [`Sequenced`], the cursor from [`Cursored`].
pub trait Sequencer: Sequenced + Cursored + Send + Sync + std::fmt::Debug {
    /// The cursor sequence itself, shared with barriers
    fn cursor_sequence(&self) -> Arc<Sequence>;

    /// The wait strategy consumers of this sequencer block on
    fn wait_strategy(&self) -> Arc<dyn WaitStrategy>;

    /// Force the claim position to `sequence`
    ///
    /// Only meaningful while no producer is active, e.g. when restoring state.
    fn claim(&self, sequence: i64);

    /// Whether `sequence` has been published and not yet overwritten
    fn is_available(&self, sequence: i64) -> bool;

    /// Add sequences that producers must not overtake
    ///
    /// Each sequence is first positioned at the current cursor so a late
    /// joiner does not hold producers back at the sentinel value.
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove a gating sequence by identity
    ///
    /// # Returns
    /// True if the sequence was found and removed
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Create a barrier over the cursor and the given upstream sequences
    fn new_barrier(self: Arc<Self>, sequences_to_track: &[Arc<Sequence>])
        -> Arc<dyn SequenceBarrier>;

    /// Minimum of the gating sequences, or the cursor if there are none
    fn get_minimum_sequence(&self) -> i64;

    /// Highest sequence in `next_sequence..=available_sequence` below which
    /// every sequence has been published
    ///
    /// Returns `next_sequence - 1` when `next_sequence` itself is not yet
    /// published.
    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64;
}

fn check_claim_size(n: i64, buffer_size: usize) -> Result<()> {
    if n < 1 || n > buffer_size as i64 {
        return Err(DisruptorError::InvalidClaimSize(n));
    }
    Ok(())
}

fn check_buffer_size(buffer_size: usize) -> Result<()> {
    if !is_power_of_two(buffer_size) || buffer_size > i32::MAX as usize {
        return Err(DisruptorError::InvalidBufferSize(buffer_size));
    }
    Ok(())
}

/// The set of consumer sequences gating a sequencer
///
/// Readers take a snapshot under a shared lock; a reader may see the set from
/// just before a concurrent add or remove, never a torn one.
#[derive(Debug, Default)]
struct GatingSequences {
    sequences: RwLock<Vec<Arc<Sequence>>>,
}

impl GatingSequences {
    fn add(&self, cursor: &Sequence, gating_sequences: &[Arc<Sequence>]) {
        let mut sequences = self.sequences.write();
        let cursor_value = cursor.get();
        for sequence in gating_sequences {
            sequence.set(cursor_value);
            sequences.push(Arc::clone(sequence));
        }
    }

    fn remove(&self, sequence: &Arc<Sequence>) -> bool {
        let mut sequences = self.sequences.write();
        let before = sequences.len();
        sequences.retain(|s| !Arc::ptr_eq(s, sequence));
        sequences.len() != before
    }

    fn minimum(&self, minimum: i64) -> i64 {
        Sequence::get_minimum_sequence(&self.sequences.read(), minimum)
    }
}

/// Sequencer for a single publishing thread
///
/// Claims are tracked in `next_value`, which is only ever written by the
/// producer; the shared cursor moves on publish. Concurrent calls to `next`
/// from several threads are a logic error (use [`MultiProducerSequencer`]).
#[derive(Debug)]
pub struct SingleProducerSequencer {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: GatingSequences,
    /// Highest claimed sequence
    next_value: CachePadded<AtomicI64>,
    /// Last observed minimum gating sequence
    cached_value: CachePadded<AtomicI64>,
}

impl SingleProducerSequencer {
    /// Create a new single producer sequencer
    ///
    /// # Errors
    /// `InvalidBufferSize` unless `buffer_size` is a power of two
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        check_buffer_size(buffer_size)?;
        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::new_with_initial_value()),
            gating_sequences: GatingSequences::default(),
            next_value: CachePadded::new(AtomicI64::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
            cached_value: CachePadded::new(AtomicI64::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
        })
    }

    /// Refresh the cached gating minimum if claiming `required` more slots
    /// could wrap; returns whether the claim fits.
    fn has_capacity(&self, required: i64, do_store: bool) -> bool {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let wrap_point = next_value + required - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            if do_store {
                // Order our earlier cursor publication before reading consumers.
                fence(Ordering::SeqCst);
            }
            let min_sequence = self.gating_sequences.minimum(next_value);
            self.cached_value.store(min_sequence, Ordering::Relaxed);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Cursored for SingleProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }
}

impl Sequenced for SingleProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        // More than a full lap can never fit; also keeps the cast below exact.
        if required_capacity > self.buffer_size {
            return false;
        }
        self.has_capacity(required_capacity as i64, false)
    }

    fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let consumed = self.gating_sequences.minimum(next_value);
        self.buffer_size as i64 - (next_value - consumed)
    }

    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        check_claim_size(n, self.buffer_size)?;

        let next_value = self.next_value.load(Ordering::Relaxed);
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            fence(Ordering::SeqCst);

            let mut min_sequence = self.gating_sequences.minimum(next_value);
            if wrap_point > min_sequence {
                trace!(
                    wrap_point,
                    min_sequence,
                    "single producer waiting for gating sequences"
                );
                while wrap_point > min_sequence {
                    thread::yield_now();
                    min_sequence = self.gating_sequences.minimum(next_value);
                }
            }

            self.cached_value.store(min_sequence, Ordering::Relaxed);
        }

        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        check_claim_size(n, self.buffer_size)?;

        if !self.has_capacity(n, true) {
            return Err(DisruptorError::InsufficientCapacity);
        }

        let next_sequence = self.next_value.load(Ordering::Relaxed) + n;
        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn publish(&self, sequence: i64) {
        self.cursor.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _lo: i64, hi: i64) {
        self.publish(hi);
    }
}

impl Sequencer for SingleProducerSequencer {
    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.wait_strategy)
    }

    fn claim(&self, sequence: i64) {
        self.next_value.store(sequence, Ordering::Relaxed);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let current = self.cursor.get();
        sequence <= current && sequence > current - self.buffer_size as i64
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.gating_sequences.add(&self.cursor, gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating_sequences.remove(sequence)
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: &[Arc<Sequence>],
    ) -> Arc<dyn SequenceBarrier> {
        Arc::new(ProcessingSequenceBarrier::new(self, sequences_to_track))
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.gating_sequences.minimum(self.cursor.get())
    }

    fn get_highest_published_sequence(&self, _next_sequence: i64, available_sequence: i64) -> i64 {
        available_sequence
    }
}

/// Sequencer safe for any number of concurrent publishing threads
///
/// The cursor holds the highest *claimed* sequence. Publication is recorded
/// per slot as the lap number (`sequence >> log2(buffer_size)`), so a slot is
/// available exactly when its marker matches the lap of the sequence asked
/// about.
#[derive(Debug)]
pub struct MultiProducerSequencer {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: GatingSequences,
    gating_sequence_cache: Sequence,
    available_buffer: Box<[AtomicI32]>,
    index_mask: usize,
    index_shift: u32,
}

impl MultiProducerSequencer {
    /// Create a new multi producer sequencer
    ///
    /// # Errors
    /// `InvalidBufferSize` unless `buffer_size` is a power of two
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        check_buffer_size(buffer_size)?;

        let available_buffer = (0..buffer_size)
            .map(|_| AtomicI32::new(-1))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::new_with_initial_value()),
            gating_sequences: GatingSequences::default(),
            gating_sequence_cache: Sequence::new_with_initial_value(),
            available_buffer,
            index_mask: buffer_size - 1,
            index_shift: buffer_size.trailing_zeros(),
        })
    }

    #[inline]
    fn calculate_index(&self, sequence: i64) -> usize {
        (sequence as usize) & self.index_mask
    }

    #[inline]
    fn calculate_availability_flag(&self, sequence: i64) -> i32 {
        (sequence >> self.index_shift) as i32
    }

    #[inline]
    fn set_available(&self, sequence: i64) {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].store(flag, Ordering::Release);
    }

    fn has_capacity(&self, required: i64, cursor_value: i64) -> bool {
        let wrap_point = cursor_value + required - self.buffer_size as i64;
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence = self.gating_sequences.minimum(cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Cursored for MultiProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }
}

impl Sequenced for MultiProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        required_capacity <= self.buffer_size
            && self.has_capacity(required_capacity as i64, self.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.cursor.get();
        let consumed = self.gating_sequences.minimum(produced);
        self.buffer_size as i64 - (produced - consumed)
    }

    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        check_claim_size(n, self.buffer_size)?;

        let mut logged = false;
        loop {
            let current = self.cursor.get();
            let next = current + n;
            let wrap_point = next - self.buffer_size as i64;
            let cached_gating_sequence = self.gating_sequence_cache.get();

            if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
                let gating_sequence = self.gating_sequences.minimum(current);

                if wrap_point > gating_sequence {
                    if !logged {
                        trace!(
                            wrap_point,
                            gating_sequence,
                            "multi producer waiting for gating sequences"
                        );
                        logged = true;
                    }
                    thread::yield_now();
                    continue;
                }

                self.gating_sequence_cache.set(gating_sequence);
            } else if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        check_claim_size(n, self.buffer_size)?;

        loop {
            let current = self.cursor.get();
            let next = current + n;

            if !self.has_capacity(n, current) {
                return Err(DisruptorError::InsufficientCapacity);
            }

            if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        for sequence in lo..=hi {
            self.set_available(sequence);
        }
        self.wait_strategy.signal_all_when_blocking();
    }
}

impl Sequencer for MultiProducerSequencer {
    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.wait_strategy)
    }

    fn claim(&self, sequence: i64) {
        self.cursor.set(sequence);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].load(Ordering::Acquire) == flag
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.gating_sequences.add(&self.cursor, gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating_sequences.remove(sequence)
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: &[Arc<Sequence>],
    ) -> Arc<dyn SequenceBarrier> {
        Arc::new(ProcessingSequenceBarrier::new(self, sequences_to_track))
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.gating_sequences.minimum(self.cursor.get())
    }

    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64 {
        for sequence in next_sequence..=available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
        }
        available_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{BlockingWaitStrategy, BusySpinWaitStrategy};
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::time::Duration;

    fn single(size: usize) -> SingleProducerSequencer {
        SingleProducerSequencer::new(size, Arc::new(BlockingWaitStrategy::new())).unwrap()
    }

    fn multi(size: usize) -> MultiProducerSequencer {
        MultiProducerSequencer::new(size, Arc::new(BlockingWaitStrategy::new())).unwrap()
    }

    #[test]
    fn test_rejects_invalid_buffer_size() {
        let strategy: Arc<dyn WaitStrategy> = Arc::new(BusySpinWaitStrategy::new());
        assert!(matches!(
            SingleProducerSequencer::new(6, Arc::clone(&strategy)),
            Err(DisruptorError::InvalidBufferSize(6))
        ));
        assert!(matches!(
            MultiProducerSequencer::new(0, strategy),
            Err(DisruptorError::InvalidBufferSize(0))
        ));
    }

    #[test]
    fn test_rejects_invalid_claim_size() {
        let sp = single(8);
        let mp = multi(8);

        assert!(matches!(sp.next_n(0), Err(DisruptorError::InvalidClaimSize(0))));
        assert!(matches!(sp.try_next_n(9), Err(DisruptorError::InvalidClaimSize(9))));
        assert!(matches!(mp.next_n(-1), Err(DisruptorError::InvalidClaimSize(-1))));
        assert!(matches!(mp.try_next_n(9), Err(DisruptorError::InvalidClaimSize(9))));
    }

    #[test]
    fn test_capacity_beyond_one_lap_is_never_available() {
        let sp = single(8);
        let mp = multi(8);

        for sequencer in [&sp as &dyn Sequencer, &mp] {
            assert!(sequencer.has_available_capacity(8));
            assert!(!sequencer.has_available_capacity(9));
            assert!(!sequencer.has_available_capacity(usize::MAX));
            assert!(!sequencer.has_available_capacity(usize::MAX / 2 + 1));
        }
    }

    #[test]
    fn test_single_producer_claims_in_order() {
        let sequencer = single(8);

        assert_eq!(sequencer.next().unwrap(), 0);
        assert_eq!(sequencer.next().unwrap(), 1);
        assert_eq!(sequencer.next_n(3).unwrap(), 4);
        // Claiming does not move the cursor; publishing does.
        assert_eq!(sequencer.get_cursor(), -1);

        sequencer.publish_range(0, 4);
        assert_eq!(sequencer.get_cursor(), 4);
    }

    #[test]
    fn test_publish_makes_only_that_sequence_available() {
        let sp = single(8);
        let seq = sp.next().unwrap();
        assert!(!sp.is_available(seq));
        sp.publish(seq);
        assert!(sp.is_available(seq));
        assert!(!sp.is_available(seq + 1));

        let mp = multi(8);
        let seq = mp.next().unwrap();
        assert!(!mp.is_available(seq));
        mp.publish(seq);
        assert!(mp.is_available(seq));
        assert!(!mp.is_available(seq + 1));
    }

    #[test]
    fn test_single_producer_try_next_fails_when_full() {
        let sequencer = single(4);
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer)]);

        let hi = sequencer.try_next_n(4).unwrap();
        sequencer.publish_range(0, hi);
        assert_eq!(sequencer.remaining_capacity(), 0);
        assert!(!sequencer.has_available_capacity(1));

        assert!(matches!(
            sequencer.try_next(),
            Err(DisruptorError::InsufficientCapacity)
        ));
        assert_eq!(sequencer.get_cursor(), 3);

        consumer.set(0);
        assert!(sequencer.has_available_capacity(1));
        assert_eq!(sequencer.try_next().unwrap(), 4);
    }

    #[test]
    fn test_multi_producer_try_next_leaves_cursor_on_failure() {
        let sequencer = multi(4);
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer)]);

        assert_eq!(sequencer.try_next_n(4).unwrap(), 3);
        assert!(matches!(
            sequencer.try_next(),
            Err(DisruptorError::InsufficientCapacity)
        ));
        assert_eq!(sequencer.get_cursor(), 3);
        assert_eq!(sequencer.remaining_capacity(), 0);

        consumer.set(1);
        assert_eq!(sequencer.remaining_capacity(), 2);
        assert_eq!(sequencer.try_next_n(2).unwrap(), 5);
    }

    #[test]
    fn test_next_blocks_until_gating_sequence_advances() {
        let sequencer = Arc::new(single(4));
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer)]);

        let hi = sequencer.next_n(4).unwrap();
        sequencer.publish_range(0, hi);

        let (tx, rx) = mpsc::channel();
        let producer = {
            let sequencer = Arc::clone(&sequencer);
            thread::spawn(move || {
                let claimed = sequencer.next().unwrap();
                tx.send(claimed).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        consumer.set(0);
        let claimed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(claimed, 4);
        producer.join().unwrap();
    }

    #[test]
    fn test_added_gating_sequence_starts_at_cursor() {
        let sequencer = single(8);
        for _ in 0..3 {
            let seq = sequencer.next().unwrap();
            sequencer.publish(seq);
        }

        let late = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[Arc::clone(&late)]);
        assert_eq!(late.get(), 2);
        assert_eq!(sequencer.get_minimum_sequence(), 2);

        assert!(sequencer.remove_gating_sequence(&late));
        assert!(!sequencer.remove_gating_sequence(&late));
    }

    #[test]
    fn test_minimum_sequence_defaults_to_cursor() {
        let sequencer = multi(8);
        let seq = sequencer.next().unwrap();
        sequencer.publish(seq);
        assert_eq!(sequencer.get_minimum_sequence(), 0);
    }

    #[test]
    fn test_multi_producer_reverse_publish_frontier() {
        let sequencer = multi(8);

        let first_hi = sequencer.next_n(4).unwrap();
        let second_hi = sequencer.next_n(4).unwrap();
        assert_eq!((first_hi, second_hi), (3, 7));

        sequencer.publish_range(4, 7);
        assert_eq!(sequencer.get_highest_published_sequence(0, 7), -1);

        sequencer.publish_range(0, 3);
        assert_eq!(sequencer.get_highest_published_sequence(0, 7), 7);
    }

    #[test]
    fn test_multi_producer_frontier_stops_at_first_gap() {
        let sequencer = multi(8);
        let hi = sequencer.next_n(6).unwrap();
        assert_eq!(hi, 5);

        for seq in [0, 1, 3, 4, 5] {
            sequencer.publish(seq);
        }
        assert_eq!(sequencer.get_highest_published_sequence(0, 5), 1);

        sequencer.publish(2);
        assert_eq!(sequencer.get_highest_published_sequence(0, 5), 5);
    }

    #[test]
    fn test_multi_producer_availability_tracks_laps() {
        let sequencer = multi(4);
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[Arc::clone(&consumer)]);

        let hi = sequencer.next_n(4).unwrap();
        sequencer.publish_range(0, hi);
        consumer.set(hi);

        let seq = sequencer.next().unwrap();
        assert_eq!(seq, 4);
        // Slot 0 still carries lap 0.
        assert!(sequencer.is_available(0));
        assert!(!sequencer.is_available(4));

        sequencer.publish(seq);
        assert!(sequencer.is_available(4));
        assert!(!sequencer.is_available(0));
    }

    #[test]
    fn test_single_producer_claim_resets_position() {
        let sequencer = single(8);
        sequencer.claim(10);
        assert_eq!(sequencer.next().unwrap(), 11);

        let sequencer = multi(8);
        sequencer.claim(10);
        assert_eq!(sequencer.get_cursor(), 10);
        assert_eq!(sequencer.next().unwrap(), 11);
    }

    #[test]
    fn test_multi_producer_concurrent_claims_are_unique() {
        let sequencer = Arc::new(multi(1024));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let sequencer = Arc::clone(&sequencer);
            handles.push(thread::spawn(move || {
                let mut claimed = Vec::with_capacity(200);
                for _ in 0..200 {
                    let seq = sequencer.next().unwrap();
                    sequencer.publish(seq);
                    claimed.push(seq);
                }
                claimed
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for seq in handle.join().unwrap() {
                assert!(all.insert(seq), "sequence {seq} claimed twice");
            }
        }

        assert_eq!(all.len(), 800);
        assert_eq!(sequencer.get_cursor(), 799);
        assert_eq!(sequencer.get_highest_published_sequence(0, 799), 799);
    }
}
