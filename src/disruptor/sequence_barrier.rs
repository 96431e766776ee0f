//! Sequence Barrier Implementation
//!
//! A sequence barrier is a consumer's view of the ring: the producer cursor,
//! the upstream consumers it must stay behind, and an alert flag used to
//! interrupt a waiting consumer during shutdown.

use crate::disruptor::{DependentSequence, DisruptorError, Result, Sequence, Sequencer, WaitStrategy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Coordination barrier for managing dependencies between event processors
pub trait SequenceBarrier: Send + Sync + std::fmt::Debug {
    /// Wait for the given sequence to become available
    ///
    /// # Returns
    /// The highest sequence that may be consumed. This can exceed `sequence`
    /// (a batch), or fall below it when the wait strategy returns early.
    ///
    /// # Errors
    /// `Alert` if the barrier is alerted, `Timeout` from timed strategies
    fn wait_for(&self, sequence: i64) -> Result<i64>;

    /// Current value of the sequence this barrier follows
    fn get_cursor(&self) -> i64;

    fn is_alerted(&self) -> bool;

    /// Alert the barrier and wake every thread waiting on it
    fn alert(&self);

    fn clear_alert(&self);

    /// # Errors
    /// Returns `DisruptorError::Alert` if the barrier has been alerted
    fn check_alert(&self) -> Result<()>;
}

/// Standard sequence barrier handed out by sequencers
#[derive(Debug)]
pub struct ProcessingSequenceBarrier {
    sequencer: Arc<dyn Sequencer>,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    dependent: DependentSequence,
    alerted: AtomicBool,
}

impl ProcessingSequenceBarrier {
    /// Create a barrier over `sequencer`'s cursor and the given upstream sequences
    ///
    /// With no `dependent_sequences` the barrier follows the cursor directly.
    pub fn new(sequencer: Arc<dyn Sequencer>, dependent_sequences: &[Arc<Sequence>]) -> Self {
        let cursor = sequencer.cursor_sequence();
        let wait_strategy = sequencer.wait_strategy();
        let dependent = DependentSequence::new(Arc::clone(&cursor), dependent_sequences);

        Self {
            sequencer,
            wait_strategy,
            cursor,
            dependent,
            alerted: AtomicBool::new(false),
        }
    }
}

impl SequenceBarrier for ProcessingSequenceBarrier {
    fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence =
            self.wait_strategy
                .wait_for(sequence, &self.cursor, &self.dependent, self)?;

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    fn get_cursor(&self) -> i64 {
        self.dependent.get()
    }

    fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    fn alert(&self) {
        debug!("sequence barrier alerted");
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(DisruptorError::Alert)
        } else {
            Ok(())
        }
    }
}
