//! Lapring Disruptor Core
//!
//! This module provides the sequence-coordination core of the Disruptor pattern:
//! sequences, the ring buffer, single and multi producer sequencers, sequence
//! barriers, wait strategies, and the event/work processors that consume events.

pub mod config;
pub mod core_interfaces;
pub mod event_factory;
pub mod event_handler;
pub mod event_processor;
pub mod exception_handler;
pub mod producer_type;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequencer;
pub mod thread_management;
pub mod wait_strategy;
pub mod work_processor;
pub mod worker_pool;


pub use config::{DisruptorConfig, WaitStrategyConfig};
pub use core_interfaces::{Cursored, DataProvider, Sequenced};
pub use event_factory::{ClosureEventFactory, DefaultEventFactory, EventFactory};
pub use event_handler::{
    ClosureEventHandler, ClosureWorkHandler, EventHandler, EventReleaser, WorkHandler,
};
pub use event_processor::{BatchEventProcessor, EventProcessor};
pub use exception_handler::{
    ClosureExceptionHandler, ExceptionHandler, IgnoreExceptionHandler, LoggingExceptionHandler,
};
pub use producer_type::ProducerType;
pub use ring_buffer::RingBuffer;
pub use sequence::{DependentSequence, FixedSequenceGroup, Sequence};
pub use sequence_barrier::{ProcessingSequenceBarrier, SequenceBarrier};
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use thread_management::{ManagedThread, ThreadBuilder};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, LiteBlockingWaitStrategy, SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};
pub use work_processor::WorkProcessor;
pub use worker_pool::WorkerPool;

/// The initial cursor value for sequences
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Errors that can occur in the Disruptor
#[derive(Debug, thiserror::Error)]
pub enum DisruptorError {
    /// A non-blocking claim could not be satisfied without overtaking a consumer
    #[error("Insufficient capacity in ring buffer")]
    InsufficientCapacity,

    /// The sequence barrier was alerted while (or before) waiting
    #[error("Sequence barrier alerted")]
    Alert,

    #[error("Timeout waiting for sequence")]
    Timeout,

    #[error("Buffer size must be a power of 2, got: {0}")]
    InvalidBufferSize(usize),

    #[error("Claim size must be between 1 and the buffer size, got: {0}")]
    InvalidClaimSize(i64),

    #[error("Processor is already running")]
    AlreadyRunning,

    /// Failure reported by user event handling code
    #[error("Event handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Event handler panicked: {0}")]
    HandlerPanic(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn processor thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

impl DisruptorError {
    /// Wrap an arbitrary error raised by handler code
    ///
    /// # Examples
    /// ```
    /// use lapring::disruptor::DisruptorError;
    ///
    /// let error = DisruptorError::handler("bad payload");
    /// assert_eq!(error.to_string(), "Event handler failed: bad payload");
    /// ```
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Handler(error.into())
    }
}

pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Utility function to check if a number is a power of 2
#[must_use]
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}
