//! `Lapring` - Lock-free sequence coordination core
//!
//! The messaging core of the LMAX Disruptor pattern: a pre-allocated ring
//! buffer, single and multi producer sequencers, sequence barriers with
//! pluggable wait strategies, and the consumer loops that drive user handlers,
//! including competing-consumer worker pools.
//!
//! ## Features
//!
//! - **Pre-allocated**: every slot is created once by an event factory
//! - **Lock-free claiming**: producers coordinate through atomic sequences only
//! - **Cache-line isolation**: hot counters never share a line
//! - **Batching**: consumers handle everything published since their last wait
//! - **Cooperative shutdown**: halting a processor alerts its barrier and wakes it
//!
//! ## Quick Start
//!
//! ```rust
//! use lapring::disruptor::{
//!     BatchEventProcessor, BlockingWaitStrategy, ClosureEventHandler, DefaultEventFactory,
//!     EventProcessor, RingBuffer,
//! };
//! use std::sync::Arc;
//! use std::thread;
//!
//! let ring_buffer = Arc::new(
//!     RingBuffer::<i64>::create_single_producer(
//!         DefaultEventFactory::new(),
//!         1024,
//!         Arc::new(BlockingWaitStrategy::new()),
//!     )
//!     .unwrap(),
//! );
//!
//! let processor = Arc::new(BatchEventProcessor::new(
//!     ring_buffer.clone(),
//!     ring_buffer.new_barrier(&[]),
//!     ClosureEventHandler::new(|event: &i64, sequence, _end_of_batch| {
//!         assert_eq!(*event, sequence * 2);
//!         Ok(())
//!     }),
//! ));
//! ring_buffer.add_gating_sequences(&[processor.get_sequence()]);
//!
//! let consumer = {
//!     let processor = Arc::clone(&processor);
//!     thread::spawn(move || processor.run())
//! };
//!
//! for _ in 0..100 {
//!     ring_buffer.publish_event(|event, sequence| *event = sequence * 2).unwrap();
//! }
//!
//! while processor.get_sequence().get() < 99 {
//!     thread::yield_now();
//! }
//! processor.halt();
//! consumer.join().unwrap().unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **`Sequence`**: padded atomic counter marking progress
//! - **`Sequencer`**: claims and publishes sequences (single or multi producer)
//! - **`RingBuffer`**: the slots plus the sequencer that guards them
//! - **`SequenceBarrier`**: a consumer's view of the cursor and its upstream consumers
//! - **`WaitStrategy`**: how a consumer waits for the next sequence
//! - **`BatchEventProcessor`** / **`WorkProcessor`**: the consumer run loops
//! - **`WorkerPool`**: competing consumers sharing one work sequence

pub mod disruptor;

// Re-export the main types for convenience
pub use disruptor::{
    // Utility functions
    is_power_of_two,
    BatchEventProcessor,
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    // Convenience types
    ClosureEventFactory,
    ClosureEventHandler,
    ClosureWorkHandler,
    // Producer and data access interfaces
    Cursored,
    DataProvider,
    DefaultEventFactory,
    // Configuration
    DisruptorConfig,
    // Error types
    DisruptorError,
    EventFactory,
    // Event handling
    EventHandler,
    // Event processing
    EventProcessor,
    EventReleaser,
    // Exception handling
    ExceptionHandler,
    LiteBlockingWaitStrategy,
    LoggingExceptionHandler,
    MultiProducerSequencer,
    ProducerType,
    Result,
    RingBuffer,
    Sequence,
    SequenceBarrier,
    Sequenced,
    // Sequencing
    Sequencer,
    SingleProducerSequencer,
    SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy,
    WaitStrategy,
    WaitStrategyConfig,
    WorkHandler,
    WorkProcessor,
    WorkerPool,
    YieldingWaitStrategy,
    // Constants
    INITIAL_CURSOR_VALUE,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version of the `Lapring` library
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
