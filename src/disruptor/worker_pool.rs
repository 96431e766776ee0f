//! Worker Pool Implementation
//!
//! A pool of [`WorkProcessor`]s sharing one work sequence. Each published
//! event is handled by exactly one worker of the pool.

use crate::disruptor::{
    Cursored, DisruptorError, EventProcessor, ExceptionHandler, LoggingExceptionHandler,
    ManagedThread, Result, RingBuffer, Sequence, SequenceBarrier, ThreadBuilder, WorkHandler,
    WorkProcessor,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Competing-consumer pool over a ring buffer
///
/// # Examples
/// ```
/// use lapring::disruptor::{
///     BlockingWaitStrategy, ClosureWorkHandler, DefaultEventFactory, RingBuffer, WorkerPool,
/// };
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use std::sync::Arc;
///
/// let ring_buffer = Arc::new(
///     RingBuffer::<i64>::create_multi_producer(
///         DefaultEventFactory::new(),
///         64,
///         Arc::new(BlockingWaitStrategy::new()),
///     )
///     .unwrap(),
/// );
/// let total = Arc::new(AtomicI64::new(0));
/// let handlers = (0..2)
///     .map(|_| {
///         let total = Arc::clone(&total);
///         ClosureWorkHandler::new(move |event: &i64| {
///             total.fetch_add(*event, Ordering::Relaxed);
///             Ok(())
///         })
///     })
///     .collect();
///
/// let pool = WorkerPool::with_handlers(Arc::clone(&ring_buffer), handlers);
/// pool.start().unwrap();
/// for i in 1..=10 {
///     ring_buffer.publish_event(|event, _| *event = i).unwrap();
/// }
/// pool.drain_and_halt();
/// pool.join().unwrap();
/// assert_eq!(total.load(Ordering::Relaxed), 55);
/// ```
pub struct WorkerPool<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T> + 'static,
{
    ring_buffer: Arc<RingBuffer<T>>,
    work_sequence: Arc<Sequence>,
    processors: Vec<Arc<WorkProcessor<T, H>>>,
    threads: Mutex<Vec<ManagedThread>>,
    started: AtomicBool,
    thread_name_prefix: String,
    cpu_cores: Vec<usize>,
}

impl<T, H> WorkerPool<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T> + 'static,
{
    /// Create a pool over an existing barrier
    ///
    /// The caller is responsible for registering
    /// [`worker_sequences`](Self::worker_sequences) as gating sequences.
    pub fn new(
        ring_buffer: Arc<RingBuffer<T>>,
        barrier: Arc<dyn SequenceBarrier>,
        exception_handler: Arc<dyn ExceptionHandler<T>>,
        handlers: Vec<H>,
    ) -> Self {
        let work_sequence = Arc::new(Sequence::new_with_initial_value());
        let processors = handlers
            .into_iter()
            .map(|handler| {
                Arc::new(
                    WorkProcessor::new(
                        ring_buffer.clone(),
                        Arc::clone(&barrier),
                        handler,
                        Arc::clone(&work_sequence),
                    )
                    .with_exception_handler(Arc::clone(&exception_handler)),
                )
            })
            .collect();

        Self {
            ring_buffer,
            work_sequence,
            processors,
            threads: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            thread_name_prefix: "lapring-worker".to_string(),
            cpu_cores: Vec::new(),
        }
    }

    /// Create a pool reading straight from the producers
    ///
    /// Builds a barrier with no upstream dependencies, logs failures, and
    /// registers the worker sequences as gating sequences of `ring_buffer`.
    pub fn with_handlers(ring_buffer: Arc<RingBuffer<T>>, handlers: Vec<H>) -> Self {
        let barrier = ring_buffer.new_barrier(&[]);
        let pool = Self::new(
            Arc::clone(&ring_buffer),
            barrier,
            Arc::new(LoggingExceptionHandler::new()),
            handlers,
        );
        ring_buffer.add_gating_sequences(&pool.worker_sequences());
        pool
    }

    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Pin worker `i` to `cores[i % cores.len()]`
    pub fn with_cpu_affinity(mut self, cores: Vec<usize>) -> Self {
        self.cpu_cores = cores;
        self
    }

    /// Every worker's sequence followed by the shared work sequence
    ///
    /// Producers must be gated on all of them.
    pub fn worker_sequences(&self) -> Vec<Arc<Sequence>> {
        self.processors
            .iter()
            .map(|processor| processor.get_sequence())
            .chain(std::iter::once(Arc::clone(&self.work_sequence)))
            .collect()
    }

    pub fn size(&self) -> usize {
        self.processors.len()
    }

    /// Start one thread per worker
    ///
    /// Threads left over from a halted run are joined first. All sequences
    /// are then moved to the ring buffer's cursor, so the pool only sees
    /// events published from now on.
    ///
    /// # Errors
    /// `AlreadyRunning` if the pool was started and not yet halted;
    /// `HandlerPanic` if a thread of the previous run panicked;
    /// `InvalidConfig` or `ThreadSpawn` if a worker thread cannot be created
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(DisruptorError::AlreadyRunning);
        }

        // A halted worker may still be inside its last event.
        if let Err(error) = self.join() {
            self.started.store(false, Ordering::Release);
            return Err(error);
        }

        let cursor = self.ring_buffer.get_cursor();
        self.work_sequence.set(cursor);
        for processor in &self.processors {
            processor.get_sequence().set(cursor);
        }

        if let Err(error) = self.spawn_workers() {
            let spawned = self.threads.lock().len();
            for processor in &self.processors[..spawned] {
                processor.halt();
            }
            self.started.store(false, Ordering::Release);
            if let Err(join_error) = self.join() {
                warn!(error = %join_error, "worker failed while unwinding a partial start");
            }
            return Err(error);
        }

        info!(
            workers = self.processors.len(),
            cursor, "worker pool started"
        );
        Ok(())
    }

    fn spawn_workers(&self) -> Result<()> {
        let mut threads = self.threads.lock();
        for (index, processor) in self.processors.iter().enumerate() {
            let mut builder =
                ThreadBuilder::new().thread_name(format!("{}-{index}", self.thread_name_prefix));
            if !self.cpu_cores.is_empty() {
                builder = builder.pin_at_core(self.cpu_cores[index % self.cpu_cores.len()])?;
            }

            let processor = Arc::clone(processor);
            threads.push(builder.spawn(move || {
                if let Err(error) = processor.run() {
                    warn!(%error, "worker exited without processing");
                }
            })?);
        }
        Ok(())
    }

    /// Wait until every event published so far has been handled, then halt
    pub fn drain_and_halt(&self) {
        let worker_sequences = self.worker_sequences();
        while self.ring_buffer.get_cursor()
            > Sequence::get_minimum_sequence(&worker_sequences, i64::MAX)
        {
            thread::yield_now();
        }

        self.halt();
    }

    /// Halt every worker after its current event
    ///
    /// Does nothing unless the pool is started. Worker threads may still be
    /// finishing an event when this returns; [`join`](Self::join) waits for
    /// them.
    pub fn halt(&self) {
        if !self.started.swap(false, Ordering::AcqRel) {
            return;
        }
        for processor in &self.processors {
            processor.halt();
        }
        info!(workers = self.processors.len(), "worker pool halted");
    }

    /// Wait for all worker threads to exit
    ///
    /// # Errors
    /// `HandlerPanic` if a worker thread panicked outside handler code
    pub fn join(&self) -> Result<()> {
        let threads: Vec<ManagedThread> = self.threads.lock().drain(..).collect();
        let mut result = Ok(());
        for thread in threads {
            if let Err(error) = thread.join() {
                result = Err(error);
            }
        }
        result
    }

    pub fn is_running(&self) -> bool {
        self.processors.iter().any(|processor| processor.is_running())
    }
}

impl<T, H> Drop for WorkerPool<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T> + 'static,
{
    /// Halts a running pool; the worker threads are joined as they drop
    fn drop(&mut self) {
        self.halt();
    }
}

impl<T, H> std::fmt::Debug for WorkerPool<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T> + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.processors.len())
            .field("work_sequence", &self.work_sequence)
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish()
    }
}
