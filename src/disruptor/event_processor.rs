//! Event Processor implementation for the Disruptor
//!
//! Event processors own a consumer's run loop: wait on the barrier, hand each
//! available event to the handler, then advance the processor's sequence so
//! producers and downstream consumers can move on.

use crate::disruptor::{
    DataProvider, DisruptorError, EventHandler, ExceptionHandler, LoggingExceptionHandler, Result,
    Sequence, SequenceBarrier,
};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A consumer run loop that can be started on a thread and halted from another
pub trait EventProcessor: Send + Sync {
    /// The sequence this processor has completed up to
    ///
    /// Register it as a gating sequence (or upstream dependency) before running.
    fn get_sequence(&self) -> Arc<Sequence>;

    /// Signal the processor to stop once the current event completes
    fn halt(&self);

    fn is_running(&self) -> bool;

    /// Run the processing loop on the calling thread until halted
    ///
    /// # Errors
    /// `AlreadyRunning` if the processor is already running on another thread
    fn run(&self) -> Result<()>;
}

pub(crate) const IDLE: u8 = 0;
pub(crate) const HALTED: u8 = 1;
pub(crate) const RUNNING: u8 = 2;

/// Run handler code, turning a panic into `DisruptorError::HandlerPanic`
pub(crate) fn guard_handler<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(DisruptorError::HandlerPanic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Processor delivering every published event to one [`EventHandler`]
///
/// The sequence is advanced once per batch, after the handler has seen every
/// event of the batch.
///
/// # Type Parameters
/// * `T` - The event type
/// * `H` - The event handler type
pub struct BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    sequence: Arc<Sequence>,
    barrier: Arc<dyn SequenceBarrier>,
    data_provider: Arc<dyn DataProvider<T> + Send + Sync>,
    handler: Mutex<H>,
    exception_handler: Box<dyn ExceptionHandler<T>>,
    state: AtomicU8,
}

impl<T, H> BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    /// Create a new batch event processor
    ///
    /// Failures are logged through [`LoggingExceptionHandler`] unless
    /// [`with_exception_handler`](Self::with_exception_handler) replaces it.
    pub fn new(
        data_provider: Arc<dyn DataProvider<T> + Send + Sync>,
        barrier: Arc<dyn SequenceBarrier>,
        handler: H,
    ) -> Self {
        Self {
            sequence: Arc::new(Sequence::new_with_initial_value()),
            barrier,
            data_provider,
            handler: Mutex::new(handler),
            exception_handler: Box::new(LoggingExceptionHandler::new()),
            state: AtomicU8::new(IDLE),
        }
    }

    pub fn with_exception_handler<E>(mut self, exception_handler: E) -> Self
    where
        E: ExceptionHandler<T> + 'static,
    {
        self.exception_handler = Box::new(exception_handler);
        self
    }

    fn process_events(&self, handler: &mut H) {
        let mut next_sequence = self.sequence.get() + 1;

        loop {
            if self.state.load(Ordering::Acquire) != RUNNING {
                break;
            }
            match self.barrier.wait_for(next_sequence) {
                Ok(available_sequence) => {
                    if available_sequence < next_sequence {
                        continue;
                    }

                    while next_sequence <= available_sequence {
                        let event = self.data_provider.get(next_sequence);
                        let end_of_batch = next_sequence == available_sequence;
                        let sequence = next_sequence;
                        if let Err(error) =
                            guard_handler(|| handler.on_event(event, sequence, end_of_batch))
                        {
                            self.exception_handler.handle_event_exception(
                                error,
                                sequence,
                                Some(event),
                            );
                        }
                        next_sequence += 1;
                    }

                    self.sequence.set(available_sequence);
                }
                Err(DisruptorError::Timeout) => {
                    let sequence = self.sequence.get();
                    if let Err(error) = guard_handler(|| handler.on_timeout(sequence)) {
                        self.exception_handler
                            .handle_event_exception(error, sequence, None);
                    }
                }
                Err(DisruptorError::Alert) => {
                    if self.state.load(Ordering::Acquire) != RUNNING {
                        break;
                    }
                }
                Err(error) => {
                    self.exception_handler
                        .handle_event_exception(error, next_sequence, None);
                }
            }
        }
    }

    fn notify_start(&self, handler: &mut H) {
        if let Err(error) = guard_handler(|| handler.on_start()) {
            self.exception_handler.handle_on_start_exception(error);
        }
    }

    fn notify_shutdown(&self, handler: &mut H) {
        if let Err(error) = guard_handler(|| handler.on_shutdown()) {
            self.exception_handler.handle_on_shutdown_exception(error);
        }
    }
}

impl<T, H> EventProcessor for BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        self.state.store(HALTED, Ordering::Release);
        self.barrier.alert();
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    fn run(&self) -> Result<()> {
        if let Err(previous) =
            self.state
                .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            if previous == RUNNING {
                return Err(DisruptorError::AlreadyRunning);
            }

            // Halted before the loop started: honour the halt.
            let mut handler = self.handler.lock();
            self.notify_start(&mut handler);
            self.notify_shutdown(&mut handler);
            self.state.store(IDLE, Ordering::Release);
            return Ok(());
        }

        self.barrier.clear_alert();
        // A halt between the state change and the clear would be lost.
        if self.state.load(Ordering::Acquire) != RUNNING {
            self.barrier.alert();
        }

        let mut handler = self.handler.lock();
        debug!(sequence = self.sequence.get(), "batch event processor started");

        self.notify_start(&mut handler);
        self.process_events(&mut handler);
        self.notify_shutdown(&mut handler);

        debug!(sequence = self.sequence.get(), "batch event processor stopped");
        self.state.store(IDLE, Ordering::Release);
        Ok(())
    }
}

impl<T, H> std::fmt::Debug for BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEventProcessor")
            .field("sequence", &self.sequence)
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish()
    }
}
