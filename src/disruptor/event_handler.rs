//! Event Handler Implementation
//!
//! Consumer callbacks. [`EventHandler`] is driven by a batch event processor
//! that sees every event; [`WorkHandler`] is driven by a work processor that
//! competes with its pool for events, so each event reaches exactly one
//! work handler.
//!
//! Optional capabilities (lifecycle, timeout notification, early release) are
//! default trait methods, wired once when the processor is built.

use crate::disruptor::{Result, Sequence};
use std::sync::Arc;

/// Handler for processing every event from the ring buffer
///
/// # Type Parameters
/// * `T` - The event type that will be processed
///
/// # Examples
/// ```
/// use lapring::disruptor::{EventHandler, Result};
///
/// #[derive(Default)]
/// struct MyEvent {
///     data: i32,
/// }
///
/// struct SumHandler {
///     total: i64,
/// }
///
/// impl EventHandler<MyEvent> for SumHandler {
///     fn on_event(&mut self, event: &MyEvent, _sequence: i64, _end_of_batch: bool) -> Result<()> {
///         self.total += i64::from(event.data);
///         Ok(())
///     }
/// }
/// ```
pub trait EventHandler<T>: Send {
    /// Process an event
    ///
    /// # Arguments
    /// * `event` - The published event
    /// * `sequence` - The sequence number of the event in the ring buffer
    /// * `end_of_batch` - True if this is the last event of the batch the
    ///   barrier returned; a good point to flush
    ///
    /// # Errors
    /// Any error is routed to the processor's exception handler and processing
    /// continues with the next event.
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()>;

    /// Called once on the processor thread before the first event
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once on the processor thread after the loop exits
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when a timed wait strategy gives up waiting
    ///
    /// # Arguments
    /// * `sequence` - The last sequence this processor has completed
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }
}

/// Handler for a work processor in a competing-consumer pool
///
/// Each event is delivered to exactly one handler of the pool.
pub trait WorkHandler<T>: Send {
    /// Process an event claimed by this worker
    ///
    /// # Errors
    /// Any error is routed to the exception handler; the event counts as
    /// processed.
    fn on_event(&mut self, event: &T) -> Result<()>;

    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Receive the releaser for this worker's progress sequence
    ///
    /// Handlers that hand events off elsewhere can use it to stop gating
    /// producers before their work is complete.
    fn set_event_releaser(&mut self, _releaser: EventReleaser) {}
}

/// Releases a worker's hold on the ring buffer
///
/// Calling [`release`](Self::release) moves the worker's sequence to
/// `i64::MAX`, so producers and the pool's drain check stop waiting on it.
/// The worker resumes tracking progress with its next claim.
#[derive(Debug, Clone)]
pub struct EventReleaser {
    sequence: Arc<Sequence>,
}

impl EventReleaser {
    pub(crate) fn new(sequence: Arc<Sequence>) -> Self {
        Self { sequence }
    }

    pub fn release(&self) {
        self.sequence.set(i64::MAX);
    }
}

/// Event handler built from a closure
///
/// # Type Parameters
/// * `T` - The event type
/// * `F` - The closure type
pub struct ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    handler: F,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> EventHandler<T> for ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()> {
        (self.handler)(event, sequence, end_of_batch)
    }
}

/// Work handler built from a closure
pub struct ClosureWorkHandler<T, F>
where
    F: FnMut(&T) -> Result<()> + Send,
{
    handler: F,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> ClosureWorkHandler<T, F>
where
    F: FnMut(&T) -> Result<()> + Send,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> WorkHandler<T> for ClosureWorkHandler<T, F>
where
    F: FnMut(&T) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &T) -> Result<()> {
        (self.handler)(event)
    }
}
