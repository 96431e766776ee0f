//! Exception Handler Implementation
//!
//! Processors never let a handler failure escape their run loop. Failures from
//! `on_event`, `on_start` and `on_shutdown` (including caught panics) are
//! passed to an exception handler instead.

use crate::disruptor::DisruptorError;
use tracing::{error, warn};

/// Handler for failures raised by event and work handlers
///
/// # Type Parameters
/// * `T` - The event type being processed
pub trait ExceptionHandler<T>: Send + Sync {
    /// Handle a failure while processing the event at `sequence`
    ///
    /// `event` is `None` when the failure happened before the slot was read.
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>);

    /// Handle a failure from the handler's `on_start`
    fn handle_on_start_exception(&self, error: DisruptorError);

    /// Handle a failure from the handler's `on_shutdown`
    fn handle_on_shutdown_exception(&self, error: DisruptorError);
}

/// Exception handler that logs every failure through `tracing`
///
/// Used by processors unless another handler is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExceptionHandler;

impl LoggingExceptionHandler {
    pub fn new() -> Self {
        Self
    }
}

impl<T> ExceptionHandler<T> for LoggingExceptionHandler {
    fn handle_event_exception(&self, err: DisruptorError, sequence: i64, event: Option<&T>) {
        error!(
            sequence,
            has_event = event.is_some(),
            error = %err,
            "exception processing event"
        );
    }

    fn handle_on_start_exception(&self, err: DisruptorError) {
        warn!(error = %err, "exception during processor start");
    }

    fn handle_on_shutdown_exception(&self, err: DisruptorError) {
        warn!(error = %err, "exception during processor shutdown");
    }
}

/// Exception handler that drops every failure
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreExceptionHandler;

impl IgnoreExceptionHandler {
    pub fn new() -> Self {
        Self
    }
}

impl<T> ExceptionHandler<T> for IgnoreExceptionHandler {
    fn handle_event_exception(&self, _error: DisruptorError, _sequence: i64, _event: Option<&T>) {}

    fn handle_on_start_exception(&self, _error: DisruptorError) {}

    fn handle_on_shutdown_exception(&self, _error: DisruptorError) {}
}

/// Closure-based exception handler
///
/// # Type Parameters
/// * `T` - The event type
/// * `F` - The closure type for event exceptions
/// * `S` - The closure type for startup exceptions
/// * `H` - The closure type for shutdown exceptions
pub struct ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    event_handler: F,
    start_handler: S,
    shutdown_handler: H,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F, S, H> ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    pub fn new(event_handler: F, start_handler: S, shutdown_handler: H) -> Self {
        Self {
            event_handler,
            start_handler,
            shutdown_handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F, S, H> ExceptionHandler<T> for ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        (self.event_handler)(error, sequence, event);
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        (self.start_handler)(error);
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        (self.shutdown_handler)(error);
    }
}
