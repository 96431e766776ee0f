//! Slot constructors for the ring buffer

use std::fmt;
use std::marker::PhantomData;

/// Builds the value each ring buffer slot starts out with
///
/// The ring buffer calls [`new_instance`](Self::new_instance) exactly once
/// per slot while it is being created. Producers then overwrite slots in
/// place, so the factory never runs on the publishing path.
///
/// # Examples
/// ```
/// use lapring::disruptor::EventFactory;
///
/// struct Quote {
///     bid: f64,
///     ask: f64,
/// }
///
/// struct EmptyQuote;
///
/// impl EventFactory<Quote> for EmptyQuote {
///     fn new_instance(&self) -> Quote {
///         Quote { bid: 0.0, ask: 0.0 }
///     }
/// }
///
/// assert_eq!(EmptyQuote.new_instance().ask, 0.0);
/// ```
pub trait EventFactory<T>: Send + Sync {
    fn new_instance(&self) -> T;
}

/// Fills slots with `T::default()`
pub struct DefaultEventFactory<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T: Default> DefaultEventFactory<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T: Default> Default for DefaultEventFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> EventFactory<T> for DefaultEventFactory<T> {
    fn new_instance(&self) -> T {
        T::default()
    }
}

impl<T> fmt::Debug for DefaultEventFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultEventFactory")
    }
}

/// Fills slots with whatever `make` returns
///
/// Handy when slots need preallocated buffers:
///
/// ```
/// use lapring::disruptor::{ClosureEventFactory, EventFactory};
///
/// let factory = ClosureEventFactory::new(|| Vec::<u8>::with_capacity(512));
/// assert!(factory.new_instance().capacity() >= 512);
/// ```
pub struct ClosureEventFactory<T, F> {
    make: F,
    marker: PhantomData<fn() -> T>,
}

impl<T, F> ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    pub fn new(make: F) -> Self {
        Self {
            make,
            marker: PhantomData,
        }
    }
}

impl<T, F> EventFactory<T> for ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    fn new_instance(&self) -> T {
        (self.make)()
    }
}
