//! Work Processor Implementation
//!
//! A work processor is one member of a competing-consumer pool. All members
//! share a single work sequence; each claims the next sequence with a CAS on
//! it, so every published event is handled by exactly one member.

use crate::disruptor::event_processor::{guard_handler, HALTED, IDLE, RUNNING};
use crate::disruptor::{
    DataProvider, DisruptorError, EventProcessor, EventReleaser, ExceptionHandler,
    LoggingExceptionHandler, Result, Sequence, SequenceBarrier, WorkHandler,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Competing consumer driving one [`WorkHandler`]
///
/// The processor's own sequence trails its claims: while it works on
/// sequence `s` its sequence reads `s - 1`, so producers never overwrite an
/// event that is still being handled.
pub struct WorkProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T>,
{
    sequence: Arc<Sequence>,
    work_sequence: Arc<Sequence>,
    barrier: Arc<dyn SequenceBarrier>,
    data_provider: Arc<dyn DataProvider<T> + Send + Sync>,
    handler: Mutex<H>,
    exception_handler: Arc<dyn ExceptionHandler<T>>,
    state: AtomicU8,
}

impl<T, H> WorkProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T>,
{
    /// Create a work processor claiming from `work_sequence`
    ///
    /// The handler receives its [`EventReleaser`] here, before any event.
    pub fn new(
        data_provider: Arc<dyn DataProvider<T> + Send + Sync>,
        barrier: Arc<dyn SequenceBarrier>,
        mut handler: H,
        work_sequence: Arc<Sequence>,
    ) -> Self {
        let sequence = Arc::new(Sequence::new_with_initial_value());
        handler.set_event_releaser(EventReleaser::new(Arc::clone(&sequence)));

        Self {
            sequence,
            work_sequence,
            barrier,
            data_provider,
            handler: Mutex::new(handler),
            exception_handler: Arc::new(LoggingExceptionHandler::new()),
            state: AtomicU8::new(IDLE),
        }
    }

    /// Replace the default logging exception handler
    ///
    /// Shared so that every worker of a pool can report to the same handler.
    pub fn with_exception_handler(
        mut self,
        exception_handler: Arc<dyn ExceptionHandler<T>>,
    ) -> Self {
        self.exception_handler = exception_handler;
        self
    }

    fn process_events(&self, handler: &mut H) {
        let mut processed_sequence = true;
        let mut cached_available_sequence = i64::MIN;
        let mut next_sequence = self.sequence.get();

        loop {
            if processed_sequence {
                // The shared barrier's alert can be cleared by a sibling
                // starting up, so a halt must not rely on it alone.
                if self.state.load(Ordering::Acquire) != RUNNING {
                    break;
                }
                processed_sequence = false;
                loop {
                    next_sequence = self.work_sequence.get() + 1;
                    self.sequence.set(next_sequence - 1);
                    if self
                        .work_sequence
                        .compare_and_set(next_sequence - 1, next_sequence)
                    {
                        break;
                    }
                }
            }

            if cached_available_sequence >= next_sequence {
                let event = self.data_provider.get(next_sequence);
                if let Err(error) = guard_handler(|| handler.on_event(event)) {
                    self.exception_handler
                        .handle_event_exception(error, next_sequence, Some(event));
                }
                // A released sequence stays released until the next claim.
                self.sequence.compare_and_set(next_sequence - 1, next_sequence);
                processed_sequence = true;
                continue;
            }

            match self.barrier.wait_for(next_sequence) {
                Ok(available_sequence) => cached_available_sequence = available_sequence,
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
                    processed_sequence = true;
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

impl<T, H> EventProcessor for WorkProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T>,
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

            let mut handler = self.handler.lock();
            self.notify_start(&mut handler);
            self.notify_shutdown(&mut handler);
            self.state.store(IDLE, Ordering::Release);
            return Ok(());
        }

        self.barrier.clear_alert();
        if self.state.load(Ordering::Acquire) != RUNNING {
            self.barrier.alert();
        }

        let mut handler = self.handler.lock();
        debug!(sequence = self.sequence.get(), "work processor started");

        self.notify_start(&mut handler);
        self.process_events(&mut handler);
        self.notify_shutdown(&mut handler);

        debug!(sequence = self.sequence.get(), "work processor stopped");
        self.state.store(IDLE, Ordering::Release);
        Ok(())
    }
}

impl<T, H> std::fmt::Debug for WorkProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: WorkHandler<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkProcessor")
            .field("sequence", &self.sequence)
            .field("work_sequence", &self.work_sequence)
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{
        BlockingWaitStrategy, ClosureExceptionHandler, ClosureWorkHandler, DefaultEventFactory,
        RingBuffer, TimeoutBlockingWaitStrategy, WaitStrategy,
    };
    use std::sync::atomic::AtomicI64;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn ring(size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Arc<RingBuffer<i64>> {
        Arc::new(
            RingBuffer::create_multi_producer(DefaultEventFactory::new(), size, wait_strategy)
                .unwrap(),
        )
    }

    fn wait_until(sequence: &Sequence, target: i64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sequence.get() < target {
            assert!(Instant::now() < deadline, "sequence stuck at {}", sequence.get());
            thread::yield_now();
        }
    }

    #[test]
    fn test_single_worker_handles_every_event() {
        let ring_buffer = ring(8, Arc::new(BlockingWaitStrategy::new()));
        let barrier = ring_buffer.new_barrier(&[]);
        let work_sequence = Arc::new(Sequence::new_with_initial_value());
        let (tx, rx) = mpsc::channel();

        let processor = Arc::new(WorkProcessor::new(
            ring_buffer.clone(),
            barrier,
            ClosureWorkHandler::new(move |event: &i64| {
                tx.send(*event).unwrap();
                Ok(())
            }),
            Arc::clone(&work_sequence),
        ));
        ring_buffer.add_gating_sequences(&[processor.get_sequence(), Arc::clone(&work_sequence)]);

        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };

        for i in 0..30 {
            ring_buffer.publish_event(|event, _| *event = i).unwrap();
        }

        let received: Vec<i64> = (0..30)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(received, (0..30).collect::<Vec<_>>());

        wait_until(&processor.get_sequence(), 29);
        processor.halt();
        worker.join().unwrap().unwrap();
    }

    #[test]
    fn test_parked_worker_unparks_on_halt() {
        let ring_buffer = ring(8, Arc::new(BlockingWaitStrategy::new()));
        let barrier = ring_buffer.new_barrier(&[]);
        let processor = Arc::new(WorkProcessor::new(
            ring_buffer.clone(),
            barrier,
            ClosureWorkHandler::new(|_: &i64| Ok(())),
            Arc::new(Sequence::new_with_initial_value()),
        ));

        let (tx, rx) = mpsc::channel();
        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || tx.send(processor.run()).unwrap())
        };

        thread::sleep(Duration::from_millis(20));
        assert!(processor.is_running());
        assert!(matches!(processor.run(), Err(DisruptorError::AlreadyRunning)));

        processor.halt();
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(result.is_ok());
        worker.join().unwrap();
        assert!(!processor.is_running());
    }

    #[test]
    fn test_failures_are_routed_and_event_counts_as_processed() {
        let ring_buffer = ring(8, Arc::new(BlockingWaitStrategy::new()));
        let barrier = ring_buffer.new_barrier(&[]);
        let work_sequence = Arc::new(Sequence::new_with_initial_value());
        let failed = Arc::new(Mutex::new(Vec::new()));

        let exception_handler: Arc<dyn ExceptionHandler<i64>> = {
            let failed = Arc::clone(&failed);
            Arc::new(ClosureExceptionHandler::new(
                move |_error, sequence, _event: Option<&i64>| failed.lock().push(sequence),
                |_| {},
                |_| {},
            ))
        };

        let processor = Arc::new(
            WorkProcessor::new(
                ring_buffer.clone(),
                barrier,
                ClosureWorkHandler::new(|event: &i64| {
                    if *event % 2 == 1 {
                        panic!("odd event {event}");
                    }
                    Ok(())
                }),
                Arc::clone(&work_sequence),
            )
            .with_exception_handler(exception_handler),
        );
        ring_buffer.add_gating_sequences(&[processor.get_sequence()]);

        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };
        for i in 0..4 {
            ring_buffer.publish_event(|event, _| *event = i).unwrap();
        }
        wait_until(&processor.get_sequence(), 3);
        processor.halt();
        worker.join().unwrap().unwrap();

        assert_eq!(*failed.lock(), vec![1, 3]);
    }

    struct ReleasingHandler {
        releaser: Option<EventReleaser>,
        proceed: mpsc::Receiver<()>,
    }

    impl WorkHandler<i64> for ReleasingHandler {
        fn on_event(&mut self, _event: &i64) -> Result<()> {
            if let Some(releaser) = &self.releaser {
                releaser.release();
            }
            self.proceed
                .recv_timeout(Duration::from_secs(5))
                .map_err(DisruptorError::handler)
        }

        fn set_event_releaser(&mut self, releaser: EventReleaser) {
            self.releaser = Some(releaser);
        }
    }

    #[test]
    fn test_event_releaser_holds_until_next_claim() {
        let ring_buffer = ring(8, Arc::new(BlockingWaitStrategy::new()));
        let barrier = ring_buffer.new_barrier(&[]);
        let (proceed_tx, proceed_rx) = mpsc::channel();

        let processor = Arc::new(WorkProcessor::new(
            ring_buffer.clone(),
            barrier,
            ReleasingHandler {
                releaser: None,
                proceed: proceed_rx,
            },
            Arc::new(Sequence::new_with_initial_value()),
        ));

        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };
        ring_buffer.publish_event(|event, _| *event = 1).unwrap();

        // Released from inside on_event while the handler is still busy.
        wait_until(&processor.get_sequence(), i64::MAX);

        proceed_tx.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while processor.get_sequence().get() != 0 {
            assert!(Instant::now() < deadline, "worker never claimed again");
            thread::yield_now();
        }

        processor.halt();
        worker.join().unwrap().unwrap();
    }

    struct TimeoutHandler {
        timeouts: Arc<AtomicI64>,
    }

    impl WorkHandler<i64> for TimeoutHandler {
        fn on_event(&mut self, _event: &i64) -> Result<()> {
            Ok(())
        }

        fn on_timeout(&mut self, sequence: i64) -> Result<()> {
            self.timeouts.store(sequence, Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn test_timeout_invokes_callback_and_keeps_running() {
        let ring_buffer = ring(
            8,
            Arc::new(TimeoutBlockingWaitStrategy::new(Duration::from_millis(1))),
        );
        let barrier = ring_buffer.new_barrier(&[]);
        let timeouts = Arc::new(AtomicI64::new(i64::MIN));

        let processor = Arc::new(WorkProcessor::new(
            ring_buffer.clone(),
            barrier,
            TimeoutHandler {
                timeouts: Arc::clone(&timeouts),
            },
            Arc::new(Sequence::new_with_initial_value()),
        ));
        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while timeouts.load(Ordering::Relaxed) == i64::MIN {
            assert!(Instant::now() < deadline, "timeout callback never fired");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(processor.is_running());

        processor.halt();
        worker.join().unwrap().unwrap();
        assert_eq!(timeouts.load(Ordering::Relaxed), -1);
    }

    #[test]
    fn test_halted_worker_stops_after_sibling_clears_alert() {
        let ring_buffer = ring(8, Arc::new(BlockingWaitStrategy::new()));
        let barrier = ring_buffer.new_barrier(&[]);
        let work_sequence = Arc::new(Sequence::new_with_initial_value());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (proceed_tx, proceed_rx) = mpsc::channel::<()>();
        let first_handled = Arc::new(Mutex::new(Vec::new()));
        let (second_tx, second_rx) = mpsc::channel();

        let first = Arc::new(WorkProcessor::new(
            ring_buffer.clone(),
            Arc::clone(&barrier),
            {
                let first_handled = Arc::clone(&first_handled);
                ClosureWorkHandler::new(move |event: &i64| {
                    first_handled.lock().push(*event);
                    entered_tx.send(()).unwrap();
                    proceed_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                    Ok(())
                })
            },
            Arc::clone(&work_sequence),
        ));
        let second = Arc::new(WorkProcessor::new(
            ring_buffer.clone(),
            Arc::clone(&barrier),
            ClosureWorkHandler::new(move |event: &i64| {
                second_tx.send(*event).unwrap();
                Ok(())
            }),
            Arc::clone(&work_sequence),
        ));
        ring_buffer.add_gating_sequences(&[
            first.get_sequence(),
            second.get_sequence(),
            Arc::clone(&work_sequence),
        ]);

        let first_thread = {
            let first = Arc::clone(&first);
            thread::spawn(move || first.run())
        };
        ring_buffer.publish_event(|event, _| *event = 10).unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        first.halt();

        // Starting the sibling clears the shared alert.
        let second_thread = {
            let second = Arc::clone(&second);
            thread::spawn(move || second.run())
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while work_sequence.get() < 1 {
            assert!(Instant::now() < deadline, "sibling never claimed");
            thread::yield_now();
        }

        ring_buffer.publish_event(|event, _| *event = 11).unwrap();
        proceed_tx.send(()).unwrap();

        first_thread.join().unwrap().unwrap();
        assert!(!first.is_running());
        assert_eq!(*first_handled.lock(), vec![10]);
        assert_eq!(second_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 11);

        second.halt();
        second_thread.join().unwrap().unwrap();
    }
}
