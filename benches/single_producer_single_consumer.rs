//! Single Producer Single Consumer (SPSC) Benchmarks
//!
//! One publisher thread feeding one `BatchEventProcessor`, measured per wait
//! strategy and burst size.

use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lapring::disruptor::{
    BatchEventProcessor, BlockingWaitStrategy, BusySpinWaitStrategy, DefaultEventFactory,
    EventHandler, EventProcessor, LiteBlockingWaitStrategy, Result as DisruptorResult, RingBuffer,
    WaitStrategy, YieldingWaitStrategy,
};

const BUFFER_SIZE: usize = 1024;
const BURST_SIZES: [u64; 3] = [1, 100, 1000];

#[derive(Debug, Default, Clone, Copy)]
struct BenchmarkEvent {
    value: i64,
}

/// Event handler that counts processed events
struct CountingSink {
    counter: Arc<AtomicI64>,
}

impl EventHandler<BenchmarkEvent> for CountingSink {
    fn on_event(
        &mut self,
        event: &BenchmarkEvent,
        _sequence: i64,
        _end_of_batch: bool,
    ) -> DisruptorResult<()> {
        black_box(event.value);
        self.counter.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

type Processor = BatchEventProcessor<BenchmarkEvent, CountingSink>;

struct Pipeline {
    ring_buffer: Arc<RingBuffer<BenchmarkEvent>>,
    processor: Arc<Processor>,
    counter: Arc<AtomicI64>,
    consumer: Option<JoinHandle<DisruptorResult<()>>>,
}

impl Pipeline {
    fn start(wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        let ring_buffer = Arc::new(
            RingBuffer::<BenchmarkEvent>::create_single_producer(
                DefaultEventFactory::new(),
                BUFFER_SIZE,
                wait_strategy,
            )
            .unwrap(),
        );
        let counter = Arc::new(AtomicI64::new(0));
        let processor = Arc::new(BatchEventProcessor::new(
            ring_buffer.clone(),
            ring_buffer.new_barrier(&[]),
            CountingSink {
                counter: Arc::clone(&counter),
            },
        ));
        ring_buffer.add_gating_sequences(&[processor.get_sequence()]);

        let consumer = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };

        Self {
            ring_buffer,
            processor,
            counter,
            consumer: Some(consumer),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.processor.halt();
        if let Some(consumer) = self.consumer.take() {
            consumer.join().unwrap().unwrap();
        }
    }
}

/// Baseline measurement to determine overhead
fn baseline_measurement(group: &mut BenchmarkGroup<WallTime>, burst_size: u64) {
    let sink = Arc::new(AtomicI64::new(0));
    let benchmark_id = BenchmarkId::new("baseline", burst_size);

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(benchmark_id, |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                for i in 1..=burst_size {
                    sink.store(black_box(i as i64), Ordering::Release);
                }
                while sink.load(Ordering::Acquire) != burst_size as i64 {}
            }
            start.elapsed()
        })
    });
}

fn benchmark_strategy(
    group: &mut BenchmarkGroup<WallTime>,
    name: &str,
    wait_strategy: Arc<dyn WaitStrategy>,
    burst_size: u64,
) {
    let pipeline = Pipeline::start(wait_strategy);
    let benchmark_id = BenchmarkId::new(name, burst_size);

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(benchmark_id, |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let target = pipeline.counter.load(Ordering::Acquire) + burst_size as i64;
                for i in 1..=burst_size {
                    pipeline
                        .ring_buffer
                        .publish_event(|event, _| event.value = black_box(i as i64))
                        .unwrap();
                }
                while pipeline.counter.load(Ordering::Acquire) < target {
                    std::hint::spin_loop();
                }
            }
            start.elapsed()
        })
    });
}

fn benchmark_batch_publish(group: &mut BenchmarkGroup<WallTime>, burst_size: u64) {
    let pipeline = Pipeline::start(Arc::new(BusySpinWaitStrategy::new()));
    let benchmark_id = BenchmarkId::new("BusySpin-batch", burst_size);

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(benchmark_id, |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let target = pipeline.counter.load(Ordering::Acquire) + burst_size as i64;
                pipeline
                    .ring_buffer
                    .publish_events(burst_size as i64, |event, sequence| {
                        event.value = black_box(sequence)
                    })
                    .unwrap();
                while pipeline.counter.load(Ordering::Acquire) < target {
                    std::hint::spin_loop();
                }
            }
            start.elapsed()
        })
    });
}

/// Main SPSC benchmark function
pub fn spsc_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("SPSC");
    group.measurement_time(Duration::from_secs(10));
    group.warm_up_time(Duration::from_secs(3));

    for &burst_size in BURST_SIZES.iter() {
        baseline_measurement(&mut group, burst_size);

        benchmark_strategy(
            &mut group,
            "BusySpin",
            Arc::new(BusySpinWaitStrategy::new()),
            burst_size,
        );
        benchmark_strategy(
            &mut group,
            "Yielding",
            Arc::new(YieldingWaitStrategy::new()),
            burst_size,
        );
        benchmark_strategy(
            &mut group,
            "Blocking",
            Arc::new(BlockingWaitStrategy::new()),
            burst_size,
        );
        benchmark_strategy(
            &mut group,
            "LiteBlocking",
            Arc::new(LiteBlockingWaitStrategy::new()),
            burst_size,
        );
        benchmark_batch_publish(&mut group, burst_size);
    }

    group.finish();
}

criterion_group!(spsc, spsc_benchmark);
criterion_main!(spsc);
