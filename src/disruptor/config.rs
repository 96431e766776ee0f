//! Configuration
//!
//! Serializable settings for building a ring buffer: its size, producer type
//! and wait strategy.

use crate::disruptor::{
    is_power_of_two, BlockingWaitStrategy, BusySpinWaitStrategy, DisruptorError, EventFactory,
    LiteBlockingWaitStrategy, ProducerType, Result, RingBuffer, SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Wait strategy selection
///
/// Serialized with a `type` tag, e.g. `{"type": "sleeping", "retries": 200, "sleep_nanos": 100}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitStrategyConfig {
    #[default]
    Blocking,
    /// Skips the wake-up when no consumer is parked
    LiteBlocking,
    TimeoutBlocking {
        timeout_millis: u64,
    },
    BusySpin,
    Yielding {
        #[serde(default = "default_spin_tries")]
        spin_tries: u32,
    },
    Sleeping {
        #[serde(default = "default_retries")]
        retries: u32,
        #[serde(default = "default_sleep_nanos")]
        sleep_nanos: u64,
    },
}

fn default_spin_tries() -> u32 {
    100
}

fn default_retries() -> u32 {
    200
}

fn default_sleep_nanos() -> u64 {
    100
}

impl WaitStrategyConfig {
    /// Instantiate the configured strategy
    pub fn build(&self) -> Arc<dyn WaitStrategy> {
        match *self {
            WaitStrategyConfig::Blocking => Arc::new(BlockingWaitStrategy::new()),
            WaitStrategyConfig::LiteBlocking => Arc::new(LiteBlockingWaitStrategy::new()),
            WaitStrategyConfig::TimeoutBlocking { timeout_millis } => Arc::new(
                TimeoutBlockingWaitStrategy::new(Duration::from_millis(timeout_millis)),
            ),
            WaitStrategyConfig::BusySpin => Arc::new(BusySpinWaitStrategy::new()),
            WaitStrategyConfig::Yielding { spin_tries } => {
                Arc::new(YieldingWaitStrategy::with_spin_tries(spin_tries))
            }
            WaitStrategyConfig::Sleeping {
                retries,
                sleep_nanos,
            } => Arc::new(SleepingWaitStrategy::with_settings(
                retries,
                Duration::from_nanos(sleep_nanos),
            )),
        }
    }
}

/// Ring buffer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisruptorConfig {
    /// Number of slots, a power of two
    pub buffer_size: usize,
    pub producer_type: ProducerType,
    pub wait_strategy: WaitStrategyConfig,
}

impl Default for DisruptorConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            producer_type: ProducerType::Multi,
            wait_strategy: WaitStrategyConfig::Blocking,
        }
    }
}

impl DisruptorConfig {
    /// Check the configuration for values the core would reject
    ///
    /// # Errors
    /// `InvalidBufferSize` for a size that is not a power of two;
    /// `InvalidConfig` for a zero timeout or sleep duration
    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(self.buffer_size));
        }

        match self.wait_strategy {
            WaitStrategyConfig::TimeoutBlocking { timeout_millis: 0 } => Err(
                DisruptorError::InvalidConfig("timeout_millis must be greater than zero".into()),
            ),
            WaitStrategyConfig::Sleeping { sleep_nanos: 0, .. } => Err(
                DisruptorError::InvalidConfig("sleep_nanos must be greater than zero".into()),
            ),
            _ => Ok(()),
        }
    }

    pub fn build_wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        self.wait_strategy.build()
    }

    /// Validate the configuration and build the ring buffer it describes
    ///
    /// # Errors
    /// Any error from [`validate`](Self::validate)
    pub fn build_ring_buffer<T, F>(&self, event_factory: F) -> Result<RingBuffer<T>>
    where
        T: Send + Sync,
        F: EventFactory<T>,
    {
        self.validate()?;
        RingBuffer::create(
            self.producer_type,
            event_factory,
            self.buffer_size,
            self.build_wait_strategy(),
        )
    }
}
