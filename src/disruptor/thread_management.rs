//! Thread management and CPU affinity for processor threads
//!
//! Processors run on caller-supplied threads. This module gives those threads
//! a name and, optionally, a dedicated CPU core.

use crate::disruptor::{DisruptorError, Result};
use core_affinity::CoreId;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Handle to a spawned processor thread
///
/// Dropping the handle joins the thread.
#[derive(Debug)]
pub struct ManagedThread {
    join_handle: Option<JoinHandle<()>>,
    thread_name: String,
}

impl ManagedThread {
    fn new(join_handle: JoinHandle<()>, thread_name: String) -> Self {
        Self {
            join_handle: Some(join_handle),
            thread_name,
        }
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Wait for the thread to finish
    ///
    /// # Errors
    /// `HandlerPanic` if the thread body panicked
    pub fn join(mut self) -> Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                DisruptorError::HandlerPanic(format!("thread '{}' panicked", self.thread_name))
            }),
            None => Ok(()),
        }
    }

    /// Whether the thread body is still executing
    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                warn!(thread = %self.thread_name, "processor thread panicked");
            }
        }
    }
}

/// Builder for named, optionally pinned, processor threads
///
/// # Examples
/// ```
/// use lapring::disruptor::ThreadBuilder;
///
/// let thread = ThreadBuilder::new()
///     .thread_name("consumer-0")
///     .spawn(|| {})
///     .unwrap();
/// assert_eq!(thread.thread_name(), "consumer-0");
/// thread.join().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ThreadBuilder {
    affinity: Option<CoreId>,
    name: Option<String>,
}

impl ThreadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the thread to a CPU core
    ///
    /// # Errors
    /// `InvalidConfig` if the core is not available on this machine
    pub fn pin_at_core(mut self, core_id: usize) -> Result<Self> {
        let available = available_cores();
        if !available.contains(&core_id) {
            return Err(DisruptorError::InvalidConfig(format!(
                "CPU core {core_id} is not available, available cores: {available:?}"
            )));
        }
        self.affinity = Some(CoreId { id: core_id });
        Ok(self)
    }

    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Spawn `f` on a new thread with the configured name and affinity
    ///
    /// # Errors
    /// `ThreadSpawn` if the OS refuses to create the thread
    pub fn spawn<F>(self, f: F) -> Result<ManagedThread>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread_name = self.name.unwrap_or_else(|| "lapring-processor".to_string());
        let affinity = self.affinity;

        let name = thread_name.clone();
        let join_handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                set_affinity_if_defined(affinity, &name);
                f();
            })?;

        Ok(ManagedThread::new(join_handle, thread_name))
    }
}

fn set_affinity_if_defined(affinity: Option<CoreId>, thread_name: &str) {
    if let Some(core_id) = affinity {
        if core_affinity::set_for_current(core_id) {
            debug!(thread = thread_name, core = core_id.id, "pinned thread to core");
        } else {
            warn!(thread = thread_name, core = core_id.id, "could not pin thread to core");
        }
    }
}

/// CPU core ids available for pinning
pub fn available_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .iter()
        .map(|core| core.id)
        .collect()
}
