//! # Runtime
//!
//! Tokio runtime profiles for the SiteHub host process.
//!
//! The security boundary is an event-driven component: renderer requests, lifecycle
//! acknowledgements and audit writes are all ordered against one scheduler. The
//! [`RuntimeConfig::event_loop`] profile reflects that and is what the shell binary
//! runs on. [`RuntimeConfig::multi_thread`] exists for tooling and stress tests that
//! want to exercise the boundary from several threads.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[shub_runtime::main(event_loop)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use shub_derive::main;

use anyhow::Context;
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const DEFAULT_WORKER_THREADS: usize = 4;
const MAX_WORKER_THREADS: usize = 256;
/// 2 `MiB`.
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
/// 1 `MiB`.
const MIN_STACK_SIZE: usize = 1024 * 1024;
/// 16 `MiB`.
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(30);
const DEFAULT_THREAD_NAME: &str = "shub-worker";

static WORKER_THREADS: OnceLock<usize> = OnceLock::new();

/// `TOKIO_WORKER_THREADS` if set and sane, otherwise the available parallelism.
fn detected_worker_threads() -> usize {
    *WORKER_THREADS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| (1..=MAX_WORKER_THREADS).contains(&n))
            .unwrap_or_else(|| {
                available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

/// Scheduler flavour of a runtime profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// One thread drives every task; the boundary's ordering guarantees rely on it.
    EventLoop,
    /// Work-stealing pool.
    MultiThread,
}

/// Configuration for the Tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub flavor: Flavor,
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::event_loop()
    }
}

impl RuntimeConfig {
    /// Single-threaded scheduler used by the shell.
    #[must_use]
    pub fn event_loop() -> Self {
        Self {
            flavor: Flavor::EventLoop,
            worker_threads: 1,
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "shub-event-loop".to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }

    /// Work-stealing scheduler sized to the machine.
    #[must_use]
    pub fn multi_thread() -> Self {
        Self {
            flavor: Flavor::MultiThread,
            worker_threads: detected_worker_threads(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }

    /// Ignored by the event-loop flavour.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, MAX_WORKER_THREADS);
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.thread_name = if name.trim().is_empty() { DEFAULT_THREAD_NAME.to_owned() } else { name };
        self
    }

    #[must_use]
    pub const fn with_thread_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.thread_keep_alive = keep_alive;
        self
    }

    fn normalized(&self) -> Self {
        Self::clone(self)
            .with_worker_threads(self.worker_threads)
            .with_stack_size(self.stack_size)
            .with_thread_name(self.thread_name.clone())
    }
}

/// Builds a runtime from `config` with I/O and timers enabled.
///
/// # Errors
///
/// Fails when the OS refuses to create the runtime threads or the I/O driver.
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(config = ?config, "Building tokio runtime");

    let mut builder = match config.flavor {
        Flavor::EventLoop => Builder::new_current_thread(),
        Flavor::MultiThread => {
            let mut builder = Builder::new_multi_thread();
            builder.worker_threads(config.worker_threads);
            builder
        }
    };
    builder
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all();

    builder.build().context("Failed to initialize tokio runtime")
}

/// Shorthand for [`build_runtime_with_config`] on the event-loop profile.
pub fn build_event_loop() -> Result<Runtime> {
    build_runtime_with_config(&RuntimeConfig::event_loop())
}
