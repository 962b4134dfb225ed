use crate::config::Config;
use crate::metrics::Sample;

use async_trait::async_trait;

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

mod cpu;
mod gpu;
mod registry;

pub use registry::{ActiveSet, Registry, RegistryError};

pub const DEFAULT_ENABLED: bool = true;

/// Registers every collector this agent ships with.
pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(cpu::NAME, DEFAULT_ENABLED, cpu::init)?;
    registry.register(gpu::NAME, DEFAULT_ENABLED, gpu::init)?;

    Ok(())
}

/// How a successful update went.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Samples were appended to the batch.
    Collected,
    /// There was legitimately nothing to report this cycle.
    NoData,
}

/// A producer of samples for a single data source.
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Appends this cycle's samples to `samples`.
    async fn update(&self, samples: &mut Vec<Sample>) -> Result<Outcome, CollectorError>;
}

/// Builds a collector from the agent configuration.
pub type CollectorInit = fn(Arc<Config>) -> Result<Box<dyn Collector>, CollectorError>;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("failed to open {what}: {source}")]
    Open {
        what: &'static str,
        source: systeminfo::Error,
    },
    #[error("couldn't read {what}: {source}")]
    Read {
        what: &'static str,
        source: systeminfo::Error,
    },
    #[error("couldn't get gpu info: failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("couldn't get gpu info: {command} exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("couldn't get gpu info: {command} did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("couldn't parse gpu info: {0}")]
    Parse(#[from] gpu::TableError),
}
