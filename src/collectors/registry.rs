use super::*;

use std::collections::HashMap;
use tracing::{info, warn};

struct Descriptor {
    name: &'static str,
    default_enabled: bool,
    init: CollectorInit,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("collector '{0}' is already registered")]
    Duplicate(&'static str),
    #[error("couldn't create collector '{name}': {source}")]
    Init {
        name: &'static str,
        source: CollectorError,
    },
}

/// The catalog of known collectors. Filled once at startup, then used to
/// build the [`ActiveSet`].
#[derive(Default)]
pub struct Registry {
    descriptors: Vec<Descriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &'static str,
        default_enabled: bool,
        init: CollectorInit,
    ) -> Result<(), RegistryError> {
        if self.descriptors.iter().any(|d| d.name == name) {
            return Err(RegistryError::Duplicate(name));
        }

        self.descriptors.push(Descriptor {
            name,
            default_enabled,
            init,
        });

        Ok(())
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    /// Constructs every enabled collector. The first construction failure
    /// aborts the build.
    pub fn build(
        &self,
        overrides: &HashMap<&str, bool>,
        disable_defaults: bool,
        config: Arc<Config>,
    ) -> Result<ActiveSet, RegistryError> {
        for name in overrides.keys() {
            if !self.descriptors.iter().any(|d| d.name == *name) {
                warn!("ignoring override for unknown collector: {name}");
            }
        }

        let mut collectors = Vec::new();

        for descriptor in &self.descriptors {
            let enabled = is_enabled(
                descriptor.default_enabled,
                overrides.get(descriptor.name).copied(),
                disable_defaults,
            );

            if !enabled {
                continue;
            }

            let collector = (descriptor.init)(config.clone()).map_err(|source| {
                RegistryError::Init {
                    name: descriptor.name,
                    source,
                }
            })?;

            collectors.push(collector);
        }

        let active = ActiveSet { collectors };

        let mut names = active.names();
        names.sort_unstable();
        info!("enabled collectors: {}", names.join(", "));

        Ok(active)
    }
}

fn is_enabled(
    default_enabled: bool,
    enable_override: Option<bool>,
    disable_defaults: bool,
) -> bool {
    enable_override.unwrap_or(!disable_defaults && default_enabled)
}

/// The collectors driven by the agent for the lifetime of the process.
pub struct ActiveSet {
    collectors: Vec<Box<dyn Collector>>,
}

impl ActiveSet {
    pub fn iter(&self) -> impl Iterator<Item = &dyn Collector> {
        self.collectors.iter().map(|c| c.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    #[cfg(test)]
    pub(crate) fn from_collectors(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors }
    }
}
