//! Readers for per-CPU topology and thermal throttle counters in sysfs. See:
//! * https://www.kernel.org/doc/Documentation/x86/topology.txt
//! * https://www.kernel.org/doc/Documentation/ABI/testing/sysfs-devices-system-cpu

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::util::read_u64;
use crate::{Error, Result};

/// A sysfs mount.
#[derive(Clone, Debug)]
pub struct SysFs {
    root: PathBuf,
}

impl SysFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join(name)
    }

    /// Returns the `devices/system/cpu/cpuN` directories ordered by CPU
    /// number. Entries such as `cpufreq` or `cpuidle` are ignored.
    pub fn cpus(&self) -> Result<Vec<CpuDir>> {
        let base = self.path("devices/system/cpu");

        let mut cpus = Vec::new();

        for entry in WalkDir::new(&base).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| Error::unreadable(e.into(), &base))?;

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };

            let id = match name.strip_prefix("cpu").map(str::parse::<usize>) {
                Some(Ok(id)) => id,
                _ => {
                    log::trace!("skipping non-cpu entry: {name}");
                    continue;
                }
            };

            cpus.push(CpuDir {
                id,
                path: entry.into_path(),
            });
        }

        cpus.sort_by_key(|cpu| cpu.id);

        Ok(cpus)
    }
}

/// A single `cpuN` directory.
#[derive(Clone, Debug)]
pub struct CpuDir {
    id: usize,
    path: PathBuf,
}

impl CpuDir {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn package_id(&self) -> Result<u64> {
        read_u64(self.path.join("topology/physical_package_id"))
    }

    pub fn core_id(&self) -> Result<u64> {
        read_u64(self.path.join("topology/core_id"))
    }

    pub fn core_throttle_count(&self) -> Result<u64> {
        read_u64(self.path.join("thermal_throttle/core_throttle_count"))
    }

    pub fn package_throttle_count(&self) -> Result<u64> {
        read_u64(self.path.join("thermal_throttle/package_throttle_count"))
    }
}
