use super::stats::*;

use crate::metrics::Sample;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use systeminfo::SysFs;
use tracing::debug;

/// Thermal throttle counts keyed by physical package and core. Hyperthread
/// siblings share their core's counter, so each (package, core) pair and
/// each package is read once.
#[derive(Debug, Default, PartialEq)]
pub(super) struct Throttles {
    packages: BTreeMap<u64, u64>,
    cores: BTreeMap<u64, BTreeMap<u64, u64>>,
}

impl Throttles {
    pub fn read(sysfs: &SysFs) -> Self {
        let mut throttles = Self::default();

        let cpus = match sysfs.cpus() {
            Ok(cpus) => cpus,
            Err(e) => {
                debug!("no thermal throttle info: {e}");
                return throttles;
            }
        };

        for cpu in cpus {
            let package = match cpu.package_id() {
                Ok(id) => id,
                Err(e) => {
                    debug!(cpu = cpu.id(), "CPU is missing physical_package_id: {e}");
                    continue;
                }
            };

            let core = match cpu.core_id() {
                Ok(id) => id,
                Err(e) => {
                    debug!(cpu = cpu.id(), "CPU is missing core_id: {e}");
                    continue;
                }
            };

            // cores first so a package whose counter is unreadable still
            // reports its cores
            if let Entry::Vacant(entry) = throttles.cores.entry(package).or_default().entry(core) {
                match cpu.core_throttle_count() {
                    Ok(count) => {
                        entry.insert(count);
                    }
                    Err(e) => debug!(cpu = cpu.id(), "CPU is missing core_throttle_count: {e}"),
                }
            }

            if let Entry::Vacant(entry) = throttles.packages.entry(package) {
                match cpu.package_throttle_count() {
                    Ok(count) => {
                        entry.insert(count);
                    }
                    Err(e) => debug!(cpu = cpu.id(), "CPU is missing package_throttle_count: {e}"),
                }
            }
        }

        throttles
    }

    pub fn samples(&self, samples: &mut Vec<Sample>) {
        for (package, count) in &self.packages {
            samples.push(
                Sample::new(&CPU_PACKAGE_THROTTLES, *count as f64).label("package", package),
            );
        }

        for (package, cores) in &self.cores {
            for (core, count) in cores {
                samples.push(
                    Sample::new(&CPU_CORE_THROTTLES, *count as f64)
                        .label("package", package)
                        .label("core", core),
                );
            }
        }
    }
}
