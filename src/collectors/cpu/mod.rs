//! Per-CPU time accounting, cpu identification and thermal throttle counts.

pub const NAME: &str = "cpu";

mod state;
mod stats;
mod throttle;

use self::state::CpuStatsCache;
use self::stats::*;
use self::throttle::Throttles;
use super::*;

use systeminfo::procfs::USER_HZ;
use systeminfo::{ProcFs, SysFs};
use tracing::debug;

pub fn init(config: Arc<Config>) -> Result<Box<dyn Collector>, CollectorError> {
    Ok(Box::new(Cpu::new(&config)?))
}

pub struct Cpu {
    procfs: ProcFs,
    sysfs: SysFs,
    info: bool,
    stats: CpuStatsCache,
}

impl Cpu {
    fn new(config: &Config) -> Result<Self, CollectorError> {
        let procfs = ProcFs::new(config.paths().procfs())
            .map_err(|source| CollectorError::Open {
                what: "procfs",
                source,
            })?
            .with_ticks_per_second(clock_ticks());

        Ok(Self {
            procfs,
            sysfs: SysFs::new(config.paths().sysfs()),
            info: config.collector(NAME).info().unwrap_or(false),
            stats: CpuStatsCache::new(),
        })
    }

    fn update_info(&self, samples: &mut Vec<Sample>) -> Result<(), CollectorError> {
        let cpus = self.procfs.cpuinfo().map_err(|source| CollectorError::Read {
            what: "cpuinfo",
            source,
        })?;

        for cpu in cpus {
            samples.push(
                Sample::new(&CPU_INFO, 1.0)
                    .label("package", &cpu.physical_id)
                    .label("core", &cpu.core_id)
                    .label("cpu", cpu.processor)
                    .label("vendor", &cpu.vendor_id)
                    .label("family", &cpu.cpu_family)
                    .label("model", &cpu.model)
                    .label("model_name", &cpu.model_name)
                    .label("microcode", &cpu.microcode)
                    .label("stepping", &cpu.stepping)
                    .label("cachesize", &cpu.cache_size),
            );
        }

        Ok(())
    }

    fn update_stat(&self, samples: &mut Vec<Sample>) -> Result<(), CollectorError> {
        let stat = self.procfs.stat().map_err(|source| CollectorError::Read {
            what: "stat",
            source,
        })?;

        for (cpu, s) in self.stats.update(&stat.cpus).iter().enumerate() {
            let modes = [
                ("user", s.user),
                ("nice", s.nice),
                ("system", s.system),
                ("idle", s.idle),
                ("iowait", s.iowait),
                ("irq", s.irq),
                ("softirq", s.softirq),
                ("steal", s.steal),
            ];

            for (mode, value) in modes {
                samples.push(
                    Sample::new(&CPU_SECONDS, value)
                        .label("cpu", cpu)
                        .label("mode", mode),
                );
            }

            // guest time is already included in user and nice
            for (mode, value) in [("user", s.guest), ("nice", s.guest_nice)] {
                samples.push(
                    Sample::new(&CPU_GUEST_SECONDS, value)
                        .label("cpu", cpu)
                        .label("mode", mode),
                );
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Collector for Cpu {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn update(&self, samples: &mut Vec<Sample>) -> Result<Outcome, CollectorError> {
        if self.info {
            self.update_info(samples)?;
        }

        self.update_stat(samples)?;

        Throttles::read(&self.sysfs).samples(samples);

        Ok(Outcome::Collected)
    }
}

fn clock_ticks() -> f64 {
    match sysconf::raw::sysconf(sysconf::raw::SysconfVariable::ScClkTck) {
        Ok(ticks) if ticks > 0 => ticks as f64,
        _ => {
            debug!("failed to get clock tick rate, assuming {USER_HZ}");
            USER_HZ
        }
    }
}
