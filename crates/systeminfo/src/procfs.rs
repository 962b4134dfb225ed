//! Readers for the subset of procfs used by the cpu collector:
//! * `/proc/stat`
//! * `/proc/cpuinfo`

use std::path::{Path, PathBuf};

use crate::util::read_string;
use crate::{Error, Result};

/// Clock ticks per second assumed when the caller does not provide one.
pub const USER_HZ: f64 = 100.0;

/// Time a single CPU spent in each accounting mode, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CpuStat {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub guest: f64,
    pub guest_nice: f64,
}

/// The cpu section of `/proc/stat`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stat {
    /// The aggregate `cpu` line.
    pub total: CpuStat,
    /// Per-CPU lines, indexed by CPU number. CPUs without a line (offline)
    /// are left zeroed.
    pub cpus: Vec<CpuStat>,
}

/// One processor block from `/proc/cpuinfo`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuInfo {
    pub processor: usize,
    pub vendor_id: String,
    pub cpu_family: String,
    pub model: String,
    pub model_name: String,
    pub microcode: String,
    pub stepping: String,
    pub cache_size: String,
    pub physical_id: String,
    pub core_id: String,
}

/// A procfs mount.
#[derive(Clone, Debug)]
pub struct ProcFs {
    root: PathBuf,
    ticks_per_second: f64,
}

impl ProcFs {
    /// Opens the procfs mounted at `root`. Fails if `root` is not a readable
    /// directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        let metadata = std::fs::metadata(&root).map_err(|e| Error::unreadable(e, &root))?;
        if !metadata.is_dir() {
            return Err(Error::unreadable(
                std::io::Error::other("not a directory"),
                &root,
            ));
        }

        Ok(Self {
            root,
            ticks_per_second: USER_HZ,
        })
    }

    /// Overrides the clock tick rate used to convert jiffies into seconds.
    pub fn with_ticks_per_second(mut self, ticks: f64) -> Self {
        if ticks > 0.0 {
            self.ticks_per_second = ticks;
        }
        self
    }

    pub fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join(name)
    }

    pub fn stat(&self) -> Result<Stat> {
        let path = self.path("stat");
        let raw = read_string(&path)?;
        parse_stat(&raw, self.ticks_per_second, &path)
    }

    pub fn cpuinfo(&self) -> Result<Vec<CpuInfo>> {
        let path = self.path("cpuinfo");
        let raw = read_string(&path)?;
        parse_cpuinfo(&raw, &path)
    }
}

fn parse_stat(raw: &str, ticks_per_second: f64, path: &Path) -> Result<Stat> {
    let mut stat = Stat::default();

    for line in raw.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let Some(header) = parts.first() else {
            continue;
        };

        if *header == "cpu" {
            stat.total = parse_cpu_line(&parts[1..], ticks_per_second, path)?;
        } else if let Some(id) = header.strip_prefix("cpu") {
            let id: usize = id.parse().map_err(|e| Error::unparseable(e, path))?;

            if stat.cpus.len() <= id {
                stat.cpus.resize(id + 1, CpuStat::default());
            }

            stat.cpus[id] = parse_cpu_line(&parts[1..], ticks_per_second, path)?;
        }
    }

    Ok(stat)
}

// older kernels omit the trailing steal/guest columns, those stay at zero
fn parse_cpu_line(fields: &[&str], ticks_per_second: f64, path: &Path) -> Result<CpuStat> {
    let mut values = [0.0; 10];

    for (value, field) in values.iter_mut().zip(fields) {
        let ticks: u64 = field.parse().map_err(|e| Error::unparseable(e, path))?;
        *value = ticks as f64 / ticks_per_second;
    }

    let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = values;

    Ok(CpuStat {
        user,
        nice,
        system,
        idle,
        iowait,
        irq,
        softirq,
        steal,
        guest,
        guest_nice,
    })
}

fn parse_cpuinfo(raw: &str, path: &Path) -> Result<Vec<CpuInfo>> {
    let mut cpus = Vec::new();
    let mut current: Option<CpuInfo> = None;

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key.trim();
        let value = value.trim().to_string();

        if key == "processor" {
            if let Some(done) = current.take() {
                cpus.push(done);
            }

            let processor = value.parse().map_err(|e| Error::unparseable(e, path))?;

            current = Some(CpuInfo {
                processor,
                ..Default::default()
            });

            continue;
        }

        // trailing platform sections (eg: `Hardware` on arm) have no processor
        let Some(cpu) = current.as_mut() else {
            continue;
        };

        match key {
            "vendor_id" => cpu.vendor_id = value,
            "cpu family" => cpu.cpu_family = value,
            "model" => cpu.model = value,
            "model name" => cpu.model_name = value,
            "microcode" => cpu.microcode = value,
            "stepping" => cpu.stepping = value,
            "cache size" => cpu.cache_size = value,
            "physical id" => cpu.physical_id = value,
            "core id" => cpu.core_id = value,
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        cpus.push(done);
    }

    if cpus.is_empty() {
        log::debug!("no processor entries found in {}", path.display());
    }

    Ok(cpus)
}
