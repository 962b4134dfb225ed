use parking_lot::Mutex;
use systeminfo::CpuStat;
use tracing::warn;

/// Last exposed per-CPU times. Kernel counters can step backwards (hot
/// plug, accounting jitter) and counters must not, so every new reading is
/// folded into this cache before it is exposed.
#[derive(Default)]
pub struct CpuStatsCache {
    stats: Mutex<Vec<CpuStat>>,
}

impl CpuStatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a fresh reading into the cache and returns the snapshot to
    /// expose. The whole fold happens under the lock so concurrent callers
    /// never observe a partially updated snapshot.
    pub fn update(&self, readings: &[CpuStat]) -> Vec<CpuStat> {
        let mut stats = self.stats.lock();

        // newly seen cpus start from a zero baseline
        if stats.len() != readings.len() {
            stats.resize(readings.len(), CpuStat::default());
        }

        for (cpu, (previous, next)) in stats.iter_mut().zip(readings).enumerate() {
            fold(cpu, previous, next);
        }

        stats.clone()
    }
}

fn fold(cpu: usize, previous: &mut CpuStat, next: &CpuStat) {
    // idle going backwards means the cpu went offline and came back
    if next.idle < previous.idle {
        warn!(
            cpu,
            old = previous.idle,
            new = next.idle,
            "CPU idle counter jumped backwards, possible hotplug event, resetting CPU stats"
        );
        *previous = CpuStat::default();
    }

    previous.idle = next.idle;

    let fields = [
        ("user", &mut previous.user, next.user),
        ("nice", &mut previous.nice, next.nice),
        ("system", &mut previous.system, next.system),
        ("iowait", &mut previous.iowait, next.iowait),
        ("irq", &mut previous.irq, next.irq),
        ("softirq", &mut previous.softirq, next.softirq),
        ("steal", &mut previous.steal, next.steal),
        ("guest", &mut previous.guest, next.guest),
        ("guest_nice", &mut previous.guest_nice, next.guest_nice),
    ];

    for (mode, old, new) in fields {
        if new >= *old {
            *old = new;
        } else {
            warn!(cpu, mode, old = *old, new, "CPU counter jumped backwards");
        }
    }
}
