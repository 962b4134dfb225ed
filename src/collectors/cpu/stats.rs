use crate::metrics::Desc;

pub static CPU_SECONDS: Desc = Desc::counter(
    "node_cpu_seconds_total",
    "Seconds the CPUs spent in each mode.",
);

pub static CPU_GUEST_SECONDS: Desc = Desc::counter(
    "node_cpu_guest_seconds_total",
    "Seconds the CPUs spent in guests (VMs) for each mode.",
);

pub static CPU_INFO: Desc = Desc::gauge("node_cpu_info", "CPU information from /proc/cpuinfo.");

pub static CPU_CORE_THROTTLES: Desc = Desc::counter(
    "node_cpu_core_throttles_total",
    "Number of times this CPU core has been throttled.",
);

pub static CPU_PACKAGE_THROTTLES: Desc = Desc::counter(
    "node_cpu_package_throttles_total",
    "Number of times this CPU package has been throttled.",
);
