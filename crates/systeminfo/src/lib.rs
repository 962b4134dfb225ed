//! Typed readers for the kernel interfaces exposed through procfs and sysfs.
//!
//! Every reader is rooted at a caller-provided mount point so that a host's
//! filesystems can be observed from inside a container.

mod error;
mod util;

pub mod procfs;
pub mod sysfs;

pub use crate::error::{Error, Result};
pub use crate::procfs::{CpuInfo, CpuStat, ProcFs, Stat};
pub use crate::sysfs::{CpuDir, SysFs};
