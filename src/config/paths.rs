use super::*;

use std::path::PathBuf;

fn procfs() -> PathBuf {
    "/proc".into()
}

fn sysfs() -> PathBuf {
    "/sys".into()
}

fn rootfs() -> PathBuf {
    "/".into()
}

/// Mount points of the kernel interfaces. Overriding these allows observing
/// the host from inside a container with the host filesystems bind-mounted.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Paths {
    #[serde(default = "procfs")]
    procfs: PathBuf,
    #[serde(default = "sysfs")]
    sysfs: PathBuf,
    #[serde(default = "rootfs")]
    rootfs: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            procfs: procfs(),
            sysfs: sysfs(),
            rootfs: rootfs(),
        }
    }
}

impl Paths {
    pub fn procfs(&self) -> &Path {
        &self.procfs
    }

    pub fn sysfs(&self) -> &Path {
        &self.sysfs
    }

    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    pub(super) fn set_procfs(&mut self, path: PathBuf) {
        self.procfs = path;
    }

    pub(super) fn set_sysfs(&mut self, path: PathBuf) {
        self.sysfs = path;
    }

    pub(super) fn set_rootfs(&mut self, path: PathBuf) {
        self.rootfs = path;
    }
}
