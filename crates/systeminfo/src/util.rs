use std::path::Path;

use crate::{Error, Result};

pub(crate) fn read_u64(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();

    let raw = std::fs::read_to_string(path).map_err(|e| Error::unreadable(e, path))?;
    let raw = raw.trim();

    raw.parse().map_err(|e| Error::unparseable(e, path))
}

pub(crate) fn read_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    std::fs::read_to_string(path).map_err(|e| Error::unreadable(e, path))
}
