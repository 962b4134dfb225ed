use super::*;

/// Per-collector settings. Fields that a collector doesn't understand are
/// ignored by it.
#[derive(Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Collector {
    #[serde(default)]
    enabled: Option<bool>,

    // gates the optional info family of a collector
    #[serde(default)]
    info: Option<bool>,

    // deadline for any external command a collector runs
    #[serde(default, deserialize_with = "optional_duration")]
    timeout: Option<Duration>,

    #[serde(default)]
    command: Option<String>,
}

impl Collector {
    pub fn check(&self, name: &str) -> Result<(), String> {
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(format!("{name}: timeout must be greater than zero"));
        }

        if self.command.as_deref() == Some("") {
            return Err(format!("{name}: command must not be empty"));
        }

        Ok(())
    }

    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    pub fn info(&self) -> Option<bool> {
        self.info
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = Some(enabled);
    }

    pub(super) fn set_info(&mut self, info: bool) {
        self.info = Some(info);
    }
}
