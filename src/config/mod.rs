use crate::exposition::Format;

use serde::{Deserialize, Deserializer};

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

mod args;
mod collector;
mod general;
mod log;
mod paths;
mod pusher;

pub use args::command;
pub use collector::Collector as CollectorConfig;
pub use general::General;
pub use log::{Log, LogFormat, LogLevel};
pub use paths::Paths;
pub use pusher::Pusher;

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    general: General,
    #[serde(default)]
    log: Log,
    #[serde(default)]
    paths: Paths,
    #[serde(default)]
    pusher: Pusher,
    #[serde(default)]
    defaults: CollectorConfig,
    #[serde(default)]
    collectors: HashMap<String, CollectorConfig>,
}

impl FromStr for Config {
    type Err = String;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(content).map_err(|e| format!("failed to parse config: {e}"))?;

        config.check()?;

        Ok(config)
    }
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("unable to open config file: {e}"))?;

        content.parse()
    }

    /// Validates the settings that serde alone can't.
    pub fn check(&self) -> Result<(), String> {
        self.general.check()?;
        self.pusher.check()?;

        for (name, config) in self.collectors.iter() {
            config.check(name)?;
        }

        Ok(())
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn pusher(&self) -> &Pusher {
        &self.pusher
    }

    /// True when collectors should be disabled unless individually enabled.
    pub fn disable_defaults(&self) -> bool {
        self.defaults.enabled() == Some(false)
    }

    /// Explicit per-collector enable/disable overrides.
    pub fn overrides(&self) -> HashMap<&str, bool> {
        self.collectors
            .iter()
            .filter_map(|(name, config)| config.enabled().map(|enabled| (name.as_str(), enabled)))
            .collect()
    }

    /// Settings for the named collector, defaulted if absent.
    pub fn collector(&self, name: &str) -> CollectorConfig {
        self.collectors.get(name).cloned().unwrap_or_default()
    }

    fn collector_mut(&mut self, name: &str) -> &mut CollectorConfig {
        self.collectors.entry(name.to_string()).or_default()
    }
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    duration(deserializer).map(Some)
}
