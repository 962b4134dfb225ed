use super::*;

fn interval() -> Duration {
    Duration::from_secs(10)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct General {
    // time between the start of consecutive scrape and push cycles
    #[serde(default = "interval", deserialize_with = "duration")]
    interval: Duration,
}

impl Default for General {
    fn default() -> Self {
        Self {
            interval: interval(),
        }
    }
}

impl General {
    pub fn check(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("interval must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub(super) fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}
