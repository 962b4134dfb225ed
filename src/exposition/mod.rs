use crate::metrics::Sample;

use serde::Deserialize;

use std::str::FromStr;

mod text;

/// Wire format of the pushed body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Prometheus text exposition format 0.0.4
    #[default]
    Text,
    /// OpenMetrics 1.0, terminated by `# EOF`
    OpenMetrics,
}

impl Format {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain;charset=utf-8",
            Self::OpenMetrics => "application/openmetrics-text; version=1.0.0; charset=utf-8",
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "openmetrics" => Ok(Self::OpenMetrics),
            other => Err(format!("unknown exposition format: {other}")),
        }
    }
}

/// Encodes one scrape's batch of samples.
pub struct Encoder {
    format: Format,
    body: String,
}

impl Encoder {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            body: String::new(),
        }
    }

    /// Appends the batch, grouped into metric families. Families are
    /// written in name order and samples keep their batch order.
    pub fn encode(&mut self, samples: &[Sample]) {
        for family in text::families(samples) {
            text::write_family(&mut self.body, self.format, &family);
        }
    }

    /// Finalizes the body, writing any terminator the format requires.
    pub fn finish(mut self) -> Vec<u8> {
        if self.format == Format::OpenMetrics {
            self.body.push_str("# EOF\n");
        }

        self.body.into_bytes()
    }
}
