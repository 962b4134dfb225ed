//! The sample model shared by collectors and the exposition encoder.

use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Cumulative, only resets when the underlying resource does.
    Counter,
    Gauge,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes a metric family. Collectors declare these as statics.
#[derive(Debug, PartialEq, Eq)]
pub struct Desc {
    name: &'static str,
    help: &'static str,
    kind: Kind,
}

impl Desc {
    pub const fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: Kind::Counter,
        }
    }

    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: Kind::Gauge,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
}

/// A single labeled measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    desc: &'static Desc,
    labels: Vec<(String, String)>,
    value: f64,
}

impl Sample {
    pub fn new(desc: &'static Desc, value: f64) -> Self {
        Self {
            desc,
            labels: Vec::new(),
            value,
        }
    }

    /// Adds a label. Setting a key that is already present replaces its
    /// value in place so keys stay unique.
    pub fn label(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();

        match self.labels.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.labels.push((key.to_string(), value)),
        }

        self
    }

    pub fn desc(&self) -> &'static Desc {
        self.desc
    }

    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// Value of the label `key`, if present.
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST: Desc = Desc::counter("test_total", "A test counter.");

    #[test]
    fn label_keys_are_unique() {
        let sample = Sample::new(&TEST, 1.0)
            .label("cpu", 0)
            .label("mode", "user")
            .label("cpu", 1);

        assert_eq!(sample.labels().len(), 2);
        assert_eq!(sample.get("cpu"), Some("1"));
        assert_eq!(sample.labels()[0].0, "cpu");
        assert_eq!(sample.desc().kind(), Kind::Counter);
    }
}
