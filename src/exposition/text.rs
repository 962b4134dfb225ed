use super::*;

use crate::metrics::{Desc, Kind};

use std::collections::BTreeMap;
use std::fmt::Write;

pub(super) struct Family<'a> {
    desc: &'static Desc,
    samples: Vec<&'a Sample>,
}

pub(super) fn families(samples: &[Sample]) -> Vec<Family<'_>> {
    let mut families: BTreeMap<&'static str, Family<'_>> = BTreeMap::new();

    for sample in samples {
        families
            .entry(sample.name())
            .or_insert_with(|| Family {
                desc: sample.desc(),
                samples: Vec::new(),
            })
            .samples
            .push(sample);
    }

    families.into_values().collect()
}

pub(super) fn write_family(out: &mut String, format: Format, family: &Family<'_>) {
    let desc = family.desc;

    // openmetrics names the family without the counter suffix
    let (family_name, sample_name) = match (format, desc.kind()) {
        (Format::OpenMetrics, Kind::Counter) => {
            let base = desc.name().strip_suffix("_total").unwrap_or(desc.name());
            (base.to_string(), format!("{base}_total"))
        }
        _ => (desc.name().to_string(), desc.name().to_string()),
    };

    let _ = writeln!(out, "# HELP {family_name} {}", escape_help(desc.help()));
    let _ = writeln!(out, "# TYPE {family_name} {}", desc.kind());

    for sample in &family.samples {
        let labels = format_labels(sample.labels());
        let value = format_value(sample.value());

        if labels.is_empty() {
            let _ = writeln!(out, "{sample_name} {value}");
        } else {
            let _ = writeln!(out, "{sample_name}{{{labels}}} {value}");
        }
    }
}

fn format_labels(labels: &[(String, String)]) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}=\"{}\"", escape_label(value)))
        .collect::<Vec<String>>()
        .join(",")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{value}")
    }
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }

    escaped
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    static SECONDS: Desc = Desc::counter(
        "node_cpu_seconds_total",
        "Seconds the CPUs spent in each mode.",
    );
    static DEVICES: Desc = Desc::gauge("nvidia_gpu_num_devices", "Number of Nvidia GPU devices.");
    static INFO: Desc = Desc::gauge("node_cpu_info", "CPU information from /proc/cpuinfo.");

    fn batch() -> Vec<Sample> {
        vec![
            Sample::new(&SECONDS, 10.5).label("cpu", 0).label("mode", "user"),
            Sample::new(&DEVICES, 2.0),
            Sample::new(&SECONDS, 300.0).label("cpu", 0).label("mode", "idle"),
        ]
    }

    fn encode(format: Format, samples: &[Sample]) -> String {
        let mut encoder = Encoder::new(format);
        encoder.encode(samples);
        String::from_utf8(encoder.finish()).unwrap()
    }

    #[test]
    fn text_groups_families_by_name() {
        assert_eq!(
            encode(Format::Text, &batch()),
            "# HELP node_cpu_seconds_total Seconds the CPUs spent in each mode.
# TYPE node_cpu_seconds_total counter
node_cpu_seconds_total{cpu=\"0\",mode=\"user\"} 10.5
node_cpu_seconds_total{cpu=\"0\",mode=\"idle\"} 300
# HELP nvidia_gpu_num_devices Number of Nvidia GPU devices.
# TYPE nvidia_gpu_num_devices gauge
nvidia_gpu_num_devices 2
"
        );
    }

    #[test]
    fn openmetrics_is_terminated() {
        let body = encode(Format::OpenMetrics, &batch());

        assert!(body.ends_with("# EOF\n"));
        assert!(body.contains("# TYPE node_cpu_seconds counter\n"));
        assert!(body.contains("node_cpu_seconds_total{cpu=\"0\",mode=\"user\"} 10.5\n"));
        assert_eq!(body.matches("# EOF").count(), 1);
    }

    #[test]
    fn empty_batch() {
        assert_eq!(encode(Format::Text, &[]), "");
        assert_eq!(encode(Format::OpenMetrics, &[]), "# EOF\n");
    }

    #[test]
    fn escapes_label_values() {
        let sample = Sample::new(&INFO, 1.0).label("model_name", "a \"quoted\"\\name\n");
        let body = encode(Format::Text, &[sample]);

        assert!(body.contains(r#"node_cpu_info{model_name="a \"quoted\"\\name\n"} 1"#));
    }

    #[test]
    fn special_values() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(0.25), "0.25");
    }

    #[test]
    fn text_output_parses() {
        let body = encode(Format::Text, &batch());
        let lines = body.lines().map(|l| Ok::<_, std::io::Error>(l.to_string()));
        let scrape = prometheus_parse::Scrape::parse(lines).unwrap();

        assert_eq!(scrape.samples.len(), 3);

        let idle = scrape
            .samples
            .iter()
            .find(|s| s.labels.get("mode").map(|v| v.to_string()) == Some("idle".to_string()))
            .unwrap();

        assert_eq!(idle.metric, "node_cpu_seconds_total");
        assert!(matches!(idle.value, prometheus_parse::Value::Counter(v) if v == 300.0));
    }
}
