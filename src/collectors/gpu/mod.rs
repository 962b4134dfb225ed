//! Nvidia GPU properties, queried through `nvidia-smi`.

pub const NAME: &str = "gpu";

mod stats;
mod table;

pub use self::table::TableError;

use self::stats::*;
use self::table::Reader;
use super::*;

use std::process::Stdio;
use tokio::process::Command;

const COMMAND: &str = "nvidia-smi";
const TIMEOUT: Duration = Duration::from_secs(5);

// the first column identifies the device, the rest become `metrics` labels
const QUERY: &[&str] = &[
    "index",
    "name",
    "temperature.gpu",
    "utilization.gpu",
    "utilization.memory",
    "memory.total",
    "memory.free",
    "memory.used",
];

pub fn init(config: Arc<Config>) -> Result<Box<dyn Collector>, CollectorError> {
    let settings = config.collector(NAME);

    Ok(Box::new(Gpu {
        info: settings.info().unwrap_or(true),
        command: settings.command().unwrap_or(COMMAND).to_string(),
        timeout: settings.timeout().unwrap_or(TIMEOUT),
    }))
}

pub struct Gpu {
    info: bool,
    command: String,
    timeout: Duration,
}

impl Gpu {
    async fn query(&self) -> Result<String, CollectorError> {
        let mut command = Command::new(&self.command);
        command
            .arg(format!("--query-gpu={}", QUERY.join(",")))
            .arg("--format=csv,noheader,nounits")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|source| CollectorError::Spawn {
                command: self.command.clone(),
                source,
            })?,
            Err(_) => {
                return Err(CollectorError::Timeout {
                    command: self.command.clone(),
                    timeout: self.timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(CollectorError::Exit {
                command: self.command.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| TableError::Encoding.into())
    }
}

#[async_trait]
impl Collector for Gpu {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn update(&self, samples: &mut Vec<Sample>) -> Result<Outcome, CollectorError> {
        if !self.info {
            return Ok(Outcome::NoData);
        }

        let output = self.query().await?;

        samples.extend(parse(&output)?);

        Ok(Outcome::Collected)
    }
}

/// Turns `nvidia-smi` csv output into samples. Values that aren't numbers,
/// such as `[N/A]` or the device name, are skipped.
fn parse(output: &str) -> Result<Vec<Sample>, TableError> {
    let records = Reader::new(',').trim_leading_space(true).read_all(output)?;

    if let Some(record) = records.first() {
        if record.len() != QUERY.len() {
            return Err(TableError::FieldCount {
                line: 1,
                expected: QUERY.len(),
                found: record.len(),
            });
        }
    }

    let mut samples = vec![Sample::new(&GPU_NUM_DEVICES, records.len() as f64)];

    for (row, record) in records.iter().enumerate() {
        let gpu = record[0]
            .parse::<u64>()
            .map(|i| i.to_string())
            .unwrap_or_else(|_| row.to_string());

        for (metric, value) in QUERY.iter().zip(record).skip(1) {
            if let Ok(value) = value.parse::<f64>() {
                samples.push(
                    Sample::new(&GPU_INFO, value)
                        .label("gpu", &gpu)
                        .label("metrics", metric),
                );
            }
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    const OUTPUT: &str = "0, Tesla T4, 45, 12, 3, 15360, 15000, 360
1, Tesla T4, [N/A], 0, 0, 15360, 15360, 0
";

    fn script(dir: &Path, body: &str) -> String {
        let path = dir.join("nvidia-smi");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn gpu(command: &str, extra: &str) -> Box<dyn Collector> {
        let config = format!("[collectors.gpu]\ncommand = {command:?}\n{extra}");
        init(Arc::new(config.parse().unwrap())).unwrap()
    }

    fn info<'a>(samples: &'a [Sample], gpu: &str, metric: &str) -> Option<&'a Sample> {
        samples
            .iter()
            .find(|s| s.get("gpu") == Some(gpu) && s.get("metrics") == Some(metric))
    }

    #[test]
    fn parses_devices() {
        let samples = parse(OUTPUT).unwrap();

        assert_eq!(samples[0].name(), "nvidia_gpu_num_devices");
        assert_eq!(samples[0].value(), 2.0);

        // names and [N/A] are skipped
        assert_eq!(samples.len(), 1 + 6 + 5);
        assert!(info(&samples, "0", "name").is_none());
        assert!(info(&samples, "1", "temperature.gpu").is_none());

        assert_eq!(info(&samples, "0", "temperature.gpu").unwrap().value(), 45.0);
        assert_eq!(info(&samples, "1", "memory.free").unwrap().value(), 15360.0);
        assert_eq!(
            info(&samples, "1", "memory.used").unwrap().desc().kind(),
            crate::metrics::Kind::Gauge
        );
    }

    #[test]
    fn no_devices() {
        let samples = parse("").unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value(), 0.0);
    }

    #[test]
    fn device_label_falls_back_to_position() {
        let samples = parse("x, Tesla T4, 45, 12, 3, 15360, 15000, 360\n").unwrap();
        assert!(info(&samples, "0", "temperature.gpu").is_some());
    }

    #[test]
    fn malformed_output() {
        assert!(matches!(
            parse("0, Tesla T4, 45\n1, Tesla T4\n"),
            Err(TableError::FieldCount { line: 2, .. })
        ));

        assert!(matches!(
            parse("0, Tesla T4, 45\n"),
            Err(TableError::FieldCount {
                expected: 8,
                found: 3,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn runs_the_query() {
        let dir = tempfile::tempdir().unwrap();
        let command = script(
            dir.path(),
            &format!(
                "[ \"$1\" = \"--query-gpu={}\" ] || exit 3\n[ \"$2\" = \"--format=csv,noheader,nounits\" ] || exit 4\ncat <<'EOF'\n{OUTPUT}EOF",
                QUERY.join(",")
            ),
        );

        let mut samples = Vec::new();
        let outcome = gpu(&command, "").update(&mut samples).await.unwrap();

        assert_eq!(outcome, Outcome::Collected);
        assert_eq!(samples.len(), 12);
    }

    #[tokio::test]
    async fn info_disabled_reports_no_data() {
        let mut samples = Vec::new();
        let outcome = gpu("/nonexistent/nvidia-smi", "info = false\n")
            .update(&mut samples)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NoData);
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn missing_command() {
        let mut samples = Vec::new();
        let error = gpu("/nonexistent/nvidia-smi", "")
            .update(&mut samples)
            .await
            .unwrap_err();

        assert!(matches!(error, CollectorError::Spawn { .. }));
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let command = script(dir.path(), "echo 'NVIDIA-SMI has failed' >&2\nexit 9");

        let mut samples = Vec::new();
        let error = gpu(&command, "").update(&mut samples).await.unwrap_err();

        match error {
            CollectorError::Exit { status, stderr, .. } => {
                assert_eq!(status.code(), Some(9));
                assert_eq!(stderr, "NVIDIA-SMI has failed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn hung_command_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let command = script(dir.path(), "exec sleep 10");

        let started = std::time::Instant::now();
        let mut samples = Vec::new();
        let error = gpu(&command, "timeout = \"100ms\"\n")
            .update(&mut samples)
            .await
            .unwrap_err();

        assert!(matches!(error, CollectorError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn unparseable_output_fails_the_update() {
        let dir = tempfile::tempdir().unwrap();
        let command = script(dir.path(), "echo '0, \"Tesla T4, 45'");

        let mut samples = Vec::new();
        let error = gpu(&command, "").update(&mut samples).await.unwrap_err();

        assert!(matches!(error, CollectorError::Parse(TableError::UnterminatedQuote { .. })));
        assert!(samples.is_empty());
    }
}
