use crate::collectors::{ActiveSet, CollectorError, Outcome};
use crate::config::Config;
use crate::exposition::{Encoder, Format};
use crate::metrics::{Desc, Sample};
use crate::pusher::{LocalIpv4, PushError, PushOutcome, Pusher, ResolveError, Resolver, Static};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

static SCRAPE_DURATION: Desc = Desc::gauge(
    "node_scrape_collector_duration_seconds",
    "node_exporter: Duration of a collector scrape.",
);

static SCRAPE_SUCCESS: Desc = Desc::gauge(
    "node_scrape_collector_success",
    "node_exporter: Whether a collector succeeded.",
);

static BUILD_INFO: Desc = Desc::gauge(
    "node_pusher_build_info",
    "A metric with a constant '1' value labeled by the version of node-pusher.",
);

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("collector {name} failed: {source}")]
    Collect {
        name: &'static str,
        source: CollectorError,
    },
    #[error("couldn't resolve instance address: {0}")]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Push(#[from] PushError),
}

/// Periodically scrapes the active collectors and pushes the batch to the
/// gateway. Cycles never overlap.
pub struct Agent {
    collectors: ActiveSet,
    resolver: Box<dyn Resolver>,
    pusher: Pusher,
    format: Format,
    interval: Duration,
}

impl Agent {
    pub fn new(config: &Config, collectors: ActiveSet) -> Result<Self, PushError> {
        let resolver: Box<dyn Resolver> = match config.pusher().instance() {
            Some(address) => Box::new(Static(address)),
            None => Box::new(LocalIpv4),
        };

        Ok(Self {
            collectors,
            resolver,
            pusher: Pusher::new(config.pusher())?,
            format: config.pusher().format(),
            interval: config.general().interval(),
        })
    }

    /// Runs cycles on the configured interval, the first one interval after
    /// the call. Returns once `shutdown` is notified, which is only checked
    /// between cycles.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.notified() => return,
                _ = interval.tick() => {}
            }

            match self.cycle().await {
                Ok(PushOutcome::Accepted(status)) => {
                    debug!("pushed metrics: {status}");
                }
                Ok(PushOutcome::Rejected { status, body }) => {
                    warn!("push gateway rejected metrics: {status}: {body}");
                }
                Err(CycleError::Push(e)) => {
                    warn!("{e}");
                }
                Err(e) => {
                    error!("skipping push: {e}");
                }
            }
        }
    }

    /// One scrape, encode and push.
    pub async fn cycle(&self) -> Result<PushOutcome, CycleError> {
        let samples = self.collect().await?;
        let instance = self.resolver.resolve()?;

        let mut encoder = Encoder::new(self.format);
        encoder.encode(&samples);

        Ok(self.pusher.push(instance, encoder.finish()).await?)
    }

    async fn collect(&self) -> Result<Vec<Sample>, CycleError> {
        let mut samples =
            vec![Sample::new(&BUILD_INFO, 1.0).label("version", env!("CARGO_PKG_VERSION"))];

        for collector in self.collectors.iter() {
            let name = collector.name();

            let start = Instant::now();
            let result = collector.update(&mut samples).await;
            let elapsed = start.elapsed();

            samples.push(
                Sample::new(&SCRAPE_DURATION, elapsed.as_secs_f64()).label("collector", name),
            );
            samples.push(
                Sample::new(&SCRAPE_SUCCESS, if result.is_ok() { 1.0 } else { 0.0 })
                    .label("collector", name),
            );

            match result {
                Ok(Outcome::Collected) => {
                    debug!("collector {name} succeeded in {elapsed:?}");
                }
                Ok(Outcome::NoData) => {
                    debug!("collector {name} returned no data");
                }
                Err(source) => {
                    return Err(CycleError::Collect { name, source });
                }
            }
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::collectors::Collector;
    use crate::pusher::tests::Gateway;

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FAKE: Desc = Desc::gauge("fake_value", "A value from a fake collector.");

    enum Behavior {
        Emit(f64),
        NoData,
        Fail,
    }

    struct Fake {
        name: &'static str,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Collector for Fake {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn update(&self, samples: &mut Vec<Sample>) -> Result<Outcome, CollectorError> {
            self.calls.fetch_add(1, Ordering::Relaxed);

            match self.behavior {
                Behavior::Emit(value) => {
                    samples.push(Sample::new(&FAKE, value).label("source", self.name));
                    Ok(Outcome::Collected)
                }
                Behavior::NoData => Ok(Outcome::NoData),
                Behavior::Fail => Err(CollectorError::Spawn {
                    command: "fake".to_string(),
                    source: std::io::Error::other("boom"),
                }),
            }
        }
    }

    fn fake(name: &'static str, behavior: Behavior) -> (Box<dyn Collector>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let collector = Box::new(Fake {
            name,
            behavior,
            calls: calls.clone(),
        });
        (collector, calls)
    }

    fn agent(address: &str, collectors: Vec<Box<dyn Collector>>, extra: &str) -> Agent {
        let config: Config = format!(
            "[general]\ninterval = \"50ms\"\n[pusher]\naddress = {address:?}\ninstance = \"10.0.0.1\"\n{extra}"
        )
        .parse()
        .unwrap();

        Agent::new(&config, ActiveSet::from_collectors(collectors)).unwrap()
    }

    #[tokio::test]
    async fn pushes_one_batch_per_cycle() {
        let gateway = Gateway::start(200, "").await;
        let (alpha, _) = fake("alpha", Behavior::Emit(4.0));
        let (beta, _) = fake("beta", Behavior::NoData);

        let agent = agent(&gateway.address, vec![alpha, beta], "");
        let outcome = agent.cycle().await.unwrap();
        assert!(matches!(outcome, PushOutcome::Accepted(_)));

        let received = gateway.received.lock().clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].path, "/metrics/job/node/instance/10.0.0.1");

        let body = &received[0].body;
        assert!(body.contains("fake_value{source=\"alpha\"} 4\n"));
        assert!(body.contains(&format!(
            "node_pusher_build_info{{version=\"{}\"}} 1\n",
            env!("CARGO_PKG_VERSION")
        )));
        // no data still counts as success
        assert!(body.contains("node_scrape_collector_success{collector=\"alpha\"} 1\n"));
        assert!(body.contains("node_scrape_collector_success{collector=\"beta\"} 1\n"));
        assert!(body.contains("# TYPE node_scrape_collector_duration_seconds gauge\n"));
    }

    #[tokio::test]
    async fn collector_failure_skips_the_push() {
        let gateway = Gateway::start(200, "").await;
        let (alpha, _) = fake("alpha", Behavior::Fail);
        let (beta, beta_calls) = fake("beta", Behavior::Emit(1.0));

        let agent = agent(&gateway.address, vec![alpha, beta], "");
        let error = agent.cycle().await.unwrap_err();

        assert!(matches!(error, CycleError::Collect { name: "alpha", .. }));
        assert_eq!(beta_calls.load(Ordering::Relaxed), 0);
        assert!(gateway.received.lock().is_empty());
    }

    #[tokio::test]
    async fn rejection_is_an_outcome() {
        let gateway = Gateway::start(400, "text format parsing error").await;
        let agent = agent(&gateway.address, Vec::new(), "format = \"openmetrics\"\n");

        match agent.cycle().await.unwrap() {
            PushOutcome::Rejected { status, body } => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(body, "text format parsing error");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let received = gateway.received.lock().clone();
        assert!(received[0].body.ends_with("# EOF\n"));
    }

    #[tokio::test]
    async fn runs_until_shutdown() {
        let gateway = Gateway::start(500, "down").await;
        let (alpha, calls) = fake("alpha", Behavior::Emit(1.0));
        let agent = agent(&gateway.address, vec![alpha], "");

        let shutdown = Arc::new(Notify::new());
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.notify_one();
        });

        // rejected pushes don't stop the loop
        tokio::time::timeout(Duration::from_secs(5), agent.run(shutdown))
            .await
            .unwrap();

        assert!(calls.load(Ordering::Relaxed) >= 2);
        assert_eq!(
            gateway.received.lock().len(),
            calls.load(Ordering::Relaxed)
        );
    }

    #[tokio::test]
    async fn unreachable_gateway_does_not_stop_the_loop() {
        // reserve a port, then free it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let (alpha, calls) = fake("alpha", Behavior::Emit(1.0));
        let agent = agent(&address, vec![alpha], "");

        let shutdown = Arc::new(Notify::new());
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.notify_one();
        });

        tokio::time::timeout(Duration::from_secs(5), agent.run(shutdown))
            .await
            .unwrap();

        assert!(calls.load(Ordering::Relaxed) >= 2);
    }

    #[tokio::test]
    async fn shutdown_before_first_tick() {
        let gateway = Gateway::start(200, "").await;
        let (alpha, calls) = fake("alpha", Behavior::Emit(1.0));
        let agent = agent(&gateway.address, vec![alpha], "");

        let shutdown = Arc::new(Notify::new());
        shutdown.notify_one();

        tokio::time::timeout(Duration::from_secs(5), agent.run(shutdown))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert!(gateway.received.lock().is_empty());
    }
}
