//! Background monitor producing server descriptions.
//!
//! The monitor runs as its own tokio task. Every heartbeat it probes the
//! server over a dedicated transport (never a pooled one), turns the outcome
//! into a [`ServerDescription`] and publishes it. Probe failures are
//! classified:
//!
//! - **Transient** (timeouts): recorded in the description, pool untouched.
//! - **Persistent** (reset, refused, EOF): recorded and the pool is drained so
//!   callers stop reusing connections to a dead server.
//!
//! The monitor never closes the server. It stops only when its
//! [`MonitorHandle`] is stopped or dropped.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{Address, FailureClass, ServerDescription, ServerError, ServerKind};
use crate::error::{Error, Result};
use crate::infrastructure::classify::FailureClassifier;
use crate::infrastructure::config::{ConnectionOptions, MonitorConfig};
use crate::infrastructure::connect::establish;
use crate::infrastructure::pool::ConnectionPool;
use crate::infrastructure::subscription::Broadcaster;
use crate::port::{BoxTransport, Dialer, Prober};

mod rtt;

use rtt::RttTracker;

/// Everything the monitor task needs, moved into it at spawn.
pub(crate) struct MonitorContext {
    pub(crate) address: Address,
    pub(crate) config: MonitorConfig,
    pub(crate) options: ConnectionOptions,
    pub(crate) dialer: Arc<dyn Dialer>,
    pub(crate) prober: Arc<dyn Prober>,
    pub(crate) classifier: Arc<dyn FailureClassifier>,
    pub(crate) pool: ConnectionPool,
    pub(crate) broadcaster: Broadcaster,
}

/// Owner's handle on a running monitor task.
///
/// Dropping the handle cancels the task without waiting for it.
pub(crate) struct MonitorHandle {
    cancel: CancellationToken,
    wake: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Spawn the monitor task on the current tokio runtime.
    pub(crate) fn spawn(ctx: MonitorContext) -> Self {
        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let task = tokio::spawn(monitor_task(
            Monitor::new(ctx),
            cancel.clone(),
            Arc::clone(&wake),
        ));
        Self {
            cancel,
            wake,
            task: Some(task),
        }
    }

    /// Ask for a probe before the next scheduled heartbeat.
    pub(crate) fn request_check(&self) {
        self.wake.notify_one();
    }

    /// Cancel the task without waiting for it.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel the task and wait for it to exit.
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(error = %e, "Monitor task panicked");
                }
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn monitor_task(mut monitor: Monitor, cancel: CancellationToken, wake: Arc<Notify>) {
    let heartbeat = monitor.ctx.config.heartbeat_interval();
    let min_interval = monitor.ctx.config.min_heartbeat_interval();

    debug!(
        address = %monitor.ctx.address,
        heartbeat_ms = u64::try_from(heartbeat.as_millis()).unwrap_or(u64::MAX),
        "Monitor started"
    );

    loop {
        let started = Instant::now();
        let desc = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            desc = monitor.check() => desc,
        };
        monitor.ctx.broadcaster.publish(desc);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = sleep_until(started + heartbeat) => {}
            () = wake.notified() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = sleep_until(started + min_interval) => {}
                }
            }
        }
    }

    debug!(address = %monitor.ctx.address, "Monitor stopped");
}

/// Probe state carried between heartbeats.
struct Monitor {
    ctx: MonitorContext,
    transport: Option<BoxTransport>,
    rtt: RttTracker,
    last_kind: ServerKind,
}

impl Monitor {
    fn new(ctx: MonitorContext) -> Self {
        Self {
            ctx,
            transport: None,
            rtt: RttTracker::default(),
            last_kind: ServerKind::Unknown,
        }
    }

    /// Probe once and describe the outcome, draining the pool on a
    /// persistent failure.
    async fn check(&mut self) -> ServerDescription {
        let address = self.ctx.address.clone();
        match self.probe().await {
            Ok((kind, rtt)) => {
                let average = self.rtt.add(rtt);
                if kind != self.last_kind {
                    info!(address = %address, from = %self.last_kind, to = %kind, "Server kind changed");
                }
                self.last_kind = kind;
                debug!(
                    address = %address,
                    kind = %kind,
                    rtt_us = u64::try_from(rtt.as_micros()).unwrap_or(u64::MAX),
                    "Probe succeeded"
                );
                ServerDescription::observed(address, kind, rtt, average)
            }
            Err(err) => {
                self.last_kind = ServerKind::Unknown;
                let class = self.ctx.classifier.classify(&err);
                match class {
                    FailureClass::Persistent => {
                        warn!(address = %address, error = %err, "Server unreachable, draining pool");
                        self.ctx.pool.drain();
                    }
                    FailureClass::Transient => {
                        info!(address = %address, error = %err, "Probe failed");
                    }
                }
                let error = ServerError {
                    class,
                    message: err.to_string(),
                };
                ServerDescription::failed(address, error, self.rtt.average())
            }
        }
    }

    /// Run one probe, dialing first if the previous transport was lost.
    ///
    /// Returns the reported kind and the probe's round trip. The transport is
    /// kept only if the probe succeeded.
    async fn probe(&mut self) -> Result<(ServerKind, Duration)> {
        let mut transport = match self.transport.take() {
            Some(transport) => transport,
            None => {
                establish(self.ctx.dialer.as_ref(), &self.ctx.address, &self.ctx.options).await?
            }
        };

        let started = Instant::now();
        let reply = timeout(
            self.ctx.options.connect_timeout(),
            self.ctx.prober.probe(&mut transport, &self.ctx.address),
        )
        .await
        .map_err(|_| Error::Io(io::Error::new(io::ErrorKind::TimedOut, "probe timed out")))??;
        let rtt = started.elapsed();

        self.transport = Some(transport);
        Ok((reply.kind, rtt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServerKind;
    use crate::infrastructure::classify::DefaultClassifier;
    use crate::testkit;
    use crate::testkit::net::MockDialer;
    use crate::testkit::probe::ScriptedProber;
    use std::io;

    struct Fixture {
        monitor: Monitor,
        pool: ConnectionPool,
        dialer: Arc<MockDialer>,
        prober: Arc<ScriptedProber>,
    }

    fn fixture(prober: ScriptedProber) -> Fixture {
        let dialer = Arc::new(MockDialer::new());
        let prober = Arc::new(prober);
        let pool = ConnectionPool::new(
            testkit::address(),
            testkit::config::pool(2, 2),
            ConnectionOptions::default(),
            dialer.clone(),
            Arc::new(DefaultClassifier),
        )
        .unwrap();
        let ctx = MonitorContext {
            address: testkit::address(),
            config: testkit::config::monitor(),
            options: ConnectionOptions::default(),
            dialer: dialer.clone(),
            prober: prober.clone(),
            classifier: Arc::new(DefaultClassifier),
            pool: pool.clone(),
            broadcaster: Broadcaster::new(ServerDescription::unknown(testkit::address())),
        };
        Fixture {
            monitor: Monitor::new(ctx),
            pool,
            dialer,
            prober,
        }
    }

    #[tokio::test]
    async fn test_successful_probe_describes_server() {
        let mut f = fixture(ScriptedProber::new().with_script(vec![Ok(ServerKind::Primary)]));

        let desc = f.monitor.check().await;
        assert_eq!(desc.kind, ServerKind::Primary);
        assert!(desc.last_rtt.is_some());
        assert!(desc.average_rtt.is_some());
        assert!(desc.last_error.is_none());
    }

    #[tokio::test]
    async fn test_transport_reused_across_probes() {
        let mut f = fixture(ScriptedProber::new());
        f.monitor.check().await;
        f.monitor.check().await;
        f.monitor.check().await;
        assert_eq!(f.dialer.dial_count(), 1);
        assert_eq!(f.prober.probe_count(), 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_drains_pool() {
        let mut f = fixture(
            ScriptedProber::new().with_script(vec![Err(io::ErrorKind::ConnectionReset)]),
        );
        drop(f.pool.get(&crate::context::Context::background()).await.unwrap());
        assert_eq!(f.pool.stats().idle, 1);

        let desc = f.monitor.check().await;
        assert_eq!(desc.kind, ServerKind::Unknown);
        let error = desc.last_error.unwrap();
        assert_eq!(error.class, FailureClass::Persistent);
        assert_eq!(f.pool.stats().drains, 1);
        assert_eq!(f.pool.stats().idle, 0);
        assert!(!f.pool.is_closed());
    }

    #[tokio::test]
    async fn test_transient_failure_does_not_drain() {
        let mut f = fixture(ScriptedProber::new().with_script(vec![Err(io::ErrorKind::TimedOut)]));
        drop(f.pool.get(&crate::context::Context::background()).await.unwrap());

        let desc = f.monitor.check().await;
        assert_eq!(
            desc.last_error.map(|e| e.class),
            Some(FailureClass::Transient)
        );
        assert_eq!(f.pool.stats().drains, 0);
        assert_eq!(f.pool.stats().idle, 1);
    }

    #[tokio::test]
    async fn test_refused_dial_drains_pool() {
        let mut f = fixture(ScriptedProber::new());
        f.dialer.fail_next(io::ErrorKind::ConnectionRefused);

        let desc = f.monitor.check().await;
        assert_eq!(
            desc.last_error.map(|e| e.class),
            Some(FailureClass::Persistent)
        );
        assert_eq!(f.pool.stats().drains, 1);
        assert_eq!(f.prober.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_redials_on_next_probe() {
        let mut f = fixture(
            ScriptedProber::new().with_script(vec![Err(io::ErrorKind::ConnectionReset)]),
        );
        f.monitor.check().await;
        let desc = f.monitor.check().await;

        assert_eq!(desc.kind, ServerKind::Standalone);
        assert_eq!(f.dialer.dial_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_average_rtt() {
        let mut f = fixture(
            ScriptedProber::new().with_script(vec![Ok(ServerKind::Primary), Err(io::ErrorKind::TimedOut)]),
        );
        let ok = f.monitor.check().await;
        let failed = f.monitor.check().await;
        assert_eq!(failed.average_rtt, ok.average_rtt);
        assert!(failed.last_rtt.is_none());
    }

    #[tokio::test]
    async fn test_task_publishes_and_stops() {
        let f = fixture(ScriptedProber::new());
        let broadcaster = f.monitor.ctx.broadcaster.clone();
        let mut sub = broadcaster.subscribe().unwrap();
        assert_eq!(sub.recv().await.unwrap().kind, ServerKind::Unknown);

        let handle = MonitorHandle::spawn(f.monitor.ctx);
        let desc = sub.recv().await.unwrap();
        assert_eq!(desc.kind, ServerKind::Standalone);

        handle.stop().await;
        let probes = f.prober.probe_count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(f.prober.probe_count(), probes);
    }

    #[tokio::test]
    async fn test_requested_check_runs_before_heartbeat() {
        let f = fixture(ScriptedProber::new());
        let mut ctx = f.monitor.ctx;
        ctx.config.heartbeat_interval_ms = 3_600_000;
        ctx.config.min_heartbeat_interval_ms = 1;
        let prober = f.prober.clone();

        let handle = MonitorHandle::spawn(ctx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(prober.probe_count(), 1);

        handle.request_check();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(prober.probe_count(), 2);
        handle.stop().await;
    }
}
