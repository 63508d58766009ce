//! Scripted [`Prober`] for monitor tests.
//!
//! Each probe pops the next scripted outcome; once the script runs out the
//! fallback outcome (default: `Standalone`) repeats forever.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{Address, ServerKind};
use crate::error::Result;
use crate::port::{BoxTransport, ProbeReply, Prober};

/// Outcome of one scripted probe.
pub type ProbeOutcome = std::result::Result<ServerKind, io::ErrorKind>;

pub struct ScriptedProber {
    script: Mutex<VecDeque<ProbeOutcome>>,
    fallback: Mutex<ProbeOutcome>,
    latency: Option<Duration>,
    probes: AtomicU32,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(ServerKind::Standalone)),
            latency: None,
            probes: AtomicU32::new(0),
        }
    }

    /// Sleep for `latency` inside every probe.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_script(self, outcomes: Vec<ProbeOutcome>) -> Self {
        *self.script.lock() = outcomes.into();
        self
    }

    pub fn push(&self, outcome: ProbeOutcome) {
        self.script.lock().push_back(outcome);
    }

    pub fn set_fallback(&self, outcome: ProbeOutcome) {
        *self.fallback.lock() = outcome;
    }

    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _transport: &mut BoxTransport, _address: &Address) -> Result<ProbeReply> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| *self.fallback.lock());
        match outcome {
            Ok(kind) => Ok(ProbeReply::new(kind)),
            Err(kind) => Err(io::Error::new(kind, "scripted probe failure").into()),
        }
    }
}
