//! A scripted fleet standing in for real SSH sessions.
//!
//! Every device answers from a per-serial script; the executor counts open and closed
//! sessions, tracks the peak number open at once and records the commands each device ran.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use patrol_common::config::Credentials;
use patrol_common::device::Device;
use patrol_common::error::InspectError;
use patrol_common::executor::{RemoteExecutor, RemoteSession};

#[derive(Default)]
struct Script {
    refuse: bool,
    replies: HashMap<String, String>,
}

#[derive(Default)]
struct Counters {
    active: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    calls: Mutex<Vec<(String, String)>>,
}

#[derive(Default)]
pub struct FakeFleet {
    scripts: HashMap<String, Script>,
    latency: Duration,
    counters: Arc<Counters>,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `sn` answers `command` with `output`. Unscripted commands answer with nothing.
    pub fn reply(mut self, sn: &str, command: &str, output: &str) -> Self {
        self.scripts
            .entry(sn.to_string())
            .or_default()
            .replies
            .insert(command.to_string(), output.to_string());
        self
    }

    /// Opening a session to `sn` fails with a connection error.
    pub fn refuse(mut self, sn: &str) -> Self {
        self.scripts.entry(sn.to_string()).or_default().refuse = true;
        self
    }

    /// Every command takes `latency` to answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Commands executed on `sn`, in execution order.
    pub fn calls_for(&self, sn: &str) -> Vec<String> {
        self.counters
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(device, _)| device == sn)
            .map(|(_, command)| command.clone())
            .collect()
    }

    pub fn peak_sessions(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteExecutor for FakeFleet {
    async fn open(
        &self,
        device: &Device,
        _credentials: &Credentials,
    ) -> Result<Box<dyn RemoteSession>, InspectError> {
        let script = self.scripts.get(&device.sn);
        if script.is_some_and(|s| s.refuse) {
            return Err(InspectError::connection(device.ip.to_string(), "connection refused"));
        }

        let counters = &self.counters;
        counters.opened.fetch_add(1, Ordering::SeqCst);
        let active = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            sn: device.sn.clone(),
            replies: script.map(|s| s.replies.clone()).unwrap_or_default(),
            latency: self.latency,
            counters: counters.clone(),
        }))
    }
}

struct FakeSession {
    sn: String,
    replies: HashMap<String, String>,
    latency: Duration,
    counters: Arc<Counters>,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn execute(&mut self, command: &str) -> Result<String, InspectError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.counters
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((self.sn.clone(), command.to_string()));
        Ok(self.replies.get(command).cloned().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), InspectError> {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
