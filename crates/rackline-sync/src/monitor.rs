//! # Connectivity Monitor
//!
//! Produces a trustworthy [`ConnectivitySignal`] instead of relying on
//! OS/browser "online" events alone.
//!
//! ## Why Active Probing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Link State vs. Reachability                        │
//! │                                                                     │
//! │  The OS "online" event only says the network interface has a link.  │
//! │  A terminal on store Wi-Fi with a dead uplink is "online" to the    │
//! │  OS and completely unable to reach the remote store.                │
//! │                                                                     │
//! │  Monitor policy:                                                    │
//! │  • every 30s while the link is up: active HTTP health probe         │
//! │  • OS reports link DOWN → offline immediately, no probe needed      │
//! │  • OS reports link UP   → probe immediately, don't trust the event  │
//! │  • probe failure (timeout / error / bad status) → offline           │
//! │  • probe success → online, recorded error cleared                   │
//! │                                                                     │
//! │  Transitions are published on a watch channel; the sync agent       │
//! │  starts a drain cycle on every offline→online edge.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Connectivity Signal
// =============================================================================

/// Process-wide connectivity state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySignal {
    /// Whether the remote store is currently reachable.
    pub is_online: bool,

    /// When reachability was last evaluated.
    pub last_checked: DateTime<Utc>,

    /// Last connectivity error, cleared on a successful probe.
    pub last_error: Option<String>,
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        // Pessimistic until the first probe says otherwise.
        ConnectivitySignal {
            is_online: false,
            last_checked: Utc::now(),
            last_error: None,
        }
    }
}

// =============================================================================
// Health Probe
// =============================================================================

/// A failed reachability probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe request timed out.
    #[error("Health check timed out")]
    Timeout,

    /// Network-level failure.
    #[error("Health check failed: {0}")]
    Unreachable(String),

    /// The endpoint answered with a non-success status.
    #[error("Health check returned status {0}")]
    BadStatus(u16),
}

/// A lightweight reachability check against the remote store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns Ok if the remote store is reachable right now.
    async fn probe(&self) -> Result<(), ProbeError>;
}

/// HTTP implementation: a HEAD request to the configured health URL.
pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpHealthProbe {
    /// Creates a probe for the given health-check URL.
    pub fn new(url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Internal(e.to_string()))?;

        Ok(HttpHealthProbe {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        let response = self.client.head(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Unreachable(e.to_string())
            }
        })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::BadStatus(response.status().as_u16()))
        }
    }
}

// =============================================================================
// Link Events
// =============================================================================

/// OS/link-layer event reported by the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Interface reports a link. Verified with an immediate probe.
    Up,
    /// Interface lost its link. Trusted immediately (fail fast).
    Down,
}

// =============================================================================
// Monitor Handle
// =============================================================================

/// Handle for interacting with a running connectivity monitor.
#[derive(Clone)]
pub struct ConnectivityMonitorHandle {
    signal: Arc<RwLock<ConnectivitySignal>>,
    online_rx: watch::Receiver<bool>,
    link_tx: mpsc::Sender<LinkEvent>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ConnectivityMonitorHandle {
    /// Returns a snapshot of the current connectivity signal.
    pub async fn signal(&self) -> ConnectivitySignal {
        self.signal.read().await.clone()
    }

    /// Returns true if the remote store is currently reachable.
    pub fn is_online(&self) -> bool {
        *self.online_rx.borrow()
    }

    /// Subscribes to online/offline transitions.
    ///
    /// The channel only notifies on actual changes, so `changed().await`
    /// resolving means an edge, not a repeat.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online_rx.clone()
    }

    /// Reports an OS link-up event (triggers an immediate probe).
    pub async fn report_link_up(&self) -> SyncResult<()> {
        self.link_tx
            .send(LinkEvent::Up)
            .await
            .map_err(|_| SyncError::ChannelError("Link event channel closed".into()))
    }

    /// Reports an OS link-down event (sets offline immediately).
    pub async fn report_link_down(&self) -> SyncResult<()> {
        self.link_tx
            .send(LinkEvent::Down)
            .await
            .map_err(|_| SyncError::ChannelError("Link event channel closed".into()))
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Shutdown channel closed".into()))
    }
}

// =============================================================================
// Connectivity Monitor
// =============================================================================

/// Background task maintaining the connectivity signal.
pub struct ConnectivityMonitor {
    probe: Arc<dyn HealthProbe>,
    probe_interval: Duration,
    signal: Arc<RwLock<ConnectivitySignal>>,
    online_tx: watch::Sender<bool>,
    link_rx: mpsc::Receiver<LinkEvent>,
    shutdown_rx: mpsc::Receiver<()>,
    /// Last link state the OS reported. Probes are skipped while the link
    /// is down; they cannot succeed and would just burn the radio.
    link_up: bool,
}

impl ConnectivityMonitor {
    /// Creates a monitor and spawns its background task.
    ///
    /// The first probe runs immediately; after that, every
    /// `probe_interval` while the link is up, plus immediately on every
    /// reported link-up event.
    pub fn spawn(
        probe: Arc<dyn HealthProbe>,
        probe_interval: Duration,
    ) -> ConnectivityMonitorHandle {
        let (online_tx, online_rx) = watch::channel(false);
        let (link_tx, link_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let signal = Arc::new(RwLock::new(ConnectivitySignal::default()));

        let monitor = ConnectivityMonitor {
            probe,
            probe_interval,
            signal: signal.clone(),
            online_tx,
            link_rx,
            shutdown_rx,
            link_up: true,
        };

        tokio::spawn(monitor.run());

        ConnectivityMonitorHandle {
            signal,
            online_rx,
            link_tx,
            shutdown_tx,
        }
    }

    /// Main monitor loop.
    async fn run(mut self) {
        info!(interval = ?self.probe_interval, "Connectivity monitor starting");

        let mut interval = tokio::time::interval(self.probe_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Periodic active check. The first tick fires immediately,
                // which doubles as the startup probe.
                _ = interval.tick() => {
                    if self.link_up {
                        self.run_probe().await;
                    }
                }

                // OS link events
                Some(event) = self.link_rx.recv() => {
                    match event {
                        LinkEvent::Down => {
                            debug!("Link down reported");
                            self.link_up = false;
                            self.record(false, Some("Connection lost".to_string())).await;
                        }
                        LinkEvent::Up => {
                            // Debounced trust: verify with a probe instead
                            // of flipping online on the event alone.
                            debug!("Link up reported, probing");
                            self.link_up = true;
                            self.run_probe().await;
                        }
                    }
                }

                // Shutdown
                _ = self.shutdown_rx.recv() => {
                    info!("Connectivity monitor shutting down");
                    break;
                }
            }
        }

        info!("Connectivity monitor stopped");
    }

    /// Runs one probe and records the outcome.
    async fn run_probe(&mut self) {
        match self.probe.probe().await {
            Ok(()) => self.record(true, None).await,
            Err(e) => {
                warn!(error = %e, "Health check failed");
                self.record(false, Some(e.to_string())).await;
            }
        }
    }

    /// Updates the signal and publishes the state if it changed.
    async fn record(&mut self, online: bool, error: Option<String>) {
        {
            let mut signal = self.signal.write().await;
            signal.is_online = online;
            signal.last_checked = Utc::now();
            signal.last_error = error;
        }

        let changed = self.online_tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });

        if changed {
            info!(online, "Connectivity changed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Probe that pops scripted outcomes, then repeats a fallback.
    struct ScriptedProbe {
        script: Mutex<VecDeque<bool>>,
        fallback: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(script: Vec<bool>, fallback: bool) -> Arc<Self> {
            Arc::new(ScriptedProbe {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthProbe for ScriptedProbe {
        async fn probe(&self) -> Result<(), ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ok = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.fallback);
            if ok {
                Ok(())
            } else {
                Err(ProbeError::Unreachable("scripted failure".to_string()))
            }
        }
    }

    /// Lets the spawned monitor task run in paused-clock tests.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_probe_success_goes_online() {
        let probe = ScriptedProbe::new(vec![], true);
        let handle = ConnectivityMonitor::spawn(probe.clone(), Duration::from_secs(30));

        settle().await;

        assert!(handle.is_online());
        let signal = handle.signal().await;
        assert!(signal.is_online);
        assert!(signal.last_error.is_none());
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_goes_offline_with_error() {
        let probe = ScriptedProbe::new(vec![], false);
        let handle = ConnectivityMonitor::spawn(probe, Duration::from_secs(30));

        settle().await;

        assert!(!handle.is_online());
        let signal = handle.signal().await;
        assert!(signal.last_error.as_deref().unwrap().contains("scripted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_probe_detects_recovery() {
        // First probe fails, the next (30s later) succeeds.
        let probe = ScriptedProbe::new(vec![false], true);
        let handle = ConnectivityMonitor::spawn(probe.clone(), Duration::from_secs(30));

        settle().await;
        assert!(!handle.is_online());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(handle.is_online());
        assert!(probe.calls() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_down_sets_offline_without_probe() {
        let probe = ScriptedProbe::new(vec![], true);
        let handle = ConnectivityMonitor::spawn(probe.clone(), Duration::from_secs(30));

        settle().await;
        assert!(handle.is_online());
        let calls_before = probe.calls();

        handle.report_link_down().await.unwrap();
        settle().await;

        // Offline immediately, error recorded, no probe spent on it.
        assert!(!handle.is_online());
        assert_eq!(probe.calls(), calls_before);
        let signal = handle.signal().await;
        assert_eq!(signal.last_error.as_deref(), Some("Connection lost"));

        // While the link is down, interval ticks don't probe either.
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(probe.calls(), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_up_triggers_immediate_probe() {
        let probe = ScriptedProbe::new(vec![], true);
        let handle = ConnectivityMonitor::spawn(probe.clone(), Duration::from_secs(3600));

        settle().await;
        handle.report_link_down().await.unwrap();
        settle().await;
        assert!(!handle.is_online());
        let calls_before = probe.calls();

        // The event alone is not trusted: a probe runs right away, well
        // before the next interval tick.
        handle.report_link_up().await.unwrap();
        settle().await;

        assert_eq!(probe.calls(), calls_before + 1);
        assert!(handle.is_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_notifies_on_transition() {
        let probe = ScriptedProbe::new(vec![], true);
        let handle = ConnectivityMonitor::spawn(probe, Duration::from_secs(30));
        let mut rx = handle.subscribe();

        // offline (initial) → online edge arrives via the watch channel.
        let online = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|online| *online))
            .await
            .expect("transition within first probe")
            .unwrap();
        assert!(*online);
    }
}
