//! Background health sweep over the server inventory.
//!
//! Probes every server on a fixed interval and turns observed status
//! changes into store updates and event-log edges. An unchanged
//! observation writes nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;

use crate::cache::ListCache;
use crate::db::Store;
use crate::probe::check_address;
use crate::uptime::StatusChangeRecorder;

/// Max probes in flight during one sweep.
const SWEEP_CONCURRENCY: usize = 8;

/// Periodic health checker feeding the status event log.
pub struct Monitor {
    store: Arc<Store>,
    cache: Arc<ListCache>,
    recorder: Arc<StatusChangeRecorder>,
    check_interval: Duration,
    probe_timeout: Duration,
}

impl Monitor {
    pub fn new(
        store: Arc<Store>,
        cache: Arc<ListCache>,
        recorder: Arc<StatusChangeRecorder>,
        check_interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            recorder,
            check_interval,
            probe_timeout,
        }
    }

    /// Spawn the sweep loop as a background task.
    pub fn start(&self) {
        let store = self.store.clone();
        let cache = self.cache.clone();
        let recorder = self.recorder.clone();
        let check_interval = self.check_interval;
        let probe_timeout = self.probe_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(check_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                sweep(&store, &cache, &recorder, probe_timeout).await;
            }
        });
    }
}

/// Probe every server once and apply any observed status edges.
pub async fn sweep(
    store: &Arc<Store>,
    cache: &Arc<ListCache>,
    recorder: &Arc<StatusChangeRecorder>,
    probe_timeout: Duration,
) {
    let servers = match store.get_servers() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Monitor: failed to load servers: {}", e);
            return;
        }
    };

    let semaphore = Arc::new(Semaphore::new(SWEEP_CONCURRENCY));
    let mut handles = Vec::with_capacity(servers.len());

    for server in servers {
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let online = check_address(&server.address, probe_timeout).await.is_ok();
            (server, online)
        }));
    }

    for handle in handles {
        let Ok((server, online)) = handle.await else {
            continue;
        };
        if online == server.status {
            continue;
        }

        tracing::info!(server = %server.name, online, "Monitor: status change observed");

        // Same ordering as API mutations: flush the list namespace before
        // the status write lands.
        cache.invalidate_all();

        let now = Utc::now();
        if let Err(e) = store.update_status(server.id, online, now) {
            tracing::error!(server = %server.name, error = %e, "Monitor: status write failed");
            continue;
        }
        if let Err(e) = recorder.record(server.id, server.status, online, now) {
            tracing::error!(server = %server.name, error = %e, "Monitor: event append failed");
        }
    }
}
