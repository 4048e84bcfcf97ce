//! Inventory service: read-through listing and invalidate-before-write
//! mutations over the server store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::cache::ListCache;
use crate::db::{DbError, ListQuery, NewServer, Server, StatusEventLog, Store};
use crate::uptime::{StatusChangeRecorder, UptimeCalculator, UptimeError};

/// Outcome of a bulk create: created rows plus per-name success/failure.
#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub created: Vec<Server>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

/// Orchestrates the server inventory.
///
/// List reads go through the cache; every mutation flushes the list
/// namespace before the write commits, so the staleness a reader can
/// observe is bounded by the entry TTL plus the invalidate-to-commit gap.
pub struct InventoryService {
    store: Arc<Store>,
    cache: Arc<ListCache>,
    recorder: Arc<StatusChangeRecorder>,
    calculator: UptimeCalculator,
    event_log: Arc<dyn StatusEventLog>,
}

impl InventoryService {
    pub fn new(
        store: Arc<Store>,
        cache: Arc<ListCache>,
        recorder: Arc<StatusChangeRecorder>,
        calculator: UptimeCalculator,
        event_log: Arc<dyn StatusEventLog>,
    ) -> Self {
        Self {
            store,
            cache,
            recorder,
            calculator,
            event_log,
        }
    }

    /// Read-through list: paired cache hit, or store read plus cache fill.
    pub fn list(&self, query: &ListQuery) -> Result<(Vec<Server>, i64), DbError> {
        if let Some((servers, total)) = self.cache.get_page(query) {
            return Ok((servers, total));
        }

        let (servers, total) = self.store.list_filtered(query)?;
        self.cache.set_page(query, &servers, total);
        Ok((servers, total))
    }

    /// Single server, via the side cache when present.
    pub fn get(&self, id: i64) -> Result<Server, DbError> {
        if let Some(server) = self.cache.get_by_id(id) {
            return Ok(server);
        }
        self.store.get_server(id)
    }

    /// Create a server. A server born online counts as a transition from
    /// the default-offline state.
    pub fn create(&self, new: NewServer) -> Result<Server, DbError> {
        self.cache.invalidate_all();

        let now = Utc::now();
        let mut server = Server {
            id: 0,
            name: new.name,
            address: new.address,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        self.store.create_server(&mut server)?;

        if let Err(e) = self.recorder.record(server.id, false, server.status, now) {
            tracing::warn!(server_id = server.id, error = %e, "failed to record initial status");
        }
        self.cache.set_by_id(&server);

        Ok(server)
    }

    /// Create a batch of servers, collecting per-name outcomes instead of
    /// failing the whole batch on the first bad row.
    pub fn create_many(&self, batch: Vec<NewServer>) -> BulkOutcome {
        self.cache.invalidate_all();

        let mut outcome = BulkOutcome {
            created: Vec::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        for new in batch {
            let now = Utc::now();
            let name = new.name.clone();
            let mut server = Server {
                id: 0,
                name: new.name,
                address: new.address,
                status: new.status,
                created_at: now,
                updated_at: now,
            };

            match self.store.create_server(&mut server) {
                Ok(_) => {
                    if let Err(e) = self.recorder.record(server.id, false, server.status, now) {
                        tracing::warn!(server_id = server.id, error = %e, "failed to record initial status");
                    }
                    self.cache.set_by_id(&server);
                    outcome.succeeded.push(name);
                    outcome.created.push(server);
                }
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "bulk create row failed");
                    outcome.failed.push(name);
                }
            }
        }

        outcome
    }

    /// Replace a server's fields, recording a status edge when the update
    /// changed it.
    pub fn update(&self, id: i64, patch: NewServer) -> Result<Server, DbError> {
        self.cache.invalidate_all();

        let existing = self.store.get_server(id)?;
        let now = Utc::now();
        let replacement = Server {
            id,
            name: patch.name,
            address: patch.address,
            status: patch.status,
            created_at: existing.created_at,
            updated_at: now,
        };
        self.store.update_server(&replacement)?;
        let updated = self.store.get_server(id)?;

        if existing.status != updated.status {
            if let Err(e) = self.recorder.record(id, existing.status, updated.status, now) {
                tracing::warn!(server_id = id, error = %e, "failed to record status change");
            }
        }
        self.cache.set_by_id(&updated);

        Ok(updated)
    }

    /// Delete a server along with its event history.
    pub fn delete(&self, id: i64) -> Result<(), DbError> {
        self.cache.invalidate_all();

        let existing = self.store.get_server(id)?;
        let now = Utc::now();

        // Final offline edge for a server removed while online
        if let Err(e) = self.recorder.record(id, existing.status, false, now) {
            tracing::warn!(server_id = id, error = %e, "failed to record final status");
        }

        self.store.delete_server(id)?;
        if let Err(e) = self.event_log.delete_for(id) {
            tracing::warn!(server_id = id, error = %e, "failed to drop event history");
        }
        self.cache.delete_by_id(id);

        Ok(())
    }

    /// Online/offline totals straight from the source of truth.
    pub fn status_counts(&self) -> Result<(i64, i64), DbError> {
        self.store.status_counts()
    }

    /// Online duration for a server on one calendar day.
    pub fn uptime_on(&self, id: i64, date: &str) -> Result<Duration, UptimeError> {
        self.calculator.uptime_on(id, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTransport;
    use crate::db::SqliteEventLog;
    use std::time::Duration as StdDuration;
    use tempfile::NamedTempFile;

    fn service() -> (NamedTempFile, Arc<Store>, InventoryService) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let event_log: Arc<dyn StatusEventLog> =
            Arc::new(SqliteEventLog::new(tmp.path()).unwrap());
        let cache = Arc::new(ListCache::new(
            Arc::new(MemoryTransport::new()),
            StdDuration::from_secs(60),
        ));
        let recorder = Arc::new(StatusChangeRecorder::new(event_log.clone()));
        let calculator = UptimeCalculator::new(event_log.clone(), chrono_tz::UTC);
        let service = InventoryService::new(
            store.clone(),
            cache,
            recorder,
            calculator,
            event_log,
        );
        (tmp, store, service)
    }

    fn new_server(name: &str, status: bool) -> NewServer {
        NewServer {
            name: name.to_string(),
            address: format!("{}.internal:22", name),
            status,
        }
    }

    #[test]
    fn test_list_is_read_through() {
        let (_tmp, store, service) = service();
        service.create(new_server("a", true)).unwrap();

        let query = ListQuery::default();
        let (_, total) = service.list(&query).unwrap();
        assert_eq!(total, 1);

        // A write that bypasses the service is invisible until invalidation:
        // the second read must come from the cache.
        let now = Utc::now();
        let mut hidden = Server {
            id: 0,
            name: "hidden".to_string(),
            address: "x:22".to_string(),
            status: false,
            created_at: now,
            updated_at: now,
        };
        store.create_server(&mut hidden).unwrap();

        let (_, stale_total) = service.list(&query).unwrap();
        assert_eq!(stale_total, 1);

        // Any service mutation flushes the namespace
        service.create(new_server("b", false)).unwrap();
        let (_, fresh_total) = service.list(&query).unwrap();
        assert_eq!(fresh_total, 3);
    }

    #[test]
    fn test_create_records_initial_online_edge() {
        let (_tmp, _store, service) = service();
        let online = service.create(new_server("up", true)).unwrap();
        let offline = service.create(new_server("down", false)).unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert!(service.uptime_on(online.id, &today).unwrap() > Duration::zero());
        assert_eq!(
            service.uptime_on(offline.id, &today).unwrap(),
            Duration::zero()
        );
    }

    #[test]
    fn test_update_records_edge_only_on_change() {
        let (_tmp, _store, service) = service();
        let server = service.create(new_server("web", false)).unwrap();

        // No status change: address only
        let patch = NewServer {
            name: "web".to_string(),
            address: "web.internal:2222".to_string(),
            status: false,
        };
        let updated = service.update(server.id, patch).unwrap();
        assert_eq!(updated.address, "web.internal:2222");

        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(
            service.uptime_on(server.id, &today).unwrap(),
            Duration::zero()
        );

        // Status flip records an edge
        let patch = NewServer {
            name: "web".to_string(),
            address: "web.internal:2222".to_string(),
            status: true,
        };
        service.update(server.id, patch).unwrap();
        assert!(service.uptime_on(server.id, &today).unwrap() > Duration::zero());
    }

    #[test]
    fn test_delete_removes_server_and_history() {
        let (_tmp, _store, service) = service();
        let server = service.create(new_server("gone", true)).unwrap();

        service.delete(server.id).unwrap();
        assert!(matches!(service.get(server.id), Err(DbError::NotFound)));

        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(
            service.uptime_on(server.id, &today).unwrap(),
            Duration::zero()
        );
    }

    #[test]
    fn test_create_many_collects_outcomes() {
        let (_tmp, _store, service) = service();
        service.create(new_server("dup", false)).unwrap();

        let outcome = service.create_many(vec![
            new_server("fresh", true),
            new_server("dup", true), // unique name violation
        ]);

        assert_eq!(outcome.succeeded, vec!["fresh".to_string()]);
        assert_eq!(outcome.failed, vec!["dup".to_string()]);
        assert_eq!(outcome.created.len(), 1);
    }

    #[test]
    fn test_status_counts() {
        let (_tmp, _store, service) = service();
        service.create(new_server("a", true)).unwrap();
        service.create(new_server("b", false)).unwrap();

        assert_eq!(service.status_counts().unwrap(), (1, 1));
    }
}
