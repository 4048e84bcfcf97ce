//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A managed server in the inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub address: String,
    /// true = online
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or replacing a server.
#[derive(Debug, Clone, Deserialize)]
pub struct NewServer {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub status: bool,
}

/// One recorded status transition for a server.
///
/// Immutable once written. A well-behaved writer only produces events where
/// `new_status != previous_status`; readers must not rely on that.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub server_id: i64,
    pub timestamp: DateTime<Utc>,
    pub previous_status: bool,
    pub new_status: bool,
}

/// Status filter for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Online,
    Offline,
}

impl StatusFilter {
    /// Parse a query-string value. Empty means no filter.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" => Some(StatusFilter::Any),
            "online" | "true" | "1" => Some(StatusFilter::Online),
            "offline" | "false" | "0" => Some(StatusFilter::Offline),
            _ => None,
        }
    }
}

/// Parameters of a paginated, filtered, sorted list query.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub per_page: i64,
    pub offset: i64,
    pub status: StatusFilter,
    pub sort_field: String,
    pub sort_order: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            per_page: 10,
            offset: 0,
            status: StatusFilter::Any,
            sort_field: "id".to_string(),
            sort_order: "asc".to_string(),
        }
    }
}
