//! Cache key construction for list queries.
//!
//! A key is a deterministic fingerprint of one query tuple: equal tuples
//! produce equal keys and distinct tuples produce distinct keys. Field
//! values are escaped so the segment delimiter cannot be forged from user
//! input, and the paired total-count key uses a reserved suffix that no
//! list key can end with.

use crate::db::{ListQuery, StatusFilter};

/// Namespace prefix shared by every list/total key. `invalidate_all`
/// flushes exactly this namespace.
pub const LIST_NAMESPACE: &str = "servers|";

/// Reserved suffix for total-count keys. It starts with the delimiter,
/// which is escaped inside every value, and carries no `=`, so no query
/// tuple can produce a list key that collides with a total key.
const TOTAL_SUFFIX: &str = "|total";

/// Escape `%`, `|` and `=` so values cannot imitate key structure.
fn escape(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('|', "%7C")
        .replace('=', "%3D")
}

fn status_token(filter: StatusFilter) -> &'static str {
    match filter {
        StatusFilter::Any => "any",
        StatusFilter::Online => "online",
        StatusFilter::Offline => "offline",
    }
}

/// Build the cache key for a list query.
pub fn list_key(query: &ListQuery) -> String {
    format!(
        "{}pp={}|off={}|st={}|sf={}|so={}",
        LIST_NAMESPACE,
        query.per_page,
        query.offset,
        status_token(query.status),
        escape(&query.sort_field),
        escape(&query.sort_order),
    )
}

/// Key of the total count paired with a list key.
pub fn total_key(list_key: &str) -> String {
    format!("{}{}", list_key, TOTAL_SUFFIX)
}

/// Key of the per-server side cache entry.
pub fn server_key(id: i64) -> String {
    format!("server|id={}", id)
}
