//! # Cache Service
//!
//! Redis-backed read-through cache with TTLs. The cache is opportunistic:
//! every failure is logged and degrades to a miss (`get` → `None`, writes
//! and deletes become no-ops), so Redis being down never fails a request.

use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Cache service wrapping a Redis client.
#[derive(Clone)]
pub struct Cache {
    client: redis::Client,
}

impl Cache {
    /// Create a new cache service.
    #[must_use]
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
        }
    }

    /// Get a raw value. Failures degrade to a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache unavailable, treating as miss");
                return None;
            },
        };

        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            },
        }
    }

    /// Set a raw value with a TTL. Failures are logged and swallowed.
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache unavailable, skipping write");
                return;
            },
        };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
        else {
            debug!(key = %key, ttl_seconds, "Cache entry written");
        }
    }

    /// Delete a single key. Failures are logged and swallowed.
    pub async fn delete(&self, key: &str) {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache unavailable, skipping delete");
                return;
            },
        };

        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(key = %key, error = %e, "Cache delete failed");
        }
    }

    /// Delete every key matching a glob pattern, using SCAN so the server
    /// is never blocked by a KEYS call.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache unavailable, skipping invalidation");
                return 0;
            },
        };

        let mut deleted = 0u64;
        let mut cursor = 0u64;

        loop {
            let scan: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await;

            let (next_cursor, keys) = match scan {
                Ok(result) => result,
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Cache scan failed during invalidation");
                    return deleted;
                },
            };

            if !keys.is_empty() {
                match conn.del::<_, u64>(keys).await {
                    Ok(count) => deleted += count,
                    Err(e) => warn!(pattern = %pattern, error = %e, "Cache delete failed during invalidation"),
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted, "Cache pattern invalidated");
        deleted
    }

    /// Get and deserialize a JSON value. Decode failures are treated as a
    /// miss and the stale entry is dropped.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache entry failed to decode, dropping");
                self.delete(key).await;
                None
            },
        }
    }

    /// Serialize and set a JSON value with a TTL.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl_seconds).await,
            Err(e) => warn!(key = %key, error = %e, "Cache entry failed to encode, skipping write"),
        }
    }
}

/// Cache key for an organization snapshot.
#[must_use]
pub fn organization_key(organization_id: &str) -> String { format!("org:snapshot:{}", organization_id) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_key_format() {
        assert_eq!(organization_key("org_abc"), "org:snapshot:org_abc");
    }

    #[test]
    fn test_cache_is_cloneable() {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let cache = Cache::new(client);
        let _cloned = cache.clone();
    }
}
