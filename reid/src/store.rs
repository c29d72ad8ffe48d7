use std::sync::Mutex;

use crate::identity::Identity;
use crate::ReidError;

/// Durable storage for identity snapshots.
///
/// The registry itself never touches storage; callers persist snapshots
/// off the matching path and complete the correlation with
/// [`Registry::set_db_id`](crate::Registry::set_db_id). A persist
/// failure must never roll back registry state.
///
/// Implementations must be safe for concurrent use.
/// Use [`MemoryStore`] for in-memory storage (testing/ephemeral).
pub trait IdentityStore: Send + Sync {
    /// Writes an identity snapshot. Returns the durable row ID.
    fn persist(&self, identity: &Identity) -> Result<i64, ReidError>;

    /// Returns all persisted snapshots in write order.
    fn all(&self) -> Result<Vec<Identity>, ReidError>;

    /// Returns the count of persisted snapshots.
    fn len(&self) -> Result<usize, ReidError>;

    /// Removes all persisted snapshots.
    fn clear(&self) -> Result<(), ReidError>;
}

/// In-memory [`IdentityStore`] implementation.
/// Data is lost on restart. Suitable for testing or ephemeral use.
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

struct MemoryStoreInner {
    rows: Vec<Identity>,
    next_row: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreInner {
                rows: Vec::new(),
                next_row: 0,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for MemoryStore {
    fn persist(&self, identity: &Identity) -> Result<i64, ReidError> {
        let mut inner = self.inner.lock().unwrap();
        inner.rows.push(identity.clone());
        inner.next_row += 1;
        Ok(inner.next_row)
    }

    fn all(&self) -> Result<Vec<Identity>, ReidError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.clone())
    }

    fn len(&self) -> Result<usize, ReidError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.len())
    }

    fn clear(&self) -> Result<(), ReidError> {
        let mut inner = self.inner.lock().unwrap();
        inner.rows.clear();
        inner.next_row = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Registry};

    #[test]
    fn memory_store_persist_and_correlate() {
        let reg = Registry::new(Config {
            dim: 3,
            ..Config::default()
        });
        let store = MemoryStore::new();

        let id = reg.get_or_create(&[1.0, 0.0, 0.0], Some("cam-1"), None).unwrap();
        let snapshot = reg.identity_of(&id).unwrap();

        let row = store.persist(&snapshot).unwrap();
        assert_eq!(row, 1);
        reg.set_db_id(&id, row).unwrap();
        assert_eq!(reg.get_db_id(&id).unwrap(), Some(1));

        let rows = store.all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
    }

    #[test]
    fn memory_store_clear() {
        let reg = Registry::new(Config {
            dim: 2,
            ..Config::default()
        });
        let store = MemoryStore::new();

        let id = reg.get_or_create(&[1.0, 0.0], None, None).unwrap();
        let snapshot = reg.identity_of(&id).unwrap();
        store.persist(&snapshot).unwrap();
        store.persist(&snapshot).unwrap();
        assert_eq!(store.len().unwrap(), 2);

        store.clear().unwrap();
        assert_eq!(store.len().unwrap(), 0);
        assert!(store.all().unwrap().is_empty());

        // Row IDs reset after clear.
        assert_eq!(store.persist(&snapshot).unwrap(), 1);
    }
}
