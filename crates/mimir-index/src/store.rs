use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::{Database, Error, Result};

/// Shared handle to the single store connection.
///
/// Cloning is cheap; every clone talks to the same connection. After
/// [`Store::close`] every clone reports [`Error::NotConnected`].
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Option<Database>>>,
}

impl Store {
    pub fn connect(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        tracing::debug!(path = %db_path.display(), "Opened store");
        Ok(Self::from_database(db))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(db))),
        }
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// The error type only has to absorb index errors, so callers can pass
    /// closures that fail with their own error type.
    pub fn with_db<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Database) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| Error::Query("store lock poisoned".to_string()))?;
        let db = guard.as_mut().ok_or(Error::NotConnected)?;
        f(db)
    }

    /// Release the connection. Idempotent.
    pub fn close(&self) {
        match self.inner.lock() {
            Ok(mut guard) => {
                if guard.take().is_some() {
                    tracing::debug!("Closed store");
                }
            }
            Err(poisoned) => {
                poisoned.into_inner().take();
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}
