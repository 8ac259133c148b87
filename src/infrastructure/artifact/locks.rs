//! Per-name reader/writer locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type LockTable = HashMap<String, Arc<RwLock<()>>>;

/// Lock table keyed by model name
///
/// Entries are created on first use and removed once the last holder
/// releases them. Names never block each other.
#[derive(Debug, Clone, Default)]
pub struct NameLocks {
    table: Arc<Mutex<LockTable>>,
}

#[derive(Debug)]
enum Held {
    Read(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Write(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

/// Counted reference to a table entry
///
/// Dropping the last reference outside the table removes the entry, whether
/// the holder finished or was cancelled while queued.
#[derive(Debug)]
struct EntryRef {
    name: String,
    table: Arc<Mutex<LockTable>>,
    lock: Arc<RwLock<()>>,
}

impl EntryRef {
    async fn read(&self) -> Held {
        Held::Read(Arc::clone(&self.lock).read_owned().await)
    }

    async fn write(&self) -> Held {
        Held::Write(Arc::clone(&self.lock).write_owned().await)
    }
}

impl Drop for EntryRef {
    fn drop(&mut self) {
        let mut table = lock_table(&self.table);

        // only the table and this reference remain
        let idle = table.get(&self.name).is_some_and(|entry| {
            Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(entry) == 2
        });
        if idle {
            table.remove(&self.name);
        }
    }
}

/// Held lock on one name; released on drop
#[derive(Debug)]
pub struct NameGuard {
    // declared first so the lock is released before the entry is checked
    held: Held,
    _entry: EntryRef,
}

impl NameGuard {
    pub fn is_exclusive(&self) -> bool {
        matches!(self.held, Held::Write(_))
    }
}

fn lock_table(table: &Mutex<LockTable>) -> MutexGuard<'_, LockTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, name: &str) -> EntryRef {
        let lock = lock_table(&self.table)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone();

        EntryRef {
            name: name.to_string(),
            table: Arc::clone(&self.table),
            lock,
        }
    }

    /// Shared access; waits for any in-flight mutation of the name
    pub async fn read(&self, name: &str) -> NameGuard {
        let entry = self.entry(name);
        let held = entry.read().await;
        NameGuard {
            held,
            _entry: entry,
        }
    }

    /// Exclusive access; mutations of one name queue in arrival order
    pub async fn write(&self, name: &str) -> NameGuard {
        let entry = self.entry(name);
        let held = entry.write().await;
        NameGuard {
            held,
            _entry: entry,
        }
    }

    /// Number of names with a live entry
    pub fn len(&self) -> usize {
        lock_table(&self.table).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_removed_when_released() {
        let locks = NameLocks::new();

        let guard = locks.write("m1").await;
        assert!(guard.is_exclusive());
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_readers_share() {
        let locks = NameLocks::new();

        let first = locks.read("m1").await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.read("m1"))
            .await
            .expect("second reader should not block");

        assert!(!first.is_exclusive());
        drop(first);
        assert_eq!(locks.len(), 1);
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_writer_excludes_readers_of_same_name() {
        let locks = NameLocks::new();

        let writer = locks.write("m1").await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.read("m1")).await;
        assert!(blocked.is_err());

        drop(writer);
        let reader = tokio::time::timeout(Duration::from_millis(100), locks.read("m1")).await;
        assert!(reader.is_ok());
    }

    #[tokio::test]
    async fn test_names_are_independent() {
        let locks = NameLocks::new();

        let _a = locks.write("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.write("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_waiting_writer_keeps_entry_alive() {
        let locks = NameLocks::new();
        let first = locks.write("m1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.write("m1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        // the queued writer still holds the entry
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_entry() {
        let locks = NameLocks::new();
        let first = locks.write("m1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.write("m1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // the lock passes to the waiter, which is cancelled before it runs again
        drop(first);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_reader_releases_entry() {
        let locks = NameLocks::new();
        let writer = locks.write("m1").await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.read("m1")).await;
        assert!(blocked.is_err());
        assert_eq!(locks.len(), 1);

        drop(writer);
        assert!(locks.is_empty());
    }
}
