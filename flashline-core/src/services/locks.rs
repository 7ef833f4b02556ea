//! Per-user serialization of read-modify-write operations

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::domain::result::{Error, Result};

/// Registry of one mutex per user
///
/// Cloning shares the registry. Operations for different users never
/// block each other.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn user_mutex(&self, user_id: Uuid) -> Result<Arc<Mutex<()>>> {
        let mut map = self
            .inner
            .lock()
            .map_err(|e| Error::Other(format!("User lock registry poisoned: {}", e)))?;
        Ok(Arc::clone(map.entry(user_id).or_default()))
    }

    /// Run `f` while holding the user's lock
    ///
    /// Not reentrant: `f` must not call back into `with_user` for the same user.
    pub fn with_user<T>(&self, user_id: Uuid, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let mutex = self.user_mutex(user_id)?;
        // Guards no data; a poisoned lock is still usable
        let _guard = mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_user_is_serialized() {
        let locks = UserLocks::new();
        let user = Uuid::new_v4();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = locks.clone();
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    locks
                        .with_user(user, || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(10));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_result_passes_through() {
        let locks = UserLocks::new();
        let user = Uuid::new_v4();

        assert_eq!(locks.with_user(user, || Ok(7)).unwrap(), 7);
        let err = locks
            .with_user(user, || -> Result<()> { Err(Error::not_found("x")) })
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
