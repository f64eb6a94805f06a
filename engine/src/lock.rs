//! The write-phase lock shared with the interrupt handler.
//!
//! The orchestrator holds the lock while it backs up and writes files. The
//! interrupt handler takes the same lock before exiting, so an interrupt
//! that lands mid-write waits until the write set is either fully applied
//! or fully rolled back.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to the write-phase lock.
#[derive(Debug, Clone, Default)]
pub struct WriteLock(Arc<Mutex<()>>);

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no write phase is running, then holds the lock.
    pub fn hold(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_holder_blocks_second_taker() {
        let lock = WriteLock::new();
        let guard = lock.hold();

        let (tx, rx) = mpsc::channel();
        let other = lock.clone();
        let handle = thread::spawn(move || {
            let _guard = other.hold();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(guard);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
    }
}
