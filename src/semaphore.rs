//! A small counting semaphore with a timed wait, used for the
//! Producer/Callback handshake instead of a host-provided threading
//! primitive. `parking_lot` gives us a `Mutex` + `Condvar` pair, applied
//! to a counter instead of a struct.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

pub struct CountingSemaphore {
    count: Mutex<usize>,
    condvar: Condvar,
}

impl CountingSemaphore {
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            condvar: Condvar::new(),
        }
    }

    /// Increment the count and wake one waiter. Called by the Callback
    /// after `commit_read`, and by the session after setting `kill`.
    pub fn post(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.condvar.notify_one();
    }

    /// Block until the count is non-zero or `timeout` elapses, consuming
    /// one unit on success. Returns `true` if woken by a post, `false` on
    /// timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
            return true;
        }
        let result = self.condvar.wait_for(&mut count, timeout);
        if !result.timed_out() && *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}
