use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Shared cancellation flag with a condition variable, cloneable across threads.
///
/// Every monitoring/capture thread is handed a clone; setting it wakes every
/// waiter so the poll loop and the descendant-capture activity can both react
/// to `stop()` without polling each other.
#[derive(Debug, Clone, Default)]
pub struct Context<T>(Arc<(Mutex<T>, Condvar)>);

impl<T> Context<T>
where
    T: Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cancellation signal. All threads waiting on this [`Context`] are
    /// notified so they unblock and finish execution.
    pub fn cancel_all(&self, val: T) -> Result<(), PoisonError<MutexGuard<'_, T>>> {
        let (lck, cvar) = &*self.0;
        let mut lck = lck.lock()?;
        *lck = val;
        cvar.notify_all();
        Ok(())
    }

    pub fn get_lock_cvar(&self) -> &(Mutex<T>, Condvar) {
        &self.0
    }

    /// Resets the Mutex to the default `T` value.
    pub fn reset(&self) -> Result<(), PoisonError<MutexGuard<'_, T>>> {
        let (lck, _) = &*self.0;
        let mut lck = lck.lock()?;
        *lck = <T as Default>::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn cancel_all_wakes_waiters() {
        let ctx = Context::<bool>::new();
        let waiter_ctx = ctx.clone();
        let handle = thread::spawn(move || {
            let (lck, cvar) = waiter_ctx.get_lock_cvar();
            let guard = cvar.wait_while(lck.lock().unwrap(), |done| !*done).unwrap();
            *guard
        });

        thread::sleep(Duration::from_millis(50));
        ctx.cancel_all(true).unwrap();
        assert!(handle.join().unwrap());
    }
}
