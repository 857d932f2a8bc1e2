//! Synchronization primitives for the attribute pipeline.
//!
//! [`OnceSlot`] is the memoized "bound attributes" slot every symbol owns. It is written at
//! most once: concurrent readers block until the single writer finishes and never see a
//! partial value. A thread that re-enters the computation of a slot it is already computing
//! gets [`Reentered`] back instead of deadlocking on itself.
//!
//! [`CancellationToken`] is the host's cancellation flag, polled only between symbols.

use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

thread_local! {
    static IN_PROGRESS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Returned by [`OnceSlot::get_or_init`] when the calling thread is already computing the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reentered;

struct InProgressGuard(usize);

impl InProgressGuard {
    fn enter(key: usize) -> Result<Self, Reentered> {
        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                return Err(Reentered);
            }
            stack.push(key);
            Ok(InProgressGuard(key))
        })
    }
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|key| *key == self.0) {
                stack.remove(position);
            }
        });
    }
}

/// An at-most-once memo cell with same-thread re-entrancy detection.
pub struct OnceSlot<T> {
    cell: OnceLock<T>,
}

impl<T> Default for OnceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OnceSlot<T> {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        OnceSlot {
            cell: OnceLock::new(),
        }
    }

    /// The value, if the slot has been filled.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Whether the slot has been filled.
    pub fn is_filled(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Return the stored value, computing it with `init` if the slot is empty.
    ///
    /// If another thread is filling the slot, this blocks until it is done. `init` runs at
    /// most once over the lifetime of the slot.
    ///
    /// # Errors
    /// Returns [`Reentered`] if this thread is already inside `init` for this slot.
    pub fn get_or_init<F>(&self, init: F) -> Result<&T, Reentered>
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }

        let key = std::ptr::from_ref(self) as usize;
        let _guard = InProgressGuard::enter(key)?;
        Ok(self.cell.get_or_init(init))
    }
}

/// Cooperative cancellation flag shared between the host and the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Fail with [`crate::Error::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    /// Returns [`crate::Error::Cancelled`] once [`CancellationToken::cancel`] was called.
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn slot_initializes_once_under_contention() {
        let slot = Arc::new(OnceSlot::<usize>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let slot = Arc::clone(&slot);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    *slot
                        .get_or_init(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            i
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn slot_reports_reentrancy() {
        let slot = OnceSlot::<u32>::new();
        let value = slot.get_or_init(|| match slot.get_or_init(|| 1) {
            Err(Reentered) => 7,
            Ok(_) => 0,
        });
        assert_eq!(value, Ok(&7));
        assert_eq!(slot.get_or_init(|| 1), Ok(&7));
    }

    #[test]
    fn cancellation() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.clone().cancel();
        assert!(matches!(token.check(), Err(crate::Error::Cancelled)));
    }
}
