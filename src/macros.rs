#![allow(unused_macros)]

/// Helper macro for locking items
///
/// A poisoned mutex still hands out its guard; every guarded structure in this crate is
/// only mutated by single insertions, so a panic elsewhere cannot leave it half-written.
///
/// ```rust, ignore
///  let mut data = lock!(my_mutex);
///  data.insert(key, value);
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for reading from a set of lazily filled slots
///
/// ```rust, ignore
///  let bag = slot_get!(self.bags, index)?;
/// ```
macro_rules! slot_get {
    ($slots:expr, $index:expr) => {
        $slots
            .get($index)
            .ok_or(crate::Error::OutOfBounds)
    };
}
