//! The per-compilation set of marker types synthesized into the output.

use std::{collections::BTreeSet, sync::Mutex};

use crate::metadata::synthesis::MarkerKind;

/// Lock-protected set of requested marker types.
///
/// A marker enters the set at most once; every later request observes the same entry. The
/// set only grows, and [`MarkerRegistry::requested`] is sorted, so the synthesized type
/// definitions do not depend on which thread asked first.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    requested: Mutex<BTreeSet<MarkerKind>>,
}

impl MarkerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `kind`. Returns `true` for the request that created the entry.
    pub fn request(&self, kind: MarkerKind) -> bool {
        let inserted = lock!(self.requested).insert(kind);
        if inserted {
            log::debug!("synthesizing marker type {}", kind.full_name());
        }
        inserted
    }

    /// Whether `kind` has been requested.
    #[must_use]
    pub fn contains(&self, kind: MarkerKind) -> bool {
        lock!(self.requested).contains(&kind)
    }

    /// Every requested marker, in [`MarkerKind`] order.
    #[must_use]
    pub fn requested(&self) -> Vec<MarkerKind> {
        lock!(self.requested).iter().copied().collect()
    }

    /// Whether nothing has been requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock!(self.requested).is_empty()
    }

    /// A private copy for a speculative query. Requests made through the copy never reach
    /// `self`.
    #[must_use]
    pub fn fork(&self) -> MarkerRegistry {
        MarkerRegistry {
            requested: Mutex::new(lock!(self.requested).clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn concurrent_requests_insert_once() {
        let registry = Arc::new(MarkerRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.request(MarkerKind::IsReadOnly))
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|created| *created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(registry.requested(), vec![MarkerKind::IsReadOnly]);
    }

    #[test]
    fn forks_are_isolated() {
        let registry = MarkerRegistry::new();
        registry.request(MarkerKind::Embedded);
        let fork = registry.fork();
        assert!(fork.request(MarkerKind::Dynamic));
        assert!(!fork.request(MarkerKind::Embedded));
        assert!(!registry.contains(MarkerKind::Dynamic));
        assert_eq!(
            fork.requested(),
            vec![MarkerKind::Embedded, MarkerKind::Dynamic]
        );
    }
}
