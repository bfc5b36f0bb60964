//! Single-flight guard for radio advances.
//!
//! A manual skip and a natural end-of-track can arrive at the same moment.
//! Whoever wins the compare-and-swap advances; the other is told the radio is
//! already advancing. Each acquisition gets a fresh token so a forced release
//! (stop/start) followed by a new acquisition cannot be undone when the stale
//! permit is finally dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const FREE: u64 = 0;

#[derive(Debug, Clone, Default)]
pub struct AdvanceGuard {
    inner: Arc<GuardInner>,
}

#[derive(Debug, Default)]
struct GuardInner {
    holder: AtomicU64,
    next_token: AtomicU64,
}

impl AdvanceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking. `None` means somebody else is mid-advance.
    pub fn try_acquire(&self) -> Option<AdvancePermit> {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner
            .holder
            .compare_exchange(FREE, token, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AdvancePermit {
                guard: self.clone(),
                token,
            })
    }

    pub fn is_held(&self) -> bool {
        self.inner.holder.load(Ordering::Acquire) != FREE
    }

    /// Free the guard regardless of who holds it.
    pub fn force_release(&self) {
        self.inner.holder.store(FREE, Ordering::Release);
    }
}

/// Proof of a successful `try_acquire`. Releases on drop, but only if the
/// guard still belongs to it.
#[derive(Debug)]
pub struct AdvancePermit {
    guard: AdvanceGuard,
    token: u64,
}

impl Drop for AdvancePermit {
    fn drop(&mut self) {
        let _ = self.guard.inner.holder.compare_exchange(
            self.token,
            FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_holder() {
        let guard = AdvanceGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.try_acquire().is_none());
        assert!(guard.is_held());
        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_stale_permit_does_not_release_new_holder() {
        let guard = AdvanceGuard::new();
        let stale = guard.try_acquire().unwrap();
        guard.force_release();
        let fresh = guard.try_acquire().unwrap();
        drop(stale);
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());
        drop(fresh);
        assert!(!guard.is_held());
    }

    #[test]
    fn test_contended_acquire_has_one_winner() {
        let guard = AdvanceGuard::new();
        let start = Arc::new(std::sync::Barrier::new(8));
        let attempted = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let start = Arc::clone(&start);
                let attempted = Arc::clone(&attempted);
                std::thread::spawn(move || {
                    start.wait();
                    let permit = guard.try_acquire();
                    let won = permit.is_some();
                    // Winner keeps the permit until every thread has tried.
                    attempted.wait();
                    drop(permit);
                    won
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|w| *w)
            .count();
        assert_eq!(winners, 1);
    }
}
