//! Debug-only reentrancy guard.
//!
//! `UnorderedMap` calls user `Hash` and `KeyEq` code in the middle of
//! operations, sometimes while a candidate entry is allocated but not yet
//! linked. Re-entering the same map from that code would observe a
//! half-updated structure. In debug builds the guard panics and names both
//! operations; in release builds it compiles to nothing.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map tracker. Public entry points hold `self.reentrancy.enter("op")`
/// for their whole body.
#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Shared access from several threads would defeat the check.
    _nosync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosync: PhantomData,
        }
    }

    /// Mark `op` as running. In debug builds, panics if another operation on
    /// the same map is still running.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!("reentrant call into UnorderedMap::{op} while UnorderedMap::{outer} is running");
            }
            self.active.set(Some(op));
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            ReentrancyGuard { _z: PhantomData }
        }
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
