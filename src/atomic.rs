//! 8-byte compare-and-swap
//!
//! [`Cx8Cell`] is a 64-bit cell whose implementation is picked from the
//! table: a lock-free `AtomicU64` when the architecture has a native 8-byte
//! CAS, a spin lock otherwise. Callers see the same behaviour either way.

#[cfg(target_has_atomic = "64")]
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::types::TraitTable;

/// Which implementation a [`Cx8Cell`] uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cx8Strategy {
    Native,
    Locked,
}

impl Cx8Strategy {
    /// Strategy for `table` on the host this code runs on
    pub fn for_table(table: &TraitTable) -> Self {
        if table.native_cx8 && cfg!(target_has_atomic = "64") {
            Cx8Strategy::Native
        } else {
            Cx8Strategy::Locked
        }
    }
}

enum Repr {
    #[cfg(target_has_atomic = "64")]
    Native(AtomicU64),
    Locked(Mutex<u64>),
}

/// A 64-bit value updated with compare-and-swap
pub struct Cx8Cell {
    repr: Repr,
}

impl Cx8Cell {
    /// Create a cell using the strategy of `table`
    pub fn new(table: &TraitTable, value: u64) -> Self {
        Self::with_strategy(Cx8Strategy::for_table(table), value)
    }

    /// Create a cell with an explicit strategy.
    ///
    /// `Native` silently degrades to `Locked` on hosts without 64-bit atomics.
    pub fn with_strategy(strategy: Cx8Strategy, value: u64) -> Self {
        let repr = match strategy {
            #[cfg(target_has_atomic = "64")]
            Cx8Strategy::Native => Repr::Native(AtomicU64::new(value)),
            _ => Repr::Locked(Mutex::new(value)),
        };
        Cx8Cell { repr }
    }

    pub fn strategy(&self) -> Cx8Strategy {
        match self.repr {
            #[cfg(target_has_atomic = "64")]
            Repr::Native(_) => Cx8Strategy::Native,
            Repr::Locked(_) => Cx8Strategy::Locked,
        }
    }

    pub fn is_lock_free(&self) -> bool {
        self.strategy() == Cx8Strategy::Native
    }

    pub fn load(&self) -> u64 {
        match &self.repr {
            #[cfg(target_has_atomic = "64")]
            Repr::Native(a) => a.load(Ordering::Acquire),
            Repr::Locked(m) => *m.lock(),
        }
    }

    pub fn store(&self, value: u64) {
        match &self.repr {
            #[cfg(target_has_atomic = "64")]
            Repr::Native(a) => a.store(value, Ordering::Release),
            Repr::Locked(m) => *m.lock() = value,
        }
    }

    /// Store `new` if the cell holds `current`.
    ///
    /// Returns `Ok(previous)` on success and `Err(actual)` on failure, like
    /// `AtomicU64::compare_exchange`.
    pub fn compare_exchange(&self, current: u64, new: u64) -> Result<u64, u64> {
        match &self.repr {
            #[cfg(target_has_atomic = "64")]
            Repr::Native(a) => a.compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire),
            Repr::Locked(m) => {
                let mut guard = m.lock();
                let actual = *guard;
                if actual == current {
                    *guard = new;
                    Ok(actual)
                } else {
                    Err(actual)
                }
            }
        }
    }

    /// Wrapping add, returning the previous value
    pub fn fetch_add(&self, delta: u64) -> u64 {
        match &self.repr {
            #[cfg(target_has_atomic = "64")]
            Repr::Native(a) => a.fetch_add(delta, Ordering::AcqRel),
            Repr::Locked(m) => {
                let mut guard = m.lock();
                let prev = *guard;
                *guard = prev.wrapping_add(delta);
                prev
            }
        }
    }
}

impl core::fmt::Debug for Cx8Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cx8Cell")
            .field("strategy", &self.strategy())
            .field("value", &self.load())
            .finish()
    }
}
