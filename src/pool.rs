//! Storage pools. A [`Pool`] is shared accounting, not shared storage:
//! every [`crate::function::Function`] owns its own growable buffers, and
//! a `Pool` tracks how many words have been reserved across all of them
//! against a global cap — see `DESIGN.md` for why this is shared budget
//! accounting rather than a literal shared arena. It keeps the actual
//! per-`Function` storage plain, independently-owned `Vec<T>`s (so the
//! borrow checker sees ordinary ownership, not aliased arena slices) while
//! still enforcing a hard ceiling on total memory committed across every
//! function anyone is building concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};

use diag::Fault;

/// Shared word-budget accounting for one kind of per-`Function` buffer
/// (instruction words, values, basic blocks, or params). Cheap to clone —
/// internally just an `Arc`-free `AtomicUsize`, since pools are expected
/// to live as long as the [`crate::alloc::Allocator`] that owns them.
#[derive(Debug)]
pub struct Pool {
  name: &'static str,
  reserved: AtomicUsize,
  cap: usize,
}

impl Pool {
  pub fn new(name: &'static str, cap: usize) -> Self {
    Pool {
      name,
      reserved: AtomicUsize::new(0),
      cap,
    }
  }

  /// Reserve `additional` more elements against the cap. On success the
  /// reservation is durable until [`Pool::release`] gives it back; on
  /// failure nothing is changed.
  pub fn reserve(&self, additional: usize) -> Result<(), Fault> {
    let mut current = self.reserved.load(Ordering::Relaxed);
    loop {
      let next = current.checked_add(additional).unwrap_or(usize::MAX);
      if next > self.cap {
        return Err(Fault::PoolExhausted {
          pool: self.name,
          requested: next,
          reserve_cap: self.cap,
        });
      }
      match self.reserved.compare_exchange_weak(
        current,
        next,
        Ordering::AcqRel,
        Ordering::Relaxed,
      ) {
        Ok(_) => {
          log::debug!("pool `{}` grew to {next}/{} words", self.name, self.cap);
          return Ok(());
        }
        Err(observed) => current = observed,
      }
    }
  }

  pub fn release(&self, amount: usize) {
    self.reserved.fetch_sub(amount, Ordering::AcqRel);
  }

  pub fn reserved(&self) -> usize {
    self.reserved.load(Ordering::Relaxed)
  }

  pub fn cap(&self) -> usize {
    self.cap
  }
}
