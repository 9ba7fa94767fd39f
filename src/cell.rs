//! Lock-free single-assignment slot.
//!
//! [`FuseCell<T>`] is the leaf primitive: an atomic slot that is written at
//! most once and thereafter immutable, like a fuse that can only blow once.
//! It settles to either a value or an [`InitError`], and once settled it
//! never changes again.
//!
//! The cell knows nothing about initializers. It only provides the three
//! primitives the facade needs: a claim CAS that elects a single writer, a
//! settle store performed through the [`Claim`] token, and acquire loads
//! (`peek` / `wait_settled`) for everyone else.

use core::cell::UnsafeCell;
use core::fmt;
use core::mem::{self, ManuallyDrop};
use core::sync::atomic::Ordering;

use crate::error::InitError;
use crate::state::FuseState;

/// Payload storage discriminated by the atomic state: `READY` means `value`
/// is live, `POISONED` means `error` is live, anything else means neither.
union Slot<T> {
   unset: (),
   value: ManuallyDrop<T>,
   error: ManuallyDrop<InitError>,
}

/// One observation of a cell, as returned by [`FuseCell::peek`].
#[derive(Debug)]
pub enum CellState<'a, T> {
   /// No settlement attempted yet.
   Empty,
   /// Some thread holds the claim and has not settled yet.
   InProgress,
   /// Terminal: settled with a value.
   Ready(&'a T),
   /// Terminal: settled with an initialization error.
   Failed(&'a InitError),
}

/// A thread-safe slot that is assigned at most once.
///
/// The lifecycle is `empty -> in progress -> ready | failed`: the transition
/// out of `empty` is a compare-and-swap that exactly one contender wins (see
/// [`try_claim`](Self::try_claim)), and the winner settles the cell exactly
/// once through the [`Claim`] it was handed. Terminal states never change.
///
/// Reads of a settled cell are a single acquire load with no further
/// synchronization; the release store in settle guarantees that whoever
/// observes a terminal state also observes the payload that produced it.
pub struct FuseCell<T> {
   state: FuseState,
   slot: UnsafeCell<Slot<T>>,
}

impl<T> FuseCell<T> {
   /// Creates a new, empty cell.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: FuseState::new(),
         slot: UnsafeCell::new(Slot { unset: () }),
      }
   }

   /// `true` once the cell has settled to a value or an error.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_settled(&self) -> bool {
      self.state.is_settled(Ordering::Relaxed)
   }

   /// Observes the current state with a single acquire load.
   ///
   /// This method never blocks, and on a settled cell it is the fast path:
   /// no CAS, no loop.
   #[inline]
   pub fn peek(&self) -> CellState<'_, T> {
      match self.state.snapshot(Ordering::Acquire) {
         // SAFETY: the acquire load observed a terminal state, so the
         // matching union field was fully written before the release store
         // that published it, and it will never be written again.
         FuseState::READY => CellState::Ready(unsafe { self.value_unchecked() }),
         FuseState::POISONED => CellState::Failed(unsafe { self.error_unchecked() }),
         FuseState::CLAIMED => CellState::InProgress,
         _ => CellState::Empty,
      }
   }

   /// Attempts the `empty -> in progress` transition.
   ///
   /// Exactly one caller among all concurrent contenders receives a
   /// [`Claim`]; everyone else receives `None`, either because another
   /// thread holds the claim or because the cell already settled. Safe to
   /// call from any number of threads with no external synchronization.
   #[inline]
   pub fn try_claim(&self) -> Option<Claim<'_, T>> {
      if self.state.try_claim() {
         Some(Claim { cell: self })
      } else {
         None
      }
   }

   /// Blocks until the cell settles, then returns the outcome.
   ///
   /// Returns immediately when the cell has already settled. This is a busy
   /// wait (bounded spin, then yielding between polls) with no timeout: a
   /// claim holder that never settles stalls every waiter indefinitely.
   pub fn wait_settled(&self) -> Result<&T, &InitError> {
      if self.state.wait_settled() == FuseState::READY {
         // SAFETY: wait_settled returned a terminal state observed with
         // acquire ordering; see `peek`.
         Ok(unsafe { self.value_unchecked() })
      } else {
         // SAFETY: as above, the terminal state was POISONED.
         Err(unsafe { self.error_unchecked() })
      }
   }

   /// # Safety
   ///
   /// The caller must have observed `READY` with acquire ordering.
   #[inline]
   unsafe fn value_unchecked(&self) -> &T {
      &(*self.slot.get()).value
   }

   /// # Safety
   ///
   /// The caller must have observed `POISONED` with acquire ordering.
   #[inline]
   unsafe fn error_unchecked(&self) -> &InitError {
      &(*self.slot.get()).error
   }
}

/// Exclusive right to settle a cell, won through [`FuseCell::try_claim`].
///
/// Settling consumes the token, so settling twice is unrepresentable.
/// Dropping a token without settling poisons the cell: waiters must always
/// observe a terminal state, even if the claim holder unwinds.
pub struct Claim<'a, T> {
   cell: &'a FuseCell<T>,
}

impl<'a, T> Claim<'a, T> {
   /// Publishes `value`, releases all waiters, and returns a reference to
   /// the now-immutable payload.
   #[inline]
   pub fn settle_value(self, value: T) -> &'a T {
      // SAFETY: winning the claim CAS made this token the only writer, and
      // no reader dereferences the slot before observing a terminal state.
      unsafe {
         (*self.cell.slot.get()).value = ManuallyDrop::new(value);
      }
      let cell = self.cell;
      cell.state.settle(FuseState::READY);
      mem::forget(self);
      // SAFETY: this thread just settled READY.
      unsafe { cell.value_unchecked() }
   }

   /// Publishes `error`, releasing all waiters. The cell is poisoned
   /// permanently; the error is re-surfaced to every future reader.
   #[inline]
   pub fn settle_error(self, error: InitError) -> &'a InitError {
      // SAFETY: see `settle_value`.
      unsafe {
         (*self.cell.slot.get()).error = ManuallyDrop::new(error);
      }
      let cell = self.cell;
      cell.state.settle(FuseState::POISONED);
      mem::forget(self);
      // SAFETY: this thread just settled POISONED.
      unsafe { cell.error_unchecked() }
   }
}

impl<T> Drop for Claim<'_, T> {
   /// Runs only when the claim holder unwinds without settling. Poisons the
   /// cell so that waiters are released instead of spinning forever.
   fn drop(&mut self) {
      // SAFETY: same exclusive write right as `settle_error`.
      unsafe {
         (*self.cell.slot.get()).error = ManuallyDrop::new(InitError::abandoned());
      }
      self.cell.state.settle(FuseState::POISONED);
   }
}

// SAFETY:
// `&FuseCell<T>` hands out `&T` once settled, so `Sync` requires `T: Sync`.
// `T: Send` is also required because the value is written by the claim
// winner and may be dropped by whichever thread owns the cell last.
unsafe impl<T: Send + Sync> Sync for FuseCell<T> {}
// SAFETY:
// Moving the cell moves the contained value, so `Send` requires `T: Send`.
unsafe impl<T: Send> Send for FuseCell<T> {}

impl<T> Default for FuseCell<T> {
   /// Creates a new, empty cell.
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T: fmt::Debug> fmt::Debug for FuseCell<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("FuseCell");
      match self.peek() {
         CellState::Ready(value) => d.field(value),
         CellState::Failed(error) => d.field(&format_args!("<poisoned: {error}>")),
         CellState::InProgress => d.field(&format_args!("<in progress>")),
         CellState::Empty => d.field(&format_args!("<unset>")),
      };
      d.finish()
   }
}

impl<T> Drop for FuseCell<T> {
   #[inline]
   fn drop(&mut self) {
      match self.state.snapshot(Ordering::Relaxed) {
         // SAFETY: we have exclusive access and the state tells us which
         // union field is live; it won't be accessed again.
         FuseState::READY => unsafe { ManuallyDrop::drop(&mut self.slot.get_mut().value) },
         FuseState::POISONED => unsafe { ManuallyDrop::drop(&mut self.slot.get_mut().error) },
         _ => {}
      }
   }
}
