//! Atomic state machine backing the single-assignment cell.
//!
//! The whole synchronization surface is one `AtomicU8` walking a four-state
//! machine:
//!
//! ```text
//! EMPTY --CAS--> CLAIMED --store--> READY
//!                        \--store--> POISONED
//! ```
//!
//! `EMPTY -> CLAIMED` is a compare-and-swap, so exactly one contender ever
//! wins it. The winner is the only writer afterwards, which is why leaving
//! `CLAIMED` is a plain release store rather than another CAS. `READY` and
//! `POISONED` are terminal; nothing transitions out of them.
//!
//! Waiting is a busy poll with a bounded spin that escalates to yielding the
//! processor. There is deliberately no futex/parking here: a settled cell is
//! read with a single acquire load, and the only threads that ever wait are
//! the ones that lost the claim race while the winner is still running.

use core::sync::atomic::{AtomicU8, Ordering};

/// Settlement state for a cell. See the module docs for the state machine.
#[repr(transparent)]
pub(crate) struct FuseState(AtomicU8);

impl FuseState {
   /// No settlement attempted yet.
   pub(crate) const EMPTY: u8 = 0;
   /// Exactly one thread holds the right to run the initializer.
   pub(crate) const CLAIMED: u8 = 1;
   /// Terminal: the cell holds a value.
   pub(crate) const READY: u8 = 2;
   /// Terminal: the cell holds an initialization error.
   pub(crate) const POISONED: u8 = 3;

   /// Spins before `wait_settled` starts yielding the processor.
   const SPIN_LIMIT: u32 = 64;

   /// Creates the state for an empty cell.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(Self::EMPTY))
   }

   /// Attempts the `EMPTY -> CLAIMED` transition.
   ///
   /// Among any number of concurrent callers exactly one observes `true`;
   /// everyone else observes `false`. A single CAS, no loop, no side effects
   /// beyond the transition itself.
   #[inline]
   pub(crate) fn try_claim(&self) -> bool {
      self
         .0
         .compare_exchange(
            Self::EMPTY,
            Self::CLAIMED,
            Ordering::Acquire,
            Ordering::Acquire,
         )
         .is_ok()
   }

   /// Publishes a terminal state.
   ///
   /// Only the thread that won `try_claim` may call this, exactly once. The
   /// Release store pairs with the Acquire in `snapshot`: any thread that
   /// observes `READY`/`POISONED` also observes the payload write that
   /// preceded this call.
   #[inline]
   pub(crate) fn settle(&self, terminal: u8) {
      debug_assert!(terminal == Self::READY || terminal == Self::POISONED);
      debug_assert_eq!(self.0.load(Ordering::Relaxed), Self::CLAIMED);
      self.0.store(terminal, Ordering::Release);
   }

   /// One atomic load. Never blocks.
   #[inline]
   pub(crate) fn snapshot(&self, ordering: Ordering) -> u8 {
      self.0.load(ordering)
   }

   /// `true` once the state is terminal.
   #[inline]
   pub(crate) fn is_settled(&self, ordering: Ordering) -> bool {
      self.snapshot(ordering) >= Self::READY
   }

   /// Busy-polls until the state is terminal, then returns it.
   ///
   /// Returns immediately when the cell has already settled. While the claim
   /// winner is still running this spins `SPIN_LIMIT` times and then yields
   /// between polls; there is no timeout, so a hung initializer stalls every
   /// waiter until it finishes.
   pub(crate) fn wait_settled(&self) -> u8 {
      let mut spins = 0u32;
      loop {
         let state = self.snapshot(Ordering::Acquire);
         if state >= Self::READY {
            return state;
         }
         if spins < Self::SPIN_LIMIT {
            spins += 1;
            core::hint::spin_loop();
         } else {
            std::thread::yield_now();
         }
      }
   }
}
