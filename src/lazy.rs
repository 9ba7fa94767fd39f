//! The lazy value facade.
//!
//! [`Lazy<T>`] pairs one [`FuseCell`] with a deferred, user-supplied
//! initializer and exposes the public contract: `create` stores the
//! computation without running it, `get` runs it at most once and caches the
//! outcome, and `map`/`flat_map` build derived lazy values without forcing
//! anything.
//!
//! A `Lazy` is a cloneable handle: clones share the same cell, so the
//! at-most-once guarantee spans every clone. Derived values own fresh,
//! independent cells.

use std::cell::UnsafeCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::cell::{CellState, FuseCell};
use crate::error::InitError;

/// The deferred computation. Boxed so that `map`/`flat_map` chains erase to
/// the same shape as a plain `create`.
type Initializer<T> = Box<dyn FnOnce() -> Result<T, InitError> + Send>;

struct Inner<T> {
   cell: FuseCell<T>,
   /// Taken exactly once, by the thread that wins the cell's claim.
   init: UnsafeCell<Option<Initializer<T>>>,
}

// SAFETY:
// The `init` slot is only ever accessed by the thread that won the claim
// CAS, which makes it exclusively owned at that point; everything else in
// `Inner` is the thread-safe cell. The bounds mirror `FuseCell`: `T: Send`
// because the winner hands the value across threads, `T: Sync` because
// settled references are shared.
unsafe impl<T: Send + Sync> Sync for Inner<T> {}
// SAFETY: moving `Inner` moves the value and the `Send` initializer.
unsafe impl<T: Send> Send for Inner<T> {}

/// A thread-safe, lock-free lazy value.
///
/// Holds a deferred computation that runs at most once, even when any number
/// of threads race through [`get`](Self::get) for the first time; the
/// outcome, success or failure, is cached for every subsequent read.
///
/// A failed initializer (a panic, or no value produced) poisons the cell
/// permanently: every later `get` returns the same [`InitError`] and the
/// initializer is never retried.
///
/// # Examples
///
/// ```rust
/// use lazy_fuse::Lazy;
///
/// let value = Lazy::create(|| "Value".to_string());
/// assert_eq!(value.get().unwrap(), "Value");
/// ```
pub struct Lazy<T> {
   inner: Arc<Inner<T>>,
}

impl<T: 'static> Lazy<T> {
   /// Creates a lazy value from `init` without invoking it.
   ///
   /// The first call to [`get`](Self::get) runs `init` exactly once. A panic
   /// in `init` is caught and becomes the permanent [`InitError`].
   pub fn create<F>(init: F) -> Self
   where
      F: FnOnce() -> T + Send + 'static,
   {
      Self::from_init(Box::new(move || Ok(init())))
   }

   /// Creates a lazy value whose initializer may decline to produce one.
   ///
   /// Returning `None` settles the cell with the same permanent error as a
   /// panic would: absence of a legitimate value collapses to failure.
   pub fn create_optional<F>(init: F) -> Self
   where
      F: FnOnce() -> Option<T> + Send + 'static,
   {
      Self::from_init(Box::new(move || init().ok_or_else(InitError::no_value)))
   }

   fn from_init(init: Initializer<T>) -> Self {
      Self {
         inner: Arc::new(Inner {
            cell: FuseCell::new(),
            init: UnsafeCell::new(Some(init)),
         }),
      }
   }
}

impl<T> Lazy<T> {
   /// `true` once the initializer has run to a value or an error.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_settled(&self) -> bool {
      self.inner.cell.is_settled()
   }

   /// Returns the cached outcome if settled, `None` otherwise.
   ///
   /// This method never blocks and never triggers initialization.
   #[inline]
   pub fn try_get(&self) -> Option<Result<&T, InitError>> {
      match self.inner.cell.peek() {
         CellState::Ready(value) => Some(Ok(value)),
         CellState::Failed(error) => Some(Err(error.clone())),
         CellState::Empty | CellState::InProgress => None,
      }
   }

   /// Returns the value, running the initializer if this is the first access.
   ///
   /// Exactly one of any number of racing callers runs the initializer; the
   /// losers wait for it to settle, and everyone observes the same outcome.
   /// Once warm this is a single atomic load.
   ///
   /// # Errors
   ///
   /// Returns the sticky [`InitError`] if the initializer panicked or
   /// produced no value, on the triggering call and on every call after it.
   #[inline]
   pub fn get(&self) -> Result<&T, InitError> {
      match self.inner.cell.peek() {
         CellState::Ready(value) => return Ok(value),
         CellState::Failed(error) => return Err(error.clone()),
         CellState::Empty | CellState::InProgress => {}
      }
      self.force()
   }

   /// Cold path for `get`: race for the claim, run or wait.
   #[cold]
   fn force(&self) -> Result<&T, InitError> {
      let Some(claim) = self.inner.cell.try_claim() else {
         // Another thread is (or was) the initializer; wait it out and
         // surface whatever it settled.
         return match self.inner.cell.wait_settled() {
            Ok(value) => Ok(value),
            Err(error) => Err(error.clone()),
         };
      };

      // SAFETY: winning the claim grants exclusive access to the
      // initializer slot; it is stored at construction and taken only here.
      let Some(init) = (unsafe { (*self.inner.init.get()).take() }) else {
         unreachable!("claim won twice on the same cell");
      };

      // Catch a panicking initializer so the cell settles poisoned instead
      // of unwinding with the claim still open.
      match panic::catch_unwind(AssertUnwindSafe(init)) {
         Ok(Ok(value)) => Ok(claim.settle_value(value)),
         Ok(Err(error)) => Err(claim.settle_error(error).clone()),
         Err(payload) => Err(claim.settle_error(InitError::panicked(payload)).clone()),
      }
   }
}

impl<T: Send + Sync + 'static> Lazy<T> {
   /// Returns a lazy value that evaluates `self` and applies `transform`.
   ///
   /// Nothing runs at construction: neither this value's initializer nor
   /// `transform` executes until the derived value's own
   /// [`get`](Self::get), and then at most once. If this value fails, the
   /// derived cell settles with the same error; a panic in `transform`
   /// poisons only the derived cell.
   pub fn map<U, F>(&self, transform: F) -> Lazy<U>
   where
      F: FnOnce(&T) -> U + Send + 'static,
      U: 'static,
   {
      let source = self.clone();
      Lazy::from_init(Box::new(move || Ok(transform(source.get()?))))
   }

   /// Returns a lazy value that evaluates `self`, applies `transform` to
   /// obtain an inner lazy value, and evaluates that.
   ///
   /// Nothing runs at construction; the first `get` on the derived value
   /// forces the full chain, each link at most once. The inner value keeps
   /// ownership of its own cache, so the derived cell stores a clone.
   ///
   /// A chain that reaches back into the value currently being forced never
   /// settles, and every caller waits forever; see the crate docs.
   pub fn flat_map<U, F>(&self, transform: F) -> Lazy<U>
   where
      F: FnOnce(&T) -> Lazy<U> + Send + 'static,
      U: Clone + 'static,
   {
      let source = self.clone();
      Lazy::from_init(Box::new(move || {
         let inner = transform(source.get()?);
         let value = inner.get()?;
         Ok(value.clone())
      }))
   }
}

impl<T> Clone for Lazy<T> {
   /// Clones the handle. The clone shares this value's cell: the
   /// initializer still runs at most once across all clones, and all clones
   /// observe the same outcome.
   #[inline]
   fn clone(&self) -> Self {
      Self {
         inner: Arc::clone(&self.inner),
      }
   }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Lazy");
      match self.inner.cell.peek() {
         CellState::Ready(value) => d.field(value),
         CellState::Failed(error) => d.field(&format_args!("<poisoned: {error}>")),
         CellState::InProgress => d.field(&format_args!("<initializing>")),
         CellState::Empty => d.field(&format_args!("<unset>")),
      };
      d.finish()
   }
}
