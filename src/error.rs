//! The error surfaced when lazy initialization fails.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

/// Error returned by [`Lazy::get`](crate::Lazy::get) after initialization
/// failed.
///
/// The failure is sticky: once a cell settles poisoned, every call observes
/// the same error forever and the initializer is never run again. An
/// initializer that panicked and one that produced no value are deliberately
/// collapsed into this single type; the distinction survives only as the
/// retained cause, for diagnostics.
///
/// Cloning is cheap (the panic message lives behind an `Arc`), which is how
/// the cell keeps one copy and hands a clone to every caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lazy initialization failed: {cause}")]
pub struct InitError {
   cause: Cause,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum Cause {
   #[error("the initializer produced no value")]
   NoValue,
   #[error("the initializer panicked: {0}")]
   Panicked(Arc<str>),
   #[error("the claim was abandoned before settling")]
   Abandoned,
}

impl InitError {
   /// The initializer completed but produced no value.
   ///
   /// This is the error a [`Claim`](crate::Claim) holder settles with when
   /// its computation has nothing to publish.
   #[must_use]
   pub fn no_value() -> Self {
      Self {
         cause: Cause::NoValue,
      }
   }

   /// The initializer panicked with the given unwind payload.
   pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
      let message: Arc<str> = if let Some(message) = payload.downcast_ref::<&str>() {
         Arc::from(*message)
      } else if let Some(message) = payload.downcast_ref::<String>() {
         Arc::from(message.as_str())
      } else {
         Arc::from("<non-string panic payload>")
      };
      Self {
         cause: Cause::Panicked(message),
      }
   }

   /// A claim token was dropped without settling its cell.
   pub(crate) fn abandoned() -> Self {
      Self {
         cause: Cause::Abandoned,
      }
   }

   /// `true` when the initializer completed without producing a value.
   #[inline]
   pub fn produced_no_value(&self) -> bool {
      matches!(self.cause, Cause::NoValue)
   }

   /// `true` when the initializer panicked instead of returning.
   #[inline]
   pub fn is_panic(&self) -> bool {
      matches!(self.cause, Cause::Panicked(_))
   }

   /// The captured panic message, if the initializer panicked with one.
   #[inline]
   pub fn panic_message(&self) -> Option<&str> {
      match &self.cause {
         Cause::Panicked(message) => Some(message),
         _ => None,
      }
   }
}
