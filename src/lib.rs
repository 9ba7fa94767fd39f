//! A thread-safe, lock-free lazy value with at-most-once initialization and
//! sticky failure.
//!
//! This crate provides two types, layered in dependency order:
//!
//! - [`FuseCell<T>`]: a lock-free single-assignment slot that settles exactly
//!   once, to either a value or an error, and never changes again.
//! - [`Lazy<T>`]: the facade over one cell plus a deferred computation, with
//!   `map`/`flat_map` composition for derived lazy values.
//!
//! When any number of threads race to read an unevaluated [`Lazy`], a single
//! compare-and-swap elects one of them to run the initializer; the losers
//! spin until the winner publishes the outcome with release ordering, and
//! from then on every read is one atomic acquire load. There are no locks,
//! mutexes, or condition variables anywhere.
//!
//! Failure is permanent: an initializer that panics, or that produces no
//! value, poisons its cell and every subsequent [`Lazy::get`] returns the
//! same [`InitError`] without ever retrying.
//!
//! # Examples
//!
//! ## Basic lazy value
//!
//! ```rust
//! use lazy_fuse::Lazy;
//!
//! let config = Lazy::create(|| "production".to_string());
//!
//! // Nothing has run yet.
//! assert!(!config.is_settled());
//!
//! // First access runs the initializer; later accesses just read the cache.
//! assert_eq!(config.get().unwrap(), "production");
//! assert_eq!(config.get().unwrap(), "production");
//! ```
//!
//! ## Derived lazy values
//!
//! ```rust
//! use lazy_fuse::Lazy;
//!
//! let base = Lazy::create(|| 21);
//! let doubled = base.map(|n| n * 2);
//!
//! // Constructing `doubled` ran neither initializer.
//! assert!(!base.is_settled());
//!
//! assert_eq!(doubled.get().unwrap(), &42);
//! assert!(base.is_settled());
//! ```
//!
//! ## Sticky failure
//!
//! ```rust
//! use lazy_fuse::Lazy;
//!
//! let broken: Lazy<String> = Lazy::create_optional(|| None);
//!
//! assert!(broken.get().is_err());
//! // The error is cached just like a value would have been.
//! assert!(broken.get().unwrap_err().produced_no_value());
//! ```
//!
//! # Caveats
//!
//! Waiting for an in-flight initializer is an uncancellable busy wait with
//! no timeout: an initializer that hangs, or a `flat_map` chain that reaches
//! back into a value currently being forced, stalls every reader forever.

/// Lock-free single-assignment slot.
mod cell;

/// The error surfaced when initialization fails.
mod error;

/// The lazy value facade and composition.
mod lazy;

/// Internal atomic state machine.
mod state;

pub use cell::{CellState, Claim, FuseCell};
pub use error::InitError;
pub use lazy::Lazy;
