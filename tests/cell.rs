use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lazy_fuse::{CellState, FuseCell, InitError};

#[test]
fn test_new_is_empty() {
   let cell: FuseCell<i32> = FuseCell::new();
   assert!(!cell.is_settled());
   assert!(matches!(cell.peek(), CellState::Empty));
}

#[test]
fn test_claim_and_settle_value() {
   let cell: FuseCell<i32> = FuseCell::new();

   let claim = cell.try_claim().expect("first claim must win");
   assert!(matches!(cell.peek(), CellState::InProgress));
   assert!(!cell.is_settled());

   let value = claim.settle_value(42);
   assert_eq!(value, &42);
   assert!(cell.is_settled());
   assert!(matches!(cell.peek(), CellState::Ready(&42)));
}

#[test]
fn test_claim_is_exclusive() {
   let cell: FuseCell<i32> = FuseCell::new();

   let claim = cell.try_claim().expect("first claim must win");
   // While the claim is open, nobody else can win it.
   assert!(cell.try_claim().is_none());

   claim.settle_value(1);
   // And not after settlement either.
   assert!(cell.try_claim().is_none());
}

#[test]
fn test_settle_error_is_sticky() {
   let cell: FuseCell<String> = FuseCell::new();

   let claim = cell.try_claim().expect("first claim must win");
   claim.settle_error(InitError::no_value());

   assert!(cell.is_settled());
   match cell.peek() {
      CellState::Failed(error) => assert!(error.produced_no_value()),
      other => panic!("expected Failed, got {other:?}"),
   }
   // The same error is observed on every subsequent peek.
   assert!(matches!(cell.peek(), CellState::Failed(_)));
}

#[test]
fn test_abandoned_claim_poisons() {
   let cell: FuseCell<i32> = FuseCell::new();

   {
      let _claim = cell.try_claim().expect("first claim must win");
      // Dropped without settling.
   }

   assert!(cell.is_settled());
   match cell.peek() {
      CellState::Failed(error) => {
         assert!(!error.produced_no_value());
         assert!(!error.is_panic());
      }
      other => panic!("expected Failed, got {other:?}"),
   }
   // Waiters are released rather than spinning forever.
   assert!(cell.wait_settled().is_err());
}

#[test]
fn test_wait_settled_returns_immediately_when_ready() {
   let cell: FuseCell<i32> = FuseCell::new();
   cell.try_claim().unwrap().settle_value(7);
   assert_eq!(cell.wait_settled(), Ok(&7));
}

#[test]
fn test_multi_thread_claim_race() {
   let cell = Arc::new(FuseCell::new());
   let winners = Arc::new(AtomicUsize::new(0));

   let threads: Vec<_> = (0..10)
      .map(|i| {
         let cell_clone = Arc::clone(&cell);
         let winners_clone = Arc::clone(&winners);
         thread::spawn(move || {
            if let Some(claim) = cell_clone.try_claim() {
               winners_clone.fetch_add(1, Ordering::SeqCst);
               // Hold the claim open long enough for the losers to wait.
               thread::sleep(Duration::from_millis(20));
               claim.settle_value(i);
            }
            *cell_clone
               .wait_settled()
               .expect("cell must settle with a value")
         })
      })
      .collect();

   let mut first_val = None;
   for handle in threads {
      let val = handle.join().unwrap();
      if first_val.is_none() {
         first_val = Some(val);
      }
      // Every thread observes the winner's value.
      assert_eq!(Some(val), first_val);
   }
   // Exactly one thread won the claim.
   assert_eq!(winners.load(Ordering::SeqCst), 1);
}

#[test]
fn test_debug_states() {
   let cell: FuseCell<i32> = FuseCell::new();
   assert_eq!(format!("{cell:?}"), "FuseCell(<unset>)");

   let claim = cell.try_claim().unwrap();
   assert_eq!(format!("{cell:?}"), "FuseCell(<in progress>)");

   claim.settle_value(5);
   assert_eq!(format!("{cell:?}"), "FuseCell(5)");
}

#[test]
fn test_drop_releases_value() {
   // A settled cell owns its value and drops it exactly once.
   struct CountsDrops(Arc<AtomicUsize>);
   impl Drop for CountsDrops {
      fn drop(&mut self) {
         self.0.fetch_add(1, Ordering::SeqCst);
      }
   }

   let drops = Arc::new(AtomicUsize::new(0));
   {
      let cell = FuseCell::new();
      cell
         .try_claim()
         .unwrap()
         .settle_value(CountsDrops(Arc::clone(&drops)));
      assert_eq!(drops.load(Ordering::SeqCst), 0);
   }
   assert_eq!(drops.load(Ordering::SeqCst), 1);

   // An empty cell drops nothing.
   {
      let _cell: FuseCell<CountsDrops> = FuseCell::new();
   }
   assert_eq!(drops.load(Ordering::SeqCst), 1);
}
