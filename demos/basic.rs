use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_fuse::Lazy;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn main() {
   let data = Arc::new(Lazy::create(|| {
      // This closure runs only once
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Initializing data...");
      // Simulate work
      std::thread::sleep(std::time::Duration::from_millis(50));
      "Expensive data".to_string()
   }));

   let threads: Vec<_> = (0..5)
      .map(|_| {
         let data = Arc::clone(&data);
         std::thread::spawn(move || {
            println!("Thread access: {}", data.get().unwrap());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(data.get().unwrap(), "Expensive data");
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Initializer ran only once
   println!("Final data: {}", data.get().unwrap());
}
