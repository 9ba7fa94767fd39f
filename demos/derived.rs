use lazy_fuse::Lazy;

struct Config {
   raw: String,
}

fn main() {
   let config = Lazy::create(|| {
      println!("Loading config...");
      Config {
         raw: "mode=production threads=8".to_string(),
      }
   });

   // Derived values are themselves lazy: nothing has loaded yet.
   let mode = config.map(|c| {
      println!("Extracting mode...");
      c.raw
         .split_whitespace()
         .find_map(|pair| pair.strip_prefix("mode="))
         .map(str::to_string)
   });
   assert!(!config.is_settled());

   // First access forces the whole chain, once.
   println!("Mode: {:?}", mode.get().unwrap());
   println!("Mode again: {:?}", mode.get().unwrap());

   // A failing initializer poisons its cell permanently.
   let broken: Lazy<String> = Lazy::create_optional(|| None);
   match broken.get() {
      Ok(_) => panic!("should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   // The second call observes the same cached error.
   assert!(broken.get().unwrap_err().produced_no_value());
}
