//! Example demonstrating the hot/cold segmented cache.
//!
//! The cache keeps one circular list split into a hot region (protected) and
//! a cold region (probation). Once the cache is full, new keys enter the
//! cold region. A cold key that was read at least twice is promoted to the
//! hot front when eviction reaches it; everything else is evicted from the
//! cold tail.
//!
//! Run with: cargo run --example basic_hot_cold

use std::sync::Arc;
use std::thread;

use hotcold::builder::CacheBuilder;
use hotcold::policy::hot_cold::HotColdCache;

fn main() {
    println!("=== Hot/Cold Cache Example ===\n");

    // 10 entries, 5 of them hot
    let mut cache = HotColdCache::new(10).unwrap();
    println!(
        "Created cache: max_size={}, hot_size={}\n",
        cache.max_size(),
        cache.hot_size()
    );

    for i in 1..=10 {
        cache.add(i, format!("value-{}", i));
    }
    println!("Inserted keys 1-10");
    println!("  order (hot -> cold): {:?}", cache.keys_hot_to_cold());

    // Two reads each mark keys 1-3 for promotion
    for key in [1, 2, 3] {
        cache.try_get(&key);
        cache.try_get(&key);
    }
    println!("\nRead keys 1, 2, 3 twice each");

    println!("\n=== Scan Resistance Demo ===\n");
    println!("Simulating scan with keys 100-120...");
    for i in 100..=120 {
        cache.add(i, format!("scan-{}", i));
    }

    println!("\nAfter scan (21 one-time insertions):");
    for key in [1, 2, 3, 4, 5] {
        println!("  contains {}? {}", key, cache.contains(&key));
    }
    println!("  count: {}", cache.count());
    println!("  order (hot -> cold): {:?}", cache.keys_hot_to_cold());

    println!("\n=== Compute-once Demo ===\n");

    let shared = Arc::new(
        CacheBuilder::new(64)
            .hot_fraction(0.25)
            .build_concurrent::<u64, u64>()
            .unwrap(),
    );
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&shared);
            thread::spawn(move || cache.get_or_add(7, |k| k * 1000 + t))
        })
        .collect();
    let results: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    println!("4 threads asked for key 7 at once");
    println!("  results: {:?} (one factory call, one shared value)", results);
    println!("  count: {}", shared.count());
}
