#![no_main]

use libfuzzer_sys::fuzz_target;
use hotcold::policy::hot_cold::HotColdCache;

// Fuzz arbitrary operation sequences on HotColdCache
//
// Tests random sequences of add, get_or_add, try_get, remove and clear over a
// small key space so eviction and promotion run constantly.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let max_size = usize::from(data[0] % 14) + 2;
    let mut cache: HotColdCache<u8, u32> = match HotColdCache::new(max_size) {
        Ok(cache) => cache,
        Err(_) => return,
    };

    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 5;
        let key = data[idx + 1] % 32;

        match op {
            0 => {
                cache.add(key, u32::from(key) * 3);
                assert_eq!(cache.peek(&key), Some(&(u32::from(key) * 3)));
            }
            1 => {
                let value = *cache.get_or_add(key, |k| u32::from(*k) * 3);
                assert_eq!(value, u32::from(key) * 3);
                assert!(cache.contains(&key));
            }
            2 => {
                if let Some(value) = cache.try_get(&key) {
                    assert_eq!(*value, u32::from(key) * 3);
                }
            }
            3 => {
                cache.remove(&key);
                assert!(!cache.contains(&key));
            }
            4 => {
                if key == 0 {
                    cache.clear();
                    assert!(cache.is_empty());
                }
            }
            _ => unreachable!(),
        }

        assert!(cache.count() <= cache.max_size());
        assert!(cache.check_invariants().is_ok());

        idx += 2;
    }
});
