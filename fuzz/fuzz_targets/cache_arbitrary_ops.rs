#![no_main]

use libfuzzer_sys::fuzz_target;
use ringcache::{Cache, CacheError};

// Fuzz arbitrary operation sequences on a small cache
//
// Tests random interleavings of set, get, get_into, get_or_set, del, touch,
// ttl and clear over a tiny keyspace, so eviction, in-place overwrite and
// repacking all trigger constantly. Only the three declared error kinds may
// ever surface.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let cache = Cache::new(1024);
    let mut buf = [0u8; 64];

    let mut idx = 0;
    while idx + 3 < data.len() {
        let op = data[idx] % 8;
        let key_byte = data[idx + 1] % 16;
        let key = [b'k', key_byte];
        let val_len = (data[idx + 2] as usize) % 48;
        let value = vec![data[idx + 3]; val_len];

        let result: Result<(), CacheError> = match op {
            0 => cache.set(&key, &value, (data[idx + 3] % 4) as u32),
            1 => cache.get(&key).map(|_| ()),
            2 => cache.get_into(&key, &mut buf).map(|_| ()),
            3 => cache.get_or_set(&key, &value, 0).map(|_| ()),
            4 => {
                cache.del(&key);
                Ok(())
            }
            5 => cache.touch(&key, (data[idx + 3] % 4) as u32),
            6 => cache.ttl(&key).map(|_| ()),
            7 => {
                cache.clear();
                Ok(())
            }
            _ => unreachable!(),
        };

        match result {
            Ok(()) | Err(CacheError::NotFound) => {}
            Err(e) => panic!("unexpected error for small entry: {e}"),
        }

        idx += 4;
    }

    // gauge sanity after any sequence
    let stats = cache.stats();
    assert_eq!(stats.lookup_count, stats.hit_count + stats.miss_count);
});
