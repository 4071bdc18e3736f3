//! Multi-threaded client scenarios against a shared stack.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use relief::{Client, Stack, TileFormat};

const SRTM3_SAMPLES: usize = 1201;
const SRTM3_SIZE: usize = SRTM3_SAMPLES * SRTM3_SAMPLES * 2;

/// Create a synthetic SRTM3 tile whose every sample is `fill`.
fn create_tile(dir: &Path, lat: i32, lon: i32, fill: i16) {
    let name = TileFormat::Srtm.filename(lat, lon).unwrap();
    let mut data = vec![0u8; SRTM3_SIZE];
    let bytes = fill.to_be_bytes();
    for pair in data.chunks_exact_mut(2) {
        pair[0] = bytes[0];
        pair[1] = bytes[1];
    }
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    file.write_all(&data).unwrap();
}

fn counting_stack(dir: &Path, max_size: usize) -> (Arc<Stack>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let locks = Arc::new(AtomicUsize::new(0));
    let unlocks = Arc::new(AtomicUsize::new(0));
    let (l, u) = (Arc::clone(&locks), Arc::clone(&unlocks));
    let stack = Stack::builder(dir)
        .max_size(max_size)
        .format(TileFormat::Srtm)
        .lock(move || {
            l.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unlock(move || {
            u.fetch_add(1, Ordering::SeqCst);
            true
        })
        .build()
        .unwrap();
    (Arc::new(stack), locks, unlocks)
}

#[test]
fn concurrent_readers_share_one_pool() {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 45, 3, 100);
    create_tile(tmp.path(), 46, 3, 200);
    create_tile(tmp.path(), 47, 3, 300);

    let (stack, locks, unlocks) = counting_stack(tmp.path(), 2);

    let mut handles = Vec::new();
    for worker in 0..4 {
        let stack = Arc::clone(&stack);
        handles.push(thread::spawn(move || {
            let mut client = Client::new(stack).unwrap();
            // Sweep over the three tiles, with many coherent queries in
            // between so the pinned fast path gets exercised.
            for pass in 0..8 {
                for base in [45, 46, 47] {
                    let lat = base as f64 + 0.1 + 0.05 * ((worker + pass) % 4) as f64;
                    let z = client.elevation(lat, 3.5).unwrap();
                    assert_eq!(z, f64::from((base - 44) * 100));
                    for i in 0..16 {
                        let z = client.elevation(lat + 0.001 * i as f64, 3.6).unwrap();
                        assert_eq!(z, f64::from((base - 44) * 100));
                    }
                }
            }
            // The client releases its pin on drop.
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Every lock acquisition was matched by a release.
    assert_eq!(locks.load(Ordering::SeqCst), unlocks.load(Ordering::SeqCst));
    assert!(locks.load(Ordering::SeqCst) > 0);

    // All pins are gone; the pool can be fully drained.
    let stats = stack.stats();
    assert_eq!(stats.pinned, 0);
    assert!(stats.size <= 2, "soft bound violated: {}", stats.size);
    stack.clear().unwrap();
    assert_eq!(stack.stats().size, 0);
}

#[test]
fn pinned_tiles_survive_concurrent_pressure() {
    let tmp = TempDir::new().unwrap();
    for lat in 44..48 {
        create_tile(tmp.path(), lat, 3, (lat * 10) as i16);
    }

    // A pool bound of one forces permanent overflow pressure.
    let (stack, _, _) = counting_stack(tmp.path(), 1);

    let mut handles = Vec::new();
    for worker in 0..4 {
        let stack = Arc::clone(&stack);
        handles.push(thread::spawn(move || {
            let lat = 44 + worker;
            let mut client = Client::new(stack).unwrap();
            for i in 0..32 {
                let z = client
                    .elevation(lat as f64 + 0.2 + 0.01 * (i % 8) as f64, 3.5)
                    .unwrap();
                // The pinned tile keeps answering with its own data even
                // while other workers churn the pool.
                assert_eq!(z, f64::from(lat * 10));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = stack.stats();
    assert_eq!(stats.pinned, 0);
    stack.clear().unwrap();
    assert_eq!(stack.stats().size, 0);
}

#[test]
fn missing_cells_are_remembered_per_client() {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 45, 3, 100);

    let (stack, locks, _) = counting_stack(tmp.path(), 2);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let stack = Arc::clone(&stack);
        handles.push(thread::spawn(move || {
            let mut client = Client::new(stack).unwrap();
            assert_eq!(client.elevation_checked(50.5, 3.5).unwrap(), None);
            // Repeated queries over the hole stay lock-free.
            for _ in 0..64 {
                assert_eq!(client.elevation_checked(50.7, 3.9).unwrap(), None);
            }
            assert_eq!(client.elevation_checked(45.5, 3.5).unwrap(), Some(100.0));
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // One failed load and one successful lookup per worker, plus the pin
    // releases on drop: far fewer lock round-trips than queries.
    assert!(locks.load(Ordering::SeqCst) <= 3 * 4);
}
