use std::io::Write;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use relief::geodesy::geodetic_to_ecef;
use relief::{Client, Stack, Stepper, TileFormat};

const SRTM3_SAMPLES: usize = 1201;
const SRTM3_SIZE: usize = SRTM3_SAMPLES * SRTM3_SAMPLES * 2;

/// Create a synthetic SRTM3 tile with a simple elevation gradient.
fn create_tile(dir: &std::path::Path, lat: i32, lon: i32) {
    let name = TileFormat::Srtm.filename(lat, lon).unwrap();
    let mut data = vec![0u8; SRTM3_SIZE];
    for row in 0..SRTM3_SAMPLES {
        for col in 0..SRTM3_SAMPLES {
            let elev = ((row + col) % 4000) as i16;
            let offset = (row * SRTM3_SAMPLES + col) * 2;
            let bytes = elev.to_be_bytes();
            data[offset] = bytes[0];
            data[offset + 1] = bytes[1];
        }
    }
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    file.write_all(&data).unwrap();
}

fn bench_stack_direct(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 45, 3);
    let stack = Stack::builder(tmp.path())
        .max_size(4)
        .format(TileFormat::Srtm)
        .build()
        .unwrap();

    // Warm the pool
    let _ = stack.elevation(45.5, 3.5);

    c.bench_function("stack_direct_cached", |b| {
        b.iter(|| {
            black_box(
                stack
                    .elevation(black_box(45.3606), black_box(3.7274))
                    .unwrap(),
            );
        });
    });
}

fn bench_client_pinned(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 45, 3);
    let stack = Arc::new(
        Stack::builder(tmp.path())
            .max_size(4)
            .format(TileFormat::Srtm)
            .lock(|| true)
            .unlock(|| true)
            .build()
            .unwrap(),
    );
    let mut client = Client::new(stack).unwrap();

    // Pin the tile
    let _ = client.elevation(45.5, 3.5);

    c.bench_function("client_pinned_fast_path", |b| {
        b.iter(|| {
            black_box(
                client
                    .elevation(black_box(45.3606), black_box(3.7274))
                    .unwrap(),
            );
        });
    });
}

fn bench_stepper_local_frame(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 45, 3);
    let stack = Arc::new(
        Stack::builder(tmp.path())
            .max_size(4)
            .format(TileFormat::Srtm)
            .build()
            .unwrap(),
    );

    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    stepper.add_stack(stack).unwrap();
    stepper.set_range(100.0);

    // Prime the frame, then hammer positions a few meters apart.
    let origin = geodetic_to_ecef(45.5, 3.5, 1500.0);
    let _ = stepper.step(origin);
    let positions: Vec<[f64; 3]> = (0..64)
        .map(|i| {
            let t = i as f64;
            [origin[0] + 0.7 * t, origin[1] + 0.5 * t, origin[2] + 0.3 * t]
        })
        .collect();

    c.bench_function("stepper_step_local_frame", |b| {
        b.iter(|| {
            for position in &positions {
                black_box(stepper.step(black_box(*position)).unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_stack_direct,
    bench_client_pinned,
    bench_stepper_local_frame,
);
criterion_main!(benches);
