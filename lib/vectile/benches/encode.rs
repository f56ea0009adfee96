use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use vectile::{Point, PointFeatureBuilder, PropertyValue, TileBuilder};

fn build_and_serialize(points: &[(i32, i32)]) -> Vec<u8> {
    let mut tile = TileBuilder::new();
    let id = tile.add_layer("bench", 2, 4096);
    for (i, &(x, y)) in points.iter().enumerate() {
        let mut feature = PointFeatureBuilder::new(tile.layer_mut(id));
        feature.set_integer_id(i as u64);
        feature.add_point(Point::new(x, y));
        feature.add_property("bucket", &PropertyValue::Uint((i % 16) as u64));
        feature.commit();
    }
    tile.serialize().unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let sizes = [10usize, 100, 1_000, 10_000];
    let seed = 0xC0FFEE;

    let mut group = c.benchmark_group("TileBuilder/point-features");
    for size in sizes.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let points: Vec<(i32, i32)> = (0..size)
                .map(|_| (rng.gen_range(0..4096), rng.gen_range(0..4096)))
                .collect();
            b.iter(|| build_and_serialize(&points));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
