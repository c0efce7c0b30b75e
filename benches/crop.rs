use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ghostrelay::{crop_to_fill, stream_geometry, BorderColor, Size};

fn bench_crop(c: &mut Criterion) {
    let control = Size::new(640.0, 480.0);
    let video = Size::new(1920.0, 1080.0);

    c.bench_function("crop_to_fill", |b| {
        b.iter(|| crop_to_fill(black_box(control), black_box(video)))
    });

    c.bench_function("stream_geometry", |b| {
        b.iter(|| {
            stream_geometry(
                black_box(control),
                black_box(video),
                BorderColor::OPAQUE_BLACK,
            )
        })
    });
}

criterion_group!(benches, bench_crop);
criterion_main!(benches);
