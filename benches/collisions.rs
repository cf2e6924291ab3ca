use std::iter::repeat_with;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::dvec2;
use impulse2d::World;
use rand::Rng;

fn init_circle_world(num_bodies: usize) -> World {
    let mut world = World::new(2000.0, 2000.0, -10.0);
    let shape = world.add_shape(impulse2d::Shape::circle());
    let mut rng = rand::thread_rng();
    let pos_limit = 500.0;
    let vel_limit = 50.0;
    for _ in repeat_with(|| ()).take(num_bodies) {
        world.add_dynamic(
            shape,
            dvec2(
                1000.0 + rng.gen_range(-pos_limit..pos_limit),
                1000.0 + rng.gen_range(-pos_limit..pos_limit),
            ),
            dvec2(
                rng.gen_range(-vel_limit..vel_limit),
                rng.gen_range(-vel_limit..vel_limit),
            ),
            0.0,
            0.0,
            rng.gen_range(1.0..3.0),
            dvec2(10.0, 10.0),
        );
    }
    world
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_elem");
    for num_bodies in [32, 64, 128, 256, 512] {
        let initial_world = init_circle_world(num_bodies);
        group.bench_with_input(
            BenchmarkId::new("step many circles", num_bodies),
            &num_bodies,
            |b, _num_bodies| {
                b.iter(|| {
                    let dt = 1.0 / 60.0;
                    let mut world = initial_world.clone();
                    world.update(black_box(dt));
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
