use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use planner_core::workspace::Workspace;
use planner_core::{ArgvBuilder, HardwareSpec, LayerGeometry, Network, dataset};

const VGG16: &str = include_str!("../tests/data/vgg16.json");
const HW: &str = include_str!("../../../hwcfg/simd.json");

fn shape_inference_benchmark(c: &mut Criterion) {
    let network = Network::from_json(VGG16).expect("vgg16 description");
    let hw = HardwareSpec::from_json(HW).expect("hardware description");
    let workspace = Workspace::default();

    let mut group = c.benchmark_group("vgg16");

    group.bench_function("derive", |b| {
        b.iter(|| {
            let mut data = dataset::imagenet(1);
            for layer in &network.layers {
                let geometry = LayerGeometry::derive(&layer.name, data, &layer.module, &hw).unwrap();
                data = geometry.output_shape();
            }
            black_box(data)
        });
    });

    group.bench_function("derive_and_argv", |b| {
        b.iter(|| {
            let mut data = dataset::imagenet(1);
            let mut tokens = 0;
            for layer in &network.layers {
                let geometry = LayerGeometry::derive(&layer.name, data, &layer.module, &hw).unwrap();
                let paths = workspace.layer_paths(&layer.name);
                let builder = ArgvBuilder::new(&geometry, &paths);
                tokens += builder.codegen(false).len() + builder.profiler(false, false).len();
                data = geometry.output_shape();
            }
            black_box(tokens)
        });
    });

    group.finish();
}

criterion_group!(benches, shape_inference_benchmark);
criterion_main!(benches);
