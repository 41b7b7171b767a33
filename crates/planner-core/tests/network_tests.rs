use planner_core::{HardwareSpec, LayerGeometry, LayerKind, Network, TensorShape, dataset};

const VGG16: &str = include_str!("data/vgg16.json");

fn hw() -> HardwareSpec {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../hwcfg/simd.json");
    HardwareSpec::load(path).unwrap()
}

#[test]
fn test_vgg16_shape_propagation() {
    let network = Network::from_json(VGG16).unwrap();
    let hw = hw();

    let mut data = dataset::imagenet(1);
    let mut conv_outputs = Vec::new();
    for layer in &network.layers {
        let geometry = LayerGeometry::derive(&layer.name, data, &layer.module, &hw).unwrap();
        if geometry.kind == LayerKind::Convolution {
            conv_outputs.push(geometry.output_width);
        }
        data = geometry.output_shape();
    }

    assert_eq!(data, TensorShape::new(1, 1000, 1, 1));
    assert_eq!(conv_outputs.len(), 13);
    assert_eq!(conv_outputs[..2], [224, 224]);
    assert_eq!(conv_outputs[12], 14);
}

#[test]
fn test_vgg16_counts_hardware_modeled_layers() {
    let network = Network::from_json(VGG16).unwrap();
    let modeled = network
        .layers
        .iter()
        .filter(|l| l.module.kind().is_hardware_modeled())
        .count();
    assert_eq!(modeled, 16);
}

#[test]
fn test_load_from_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/vgg16.json");
    let network = Network::load(path).unwrap();
    assert_eq!(network.name, "vgg16");
    assert_eq!(network.len(), 38);
}
