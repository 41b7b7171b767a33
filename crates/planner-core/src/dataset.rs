//! Input tensor shapes of common datasets.

use crate::layer::TensorShape;

/// ImageNet: `batch x 3 x 224 x 224`.
pub fn imagenet(batch: u32) -> TensorShape {
    TensorShape::new(batch, 3, 224, 224)
}

/// Darknet: `batch x 3 x 256 x 256`.
pub fn darknet(batch: u32) -> TensorShape {
    TensorShape::new(batch, 3, 256, 256)
}

/// COCO: `batch x 3 x 608 x 608`.
pub fn coco(batch: u32) -> TensorShape {
    TensorShape::new(batch, 3, 608, 608)
}

/// Looks up a dataset shape by name.
pub fn by_name(name: &str, batch: u32) -> Option<TensorShape> {
    match name.to_lowercase().as_str() {
        "imagenet" => Some(imagenet(batch)),
        "darknet" => Some(darknet(batch)),
        "coco" => Some(coco(batch)),
        _ => None,
    }
}
