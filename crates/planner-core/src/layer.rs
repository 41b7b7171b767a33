//! Layer inputs: tensor shapes and layer module descriptors.

use std::fmt;

/// 4-D activation shape in NCHW order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorShape {
    pub batch: u32,
    pub channel: u32,
    pub height: u32,
    pub width: u32,
}

impl TensorShape {
    pub const fn new(batch: u32, channel: u32, height: u32, width: u32) -> Self {
        Self {
            batch,
            channel,
            height,
            width,
        }
    }

    /// Number of elements per batch entry.
    pub fn features(&self) -> u64 {
        u64::from(self.channel) * u64::from(self.height) * u64::from(self.width)
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.batch, self.channel, self.height, self.width)
    }
}

/// Operation category of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Convolution,
    FullyConnected,
    MaxPool,
    AdaptiveAvgPool,
    Activation,
    Dropout,
    BatchNorm,
    Unsupported,
}

impl LayerKind {
    /// Whether the layer has a generated, compiled and simulated
    /// representation. Everything else only runs shape inference.
    pub fn is_hardware_modeled(self) -> bool {
        matches!(self, LayerKind::Convolution | LayerKind::FullyConnected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Convolution => "Conv2d",
            LayerKind::FullyConnected => "Linear",
            LayerKind::MaxPool => "MaxPool2d",
            LayerKind::AdaptiveAvgPool => "AdaptiveAvgPool2d",
            LayerKind::Activation => "ReLU",
            LayerKind::Dropout => "Dropout",
            LayerKind::BatchNorm => "BatchNorm2d",
            LayerKind::Unsupported => "Unsupported",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared parameters of a layer module.
///
/// Pairs are `(height, width)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerModule {
    Conv2d {
        in_channels: u32,
        out_channels: u32,
        kernel_size: (u32, u32),
        stride: (u32, u32),
        padding: (u32, u32),
    },
    Linear {
        in_features: u32,
        out_features: u32,
    },
    MaxPool2d {
        kernel_size: u32,
        stride: u32,
        padding: u32,
    },
    AdaptiveAvgPool2d,
    ReLU,
    Dropout,
    BatchNorm2d {
        num_features: u32,
    },
    /// A module with no shape inference rule, carrying its type name.
    Unsupported(String),
}

impl LayerModule {
    /// Square convolution with the same kernel, stride and padding on both axes.
    pub fn conv2d(in_channels: u32, out_channels: u32, kernel: u32, stride: u32, padding: u32) -> Self {
        LayerModule::Conv2d {
            in_channels,
            out_channels,
            kernel_size: (kernel, kernel),
            stride: (stride, stride),
            padding: (padding, padding),
        }
    }

    pub fn linear(in_features: u32, out_features: u32) -> Self {
        LayerModule::Linear {
            in_features,
            out_features,
        }
    }

    pub fn max_pool2d(kernel_size: u32, stride: u32, padding: u32) -> Self {
        LayerModule::MaxPool2d {
            kernel_size,
            stride,
            padding,
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            LayerModule::Conv2d { .. } => LayerKind::Convolution,
            LayerModule::Linear { .. } => LayerKind::FullyConnected,
            LayerModule::MaxPool2d { .. } => LayerKind::MaxPool,
            LayerModule::AdaptiveAvgPool2d => LayerKind::AdaptiveAvgPool,
            LayerModule::ReLU => LayerKind::Activation,
            LayerModule::Dropout => LayerKind::Dropout,
            LayerModule::BatchNorm2d { .. } => LayerKind::BatchNorm,
            LayerModule::Unsupported(_) => LayerKind::Unsupported,
        }
    }

    /// Display name of the module type.
    pub fn type_name(&self) -> &str {
        match self {
            LayerModule::Unsupported(name) => name,
            other => other.kind().as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_modeled_kinds() {
        assert!(LayerModule::conv2d(3, 64, 3, 1, 1).kind().is_hardware_modeled());
        assert!(LayerModule::linear(4096, 1000).kind().is_hardware_modeled());
        assert!(!LayerModule::max_pool2d(2, 2, 0).kind().is_hardware_modeled());
        assert!(!LayerModule::ReLU.kind().is_hardware_modeled());
        assert!(!LayerModule::BatchNorm2d { num_features: 64 }.kind().is_hardware_modeled());
    }

    #[test]
    fn test_type_name() {
        assert_eq!(LayerModule::Dropout.type_name(), "Dropout");
        assert_eq!(LayerModule::Unsupported("GroupNorm".into()).type_name(), "GroupNorm");
    }

    #[test]
    fn test_tensor_shape_display() {
        let shape = TensorShape::new(1, 3, 224, 224);
        assert_eq!(shape.to_string(), "(1, 3, 224, 224)");
        assert_eq!(shape.features(), 150_528);
    }
}
