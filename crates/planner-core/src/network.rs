//! Network descriptions: an ordered list of named layer modules.
//!
//! # JSON format
//! ```json
//! {
//!   "name": "alexnet",
//!   "layers": [
//!     { "name": "conv_1", "type": "conv2d", "in_channels": 3, "out_channels": 96,
//!       "kernel_size": 11, "stride": 4, "padding": 0 },
//!     { "name": "ReLU", "type": "relu" },
//!     { "name": "pool_1", "type": "maxpool2d", "kernel_size": 3, "stride": 2 }
//!   ]
//! }
//! ```
//!
//! `kernel_size`, `stride` and `padding` take either an integer or an
//! `[height, width]` pair. Unknown layer types are kept as
//! [`LayerModule::Unsupported`] so that they fail at shape inference with
//! the type name.

use std::path::Path;

use serde::Deserialize;

use crate::error::{PlannerError, Result};
use crate::layer::LayerModule;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Pair {
    Square(u32),
    HeightWidth([u32; 2]),
}

impl Pair {
    fn hw(self) -> (u32, u32) {
        match self {
            Pair::Square(v) => (v, v),
            Pair::HeightWidth([h, w]) => (h, w),
        }
    }

    fn square(self, layer: &str, field: &str) -> Result<u32> {
        match self {
            Pair::Square(v) => Ok(v),
            Pair::HeightWidth([h, w]) if h == w => Ok(h),
            Pair::HeightWidth(_) => Err(PlannerError::Config(format!(
                "layer '{layer}': {field} must be square for pooling layers"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    in_channels: Option<u32>,
    out_channels: Option<u32>,
    in_features: Option<u32>,
    out_features: Option<u32>,
    num_features: Option<u32>,
    kernel_size: Option<Pair>,
    stride: Option<Pair>,
    padding: Option<Pair>,
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    name: String,
    layers: Vec<RawLayer>,
}

/// One named layer of a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLayer {
    pub name: String,
    pub module: LayerModule,
}

impl NetworkLayer {
    pub fn new(name: impl Into<String>, module: LayerModule) -> Self {
        Self {
            name: name.into(),
            module,
        }
    }
}

/// Layers in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub layers: Vec<NetworkLayer>,
}

impl Network {
    /// Loads a network description from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Config` if the file cannot be read or parsed,
    /// or a layer lacks a parameter its type requires.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlannerError::Config(format!("cannot read network '{}': {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawNetwork = serde_json::from_str(json)
            .map_err(|e| PlannerError::Config(format!("network parse error: {e}")))?;

        let layers = raw
            .layers
            .into_iter()
            .map(|layer| {
                let module = module_from_raw(&layer)?;
                Ok(NetworkLayer::new(layer.name, module))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Network {
            name: raw.name,
            layers,
        })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

fn required<T>(value: Option<T>, layer: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| PlannerError::Config(format!("layer '{layer}': missing '{field}'")))
}

fn module_from_raw(raw: &RawLayer) -> Result<LayerModule> {
    let name = raw.name.as_str();
    let module = match raw.kind.to_lowercase().as_str() {
        "conv2d" | "conv" | "convolution" => LayerModule::Conv2d {
            in_channels: required(raw.in_channels, name, "in_channels")?,
            out_channels: required(raw.out_channels, name, "out_channels")?,
            kernel_size: required(raw.kernel_size, name, "kernel_size")?.hw(),
            stride: raw.stride.map_or((1, 1), Pair::hw),
            padding: raw.padding.map_or((0, 0), Pair::hw),
        },
        "linear" | "fc" | "dense" | "fully_connected" => LayerModule::Linear {
            in_features: required(raw.in_features, name, "in_features")?,
            out_features: required(raw.out_features, name, "out_features")?,
        },
        "maxpool2d" | "maxpool" | "max_pool" => {
            let kernel_size = required(raw.kernel_size, name, "kernel_size")?.square(name, "kernel_size")?;
            let stride = match raw.stride {
                Some(stride) => stride.square(name, "stride")?,
                None => kernel_size,
            };
            let padding = match raw.padding {
                Some(padding) => padding.square(name, "padding")?,
                None => 0,
            };
            LayerModule::MaxPool2d {
                kernel_size,
                stride,
                padding,
            }
        }
        "adaptiveavgpool2d" | "adaptive_avg_pool" | "avgpool" => LayerModule::AdaptiveAvgPool2d,
        "relu" => LayerModule::ReLU,
        "dropout" => LayerModule::Dropout,
        "batchnorm2d" | "batchnorm" | "bn" => LayerModule::BatchNorm2d {
            num_features: raw.num_features.unwrap_or_default(),
        },
        _ => LayerModule::Unsupported(raw.kind.clone()),
    };
    Ok(module)
}
