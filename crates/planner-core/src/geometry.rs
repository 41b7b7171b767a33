//! Per-layer shape inference.
//!
//! [`LayerGeometry::derive`] turns an input shape, a layer module and the
//! hardware description into every dimension the external tools need, and
//! the output shape forwarded to the next layer.
//!
//! Output width/height follow the convolution arithmetic
//! `(in + pad - kernel) / stride + 1`. Convolution and fully-connected layers
//! count padding on both sides (`2 * padding`); max-pool and adaptive pool
//! count it once.

use crate::error::{PlannerError, Result};
use crate::hardware::{HardwareSpec, PeDim, PeStructure};
use crate::layer::{LayerKind, LayerModule, TensorShape};

/// Fully derived parameters of one layer.
///
/// Hardware values are copied in at derivation time; the geometry does not
/// observe later changes to the [`HardwareSpec`] it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGeometry {
    pub layer_name: String,
    pub kind: LayerKind,

    pub batch: u32,
    pub input_channel: u32,
    pub input_width: u32,
    pub input_height: u32,

    pub stride: u32,
    pub kernel_width: u32,
    pub kernel_height: u32,
    pub padding_width: u32,
    pub padding_height: u32,

    pub output_channel: u32,
    pub output_width: u32,
    pub output_height: u32,

    pub mac_cycles: u32,
    pub frequency: f64,
    pub bandwidth: f64,
    pub mac_energy: f64,
    pub on_chip_energy: f64,
    pub off_chip_energy: f64,
    pub input_mem_size: f64,
    pub weight_mem_size: f64,
    pub output_mem_size: f64,
    pub pe_dim: PeDim,
    pub pe_strt: PeStructure,
}

/// Kernel/stride/padding/channel parameters chosen by layer kind.
struct KindParams {
    input_channel: u32,
    input_width: u32,
    input_height: u32,
    stride: u32,
    kernel: (u32, u32),
    padding: (u32, u32),
    output_channel: u32,
}

/// How padding enters the output-size formula.
#[derive(Clone, Copy)]
enum PaddingRule {
    Double,
    Single,
    PassThrough,
}

impl LayerGeometry {
    /// Derives the geometry of `module` applied to `input`.
    ///
    /// # Errors
    ///
    /// - `PlannerError::Value` if the input is not square, the channel or
    ///   feature count disagrees with the module, the stride is zero, or the
    ///   kernel does not fit the padded input.
    /// - `PlannerError::UnsupportedLayer` for a module with no inference rule.
    pub fn derive(
        layer_name: &str,
        input: TensorShape,
        module: &LayerModule,
        hw: &HardwareSpec,
    ) -> Result<Self> {
        if input.width != input.height {
            return Err(PlannerError::Value(format!(
                "layer '{layer_name}': input width {} differs from height {}",
                input.width, input.height
            )));
        }

        let params = kind_params(layer_name, input, module)?;
        let kind = module.kind();

        let rule = match kind {
            LayerKind::Convolution | LayerKind::FullyConnected => PaddingRule::Double,
            LayerKind::MaxPool | LayerKind::AdaptiveAvgPool => PaddingRule::Single,
            _ => PaddingRule::PassThrough,
        };

        let (output_width, output_height) = match rule {
            PaddingRule::PassThrough => (params.input_width, params.input_height),
            PaddingRule::Double | PaddingRule::Single => {
                if params.stride == 0 {
                    return Err(PlannerError::Value(format!(
                        "layer '{layer_name}': stride must be positive"
                    )));
                }
                let factor = if matches!(rule, PaddingRule::Double) { 2 } else { 1 };
                let width = output_extent(
                    layer_name,
                    params.input_width,
                    factor,
                    params.padding.1,
                    params.kernel.1,
                    params.stride,
                )?;
                let height = output_extent(
                    layer_name,
                    params.input_height,
                    factor,
                    params.padding.0,
                    params.kernel.0,
                    params.stride,
                )?;
                (width, height)
            }
        };

        let [input_mem_size, weight_mem_size, output_mem_size] = hw.mem_size();

        Ok(LayerGeometry {
            layer_name: layer_name.to_string(),
            kind,
            batch: input.batch,
            input_channel: params.input_channel,
            input_width: params.input_width,
            input_height: params.input_height,
            stride: params.stride,
            kernel_width: params.kernel.1,
            kernel_height: params.kernel.0,
            padding_width: params.padding.1,
            padding_height: params.padding.0,
            output_channel: params.output_channel,
            output_width,
            output_height,
            mac_cycles: hw.mac_cycles(),
            frequency: hw.frequency(),
            bandwidth: hw.bandwidth(),
            mac_energy: hw.mac_energy(),
            on_chip_energy: hw.on_chip_energy_32(),
            off_chip_energy: hw.off_chip_energy_32(),
            input_mem_size,
            weight_mem_size,
            output_mem_size,
            pe_dim: hw.pe_dim().clone(),
            pe_strt: hw.pe_strt().clone(),
        })
    }

    /// Shape handed to the next layer.
    pub fn output_shape(&self) -> TensorShape {
        TensorShape::new(self.batch, self.output_channel, self.output_height, self.output_width)
    }

    /// Shape as seen by this layer after any flattening.
    pub fn input_shape(&self) -> TensorShape {
        TensorShape::new(self.batch, self.input_channel, self.input_height, self.input_width)
    }
}

fn kind_params(layer_name: &str, input: TensorShape, module: &LayerModule) -> Result<KindParams> {
    let unchanged = KindParams {
        input_channel: input.channel,
        input_width: input.width,
        input_height: input.height,
        stride: 1,
        kernel: (1, 1),
        padding: (0, 0),
        output_channel: input.channel,
    };

    let params = match module {
        LayerModule::Conv2d {
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
        } => {
            if input.channel != *in_channels {
                return Err(PlannerError::Value(format!(
                    "layer '{layer_name}': input has {} channels, module expects {in_channels}",
                    input.channel
                )));
            }
            KindParams {
                stride: stride.0,
                kernel: *kernel_size,
                padding: *padding,
                output_channel: *out_channels,
                ..unchanged
            }
        }
        LayerModule::Linear {
            in_features,
            out_features,
        } => {
            let input_channel = if input.width != 1 {
                u32::try_from(input.features()).map_err(|_| {
                    PlannerError::Value(format!(
                        "layer '{layer_name}': flattened input {} is too large",
                        input.features()
                    ))
                })?
            } else {
                input.channel
            };
            if input_channel != *in_features {
                return Err(PlannerError::Value(format!(
                    "layer '{layer_name}': input has {input_channel} features, module expects {in_features}"
                )));
            }
            KindParams {
                input_channel,
                input_width: 1,
                input_height: 1,
                output_channel: *out_features,
                ..unchanged
            }
        }
        LayerModule::MaxPool2d {
            kernel_size,
            stride,
            padding,
        } => KindParams {
            stride: *stride,
            kernel: (*kernel_size, *kernel_size),
            padding: (*padding, *padding),
            ..unchanged
        },
        LayerModule::AdaptiveAvgPool2d => KindParams {
            kernel: (input.height, input.width),
            ..unchanged
        },
        LayerModule::ReLU | LayerModule::Dropout | LayerModule::BatchNorm2d { .. } => unchanged,
        LayerModule::Unsupported(name) => {
            return Err(PlannerError::UnsupportedLayer(name.clone()));
        }
    };

    Ok(params)
}

/// `(input + factor * padding - kernel) / stride + 1`, computed in `i64`.
fn output_extent(
    layer_name: &str,
    input: u32,
    factor: u32,
    padding: u32,
    kernel: u32,
    stride: u32,
) -> Result<u32> {
    let padded = i64::from(input) + i64::from(factor) * i64::from(padding);
    let span = padded - i64::from(kernel);
    if span < 0 {
        return Err(PlannerError::Value(format!(
            "layer '{layer_name}': kernel {kernel} does not fit input {input} with padding {padding}"
        )));
    }
    u32::try_from(span / i64::from(stride) + 1).map_err(|_| {
        PlannerError::Value(format!(
            "layer '{layer_name}': output size overflows with padding {padding}"
        ))
    })
}
