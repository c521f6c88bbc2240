//! Plain convolution layer with activation, used for the stem and output head.

use crate::errors::NetworkError;
use crate::layers::Activation;
use crate::layers::shape::ensure_channels;
use burn::{
    module::Module,
    nn::{
        PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    tensor::{Tensor, backend::Backend},
};

/// Configuration for a [`ConvLayer`].
#[derive(Debug, Clone)]
pub struct ConvLayerConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output channels.
    pub out_channels: usize,
    /// Square kernel size.
    pub kernel_size: usize,
    /// Zero padding applied on every spatial border.
    pub padding: usize,
    /// Activation function to apply after the convolution.
    pub activation: Activation,
}

impl ConvLayerConfig {
    /// Creates a new ConvLayerConfig with no padding and no activation.
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            padding: 0,
            activation: Activation::None,
        }
    }

    /// Sets the padding.
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the activation function.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Initializes the layer with the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ConvLayer<B>, NetworkError> {
        if self.in_channels == 0 || self.out_channels == 0 || self.kernel_size == 0 {
            return Err(NetworkError::invalid_config(format!(
                "conv layer needs non-zero channels and kernel, got {} -> {} with kernel {}",
                self.in_channels, self.out_channels, self.kernel_size
            )));
        }

        let conv = Conv2dConfig::new(
            [self.in_channels, self.out_channels],
            [self.kernel_size, self.kernel_size],
        )
        .with_padding(PaddingConfig2d::Explicit(self.padding, self.padding))
        .init(device);

        Ok(ConvLayer {
            conv,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            activation_id: self.activation.to_id(),
        })
    }
}

/// A stride-1 convolution with bias followed by an optional activation.
#[derive(Module, Debug)]
pub struct ConvLayer<B: Backend> {
    conv: Conv2d<B>,
    in_channels: usize,
    out_channels: usize,
    /// Activation function ID (0=None, 1=Relu).
    activation_id: u8,
}

impl<B: Backend> ConvLayer<B> {
    /// Performs the forward pass.
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        ensure_channels("conv layer input", &input, self.in_channels)?;
        let output = self.conv.forward(input);
        Ok(Activation::from_id(self.activation_id).apply(output))
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Returns the activation function.
    pub fn activation(&self) -> Activation {
        Activation::from_id(self.activation_id)
    }

    #[cfg(test)]
    pub(crate) fn zeroed(self) -> Self {
        Self {
            conv: crate::layers::zero_conv(self.conv),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_conv_layer_config_creation() {
        let config = ConvLayerConfig::new(4, 16, 3)
            .with_padding(1)
            .with_activation(Activation::Relu);

        assert_eq!(config.in_channels, 4);
        assert_eq!(config.out_channels, 16);
        assert_eq!(config.activation, Activation::Relu);
    }

    #[test]
    fn test_conv_layer_forward_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let layer: ConvLayer<TestBackend> = ConvLayerConfig::new(4, 16, 3)
            .with_padding(1)
            .with_activation(Activation::Relu)
            .init(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([2, 4, 8, 8], &device);
        let output = layer.forward(input).unwrap();

        assert_eq!(output.dims(), [2, 16, 8, 8]);
        assert_eq!(layer.activation(), Activation::Relu);
    }

    #[test]
    fn test_relu_conv_output_is_non_negative() {
        let device = <TestBackend as Backend>::Device::default();
        let layer: ConvLayer<TestBackend> = ConvLayerConfig::new(2, 3, 3)
            .with_padding(1)
            .with_activation(Activation::Relu)
            .init(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::random(
            [1, 2, 6, 6],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let output: Vec<f32> = layer.forward(input).unwrap().to_data().to_vec().unwrap();

        assert!(output.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_conv_layer_rejects_zero_kernel() {
        let device = <TestBackend as Backend>::Device::default();
        let result = ConvLayerConfig::new(4, 16, 0).init::<TestBackend>(&device);

        assert!(matches!(result, Err(NetworkError::InvalidConfig { .. })));
    }
}
