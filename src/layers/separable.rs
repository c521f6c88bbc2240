//! Depthwise-separable convolution.

use burn::{
    module::Module,
    nn::{
        PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    tensor::{Tensor, backend::Backend},
};

use crate::errors::NetworkError;
use crate::layers::shape::{conv_output_size, ensure_channels};

/// Configuration for a [`SeparableConv`] block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparableConvConfig {
    /// Number of input channels (also the depthwise group count).
    pub in_channels: usize,
    /// Number of output channels produced by the pointwise convolution.
    pub out_channels: usize,
    /// Square kernel size of the depthwise convolution.
    pub kernel_size: usize,
    /// Stride of the depthwise convolution.
    pub stride: usize,
    /// Zero padding applied on every spatial border.
    pub padding: usize,
}

impl SeparableConvConfig {
    /// Creates a stride-1, unpadded configuration.
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            stride: 1,
            padding: 0,
        }
    }

    /// Sets the stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Sets the padding.
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    fn validate(&self) -> Result<(), NetworkError> {
        if self.in_channels == 0 || self.out_channels == 0 {
            return Err(NetworkError::invalid_config(format!(
                "separable conv channels must be non-zero, got {} -> {}",
                self.in_channels, self.out_channels
            )));
        }
        if self.kernel_size == 0 || self.stride == 0 {
            return Err(NetworkError::invalid_config(format!(
                "separable conv kernel and stride must be non-zero, got kernel {} stride {}",
                self.kernel_size, self.stride
            )));
        }
        Ok(())
    }

    /// Initializes the block on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<SeparableConv<B>, NetworkError> {
        self.validate()?;

        let kernel = [self.kernel_size, self.kernel_size];
        // One filter per input channel, no cross-channel mixing.
        let depthwise = Conv2dConfig::new([self.in_channels, self.in_channels], kernel)
            .with_stride([self.stride, self.stride])
            .with_padding(PaddingConfig2d::Explicit(self.padding, self.padding))
            .with_groups(self.in_channels)
            .with_bias(false)
            .init(device);
        let pointwise = Conv2dConfig::new([self.in_channels, self.out_channels], [1, 1])
            .with_bias(true)
            .init(device);

        Ok(SeparableConv {
            depthwise,
            pointwise,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            kernel_size: self.kernel_size,
            stride: self.stride,
            padding: self.padding,
        })
    }
}

/// Depthwise convolution followed by a 1x1 pointwise convolution.
#[derive(Module, Debug)]
pub struct SeparableConv<B: Backend> {
    depthwise: Conv2d<B>,
    pointwise: Conv2d<B>,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
}

impl<B: Backend> SeparableConv<B> {
    /// Performs the forward pass.
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        ensure_channels("separable conv input", &input, self.in_channels)?;
        let x = self.depthwise.forward(input);
        Ok(self.pointwise.forward(x))
    }

    /// Spatial size produced for an `(height, width)` input.
    pub fn output_size(&self, height: usize, width: usize) -> (usize, usize) {
        (
            conv_output_size(height, self.kernel_size, self.stride, self.padding),
            conv_output_size(width, self.kernel_size, self.stride, self.padding),
        )
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    #[cfg(test)]
    pub(crate) fn zeroed(self) -> Self {
        Self {
            depthwise: crate::layers::zero_conv(self.depthwise),
            pointwise: crate::layers::zero_conv(self.pointwise),
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
    fn test_separable_config_defaults() {
        let config = SeparableConvConfig::new(8, 16, 3).with_padding(1);

        assert_eq!(config.stride, 1);
        assert_eq!(config.padding, 1);
        assert_eq!(config.kernel_size, 3);
    }

    #[test]
    fn test_depthwise_has_one_filter_per_channel_and_no_bias() {
        let device = <TestBackend as Backend>::Device::default();
        let block: SeparableConv<TestBackend> = SeparableConvConfig::new(6, 10, 5)
            .with_padding(2)
            .init(&device)
            .expect("valid config");

        assert_eq!(block.depthwise.weight.val().dims(), [6, 1, 5, 5]);
        assert!(block.depthwise.bias.is_none());
        assert_eq!(block.pointwise.weight.val().dims(), [10, 6, 1, 1]);
        assert!(block.pointwise.bias.is_some());
    }

    #[test]
    fn test_separable_forward_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let block: SeparableConv<TestBackend> = SeparableConvConfig::new(4, 8, 3)
            .with_stride(2)
            .with_padding(1)
            .init(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([2, 4, 16, 12], &device);
        let output = block.forward(input).unwrap();

        assert_eq!(output.dims(), [2, 8, 8, 6]);
        assert_eq!(block.output_size(16, 12), (8, 6));
    }

    #[test]
    fn test_separable_rejects_wrong_input_channels() {
        let device = <TestBackend as Backend>::Device::default();
        let block: SeparableConv<TestBackend> =
            SeparableConvConfig::new(4, 8, 3).init(&device).unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 8, 8], &device);
        let result = block.forward(input);

        assert!(matches!(
            result,
            Err(NetworkError::ChannelMismatch {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_separable_rejects_zero_sizes() {
        let device = <TestBackend as Backend>::Device::default();

        let zero_channels = SeparableConvConfig::new(0, 8, 3).init::<TestBackend>(&device);
        assert!(matches!(zero_channels, Err(NetworkError::InvalidConfig { .. })));

        let zero_stride = SeparableConvConfig::new(4, 8, 3)
            .with_stride(0)
            .init::<TestBackend>(&device);
        assert!(matches!(zero_stride, Err(NetworkError::InvalidConfig { .. })));
    }

    #[test]
    fn test_zeroed_block_outputs_zeros() {
        let device = <TestBackend as Backend>::Device::default();
        let block: SeparableConv<TestBackend> = SeparableConvConfig::new(3, 5, 3)
            .with_padding(1)
            .init(&device)
            .unwrap()
            .zeroed();

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 4, 4], &device);
        let output: Vec<f32> = block.forward(input).unwrap().to_data().to_vec().unwrap();

        assert!(output.iter().all(|v| *v == 0.0));
    }
}
