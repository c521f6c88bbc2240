//! Transposed-convolution upsampling block.

use burn::{
    module::Module,
    nn::conv::{ConvTranspose2d, ConvTranspose2dConfig},
    tensor::{Tensor, backend::Backend},
};

use super::Block;
use crate::errors::NetworkError;
use crate::layers::shape::ensure_channels;

/// Configuration for an [`Upsampling`] block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsamplingConfig {
    pub in_channels: usize,
    pub out_channels: usize,
}

impl UpsamplingConfig {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Upsampling<B>, NetworkError> {
        if self.in_channels == 0 || self.out_channels == 0 {
            return Err(NetworkError::invalid_config(format!(
                "upsampling channels must be non-zero, got {} -> {}",
                self.in_channels, self.out_channels
            )));
        }

        // 2x2 kernel, stride 2, no padding: each input pixel maps to a 2x2 patch.
        let upsample = ConvTranspose2dConfig::new([self.in_channels, self.out_channels], [2, 2])
            .with_stride([2, 2])
            .init(device);

        Ok(Upsampling {
            upsample,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
        })
    }
}

/// Doubles height and width with a single transposed convolution.
#[derive(Module, Debug)]
pub struct Upsampling<B: Backend> {
    upsample: ConvTranspose2d<B>,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> Upsampling<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        ensure_channels("upsampling input", &input, self.in_channels)?;
        Ok(self.upsample.forward(input))
    }
}

impl<B: Backend> Block<B> for Upsampling<B> {
    type Input = Tensor<B, 4>;

    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn out_channels(&self) -> usize {
        self.out_channels
    }

    fn evaluate(&self, input: Self::Input) -> Result<Tensor<B, 4>, NetworkError> {
        self.forward(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::DownsamplingConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_upsampling_doubles_spatial_dims() {
        let device = <TestBackend as Backend>::Device::default();
        let up: Upsampling<TestBackend> = UpsamplingConfig::new(32, 16).init(&device).unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([2, 32, 5, 7], &device);
        let output = up.evaluate(input).unwrap();

        assert_eq!(output.dims(), [2, 16, 10, 14]);
    }

    #[test]
    fn test_upsampling_inverts_downsampling_geometry() {
        let device = <TestBackend as Backend>::Device::default();
        let down = DownsamplingConfig::new(8, 16).init::<TestBackend>(&device).unwrap();
        let up = UpsamplingConfig::new(16, 8).init::<TestBackend>(&device).unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([1, 8, 20, 12], &device);
        let output = up.forward(down.forward(input).unwrap()).unwrap();

        assert_eq!(output.dims(), [1, 8, 20, 12]);
    }

    #[test]
    fn test_upsampling_rejects_zero_channels() {
        let device = <TestBackend as Backend>::Device::default();
        let result = UpsamplingConfig::new(0, 8).init::<TestBackend>(&device);

        assert!(matches!(result, Err(NetworkError::InvalidConfig { .. })));
    }
}
