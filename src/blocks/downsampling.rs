//! Strided downsampling block.

use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};

use super::{Block, bottleneck_channels};
use crate::errors::NetworkError;
use crate::layers::shape::{checked_add, ensure_channels};
use crate::layers::{Activation, SeparableConv, SeparableConvConfig};

/// Configuration for a [`Downsampling`] block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownsamplingConfig {
    pub in_channels: usize,
    pub out_channels: usize,
}

impl DownsamplingConfig {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
        }
    }

    /// Initializes the block. `out_channels` must be a multiple of four.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Downsampling<B>, NetworkError> {
        let bottleneck = bottleneck_channels("downsampling", self.out_channels)?;

        let sepconv = SeparableConvConfig::new(self.in_channels, bottleneck, 5)
            .with_stride(2)
            .with_padding(2)
            .init(device)?;
        let sepconv2 = SeparableConvConfig::new(bottleneck, self.out_channels, 5)
            .with_padding(2)
            .init(device)?;
        let branchconv = SeparableConvConfig::new(self.in_channels, self.out_channels, 3)
            .with_stride(2)
            .with_padding(1)
            .init(device)?;

        Ok(Downsampling {
            sepconv,
            sepconv2,
            branchconv,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
        })
    }
}

/// Halves the spatial resolution: a strided bottleneck path summed with a
/// strided 3x3 projection of the input.
#[derive(Module, Debug)]
pub struct Downsampling<B: Backend> {
    sepconv: SeparableConv<B>,
    sepconv2: SeparableConv<B>,
    branchconv: SeparableConv<B>,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> Downsampling<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        ensure_channels("downsampling input", &input, self.in_channels)?;

        let branch = self.branchconv.forward(input.clone())?;
        let x = self.sepconv.forward(input)?;
        let x = Activation::Relu.apply(x);
        let x = self.sepconv2.forward(x)?;
        checked_add("downsampling branch", x, branch)
    }

    /// Spatial size produced for an `(height, width)` input.
    pub fn output_size(&self, height: usize, width: usize) -> (usize, usize) {
        // The 5x5/pad 2 and 3x3/pad 1 stride-2 paths agree for every input size.
        self.branchconv.output_size(height, width)
    }
}

impl<B: Backend> Block<B> for Downsampling<B> {
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
