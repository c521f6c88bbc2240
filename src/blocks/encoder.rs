//! Residual encoder block.

use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};

use super::{Block, bottleneck_channels};
use crate::errors::NetworkError;
use crate::layers::shape::{checked_add, ensure_channels};
use crate::layers::{Activation, SeparableConv, SeparableConvConfig};

/// Configuration for an [`Encoder`] block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub in_channels: usize,
    pub out_channels: usize,
}

impl EncoderConfig {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
        }
    }

    /// Initializes the block.
    ///
    /// Fails with [`NetworkError::IndivisibleChannels`] when `out_channels`
    /// is not a multiple of four.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Encoder<B>, NetworkError> {
        let bottleneck = bottleneck_channels("encoder", self.out_channels)?;

        let sepconv = SeparableConvConfig::new(self.in_channels, bottleneck, 5)
            .with_padding(2)
            .init(device)?;
        let sepconv2 = SeparableConvConfig::new(bottleneck, self.out_channels, 5)
            .with_padding(2)
            .init(device)?;
        let shortcut = if self.in_channels == self.out_channels {
            Shortcut::Identity(self.in_channels)
        } else {
            Shortcut::Projection(
                SeparableConvConfig::new(self.in_channels, self.out_channels, 3)
                    .with_padding(1)
                    .init(device)?,
            )
        };

        Ok(Encoder {
            sepconv,
            sepconv2,
            shortcut,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
        })
    }
}

/// The residual path of an [`Encoder`].
#[derive(Module, Debug)]
pub enum Shortcut<B: Backend> {
    /// Input passed through unchanged; holds the channel count.
    Identity(usize),
    /// Input projected to the output channel count.
    Projection(SeparableConv<B>),
}

impl<B: Backend> Shortcut<B> {
    fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        match self {
            Shortcut::Identity(_) => Ok(input),
            Shortcut::Projection(proj) => proj.forward(input),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Shortcut::Identity(_))
    }
}

/// Two 5x5 separable convolutions around a bottleneck, plus a shortcut.
///
/// `relu(sep2(relu(sep1(x))) + shortcut(x))`
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    sepconv: SeparableConv<B>,
    sepconv2: SeparableConv<B>,
    shortcut: Shortcut<B>,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        ensure_channels("encoder input", &input, self.in_channels)?;

        let branch = self.shortcut.forward(input.clone())?;
        let x = self.sepconv.forward(input)?;
        let x = Activation::Relu.apply(x);
        let x = self.sepconv2.forward(x)?;
        let x = checked_add("encoder residual", x, branch)?;
        Ok(Activation::Relu.apply(x))
    }

    pub fn shortcut(&self) -> &Shortcut<B> {
        &self.shortcut
    }

    #[cfg(test)]
    pub(crate) fn zeroed(self) -> Self {
        Self {
            sepconv: self.sepconv.zeroed(),
            sepconv2: self.sepconv2.zeroed(),
            ..self
        }
    }
}

impl<B: Backend> Block<B> for Encoder<B> {
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
