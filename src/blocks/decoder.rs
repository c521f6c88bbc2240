//! Channel-preserving residual refinement block.

use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};

use super::Block;
use crate::errors::NetworkError;
use crate::layers::shape::{checked_add, ensure_channels};
use crate::layers::{Activation, SeparableConv, SeparableConvConfig};

/// Configuration for a [`Decoder`] block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    pub in_channels: usize,
    pub out_channels: usize,
}

impl DecoderConfig {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
        }
    }

    /// Initializes the block.
    ///
    /// The shortcut is a pure identity, so `in_channels` must equal `out_channels`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Decoder<B>, NetworkError> {
        if self.in_channels != self.out_channels {
            return Err(NetworkError::invalid_config(format!(
                "decoder shortcut is an identity and needs in == out channels, got {} -> {}",
                self.in_channels, self.out_channels
            )));
        }

        let sepconv = SeparableConvConfig::new(self.in_channels, self.out_channels, 3)
            .with_padding(1)
            .init(device)?;
        let sepconv2 = SeparableConvConfig::new(self.out_channels, self.out_channels, 3)
            .with_padding(1)
            .init(device)?;

        Ok(Decoder {
            sepconv,
            sepconv2,
            channels: self.out_channels,
        })
    }
}

/// `sep2(relu(sep1(x))) + x` with 3x3 separable convolutions.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    sepconv: SeparableConv<B>,
    sepconv2: SeparableConv<B>,
    channels: usize,
}

impl<B: Backend> Decoder<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        ensure_channels("decoder input", &input, self.channels)?;

        let branch = input.clone();
        let x = self.sepconv.forward(input)?;
        let x = Activation::Relu.apply(x);
        let x = self.sepconv2.forward(x)?;
        checked_add("decoder residual", x, branch)
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

impl<B: Backend> Block<B> for Decoder<B> {
    type Input = Tensor<B, 4>;

    fn in_channels(&self) -> usize {
        self.channels
    }

    fn out_channels(&self) -> usize {
        self.channels
    }

    fn evaluate(&self, input: Self::Input) -> Result<Tensor<B, 4>, NetworkError> {
        self.forward(input)
    }
}
