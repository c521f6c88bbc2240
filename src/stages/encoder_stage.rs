//! One level of the encoder pyramid.

use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};
use serde::{Deserialize, Serialize};

use crate::blocks::{
    Block, Downsampling, DownsamplingConfig, Encoder, EncoderConfig, evaluate_chain,
};
use crate::errors::NetworkError;
use crate::layers::shape::ensure_channels;

/// Configuration for an [`EncoderStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderStageConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    /// Number of channel-preserving encoder blocks after the downsampling.
    pub num_encoders: usize,
}

impl EncoderStageConfig {
    pub fn new(in_channels: usize, out_channels: usize, num_encoders: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            num_encoders,
        }
    }

    /// Initializes the stage. Each repeated encoder gets its own weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<EncoderStage<B>, NetworkError> {
        let downsampling =
            DownsamplingConfig::new(self.in_channels, self.out_channels).init(device)?;
        let encoder = EncoderConfig::new(self.out_channels, self.out_channels);
        let encoders = (0..self.num_encoders)
            .map(|_| encoder.init(device))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EncoderStage {
            downsampling,
            encoders,
        })
    }
}

/// Downsampling followed by `num_encoders` residual encoder blocks.
#[derive(Module, Debug)]
pub struct EncoderStage<B: Backend> {
    downsampling: Downsampling<B>,
    encoders: Vec<Encoder<B>>,
}

impl<B: Backend> EncoderStage<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        let x = self.downsampling.evaluate(input)?;
        let x = evaluate_chain(&self.encoders, x)?;
        ensure_channels("encoder stage output", &x, self.out_channels())?;
        Ok(x)
    }

    /// Number of repeated encoder blocks.
    pub fn depth(&self) -> usize {
        self.encoders.len()
    }
}

impl<B: Backend> Block<B> for EncoderStage<B> {
    type Input = Tensor<B, 4>;

    fn in_channels(&self) -> usize {
        self.downsampling.in_channels()
    }

    fn out_channels(&self) -> usize {
        self.downsampling.out_channels()
    }

    fn evaluate(&self, input: Self::Input) -> Result<Tensor<B, 4>, NetworkError> {
        self.forward(input)
    }
}
