//! One level of the decoder pyramid, fused with an encoder skip tensor.

use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};
use serde::{Deserialize, Serialize};

use crate::blocks::{Block, Decoder, DecoderConfig, Upsampling, UpsamplingConfig};
use crate::errors::NetworkError;
use crate::layers::shape::{checked_add, ensure_channels};
use crate::layers::{Activation, SeparableConv, SeparableConvConfig};

/// Configuration for a [`DecoderStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStageConfig {
    /// Channels of the incoming decoder-path tensor.
    pub in_channels: usize,
    /// Channels after upsampling, and of the fused output.
    pub out_channels: usize,
    /// Channels of the skip tensor supplied by the encoder side.
    pub skip_channels: usize,
}

impl DecoderStageConfig {
    pub fn new(in_channels: usize, out_channels: usize, skip_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            skip_channels,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DecoderStage<B>, NetworkError> {
        let decoder = DecoderConfig::new(self.in_channels, self.in_channels).init(device)?;
        let upsampling = UpsamplingConfig::new(self.in_channels, self.out_channels).init(device)?;
        let skipconnect = SeparableConvConfig::new(self.skip_channels, self.out_channels, 3)
            .with_padding(1)
            .init(device)?;

        Ok(DecoderStage {
            decoder,
            upsampling,
            skipconnect,
        })
    }
}

/// `up(decoder(x)) + relu(skipconnect(skip))`
#[derive(Module, Debug)]
pub struct DecoderStage<B: Backend> {
    decoder: Decoder<B>,
    upsampling: Upsampling<B>,
    skipconnect: SeparableConv<B>,
}

impl<B: Backend> DecoderStage<B> {
    /// Decodes `input`, doubles its resolution and adds the projected `skip`.
    ///
    /// `skip` must have exactly twice the height and width of `input`.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
        skip: Tensor<B, 4>,
    ) -> Result<Tensor<B, 4>, NetworkError> {
        ensure_channels("decoder stage skip", &skip, self.skip_channels())?;

        let x = self.decoder.evaluate(input)?;
        let x = self.upsampling.evaluate(x)?;
        let skip = Activation::Relu.apply(self.skipconnect.forward(skip)?);
        let x = checked_add("decoder stage skip fusion", x, skip)?;
        ensure_channels("decoder stage output", &x, self.out_channels())?;
        Ok(x)
    }

    pub fn skip_channels(&self) -> usize {
        self.skipconnect.in_channels()
    }
}

impl<B: Backend> Block<B> for DecoderStage<B> {
    /// `(decoder-path tensor, skip tensor)`
    type Input = (Tensor<B, 4>, Tensor<B, 4>);

    fn in_channels(&self) -> usize {
        self.decoder.in_channels()
    }

    fn out_channels(&self) -> usize {
        self.upsampling.out_channels()
    }

    fn evaluate(&self, (input, skip): Self::Input) -> Result<Tensor<B, 4>, NetworkError> {
        self.forward(input, skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_decoder_stage_fuses_skip_at_double_resolution() {
        let device = <TestBackend as Backend>::Device::default();
        let stage: DecoderStage<TestBackend> =
            DecoderStageConfig::new(32, 16, 8).init(&device).unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([2, 32, 4, 6], &device);
        let skip = Tensor::<TestBackend, 4>::zeros([2, 8, 8, 12], &device);
        let output = stage.evaluate((input, skip)).unwrap();

        assert_eq!(output.dims(), [2, 16, 8, 12]);
        assert_eq!(stage.in_channels(), 32);
        assert_eq!(stage.out_channels(), 16);
        assert_eq!(stage.skip_channels(), 8);
    }

    #[test]
    fn test_decoder_stage_reports_spatial_misalignment() {
        let device = <TestBackend as Backend>::Device::default();
        let stage: DecoderStage<TestBackend> =
            DecoderStageConfig::new(8, 8, 8).init(&device).unwrap();

        // An odd-sized skip cannot match a doubled 4x4 map.
        let input = Tensor::<TestBackend, 4>::zeros([1, 8, 4, 4], &device);
        let skip = Tensor::<TestBackend, 4>::zeros([1, 8, 9, 9], &device);

        match stage.forward(input, skip) {
            Err(NetworkError::ShapeMismatch { left, right, .. }) => {
                assert_eq!(left, [1, 8, 8, 8]);
                assert_eq!(right, [1, 8, 9, 9]);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_decoder_stage_rejects_wrong_skip_channels() {
        let device = <TestBackend as Backend>::Device::default();
        let stage: DecoderStage<TestBackend> =
            DecoderStageConfig::new(8, 8, 16).init(&device).unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([1, 8, 4, 4], &device);
        let skip = Tensor::<TestBackend, 4>::zeros([1, 8, 8, 8], &device);

        assert!(matches!(
            stage.forward(input, skip),
            Err(NetworkError::ChannelMismatch { expected: 16, actual: 8, .. })
        ));
    }
}
