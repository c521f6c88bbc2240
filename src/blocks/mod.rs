//! Residual, resampling and refinement blocks.
//!
//! Every block implements [`Block`], which lets the stage wrappers compose
//! them without knowing the concrete variant.

pub mod decoder;
pub mod downsampling;
pub mod encoder;
pub mod upsampling;

pub use decoder::{Decoder, DecoderConfig};
pub use downsampling::{Downsampling, DownsamplingConfig};
pub use encoder::{Encoder, EncoderConfig, Shortcut};
pub use upsampling::{Upsampling, UpsamplingConfig};

use burn::tensor::{Tensor, backend::Backend};

use crate::errors::NetworkError;

/// Divisor applied to the output channel count to size residual bottlenecks.
pub const BOTTLENECK_DIVISOR: usize = 4;

/// Common capability of every block: tensors in, one tensor out.
pub trait Block<B: Backend> {
    /// What the block consumes: a single feature map, or a feature map plus skip.
    type Input;

    /// Channel count the block expects on its (primary) input.
    fn in_channels(&self) -> usize;

    /// Channel count the block produces.
    fn out_channels(&self) -> usize;

    /// Evaluates the block.
    fn evaluate(&self, input: Self::Input) -> Result<Tensor<B, 4>, NetworkError>;
}

/// Feeds `input` through `blocks` in order.
pub fn evaluate_chain<'a, B, T>(
    blocks: impl IntoIterator<Item = &'a T>,
    input: Tensor<B, 4>,
) -> Result<Tensor<B, 4>, NetworkError>
where
    B: Backend,
    T: Block<B, Input = Tensor<B, 4>> + 'a,
{
    blocks
        .into_iter()
        .try_fold(input, |x, block| block.evaluate(x))
}

/// Computes the bottleneck width for `block`, rejecting counts that would truncate.
pub(crate) fn bottleneck_channels(
    block: &'static str,
    out_channels: usize,
) -> Result<usize, NetworkError> {
    if out_channels == 0 || out_channels % BOTTLENECK_DIVISOR != 0 {
        return Err(NetworkError::IndivisibleChannels {
            block,
            channels: out_channels,
            divisor: BOTTLENECK_DIVISOR,
        });
    }
    Ok(out_channels / BOTTLENECK_DIVISOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bottleneck_channels() {
        assert_eq!(bottleneck_channels("encoder", 64).unwrap(), 16);
        assert!(matches!(
            bottleneck_channels("encoder", 30),
            Err(NetworkError::IndivisibleChannels {
                channels: 30,
                divisor: 4,
                ..
            })
        ));
        assert!(bottleneck_channels("encoder", 0).is_err());
    }
}
