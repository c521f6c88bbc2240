//! Convolutional building blocks shared by every higher block.
//!
//! This module contains the depthwise-separable convolution, the plain
//! convolution used by the stem and output head, activation functions, and
//! the shape-assertion helpers invoked at block boundaries.

pub mod activation;
pub mod conv;
pub mod separable;
pub mod shape;

pub use activation::Activation;
pub use conv::{ConvLayer, ConvLayerConfig};
pub use separable::{SeparableConv, SeparableConvConfig};

/// Replaces every parameter of `conv` with zeros of the same shape.
#[cfg(test)]
pub(crate) fn zero_conv<B: burn::tensor::backend::Backend>(
    mut conv: burn::nn::conv::Conv2d<B>,
) -> burn::nn::conv::Conv2d<B> {
    use burn::module::Param;

    conv.weight = Param::from_tensor(conv.weight.val().zeros_like());
    conv.bias = conv
        .bias
        .map(|bias| Param::from_tensor(bias.val().zeros_like()));
    conv
}
