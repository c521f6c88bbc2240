//! # sepunet
//!
//! A depthwise-separable U-Net style encoder-decoder for 4-channel
//! image-to-image restoration, defined on top of the Burn framework.
//!
//! The network stacks strided [`blocks::Downsampling`] and residual
//! [`blocks::Encoder`] blocks into encoder stages, mirrors them with
//! [`blocks::Upsampling`] decoder stages fed by additive skip connections, and
//! adds its output back onto the input image (global residual learning).
//!
//! ## Features
//!
//! - **Burn Backend**: Runs on any Burn backend; WGPU and NdArray aliases are provided.
//! - **Checked topology**: Channel counts are validated at construction and at
//!   every block boundary, and input shapes are checked before evaluation.
//! - **Serializable configuration**: [`NetworkConfig`] round-trips through JSON.
//!
//! ## Example
//!
//! ```
//! use sepunet::prelude::*;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray;
//!
//! let device = <Backend as burn::tensor::backend::Backend>::Device::default();
//!
//! let model: Network<Backend> = NetworkConfig::default()
//!     .init(&device)
//!     .expect("Failed to build network");
//!
//! let image = Tensor::<Backend, 4>::zeros([1, 4, 32, 32], &device);
//! let restored = model.forward(image).unwrap();
//! assert_eq!(restored.dims(), [1, 4, 32, 32]);
//! ```

pub mod blocks;
pub mod errors;
pub mod layers;
pub mod network;
pub mod stages;

// Re-exports for convenience
pub use errors::NetworkError;
pub use layers::activation::Activation;
pub use network::{Network, NetworkConfig, NetworkSummary};

/// Backend type for GPU inference.
pub type InferenceBackend = burn::backend::Wgpu;

/// Backend type for CPU inference.
pub type CpuBackend = burn::backend::NdArray;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::blocks::Block;
    pub use crate::errors::NetworkError;
    pub use crate::network::{Network, NetworkConfig, NetworkSummary};
    pub use crate::stages::{DecoderStageConfig, EncoderStageConfig};
    pub use crate::{CpuBackend, InferenceBackend};
}
