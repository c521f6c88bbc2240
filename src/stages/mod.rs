//! Encoder and decoder stages, one per pyramid level.

pub mod decoder_stage;
pub mod encoder_stage;

pub use decoder_stage::{DecoderStage, DecoderStageConfig};
pub use encoder_stage::{EncoderStage, EncoderStageConfig};
