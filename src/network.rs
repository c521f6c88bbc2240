//! Network - the top-level encoder-decoder.
//!
//! A convolutional stem feeds a pyramid of [`EncoderStage`]s whose inputs are
//! retained as skip tensors, a mirrored pyramid of [`DecoderStage`]s consumes
//! them in reverse order, and a refinement head predicts a correction that is
//! added back onto the input image.

use crate::blocks::{Block, Decoder, DecoderConfig};
use crate::errors::NetworkError;
use crate::layers::shape::{checked_add, ensure_channels};
use crate::layers::{Activation, ConvLayer, ConvLayerConfig};
use crate::stages::{DecoderStage, DecoderStageConfig, EncoderStage, EncoderStageConfig};
use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Configuration for building a [`Network`].
///
/// [`NetworkConfig::default`] is the standard 4-channel topology:
/// stem 4→16, encoder stages 16→64→128→256→512 with depths 1, 1, 3, 3, and
/// decoder stages 512→64→32→32→16 fed by skips of 256, 128, 64 and 16 channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Channels of the input and output images.
    pub image_channels: usize,
    /// Channels produced by the stem convolution.
    pub stem_channels: usize,
    /// Encoder stages, shallowest first.
    pub encoder_stages: Vec<EncoderStageConfig>,
    /// Decoder stages, deepest first.
    pub decoder_stages: Vec<DecoderStageConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            image_channels: 4,
            stem_channels: 16,
            encoder_stages: vec![
                EncoderStageConfig::new(16, 64, 1),
                EncoderStageConfig::new(64, 128, 1),
                EncoderStageConfig::new(128, 256, 3),
                EncoderStageConfig::new(256, 512, 3),
            ],
            decoder_stages: vec![
                DecoderStageConfig::new(512, 64, 256),
                DecoderStageConfig::new(64, 32, 128),
                DecoderStageConfig::new(32, 32, 64),
                DecoderStageConfig::new(32, 16, 16),
            ],
        }
    }
}

impl NetworkConfig {
    /// Creates a configuration with the default topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the image channel count.
    pub fn with_image_channels(mut self, channels: usize) -> Self {
        self.image_channels = channels;
        self
    }

    /// Sets the stem channel count.
    pub fn with_stem_channels(mut self, channels: usize) -> Self {
        self.stem_channels = channels;
        self
    }

    /// Replaces the encoder schedule.
    pub fn with_encoder_stages(mut self, stages: Vec<EncoderStageConfig>) -> Self {
        self.encoder_stages = stages;
        self
    }

    /// Replaces the decoder schedule.
    pub fn with_decoder_stages(mut self, stages: Vec<DecoderStageConfig>) -> Self {
        self.decoder_stages = stages;
        self
    }

    /// Height and width of the input must be multiples of this value.
    pub fn spatial_multiple(&self) -> Result<usize, NetworkError> {
        spatial_multiple(self.encoder_stages.len())
    }

    /// Channel counts of the skip tensors, in the order decoder stages consume them.
    fn skip_schedule(&self) -> Vec<usize> {
        let mut skips: Vec<usize> = std::iter::once(self.stem_channels)
            .chain(self.encoder_stages.iter().map(|s| s.out_channels))
            .take(self.encoder_stages.len())
            .collect();
        skips.reverse();
        skips
    }

    /// Checks the stage wiring without allocating any weights.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.image_channels == 0 || self.stem_channels == 0 {
            return Err(NetworkError::invalid_config(
                "image and stem channels must be non-zero",
            ));
        }
        if self.encoder_stages.is_empty() {
            return Err(NetworkError::invalid_config(
                "at least one encoder stage is required",
            ));
        }
        if self.decoder_stages.len() != self.encoder_stages.len() {
            return Err(NetworkError::invalid_config(format!(
                "{} decoder stages cannot mirror {} encoder stages",
                self.decoder_stages.len(),
                self.encoder_stages.len()
            )));
        }
        self.spatial_multiple()?;

        let mut channels = self.stem_channels;
        for (i, stage) in self.encoder_stages.iter().enumerate() {
            if stage.in_channels != channels {
                return Err(NetworkError::invalid_config(format!(
                    "encoder stage {} expects {} input channels but receives {}",
                    i + 1,
                    stage.in_channels,
                    channels
                )));
            }
            channels = stage.out_channels;
        }

        for (i, (stage, skip)) in self
            .decoder_stages
            .iter()
            .zip(self.skip_schedule())
            .enumerate()
        {
            if stage.in_channels != channels {
                return Err(NetworkError::invalid_config(format!(
                    "decoder stage {} expects {} input channels but receives {}",
                    i + 1,
                    stage.in_channels,
                    channels
                )));
            }
            if stage.skip_channels != skip {
                return Err(NetworkError::invalid_config(format!(
                    "decoder stage {} expects {} skip channels but the mirrored encoder yields {}",
                    i + 1,
                    stage.skip_channels,
                    skip
                )));
            }
            channels = stage.out_channels;
        }

        Ok(())
    }

    /// Builds the network on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Network<B>, NetworkError> {
        self.validate()?;
        let spatial_multiple = self.spatial_multiple()?;

        let stem = ConvLayerConfig::new(self.image_channels, self.stem_channels, 3)
            .with_padding(1)
            .with_activation(Activation::Relu)
            .init(device)?;
        let encoder_stages = self
            .encoder_stages
            .iter()
            .map(|stage| stage.init(device))
            .collect::<Result<Vec<_>, _>>()?;
        let decoder_stages = self
            .decoder_stages
            .iter()
            .map(|stage| stage.init(device))
            .collect::<Result<Vec<_>, _>>()?;

        // validate() guarantees a non-empty decoder schedule.
        let head_channels = self
            .decoder_stages
            .last()
            .map(|stage| stage.out_channels)
            .unwrap_or(self.stem_channels);
        let head_decoder = DecoderConfig::new(head_channels, head_channels).init(device)?;
        let head_conv = ConvLayerConfig::new(head_channels, self.image_channels, 3)
            .with_padding(1)
            .init(device)?;

        let network = Network {
            stem,
            encoder_stages,
            decoder_stages,
            head_decoder,
            head_conv,
            image_channels: self.image_channels,
            spatial_multiple,
        };
        debug!(
            "Built network: {} encoder stages, {} parameters",
            network.encoder_stages.len(),
            network.num_params()
        );
        Ok(network)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, NetworkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, NetworkError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// `2^stages`, or an error when the stage count overflows the shift.
fn spatial_multiple(stages: usize) -> Result<usize, NetworkError> {
    u32::try_from(stages)
        .ok()
        .and_then(|shift| 1usize.checked_shl(shift))
        .ok_or_else(|| {
            NetworkError::invalid_config(format!(
                "{} stages exceed the representable spatial multiple",
                stages
            ))
        })
}

/// Observed dimensions at a named junction of a forward pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Junction {
    pub name: String,
    pub dims: [usize; 4],
}

/// The encoder-decoder network.
///
/// `forward` takes `&self` and allocates its intermediates per call, but
/// backend tensors are not necessarily `Sync`: to evaluate from several
/// threads, give each thread its own `clone()` of the network. Clones share
/// the underlying weight storage.
#[derive(Module, Debug)]
pub struct Network<B: Backend> {
    stem: ConvLayer<B>,
    encoder_stages: Vec<EncoderStage<B>>,
    decoder_stages: Vec<DecoderStage<B>>,
    head_decoder: Decoder<B>,
    head_conv: ConvLayer<B>,
    image_channels: usize,
    spatial_multiple: usize,
}

impl<B: Backend> Network<B> {
    /// Maps an image of shape `[batch, C, H, W]` to a restored image of the same shape.
    pub fn forward(&self, image: Tensor<B, 4>) -> Result<Tensor<B, 4>, NetworkError> {
        self.forward_traced(image).map(|(output, _)| output)
    }

    /// Like [`Network::forward`], also returning the dims observed at each junction.
    ///
    /// Junctions are `stem`, `encoder stage 1..n`, `decoder stage 1..n` and `output`.
    pub fn forward_traced(
        &self,
        image: Tensor<B, 4>,
    ) -> Result<(Tensor<B, 4>, Vec<Junction>), NetworkError> {
        self.check_input_dims(image.dims())?;

        let mut junctions = Vec::with_capacity(2 * self.encoder_stages.len() + 2);
        let mut record =
            |name: String, x: &Tensor<B, 4>, expected: usize| -> Result<(), NetworkError> {
                ensure_channels(&name, x, expected)?;
                trace!("{}: {:?}", name, x.dims());
                junctions.push(Junction {
                    name,
                    dims: x.dims(),
                });
                Ok(())
            };

        let mut x = self.stem.forward(image.clone())?;
        record("stem".to_string(), &x, self.stem.out_channels())?;

        // Each stage input is the skip tensor for the mirrored decoder stage.
        let mut skips = Vec::with_capacity(self.encoder_stages.len());
        for (i, stage) in self.encoder_stages.iter().enumerate() {
            let next = stage.evaluate(x.clone())?;
            record(format!("encoder stage {}", i + 1), &next, stage.out_channels())?;
            skips.push(x);
            x = next;
        }

        for (i, (stage, skip)) in self
            .decoder_stages
            .iter()
            .zip(skips.into_iter().rev())
            .enumerate()
        {
            x = stage.evaluate((x, skip))?;
            record(format!("decoder stage {}", i + 1), &x, stage.out_channels())?;
        }

        let x = self.head_decoder.evaluate(x)?;
        let correction = self.head_conv.forward(x)?;
        record("output".to_string(), &correction, self.image_channels)?;

        let output = checked_add("global residual", correction, image)?;
        Ok((output, junctions))
    }

    /// Validates an input shape without evaluating any block.
    pub fn check_input_dims(&self, dims: [usize; 4]) -> Result<(), NetworkError> {
        if dims[1] != self.image_channels {
            return Err(NetworkError::ChannelMismatch {
                junction: "network input".to_string(),
                expected: self.image_channels,
                actual: dims[1],
            });
        }
        let multiple = self.spatial_multiple();
        let valid = |size: usize| size != 0 && size % multiple == 0;
        if dims[0] == 0 || !valid(dims[2]) || !valid(dims[3]) {
            return Err(NetworkError::InvalidInputShape { dims, multiple });
        }
        Ok(())
    }

    /// Height and width of the input must be multiples of this value.
    pub fn spatial_multiple(&self) -> usize {
        self.spatial_multiple
    }

    /// Reports channel transitions and parameter counts per component.
    pub fn summary(&self) -> NetworkSummary {
        let mut components = vec![ComponentSummary::new(
            "stem",
            self.stem.in_channels(),
            self.stem.out_channels(),
            self.stem.num_params(),
        )];
        for (i, stage) in self.encoder_stages.iter().enumerate() {
            components.push(ComponentSummary::new(
                format!("encoder stage {}", i + 1),
                stage.in_channels(),
                stage.out_channels(),
                stage.num_params(),
            ));
        }
        for (i, stage) in self.decoder_stages.iter().enumerate() {
            components.push(ComponentSummary::new(
                format!("decoder stage {}", i + 1),
                stage.in_channels(),
                stage.out_channels(),
                stage.num_params(),
            ));
        }
        components.push(ComponentSummary::new(
            "head decoder",
            self.head_decoder.in_channels(),
            self.head_decoder.out_channels(),
            self.head_decoder.num_params(),
        ));
        components.push(ComponentSummary::new(
            "head conv",
            self.head_conv.in_channels(),
            self.head_conv.out_channels(),
            self.head_conv.num_params(),
        ));

        let total_params = components.iter().map(|c| c.num_params).sum();
        NetworkSummary {
            components,
            total_params,
        }
    }

    #[cfg(test)]
    fn with_zeroed_head(self) -> Self {
        Self {
            head_decoder: self.head_decoder.zeroed(),
            head_conv: self.head_conv.zeroed(),
            ..self
        }
    }
}

/// Per-component entry of a [`NetworkSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub in_channels: usize,
    pub out_channels: usize,
    pub num_params: usize,
}

impl ComponentSummary {
    fn new(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        num_params: usize,
    ) -> Self {
        Self {
            name: name.into(),
            in_channels,
            out_channels,
            num_params,
        }
    }
}

/// Parameter counts and channel transitions of a built network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub components: Vec<ComponentSummary>,
    pub total_params: usize,
}

impl NetworkSummary {
    /// Exports the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, NetworkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
